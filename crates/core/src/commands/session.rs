//! Pairing session commands

use serde_json::{json, Value};

use crate::app::App;
use crate::errors::Result;
use crate::runtime;

pub fn begin(app: &App, _args: Value) -> Result<Value> {
    let status = app.session().begin_pairing()?;
    Ok(json!({ "status": status }))
}

pub fn status(app: &App, _args: Value) -> Result<Value> {
    Ok(serde_json::to_value(app.session().status())?)
}

pub fn disconnect(app: &App, _args: Value) -> Result<Value> {
    let status = runtime::block_on(app.session().disconnect())?;
    Ok(json!({ "status": status }))
}
