//! Category commands: sidebar listing and the save-or-rename form

use serde_json::{json, Value};

use crate::app::App;
use crate::errors::Result;
use crate::events::ToastLevel;
use crate::model::CategoryDraft;
use crate::runtime;

pub fn list(app: &App, _args: Value) -> Result<Value> {
    Ok(json!({
        "categories": app.store().category_counts(),
        "total": app.store().prompt_count(),
    }))
}

pub fn save(app: &App, args: Value) -> Result<Value> {
    let id = args.get("id").and_then(|v| v.as_str()).map(String::from);
    let draft: CategoryDraft = serde_json::from_value(args)?;
    let category = runtime::block_on(app.store().save_category(draft, id.as_deref()))?;

    let key = if id.is_some() {
        "category_updated"
    } else {
        "category_added"
    };
    app.toast(ToastLevel::Success, key);
    Ok(json!(category))
}
