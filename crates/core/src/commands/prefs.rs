//! Preference and translation-table commands

use serde_json::{json, Value};

use crate::app::App;
use crate::errors::Result;
use crate::i18n;
use crate::runtime;

pub fn get(app: &App, _args: Value) -> Result<Value> {
    let (theme, locale) = app.prefs();
    let rtl = i18n::is_rtl(&locale);
    Ok(json!({ "theme": theme, "locale": locale, "rtl": rtl }))
}

pub fn set(app: &App, args: Value) -> Result<Value> {
    let theme = args.get("theme").and_then(|v| v.as_str());
    let locale = args.get("locale").and_then(|v| v.as_str());

    let (theme, locale) = runtime::block_on(app.set_prefs(theme, locale))?;
    let rtl = i18n::is_rtl(&locale);
    Ok(json!({ "theme": theme, "locale": locale, "rtl": rtl }))
}

pub fn i18n_table(app: &App, args: Value) -> Result<Value> {
    let requested = args.get("locale").and_then(|v| v.as_str());
    let (locale, table) = app.i18n_table(requested)?;
    let rtl = i18n::is_rtl(&locale);
    Ok(json!({ "locale": locale, "rtl": rtl, "table": table }))
}
