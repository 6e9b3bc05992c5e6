//! Prompt commands: listing, CRUD and the copy action
//!
//! Mutations toast their own success line; failures toast centrally in
//! `App::dispatch` via the error's toast key.

use serde_json::{json, Value};

use crate::app::App;
use crate::errors::{CompanionError, Result};
use crate::events::ToastLevel;
use crate::model::PromptDraft;
use crate::runtime;
use crate::store::{CategoryFilter, PromptQuery, SortKey};

use super::required_str;

pub fn list(app: &App, args: Value) -> Result<Value> {
    let query = PromptQuery {
        category: args
            .get("category")
            .and_then(|v| v.as_str())
            .map(CategoryFilter::parse)
            .unwrap_or_default(),
        search: args
            .get("search")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        sort: args
            .get("sort")
            .and_then(|v| v.as_str())
            .map(SortKey::parse)
            .unwrap_or_default(),
    };

    Ok(json!({ "prompts": app.store().query(&query) }))
}

pub fn get(app: &App, args: Value) -> Result<Value> {
    let id = required_str(&args, "prompts.get", "id")?;
    let detail = app
        .store()
        .prompt_detail(id)
        .ok_or_else(|| CompanionError::NotFound(format!("prompt {}", id)))?;

    let category_name = detail.category_name().to_string();
    Ok(json!({
        "prompt": detail.prompt,
        "category": detail.category,
        "categoryName": category_name,
        "tags": detail.tags,
    }))
}

pub fn create(app: &App, args: Value) -> Result<Value> {
    let draft: PromptDraft = serde_json::from_value(args)?;
    let prompt = runtime::block_on(app.store().create_prompt(draft))?;

    app.toast(ToastLevel::Success, "prompt_added");
    Ok(json!(prompt))
}

pub fn update(app: &App, args: Value) -> Result<Value> {
    let id = required_str(&args, "prompts.update", "id")?.to_string();
    let draft: PromptDraft = serde_json::from_value(args)?;
    let prompt = runtime::block_on(app.store().update_prompt(&id, draft))?;

    app.toast(ToastLevel::Success, "prompt_updated");
    Ok(json!(prompt))
}

pub fn delete(app: &App, args: Value) -> Result<Value> {
    let id = required_str(&args, "prompts.delete", "id")?;
    let deleted = runtime::block_on(app.store().delete_prompt(id))?;

    if deleted {
        app.toast(ToastLevel::Success, "prompt_deleted");
    }
    Ok(json!({ "deleted": deleted }))
}

pub fn copy(app: &App, args: Value) -> Result<Value> {
    let id = required_str(&args, "prompts.copy", "id")?;
    let detail = app
        .store()
        .prompt_detail(id)
        .ok_or_else(|| CompanionError::NotFound(format!("prompt {}", id)))?;

    // The counter moves only after the host clipboard accepted the text
    app.clipboard().set_text(&detail.prompt.content)?;

    let prompt = runtime::block_on(app.store().record_copy(id))?
        .ok_or_else(|| CompanionError::NotFound(format!("prompt {}", id)))?;

    Ok(json!({ "copyCount": prompt.copy_count }))
}
