//! Export and import commands
//!
//! The shell owns file I/O; these commands only produce and consume the
//! document text.

use serde_json::{json, Value};

use crate::app::App;
use crate::errors::{CompanionError, Result};
use crate::events::ToastLevel;
use crate::exchange::{self, ExportDocument};
use crate::runtime;

pub fn export(app: &App, _args: Value) -> Result<Value> {
    let document = ExportDocument::new(app.store().snapshot());
    let filename = document.filename();
    let rendered = document.to_json()?;

    app.toast(ToastLevel::Success, "export_success");
    Ok(json!({ "filename": filename, "document": rendered }))
}

pub fn import(app: &App, args: Value) -> Result<Value> {
    let raw = match args.get("document") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => {
            return Err(CompanionError::InvalidArgs {
                command: "snapshot.import".to_string(),
                reason:  "missing document".to_string(),
            });
        },
    };

    let incoming = match exchange::parse_import(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            // Wrong-shape documents toast invalid_file via dispatch;
            // unparseable text gets its own line here
            if matches!(err, CompanionError::Serde(_)) {
                app.toast(ToastLevel::Error, "import_error");
            }
            return Err(err);
        },
    };

    let outcome = runtime::block_on(app.store().merge_snapshot(incoming))?;

    let message = format!(
        "{} {}!",
        outcome.new_prompts,
        app.catalog_text("prompts_imported")
    );
    app.toast_text(ToastLevel::Success, message);
    Ok(json!({ "imported": outcome.new_prompts }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::config::AppConfig;
    use crate::events::AppEvent;
    use crate::model::Snapshot;

    fn seeded_app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let app = runtime::block_on(App::bootstrap(config)).unwrap();
        let payload = serde_json::to_value(Snapshot::demo()).unwrap();
        runtime::block_on(app.ingest_payload(payload)).unwrap();
        (app, dir)
    }

    fn toast_messages(rx: &crossbeam_channel::Receiver<AppEvent>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|event| match event {
                AppEvent::Toast { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    // ========================================
    // snapshot.export tests
    // ========================================

    #[test]
    fn test_export_produces_versioned_document() {
        let (app, _dir) = seeded_app();
        let (_id, rx) = app.subscribe();

        let result = export(&app, json!({})).unwrap();
        assert!(result["filename"]
            .as_str()
            .unwrap()
            .starts_with("prompt-master-export-"));

        let document: Value =
            serde_json::from_str(result["document"].as_str().unwrap()).unwrap();
        assert_eq!(document["version"], "1.0");
        assert_eq!(document["prompts"].as_array().unwrap().len(), 3);
        assert_eq!(document["categories"].as_array().unwrap().len(), 5);

        assert_eq!(
            toast_messages(&rx),
            vec!["Prompts exported successfully!".to_string()]
        );
    }

    // ========================================
    // snapshot.import tests
    // ========================================

    #[test]
    fn test_import_merges_by_id() {
        let (app, _dir) = seeded_app();
        let (_id, rx) = app.subscribe();

        let document = json!({
            "version": "1.0",
            "prompts": [
                { "id": "1", "title": "Shadowed", "content": "Loses to the held copy" },
                { "id": "99", "title": "Imported", "content": "Body" },
            ],
            "categories": [],
            "tags": [],
        });

        let result = import(&app, json!({ "document": document })).unwrap();
        assert_eq!(result["imported"], 1);
        assert_eq!(app.store().prompt_count(), 4);

        // Held copy wins on id collision
        let detail = app.store().prompt_detail("1").unwrap();
        assert_eq!(detail.prompt.title, "Blog Article Generator");

        assert_eq!(toast_messages(&rx), vec!["1 prompts imported!".to_string()]);
    }

    #[test]
    fn test_import_accepts_string_form() {
        let (app, _dir) = seeded_app();

        let raw = r#"{ "prompts": [ { "id": "x7", "title": "T", "content": "C" } ] }"#;
        let result = import(&app, json!({ "document": raw })).unwrap();
        assert_eq!(result["imported"], 1);
    }

    #[test]
    fn test_import_wrong_shape_mutates_nothing() {
        let (app, _dir) = seeded_app();
        let (_id, rx) = app.subscribe();

        // Through dispatch so the central toast fires
        let err = app
            .dispatch("snapshot.import", json!({ "document": { "prompts": 5 } }))
            .unwrap_err();
        assert_eq!(err.category(), "format");
        assert_eq!(app.store().prompt_count(), 3);
        assert_eq!(toast_messages(&rx), vec!["Invalid file format".to_string()]);
    }

    #[test]
    fn test_import_unparseable_text_toasts_import_error() {
        let (app, _dir) = seeded_app();
        let (_id, rx) = app.subscribe();

        let err = app
            .dispatch("snapshot.import", json!({ "document": "not json at all" }))
            .unwrap_err();
        assert_eq!(err.category(), "serialization");
        assert_eq!(app.store().prompt_count(), 3);
        assert_eq!(toast_messages(&rx), vec!["Error importing file".to_string()]);
    }

    #[test]
    fn test_import_requires_document() {
        let (app, _dir) = seeded_app();

        let err = import(&app, json!({})).unwrap_err();
        assert_eq!(err.category(), "arguments");
    }
}
