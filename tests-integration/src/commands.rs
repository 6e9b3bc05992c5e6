//! Integration tests for command dispatch and handlers

use prompt_master_core::{runtime, App, AppConfig, AppEvent};
use serde_json::json;
use tempfile::TempDir;

fn test_app() -> (App, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    let app = runtime::block_on(App::bootstrap(config)).unwrap();
    (app, dir)
}

#[test]
fn test_ping_command() {
    let (app, _dir) = test_app();

    let args = json!({"message": "hello"});
    let result = app.dispatch("ping", args).unwrap();

    assert_eq!(result["pong"], json!(true));
    assert_eq!(result["message"], json!("hello"));
}

#[test]
fn test_command_not_found() {
    let (app, _dir) = test_app();

    let result = app.dispatch("nonexistent_command", json!({}));
    assert!(result.is_err());
}

#[test]
fn test_command_surface_is_stable() {
    let commands = prompt_master_core::commands::list_commands();

    assert_eq!(
        commands,
        vec![
            "categories.list",
            "categories.save",
            "i18n.table",
            "ping",
            "prefs.get",
            "prefs.set",
            "prompts.copy",
            "prompts.create",
            "prompts.delete",
            "prompts.get",
            "prompts.list",
            "prompts.update",
            "session.begin",
            "session.disconnect",
            "session.status",
            "snapshot.export",
            "snapshot.import",
        ]
    );
}

#[test]
fn test_prompt_lifecycle_through_dispatch() {
    let (app, _dir) = test_app();
    let (_id, events) = app.subscribe();

    // Create
    let created = app
        .dispatch(
            "prompts.create",
            json!({
                "title": "Standup Summary",
                "content": "Summarize this standup: [NOTES]",
                "tags": "Work, AI",
                "rating": 4,
            }),
        )
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let listed = app.dispatch("prompts.list", json!({})).unwrap();
    assert_eq!(listed["prompts"].as_array().unwrap().len(), 1);

    // Update
    let updated = app
        .dispatch(
            "prompts.update",
            json!({ "id": id, "title": "Standup Digest", "content": "Digest: [NOTES]" }),
        )
        .unwrap();
    assert_eq!(updated["title"], "Standup Digest");
    assert!(!updated["modifiedAt"].is_null());

    // Copy lands on the noop clipboard and still counts
    let copied = app.dispatch("prompts.copy", json!({ "id": id })).unwrap();
    assert_eq!(copied["copyCount"], 1);

    let fetched = app.dispatch("prompts.get", json!({ "id": id })).unwrap();
    assert_eq!(fetched["prompt"]["copyCount"], 1);
    assert!(!fetched["prompt"]["lastUsedAt"].is_null());
    assert_eq!(fetched["categoryName"], "General");
    assert_eq!(fetched["tags"].as_array().unwrap().len(), 2);

    // Delete
    let deleted = app.dispatch("prompts.delete", json!({ "id": id })).unwrap();
    assert_eq!(deleted["deleted"], json!(true));
    let listed = app.dispatch("prompts.list", json!({})).unwrap();
    assert!(listed["prompts"].as_array().unwrap().is_empty());

    let toasts: Vec<String> = events
        .try_iter()
        .filter_map(|event| match event {
            AppEvent::Toast { message, .. } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(
        toasts,
        vec!["Prompt added!", "Prompt updated!", "Prompt deleted"]
    );
}

#[test]
fn test_snapshot_export_import_round_trip() {
    let (source, _source_dir) = test_app();

    for title in ["One", "Two"] {
        source
            .dispatch(
                "prompts.create",
                json!({ "title": title, "content": "Body" }),
            )
            .unwrap();
    }
    let exported = source.dispatch("snapshot.export", json!({})).unwrap();
    let document = exported["document"].as_str().unwrap();

    let (target, _target_dir) = test_app();
    let imported = target
        .dispatch("snapshot.import", json!({ "document": document }))
        .unwrap();
    assert_eq!(imported["imported"], 2);

    let listed = target.dispatch("prompts.list", json!({})).unwrap();
    assert_eq!(listed["prompts"].as_array().unwrap().len(), 2);

    // Importing the same document again adds nothing
    let again = target
        .dispatch("snapshot.import", json!({ "document": document }))
        .unwrap();
    assert_eq!(again["imported"], 0);
}

#[test]
fn test_prefs_persist_across_restart() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let app = runtime::block_on(App::bootstrap(config.clone())).unwrap();
    let set = app
        .dispatch("prefs.set", json!({ "theme": "dark", "locale": "ar" }))
        .unwrap();
    assert_eq!(set["rtl"], true);
    runtime::block_on(app.shutdown());
    drop(app);

    let app = runtime::block_on(App::bootstrap(config)).unwrap();
    let prefs = app.dispatch("prefs.get", json!({})).unwrap();
    assert_eq!(prefs["theme"], "dark");
    assert_eq!(prefs["locale"], "ar");
    assert_eq!(prefs["rtl"], true);

    // Toasts come out of the persisted locale's catalog
    let table = app.dispatch("i18n.table", json!({})).unwrap();
    assert_eq!(table["locale"], "ar");
}
