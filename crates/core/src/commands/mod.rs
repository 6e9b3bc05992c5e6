//! Command registry and dispatch system
//!
//! This module provides a static registry of commands that UI shells call by
//! name. Commands are registered as "category.action" (e.g., "prompts.create",
//! "session.begin") and dispatched to handler functions against the owned
//! application state.
//!
//! ## Adding a new command
//!
//! 1. Create handler function: `pub fn my_command(app: &App, args: Value) -> Result<Value>`
//! 2. Register in `REGISTRY`: `("category.action", my_command as CommandHandler)`
//! 3. Add tests for the command

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::app::App;
use crate::errors::{CompanionError, Result};

mod categories;
mod prefs;
mod prompts;
mod session;
mod snapshot;

/// Type alias for command handler functions
///
/// All command handlers take the application state plus a JSON Value
/// (arguments) and return a Result<Value>
pub type CommandHandler = fn(&App, Value) -> Result<Value>;

/// Static command registry
///
/// Maps command names to handler functions. Initialized lazily on first access.
static REGISTRY: Lazy<HashMap<&'static str, CommandHandler>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Test command
    map.insert("ping", ping as CommandHandler);

    // Replica
    map.insert("prompts.list", prompts::list as CommandHandler);
    map.insert("prompts.get", prompts::get as CommandHandler);
    map.insert("prompts.create", prompts::create as CommandHandler);
    map.insert("prompts.update", prompts::update as CommandHandler);
    map.insert("prompts.delete", prompts::delete as CommandHandler);
    map.insert("prompts.copy", prompts::copy as CommandHandler);
    map.insert("categories.list", categories::list as CommandHandler);
    map.insert("categories.save", categories::save as CommandHandler);

    // Pairing
    map.insert("session.begin", session::begin as CommandHandler);
    map.insert("session.status", session::status as CommandHandler);
    map.insert("session.disconnect", session::disconnect as CommandHandler);

    // Exchange
    map.insert("snapshot.export", snapshot::export as CommandHandler);
    map.insert("snapshot.import", snapshot::import as CommandHandler);

    // Presentation
    map.insert("prefs.get", prefs::get as CommandHandler);
    map.insert("prefs.set", prefs::set as CommandHandler);
    map.insert("i18n.table", prefs::i18n_table as CommandHandler);

    map
});

/// Dispatch a command by name
///
/// Looks up the command in the registry and executes it against `app` with
/// the provided arguments.
pub fn dispatch(app: &App, command: &str, args: Value) -> Result<Value> {
    match REGISTRY.get(command) {
        Some(handler) => handler(app, args),
        None => Err(CompanionError::CommandNotFound(command.to_string())),
    }
}

/// List all available commands
///
/// Returns a sorted list of all registered command names.
pub fn list_commands() -> Vec<String> {
    let mut commands: Vec<String> = REGISTRY.keys().map(|&k| k.to_string()).collect();
    commands.sort();
    commands
}

/// Pull a required string argument, naming the command in the failure
fn required_str<'a>(args: &'a Value, command: &str, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CompanionError::InvalidArgs {
            command: command.to_string(),
            reason:  format!("missing {}", key),
        })
}

// ============================================================================
// Test Commands
// ============================================================================

/// Ping command - simple test to verify command dispatch works
///
/// Returns the input arguments with an added "pong" field.
///
/// # Example
/// ```json
/// // Input:  {"message": "hello"}
/// // Output: {"message": "hello", "pong": true}
/// ```
fn ping(_app: &App, args: Value) -> Result<Value> {
    let mut result = match args {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    result.insert("pong".to_string(), Value::Bool(true));
    Ok(Value::Object(result))
}
