//! prompt-master-core: embeddable core of the Prompt Master web companion
//!
//! The companion receives a phone app's prompt library over a paired
//! loopback WebSocket connection and serves it to a UI shell:
//! - QR pairing handshake with a one-shot inbound snapshot sync
//! - in-memory replica of prompts/categories/tags with CRUD and querying
//! - SQLite-backed mirror for the replica and the theme/locale preferences
//! - versioned export/import documents with de-duplicating merge
//! - translated toasts and UI strings (en, ar, fr, es)
//!
//! ## Architecture
//!
//! An owned [`app::App`] composes every module; shells drive it through the
//! [`commands`] registry (JSON in, JSON out) and render from the
//! [`events::EventBus`] stream. No global state beyond the shared tokio
//! runtime.
//!
//! ```no_run
//! use prompt_master_core::{app::App, config::AppConfig, runtime};
//!
//! let app = runtime::block_on(App::bootstrap(AppConfig::from_env()?))?;
//! let (_id, _events) = app.subscribe();
//! app.start()?;
//! # Ok::<(), prompt_master_core::errors::CompanionError>(())
//! ```

// Module declarations
pub mod app;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod i18n;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod session;
pub mod store;
pub mod transport;
pub mod util;

pub use app::App;
pub use config::AppConfig;
pub use errors::{CompanionError, Result};
pub use events::{AppEvent, EventBus, ToastLevel};
pub use model::{Category, Prompt, Snapshot, Tag};
