//! Application composition root
//!
//! One `App` owns what the original kept in a module-level `state` global:
//! config, database, replica, session, catalog, clipboard and the event
//! bus. Embedders construct it once, call `start()`, and talk to it through
//! `dispatch` plus the event stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crossbeam_channel::Receiver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clipboard::{Clipboard, NoopClipboard};
use crate::commands;
use crate::config::AppConfig;
use crate::db::{kv, Db};
use crate::errors::{CompanionError, Result};
use crate::events::{AppEvent, EventBus, SubscriberId, ToastLevel};
use crate::i18n::{self, Catalog};
use crate::model::Snapshot;
use crate::session::{ConnectionStatus, SessionManager};
use crate::store::ReplicaStore;
use crate::transport::WsTransport;

/// Persisted presentation preferences
struct Prefs {
    theme: String,
    locale: String,
}

/// Owned application state
pub struct App {
    config: AppConfig,
    db: Db,
    store: Arc<ReplicaStore>,
    session: SessionManager,
    events: EventBus,
    catalog: Arc<RwLock<Catalog>>,
    clipboard: Box<dyn Clipboard>,
    prefs: Mutex<Prefs>,
}

impl App {
    /// Construct the full application from `config`
    ///
    /// Opens the mirror database, reloads persisted preferences and wires
    /// the session manager to a loopback WebSocket transport. The replica
    /// starts empty; contents arrive via pairing or import.
    pub async fn bootstrap(config: AppConfig) -> Result<App> {
        let db = Db::open(&config.db_path().to_string_lossy()).await?;

        let theme = kv::get(&db, kv::THEME)
            .await?
            .unwrap_or_else(|| config.default_theme.clone());
        let locale = match kv::get(&db, kv::LOCALE).await? {
            Some(saved) => i18n::resolve_locale(&saved).to_string(),
            None => i18n::resolve_locale(&config.default_locale).to_string(),
        };
        let catalog = Arc::new(RwLock::new(load_catalog(&config, &locale)?));

        let events = EventBus::new();
        let store = Arc::new(ReplicaStore::new(db.clone(), events.clone()));

        let transport = WsTransport::new(config.bind_host.clone(), config.bind_port);
        let session = SessionManager::new(
            Box::new(transport),
            Arc::clone(&store),
            events.clone(),
            Arc::clone(&catalog),
            config.accept_delay,
        );

        Ok(App {
            config,
            db,
            store,
            session,
            events,
            catalog,
            clipboard: Box::new(NoopClipboard),
            prefs: Mutex::new(Prefs { theme, locale }),
        })
    }

    /// Swap in the embedder's clipboard implementation
    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> App {
        self.clipboard = clipboard;
        self
    }

    /// Start pairing; the next `PairingReady` event carries the ticket
    pub fn start(&self) -> Result<ConnectionStatus> {
        self.session.begin_pairing()
    }

    /// Run a named command; the UI shell's synchronous API
    ///
    /// Errors carrying a toast key raise the toast here so every shell gets
    /// the same notification behavior.
    pub fn dispatch(&self, command: &str, args: Value) -> Result<Value> {
        match commands::dispatch(self, command, args) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(
                    "command '{}' failed ({}): {}",
                    command,
                    err.category(),
                    err
                );
                if let Some(key) = err.toast_key() {
                    self.toast(ToastLevel::Error, key);
                }
                Err(err)
            },
        }
    }

    /// Register a shell for events
    pub fn subscribe(&self) -> (SubscriberId, Receiver<AppEvent>) {
        self.events.subscribe()
    }

    /// Remove a shell's subscription
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    /// Inject a snapshot directly, bypassing the transport
    ///
    /// The hook the original exposed to its hosting app. Payloads without a
    /// `prompts` field are ignored, same as on the wire.
    pub async fn ingest_payload(&self, payload: Value) -> Result<bool> {
        if payload.get("prompts").is_none() {
            debug!("injected payload without prompts ignored");
            return Ok(false);
        }
        let snapshot: Snapshot = serde_json::from_value(payload)?;
        self.session.ingest_snapshot(snapshot).await
    }

    /// Current `(theme, locale)` pair
    pub fn prefs(&self) -> (String, String) {
        let prefs = self.prefs.lock().unwrap();
        (prefs.theme.clone(), prefs.locale.clone())
    }

    /// Persist preference changes; `None` leaves a value untouched
    ///
    /// Unsupported locales fall back through `resolve_locale` rather than
    /// erroring; an unknown theme is rejected outright.
    pub async fn set_prefs(
        &self,
        theme: Option<&str>,
        locale: Option<&str>,
    ) -> Result<(String, String)> {
        if let Some(theme) = theme {
            if theme != "light" && theme != "dark" {
                return Err(CompanionError::InvalidArgs {
                    command: "prefs.set".to_string(),
                    reason:  format!("unknown theme '{}'", theme),
                });
            }
            kv::set(&self.db, kv::THEME, theme).await?;
            self.prefs.lock().unwrap().theme = theme.to_string();
        }

        if let Some(locale) = locale {
            let resolved = i18n::resolve_locale(locale);
            kv::set(&self.db, kv::LOCALE, resolved).await?;
            let catalog = load_catalog(&self.config, resolved)?;
            *self.catalog.write().unwrap() = catalog;
            self.prefs.lock().unwrap().locale = resolved.to_string();
        }

        let (theme_now, locale_now) = self.prefs();
        if theme.is_some() || locale.is_some() {
            self.events.emit(AppEvent::PrefsChanged {
                theme:  theme_now.clone(),
                locale: locale_now.clone(),
            });
        }
        Ok((theme_now, locale_now))
    }

    /// Tear down the transport and close the database
    pub async fn shutdown(&self) {
        self.session.shutdown();
        self.db.close().await;
    }

    /// The replica store
    pub fn store(&self) -> &ReplicaStore {
        &self.store
    }

    /// The pairing session
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub(crate) fn clipboard(&self) -> &dyn Clipboard {
        self.clipboard.as_ref()
    }

    /// Toast with a catalog key resolved through the active locale
    pub(crate) fn toast(&self, level: ToastLevel, key: &str) {
        let message = self.catalog.read().unwrap().text(key);
        self.events.emit_toast(level, message);
    }

    /// Toast with already-rendered text
    pub(crate) fn toast_text(&self, level: ToastLevel, message: impl Into<String>) {
        self.events.emit_toast(level, message);
    }

    /// Active locale string the catalog resolves through
    pub(crate) fn catalog_text(&self, key: &str) -> String {
        self.catalog.read().unwrap().text(key)
    }

    /// Key→string table for `locale`, or the active catalog's when absent
    pub(crate) fn i18n_table(&self, locale: Option<&str>) -> Result<(String, HashMap<String, String>)> {
        match locale {
            Some(tag) => {
                let resolved = i18n::resolve_locale(tag);
                let catalog = load_catalog(&self.config, resolved)?;
                Ok((resolved.to_string(), catalog.table()))
            },
            None => {
                let catalog = self.catalog.read().unwrap();
                Ok((catalog.locale().to_string(), catalog.table()))
            },
        }
    }
}

/// Build the catalog for `locale`, preferring the configured override
/// directory and falling back to the bundled tables when it is unusable
fn load_catalog(config: &AppConfig, locale: &str) -> Result<Catalog> {
    if let Some(dir) = &config.locale_dir {
        match Catalog::from_dir(dir, locale) {
            Ok(catalog) => return Ok(catalog),
            Err(err) => {
                warn!("locale override directory unusable, using bundled table: {}", err);
            },
        }
    }
    Catalog::builtin(locale)
}

// ========================================
// Tests
// ========================================
