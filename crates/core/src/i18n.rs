//! Translation catalog
//!
//! Flat key→string tables per locale. Lookup walks the active locale, then
//! English, then gives the key back so a missing entry never breaks a shell.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::{CompanionError, Result};

/// Locales the companion ships tables for
pub const SUPPORTED_LOCALES: [&str; 4] = ["en", "ar", "fr", "es"];

/// Fallback locale
pub const DEFAULT_LOCALE: &str = "en";

const EN: &str = include_str!("../i18n/en.json");
const AR: &str = include_str!("../i18n/ar.json");
const FR: &str = include_str!("../i18n/fr.json");
const ES: &str = include_str!("../i18n/es.json");

/// Reduce a reported language tag to a supported locale
///
/// Keeps the primary subtag (`fr-CA` → `fr`); anything unsupported maps to
/// the default.
pub fn resolve_locale(reported: &str) -> &'static str {
    let primary: String = reported
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    SUPPORTED_LOCALES
        .iter()
        .find(|supported| **supported == primary)
        .copied()
        .unwrap_or(DEFAULT_LOCALE)
}

/// Whether a locale renders right-to-left
pub fn is_rtl(locale: &str) -> bool {
    locale == "ar"
}

/// Loaded translation table with English fallback
#[derive(Debug, Clone)]
pub struct Catalog {
    locale: String,
    strings: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Catalog {
    /// Load the bundled table for `locale` (resolved first)
    pub fn builtin(locale: &str) -> Result<Catalog> {
        let locale = resolve_locale(locale);
        Ok(Catalog {
            locale: locale.to_string(),
            strings: parse_table(builtin_table(locale))?,
            fallback: parse_table(EN)?,
        })
    }

    /// Load `<locale>.json` from `dir` in place of the bundled table
    ///
    /// The English fallback stays bundled so partial override files work.
    pub fn from_dir(dir: &Path, locale: &str) -> Result<Catalog> {
        let locale = resolve_locale(locale);
        let path = dir.join(format!("{}.json", locale));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            CompanionError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Ok(Catalog {
            locale: locale.to_string(),
            strings: parse_table(&raw)?,
            fallback: parse_table(EN)?,
        })
    }

    /// The resolved locale this catalog serves
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up `key`: active locale, then English, then the key itself
    pub fn text(&self, key: &str) -> String {
        self.strings
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Merged table (English filled in under missing keys) for shells that
    /// render their own chrome
    pub fn table(&self) -> HashMap<String, String> {
        let mut merged = self.fallback.clone();
        merged.extend(self.strings.clone());
        merged
    }
}

fn builtin_table(locale: &str) -> &'static str {
    match locale {
        "ar" => AR,
        "fr" => FR,
        "es" => ES,
        _ => EN,
    }
}

fn parse_table(raw: &str) -> Result<HashMap<String, String>> {
    Ok(serde_json::from_str(raw)?)
}
