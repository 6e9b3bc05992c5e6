pub const SCHEMA: &str = "
-- Preference and session-mirror storage
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,         -- Well-known key (see db::kv)
    value TEXT NOT NULL,          -- UTF-8 payload, JSON for the session mirror
    updated_at INTEGER NOT NULL   -- Unix timestamp (seconds)
);
";
