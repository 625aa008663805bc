//! SQL schema for the Quire SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per entity with history; inserted in the same transaction as the
-- entity's first version.
CREATE TABLE IF NOT EXISTS entities (
    entity_key  TEXT PRIMARY KEY,   -- subject slug or '@roster'
    created_at  TEXT NOT NULL
);

-- Versions are never deleted. A second write on the same capture date
-- replaces that day's content.
CREATE TABLE IF NOT EXISTS versions (
    entity_key   TEXT NOT NULL REFERENCES entities(entity_key),
    captured_on  TEXT NOT NULL,     -- YYYY-MM-DD; sorts chronologically
    content      TEXT NOT NULL,
    written_at   TEXT NOT NULL,     -- RFC 3339 UTC
    PRIMARY KEY (entity_key, captured_on)
);

-- Current state only; replaced wholesale each poll cycle.
CREATE TABLE IF NOT EXISTS locators (
    slug     TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    locator  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cycle_marker (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    completed_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
