//! SQL schema for the Rounds SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS areas (
    area_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS area_postal_codes (
    area_id     TEXT NOT NULL REFERENCES areas(area_id),
    postal_code TEXT NOT NULL,
    PRIMARY KEY (area_id, postal_code)
);

-- Every agent belongs to exactly one existing area.
CREATE TABLE IF NOT EXISTS agents (
    agent_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    area_id     TEXT NOT NULL REFERENCES areas(area_id),
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id  TEXT PRIMARY KEY,
    line        TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    lat         REAL,
    lng         REAL
);

-- Subscriptions are never deleted; cancellation is a status.
CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id TEXT PRIMARY KEY,
    customer_id     TEXT NOT NULL,
    address_id      TEXT NOT NULL REFERENCES addresses(address_id),
    products        TEXT NOT NULL DEFAULT '[]',  -- JSON array of product lines
    recurrence      TEXT NOT NULL,               -- 'daily' | 'every_other_day' | 'weekly'
    start_date      TEXT NOT NULL,               -- YYYY-MM-DD
    pause_start     TEXT,
    pause_end       TEXT,
    status          TEXT NOT NULL,               -- 'active' | 'paused' | 'cancelled'
    created_at      TEXT NOT NULL,
    CHECK ((pause_start IS NULL) = (pause_end IS NULL))
);

-- Obligations are never deleted. The CHECKs mirror the lifecycle: proof iff
-- delivered, reason iff failed, completion time iff terminal.
CREATE TABLE IF NOT EXISTS obligations (
    obligation_id     TEXT PRIMARY KEY,
    subscription_id   TEXT NOT NULL REFERENCES subscriptions(subscription_id),
    delivery_date     TEXT NOT NULL,
    agent_id          TEXT REFERENCES agents(agent_id),
    status            TEXT NOT NULL,
    started_at        TEXT,
    proof_kind        TEXT,
    proof_url         TEXT,
    proof_captured_at TEXT,
    failure_code      TEXT,
    failure_note      TEXT,
    completed_at      TEXT,
    created_at        TEXT NOT NULL,
    UNIQUE (subscription_id, delivery_date),
    CHECK ((status = 'delivered') = (proof_url IS NOT NULL)),
    CHECK ((status = 'failed') = (failure_code IS NOT NULL)),
    CHECK ((status IN ('delivered', 'failed')) = (completed_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS area_codes_postal_idx   ON area_postal_codes(postal_code);
CREATE INDEX IF NOT EXISTS agents_area_idx         ON agents(area_id);
CREATE INDEX IF NOT EXISTS obligations_agent_idx   ON obligations(agent_id, delivery_date);
CREATE INDEX IF NOT EXISTS obligations_date_idx    ON obligations(delivery_date, status);

PRAGMA user_version = 1;
";
