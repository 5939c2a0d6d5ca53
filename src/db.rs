// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerclip", "ledgerclip"));

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var("LEDGERCLIP_DB") {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    apply_busy_timeout(&conn)?;
    Ok(conn)
}

/// Statement-level deadline; a lock held past this surfaces as Timeout.
pub fn apply_busy_timeout(conn: &Connection) -> Result<()> {
    let ms: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='busy_timeout_ms'",
            [],
            |r| r.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    let ms: u64 = ms.and_then(|s| s.parse().ok()).unwrap_or(5_000);
    conn.busy_timeout(Duration::from_millis(ms))?;
    Ok(())
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS banks(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        code TEXT,
        country TEXT,
        colour TEXT,
        website TEXT,
        logo TEXT,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS principal_accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        bank_id INTEGER,
        name TEXT NOT NULL,
        account_number TEXT,
        iban TEXT,
        bic TEXT,
        kind TEXT NOT NULL DEFAULT 'checking',
        balance TEXT NOT NULL DEFAULT '0',
        initial_balance TEXT NOT NULL DEFAULT '0',
        currency TEXT NOT NULL,
        opening_date TEXT,
        allow_overdraft INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, name),
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(bank_id) REFERENCES banks(id)
    );

    CREATE TABLE IF NOT EXISTS sub_accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        principal_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        target_amount TEXT,
        balance TEXT NOT NULL DEFAULT '0',
        colour TEXT,
        icon TEXT,
        target_date TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(principal_id, name),
        FOREIGN KEY(principal_id) REFERENCES principal_accounts(id)
    );

    -- Append-style ledger. Exactly one of principal_id/sub_id is set; dates
    -- are stored as 'YYYY-MM-DD HH:MM:SS' so (date, id) orders lexically.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN (
            'deposit','withdrawal','transfer_out','transfer_in',
            'transfer_external','recredit_cancellation')),
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        reference TEXT,
        external_reference TEXT,
        date TEXT NOT NULL,
        principal_id INTEGER,
        sub_id INTEGER,
        dest_principal_id INTEGER,
        dest_sub_id INTEGER,
        dest_label TEXT,
        balance_after TEXT NOT NULL,
        accounting_status TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK((principal_id IS NULL) != (sub_id IS NULL)),
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(principal_id) REFERENCES principal_accounts(id),
        FOREIGN KEY(sub_id) REFERENCES sub_accounts(id)
    );
    CREATE INDEX IF NOT EXISTS idx_tx_principal_date ON transactions(principal_id, date, id);
    CREATE INDEX IF NOT EXISTS idx_tx_sub_date ON transactions(sub_id, date, id);
    CREATE INDEX IF NOT EXISTS idx_tx_reference ON transactions(reference);

    CREATE TABLE IF NOT EXISTS external_transfer_intents(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id INTEGER NOT NULL,
        dest_iban TEXT NOT NULL,
        dest_bic TEXT,
        dest_name TEXT NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK(status IN ('pending','cancelled','settled')),
        requested_at TEXT NOT NULL,
        FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS journal_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number INTEGER NOT NULL,
        name TEXT NOT NULL,
        type_account TEXT NOT NULL
            CHECK(type_account IN ('asset','liability','charge','revenue')),
        parent_id INTEGER,
        active INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY(parent_id) REFERENCES journal_categories(id)
    );

    CREATE TABLE IF NOT EXISTS journal_entries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        principal_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        reference TEXT,
        kind TEXT NOT NULL CHECK(kind IN ('expense','revenue')),
        tva_rate TEXT,
        tva_amount TEXT,
        attachment_name TEXT,
        attachment_mime TEXT,
        attachment_ref TEXT,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK(status IN ('pending','validated','rejected')),
        transaction_id INTEGER,
        active INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY(user_id) REFERENCES users(id),
        FOREIGN KEY(principal_id) REFERENCES principal_accounts(id),
        FOREIGN KEY(category_id) REFERENCES journal_categories(id),
        FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_entries_tx ON journal_entries(transaction_id);

    CREATE TABLE IF NOT EXISTS tags(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('revenue','expense','transfer')),
        colour TEXT,
        icon TEXT,
        monthly_budget TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        UNIQUE(user_id, name),
        FOREIGN KEY(user_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS transaction_tags(
        transaction_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY(transaction_id, tag_id),
        FOREIGN KEY(transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
        FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS contacts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        iban TEXT,
        note TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        UNIQUE(user_id, name),
        FOREIGN KEY(user_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS contact_accounts(
        contact_id INTEGER NOT NULL,
        principal_id INTEGER NOT NULL,
        PRIMARY KEY(contact_id, principal_id),
        FOREIGN KEY(contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
        FOREIGN KEY(principal_id) REFERENCES principal_accounts(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS favourite_periods(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        scope TEXT NOT NULL CHECK(scope IN ('principal','sub')),
        account_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        date_from TEXT NOT NULL,
        date_to TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        FOREIGN KEY(user_id) REFERENCES users(id)
    );

    -- Short-lived CSV staging, swept after one hour.
    CREATE TABLE IF NOT EXISTS csv_imports(
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(user_id) REFERENCES users(id)
    );
    "#,
    )?;
    Ok(())
}
