// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::models::{AccountRef, Contact};
use crate::registry;

pub fn create_contact(
    conn: &Connection,
    user_id: i64,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    iban: Option<&str>,
    note: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO contacts(user_id, name, email, phone, iban, note)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![user_id, name, email, phone, iban, note],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_contact(conn: &Connection, user_id: i64, id: i64) -> Result<Contact> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, email, phone, iban, note, active
             FROM contacts WHERE id=?1 AND active=1",
            params![id],
            |r| {
                Ok(Contact {
                    id: r.get(0)?,
                    user_id: r.get(1)?,
                    name: r.get(2)?,
                    email: r.get(3)?,
                    phone: r.get(4)?,
                    iban: r.get(5)?,
                    note: r.get(6)?,
                    active: r.get(7)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("contact {}", id)))?;
    if row.user_id != user_id {
        return Err(LedgerError::NotOwned(format!("contact {}", id)));
    }
    Ok(row)
}

pub fn deactivate_contact(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    get_contact(conn, user_id, id)?;
    conn.execute("DELETE FROM contact_accounts WHERE contact_id=?1", params![id])?;
    conn.execute("UPDATE contacts SET active=0 WHERE id=?1", params![id])?;
    Ok(())
}

pub fn list_contacts(conn: &Connection, user_id: i64) -> Result<Vec<Contact>> {
    let mut stmt =
        conn.prepare("SELECT id FROM contacts WHERE user_id=?1 AND active=1 ORDER BY name")?;
    let ids = stmt.query_map(params![user_id], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(get_contact(conn, user_id, id?)?);
    }
    Ok(out)
}

/// Associate a contact with one of the user's principal accounts.
pub fn link_account(conn: &Connection, user_id: i64, contact_id: i64, principal_id: i64) -> Result<()> {
    get_contact(conn, user_id, contact_id)?;
    registry::load_account(conn, user_id, AccountRef::Principal(principal_id))?;
    conn.execute(
        "INSERT OR IGNORE INTO contact_accounts(contact_id, principal_id) VALUES (?1,?2)",
        params![contact_id, principal_id],
    )?;
    Ok(())
}

pub fn unlink_account(conn: &Connection, user_id: i64, contact_id: i64, principal_id: i64) -> Result<()> {
    get_contact(conn, user_id, contact_id)?;
    conn.execute(
        "DELETE FROM contact_accounts WHERE contact_id=?1 AND principal_id=?2",
        params![contact_id, principal_id],
    )?;
    Ok(())
}

pub fn accounts_for_contact(conn: &Connection, user_id: i64, contact_id: i64) -> Result<Vec<i64>> {
    get_contact(conn, user_id, contact_id)?;
    let mut stmt =
        conn.prepare("SELECT principal_id FROM contact_accounts WHERE contact_id=?1")?;
    let ids = stmt.query_map(params![contact_id], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(id?);
    }
    Ok(out)
}
