// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Favourite reporting periods: named date ranges a user pins to an account.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::models::{AccountRef, FavouritePeriod};
use crate::registry;

pub fn save_period(
    conn: &Connection,
    user_id: i64,
    account: AccountRef,
    name: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64> {
    if to < from {
        return Err(LedgerError::InvalidDate(format!("{} > {}", from, to)));
    }
    registry::load_account(conn, user_id, account)?;
    conn.execute(
        "INSERT INTO favourite_periods(user_id, scope, account_id, name, date_from, date_to)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            user_id,
            account.kind_str(),
            account.id(),
            name,
            from.to_string(),
            to.to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_periods(conn: &Connection, user_id: i64) -> Result<Vec<FavouritePeriod>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, scope, account_id, name, date_from, date_to, status
         FROM favourite_periods WHERE user_id=?1 AND status='active'
         ORDER BY name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, i64>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, uid, scope, account_id, name, from, to, status) = row?;
        out.push(FavouritePeriod {
            id,
            user_id: uid,
            scope,
            account_id,
            name,
            date_from: from
                .parse()
                .map_err(|_| LedgerError::InvalidDate(from.clone()))?,
            date_to: to
                .parse()
                .map_err(|_| LedgerError::InvalidDate(to.clone()))?,
            status,
        });
    }
    Ok(out)
}

pub fn delete_period(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let owner: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM favourite_periods WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    match owner {
        None => Err(LedgerError::NotFound(format!("favourite period {}", id))),
        Some(o) if o != user_id => Err(LedgerError::NotOwned(format!("favourite period {}", id))),
        Some(_) => {
            conn.execute("DELETE FROM favourite_periods WHERE id=?1", params![id])?;
            Ok(())
        }
    }
}
