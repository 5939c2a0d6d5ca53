// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use ledgerclip::db;
use ledgerclip::error::LedgerError;
use ledgerclip::journal::{self, EntryPatch, NewEntry};
use ledgerclip::ledger;
use ledgerclip::models::{AccountRef, EntryStatus};
use ledgerclip::registry::{self, NewPrincipal};
use ledgerclip::utils;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn principal(conn: &Connection, user_id: i64, name: &str) -> i64 {
    registry::create_principal(
        conn,
        user_id,
        &NewPrincipal {
            name,
            bank_id: None,
            account_number: None,
            iban: None,
            bic: None,
            kind: "checking",
            initial_balance: dec("1000"),
            currency: "CHF",
            opening_date: None,
            allow_overdraft: false,
        },
    )
    .unwrap()
}

fn entry(conn: &Connection, user_id: i64, pid: i64, cat: i64, amount: &str) -> i64 {
    journal::create_entry(
        conn,
        user_id,
        &NewEntry {
            date: day("2025-03-01"),
            principal_id: pid,
            category_id: cat,
            amount: dec(amount),
            description: "supplies",
            reference: None,
            kind: "expense",
            tva_rate: None,
            tva_amount: None,
        },
    )
    .unwrap()
}

#[test]
fn category_types_are_validated() {
    let conn = setup();
    let err = journal::create_category(&conn, 4000, "Office", "equity", None).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    let id = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let child = journal::create_category(&conn, 4100, "Paper", "charge", Some(id)).unwrap();
    assert!(child > id);

    // A parent with active children cannot be removed.
    let err = journal::deactivate_category(&conn, id).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
    journal::deactivate_category(&conn, child).unwrap();
    journal::deactivate_category(&conn, id).unwrap();
}

#[test]
fn entry_status_moves_through_pending() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let e = entry(&mut conn, user, pid, cat, "50");

    journal::set_entry_status(&conn, user, e, EntryStatus::Validated).unwrap();
    let err = journal::set_entry_status(&conn, user, e, EntryStatus::Rejected).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Un-validate, then reject.
    journal::set_entry_status(&conn, user, e, EntryStatus::Pending).unwrap();
    journal::set_entry_status(&conn, user, e, EntryStatus::Rejected).unwrap();
    assert_eq!(
        journal::get_entry(&conn, user, e).unwrap().status,
        EntryStatus::Rejected
    );
}

#[test]
fn linked_entries_cannot_exceed_the_transaction() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let tx = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(pid),
        dec("300"),
        "invoice",
        utils::parse_flex_datetime("2025-03-01").unwrap(),
    )
    .unwrap();

    let e1 = entry(&mut conn, user, pid, cat, "180");
    let e2 = entry(&mut conn, user, pid, cat, "130");
    let e3 = entry(&mut conn, user, pid, cat, "120");

    journal::link_entry(&mut conn, user, e1, tx).unwrap();
    let err = journal::link_entry(&mut conn, user, e2, tx).unwrap_err();
    assert!(matches!(err, LedgerError::LinkWouldExceedTransaction { .. }));
    journal::link_entry(&mut conn, user, e3, tx).unwrap();

    assert_eq!(journal::get_entry(&conn, user, e1).unwrap().transaction_id, Some(tx));
    assert_eq!(journal::get_entry(&conn, user, e2).unwrap().transaction_id, None);
    assert_eq!(journal::get_entry(&conn, user, e3).unwrap().transaction_id, Some(tx));
}

#[test]
fn amount_edits_recheck_link_capacity() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let tx = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(pid),
        dec("100"),
        "",
        utils::parse_flex_datetime("2025-03-01").unwrap(),
    )
    .unwrap();
    let e = entry(&mut conn, user, pid, cat, "80");
    journal::link_entry(&mut conn, user, e, tx).unwrap();

    let err = journal::update_entry(
        &mut conn,
        user,
        e,
        &EntryPatch {
            amount: Some(dec("150")),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::LinkWouldExceedTransaction { .. }));

    journal::update_entry(
        &mut conn,
        user,
        e,
        &EntryPatch {
            amount: Some(dec("100")),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(journal::get_entry(&conn, user, e).unwrap().amount, dec("100"));
}

#[test]
fn soft_delete_keeps_the_row_and_unlinks() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let tx = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(pid),
        dec("100"),
        "",
        utils::parse_flex_datetime("2025-03-01").unwrap(),
    )
    .unwrap();
    let e = entry(&mut conn, user, pid, cat, "60");
    journal::link_entry(&mut conn, user, e, tx).unwrap();

    journal::delete_entry(&conn, user, e, false).unwrap();
    let active: bool = conn
        .query_row("SELECT active FROM journal_entries WHERE id=?1", [e], |r| r.get(0))
        .unwrap();
    assert!(!active);

    // The freed capacity is usable again.
    let e2 = entry(&mut conn, user, pid, cat, "100");
    journal::link_entry(&mut conn, user, e2, tx).unwrap();
}

#[test]
fn one_attachment_per_entry() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let e = entry(&mut conn, user, pid, cat, "60");

    journal::attach_file(&conn, user, e, "receipt.pdf", "application/pdf", "blob-1").unwrap();
    let err =
        journal::attach_file(&conn, user, e, "other.pdf", "application/pdf", "blob-2").unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    let old = journal::detach_file(&conn, user, e).unwrap();
    assert_eq!(old.as_deref(), Some("blob-1"));
    assert_eq!(journal::detach_file(&conn, user, e).unwrap(), None);
}

#[test]
fn relink_moves_an_entry_between_transactions() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let pid = principal(&conn, user, "Biz");
    let cat = journal::create_category(&conn, 4000, "Office", "charge", None).unwrap();
    let t1 = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(pid),
        dec("100"),
        "",
        utils::parse_flex_datetime("2025-03-01").unwrap(),
    )
    .unwrap();
    let t2 = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(pid),
        dec("50"),
        "",
        utils::parse_flex_datetime("2025-03-02").unwrap(),
    )
    .unwrap();
    let e = entry(&mut conn, user, pid, cat, "40");
    journal::link_entry(&mut conn, user, e, t1).unwrap();
    journal::relink_entry(&mut conn, user, e, t2).unwrap();
    assert_eq!(journal::get_entry(&conn, user, e).unwrap().transaction_id, Some(t2));

    // A second link without relink is refused.
    let e2 = entry(&mut conn, user, pid, cat, "10");
    journal::link_entry(&mut conn, user, e2, t1).unwrap();
    let err = journal::link_entry(&mut conn, user, e2, t2).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
}
