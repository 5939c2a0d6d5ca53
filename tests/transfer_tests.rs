// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;

use ledgerclip::db;
use ledgerclip::error::LedgerError;
use ledgerclip::ledger::{self, TxPatch};
use ledgerclip::models::{AccountRef, IntentStatus, TxKind};
use ledgerclip::registry::{self, NewPrincipal, NewSubAccount};
use ledgerclip::transfer;
use ledgerclip::utils;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn at(s: &str) -> NaiveDateTime {
    utils::parse_flex_datetime(s).unwrap()
}

fn principal(conn: &Connection, user_id: i64, name: &str, initial: &str) -> AccountRef {
    let id = registry::create_principal(
        conn,
        user_id,
        &NewPrincipal {
            name,
            bank_id: None,
            account_number: None,
            iban: None,
            bic: None,
            kind: "checking",
            initial_balance: dec(initial),
            currency: "CHF",
            opening_date: None,
            allow_overdraft: false,
        },
    )
    .unwrap();
    AccountRef::Principal(id)
}

fn sub(conn: &Connection, user_id: i64, parent: AccountRef, name: &str) -> AccountRef {
    let id = registry::create_sub_account(
        conn,
        user_id,
        parent.id(),
        &NewSubAccount {
            name,
            description: None,
            target_amount: None,
            colour: None,
            icon: None,
            target_date: None,
        },
    )
    .unwrap();
    AccountRef::Sub(id)
}

fn balance(conn: &Connection, user_id: i64, acc: AccountRef) -> Decimal {
    registry::load_account(conn, user_id, acc).unwrap().balance
}

#[test]
fn internal_transfer_moves_money_and_pairs_legs() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "500");
    let b = principal(&conn, user, "B", "0");

    let receipt =
        transfer::transfer_internal(&mut conn, user, a, b, dec("200"), "move", at("2025-02-01"))
            .unwrap();

    assert_eq!(balance(&conn, user, a), dec("300"));
    assert_eq!(balance(&conn, user, b), dec("200"));

    let out = ledger::get_row(&conn, user, receipt.out_id).unwrap();
    let inn = ledger::get_row(&conn, user, receipt.in_id).unwrap();
    assert_eq!(out.kind, TxKind::TransferOut);
    assert_eq!(inn.kind, TxKind::TransferIn);
    assert_eq!(out.reference.as_deref(), Some(receipt.reference.as_str()));
    assert_eq!(inn.reference, out.reference);
    assert_eq!(out.amount, inn.amount);
}

#[test]
fn transfer_to_same_account_is_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");

    let err = transfer::transfer_internal(&mut conn, user, a, a, dec("10"), "", at("2025-02-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::SameSourceAndDestination));
}

#[test]
fn sub_accounts_cannot_transfer_across_principals() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let b = principal(&conn, user, "B", "100");
    let s1 = sub(&conn, user, a, "Holiday");
    let s2 = sub(&conn, user, b, "Car");

    // Fund the sub-account first so only the scope check can fail.
    transfer::transfer_internal(&mut conn, user, a, s1, dec("50"), "", at("2025-02-01")).unwrap();

    let err = transfer::transfer_internal(&mut conn, user, s1, s2, dec("10"), "", at("2025-02-02"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::SubAccountScopeViolation));
    let err = transfer::transfer_internal(&mut conn, user, s1, b, dec("10"), "", at("2025-02-02"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::SubAccountScopeViolation));

    // The failed attempts wrote nothing.
    assert_eq!(balance(&conn, user, s1), dec("50"));
    assert_eq!(balance(&conn, user, b), dec("100"));
}

#[test]
fn sub_account_transfers_stay_within_their_principal() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let s1 = sub(&conn, user, a, "Holiday");

    transfer::transfer_internal(&mut conn, user, a, s1, dec("40"), "", at("2025-02-01")).unwrap();
    transfer::transfer_internal(&mut conn, user, s1, a, dec("15"), "", at("2025-02-02")).unwrap();

    assert_eq!(balance(&conn, user, a), dec("75"));
    assert_eq!(balance(&conn, user, s1), dec("25"));
}

#[test]
fn transfer_legs_cannot_be_deleted_individually() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let b = principal(&conn, user, "B", "0");
    let receipt =
        transfer::transfer_internal(&mut conn, user, a, b, dec("30"), "", at("2025-02-01")).unwrap();

    let err = ledger::delete_transaction(&mut conn, user, receipt.out_id).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
}

#[test]
fn deleting_a_transfer_removes_both_legs() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let b = principal(&conn, user, "B", "0");
    let receipt =
        transfer::transfer_internal(&mut conn, user, a, b, dec("30"), "", at("2025-02-01")).unwrap();

    transfer::delete_internal_transfer(&mut conn, user, receipt.in_id).unwrap();

    assert_eq!(balance(&conn, user, a), dec("100"));
    assert_eq!(balance(&conn, user, b), dec("0"));
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn editing_one_leg_mirrors_the_companion() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let b = principal(&conn, user, "B", "0");
    let receipt =
        transfer::transfer_internal(&mut conn, user, a, b, dec("30"), "", at("2025-02-01")).unwrap();

    let patch = TxPatch {
        amount: Some(dec("45")),
        date: Some(at("2025-02-03")),
        ..Default::default()
    };
    ledger::modify_transaction(&mut conn, user, receipt.out_id, &patch).unwrap();

    let out = ledger::get_row(&conn, user, receipt.out_id).unwrap();
    let inn = ledger::get_row(&conn, user, receipt.in_id).unwrap();
    assert_eq!(out.amount, dec("45"));
    assert_eq!(inn.amount, dec("45"));
    assert_eq!(inn.date, at("2025-02-03"));
    assert_eq!(balance(&conn, user, a), dec("55"));
    assert_eq!(balance(&conn, user, b), dec("45"));
}

#[test]
fn external_transfer_debits_and_queues_an_intent() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");

    let (tx_id, intent_id) = transfer::transfer_external(
        &mut conn,
        user,
        a,
        "CH93 0076 2011 6238 5295 7",
        None,
        "Landlord",
        dec("60"),
        "rent",
        at("2025-02-01"),
    )
    .unwrap();

    assert_eq!(balance(&conn, user, a), dec("40"));
    let row = ledger::get_row(&conn, user, tx_id).unwrap();
    assert_eq!(row.kind, TxKind::TransferExternal);

    let intent = transfer::get_intent(&conn, user, intent_id).unwrap();
    assert_eq!(intent.status, IntentStatus::Pending);
    assert_eq!(intent.dest_iban, "CH9300762011623852957");
    assert_eq!(intent.dest_name, "Landlord");
}

#[test]
fn bad_iban_is_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");

    let err = transfer::transfer_external(
        &mut conn,
        user,
        a,
        "not-an-iban",
        None,
        "Landlord",
        dec("10"),
        "",
        at("2025-02-01"),
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidIban(_)));
}

#[test]
fn cancelling_an_intent_recredits_once() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let (_, intent_id) = transfer::transfer_external(
        &mut conn,
        user,
        a,
        "CH9300762011623852957",
        None,
        "Landlord",
        dec("60"),
        "rent",
        at("2025-02-01"),
    )
    .unwrap();

    let recredit = transfer::cancel_external_transfer(&mut conn, user, intent_id).unwrap();
    assert_eq!(balance(&conn, user, a), dec("100"));
    let row = ledger::get_row(&conn, user, recredit).unwrap();
    assert_eq!(row.kind, TxKind::RecreditCancellation);

    let intent = transfer::get_intent(&conn, user, intent_id).unwrap();
    assert_eq!(intent.status, IntentStatus::Cancelled);

    let err = transfer::cancel_external_transfer(&mut conn, user, intent_id).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyFinal(_)));
    assert_eq!(balance(&conn, user, a), dec("100"));
}

#[test]
fn editing_an_external_row_updates_its_intent() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let (tx_id, intent_id) = transfer::transfer_external(
        &mut conn,
        user,
        a,
        "CH9300762011623852957",
        None,
        "Landlord",
        dec("60"),
        "rent",
        at("2025-02-01"),
    )
    .unwrap();

    let patch = TxPatch {
        amount: Some(dec("10")),
        ..Default::default()
    };
    ledger::modify_transaction(&mut conn, user, tx_id, &patch).unwrap();
    assert_eq!(balance(&conn, user, a), dec("90"));
    let intent = transfer::get_intent(&conn, user, intent_id).unwrap();
    assert_eq!(intent.amount, dec("10"));

    // Cancellation recredits the edited amount, not the original one.
    transfer::cancel_external_transfer(&mut conn, user, intent_id).unwrap();
    assert_eq!(balance(&conn, user, a), dec("100"));
}

#[test]
fn external_row_is_frozen_after_cancellation() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let a = principal(&conn, user, "A", "100");
    let (tx_id, intent_id) = transfer::transfer_external(
        &mut conn,
        user,
        a,
        "CH9300762011623852957",
        None,
        "Landlord",
        dec("60"),
        "rent",
        at("2025-02-01"),
    )
    .unwrap();
    transfer::cancel_external_transfer(&mut conn, user, intent_id).unwrap();

    let patch = TxPatch {
        amount: Some(dec("10")),
        ..Default::default()
    };
    let err = ledger::modify_transaction(&mut conn, user, tx_id, &patch).unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyFinal(_)));
    assert_eq!(balance(&conn, user, a), dec("100"));

    // The description stays editable.
    let patch = TxPatch {
        description: Some("rent (cancelled)".into()),
        ..Default::default()
    };
    ledger::modify_transaction(&mut conn, user, tx_id, &patch).unwrap();
    let row = ledger::get_row(&conn, user, tx_id).unwrap();
    assert_eq!(row.description, "rent (cancelled)");
}
