// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;

use ledgerclip::db;
use ledgerclip::error::LedgerError;
use ledgerclip::ledger::{self, TxPatch};
use ledgerclip::models::AccountRef;
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

fn at(s: &str) -> NaiveDateTime {
    utils::parse_flex_datetime(s).unwrap()
}

fn account(conn: &Connection, user_id: i64, name: &str, overdraft: bool) -> AccountRef {
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
            initial_balance: Decimal::ZERO,
            currency: "CHF",
            opening_date: None,
            allow_overdraft: overdraft,
        },
    )
    .unwrap();
    AccountRef::Principal(id)
}

fn balance(conn: &Connection, user_id: i64, acc: AccountRef) -> Decimal {
    registry::load_account(conn, user_id, acc).unwrap().balance
}

fn chain(conn: &Connection, acc: AccountRef) -> Vec<Decimal> {
    let mut stmt = conn
        .prepare("SELECT balance_after FROM transactions WHERE principal_id=?1 ORDER BY date, id")
        .unwrap();
    let rows = stmt
        .query_map([acc.id()], |r| r.get::<_, String>(0))
        .unwrap();
    rows.map(|s| s.unwrap().parse().unwrap()).collect()
}

#[test]
fn deposit_then_withdraw_updates_balance() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    ledger::record_deposit(&mut conn, user, acc, dec("100"), "salary", at("2025-01-01")).unwrap();
    ledger::record_withdrawal(&mut conn, user, acc, dec("30"), "groceries", at("2025-01-02"))
        .unwrap();

    assert_eq!(balance(&conn, user, acc), dec("70"));
    assert_eq!(chain(&conn, acc), vec![dec("100"), dec("70")]);
}

#[test]
fn withdrawal_beyond_balance_is_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    ledger::record_deposit(&mut conn, user, acc, dec("20"), "", at("2025-01-01")).unwrap();
    let err = ledger::record_withdrawal(&mut conn, user, acc, dec("50"), "", at("2025-01-02"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    // Nothing was persisted and the balance is untouched.
    assert_eq!(chain(&conn, acc).len(), 1);
    assert_eq!(balance(&conn, user, acc), dec("20"));
}

#[test]
fn non_positive_amounts_are_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    let err = ledger::record_deposit(&mut conn, user, acc, dec("0"), "", at("2025-01-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    let err = ledger::record_deposit(&mut conn, user, acc, dec("-5"), "", at("2025-01-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
}

#[test]
fn past_dated_insert_replays_the_chain() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    ledger::record_deposit(&mut conn, user, acc, dec("100"), "", at("2025-01-01")).unwrap();
    ledger::record_withdrawal(&mut conn, user, acc, dec("40"), "", at("2025-01-03")).unwrap();
    ledger::record_deposit(&mut conn, user, acc, dec("20"), "", at("2025-01-04")).unwrap();

    // Back-dated deposit lands between the first two rows; everything after
    // it is replayed.
    ledger::record_deposit(&mut conn, user, acc, dec("10"), "", at("2025-01-02")).unwrap();

    assert_eq!(
        chain(&conn, acc),
        vec![dec("100"), dec("110"), dec("70"), dec("90")]
    );
    assert_eq!(balance(&conn, user, acc), dec("90"));
}

#[test]
fn edit_that_breaks_the_chain_is_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    let dep = ledger::record_deposit(&mut conn, user, acc, dec("50"), "", at("2025-01-01")).unwrap();
    ledger::record_withdrawal(&mut conn, user, acc, dec("40"), "", at("2025-01-02")).unwrap();

    let patch = TxPatch {
        amount: Some(dec("10")),
        ..Default::default()
    };
    let err = ledger::modify_transaction(&mut conn, user, dep, &patch).unwrap_err();
    assert!(matches!(err, LedgerError::WouldCauseNegativeBalance { .. }));

    // The edit rolled back wholesale.
    assert_eq!(chain(&conn, acc), vec![dec("50"), dec("10")]);
    assert_eq!(balance(&conn, user, acc), dec("10"));
}

#[test]
fn overdraft_account_may_go_negative() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Credit line", true);

    ledger::record_withdrawal(&mut conn, user, acc, dec("25"), "", at("2025-01-01")).unwrap();
    assert_eq!(balance(&conn, user, acc), dec("-25"));
}

#[test]
fn modify_amount_and_date_reorders_the_chain() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    ledger::record_deposit(&mut conn, user, acc, dec("100"), "", at("2025-01-01")).unwrap();
    let w = ledger::record_withdrawal(&mut conn, user, acc, dec("30"), "", at("2025-01-05"))
        .unwrap();
    ledger::record_deposit(&mut conn, user, acc, dec("10"), "", at("2025-01-03")).unwrap();

    // Move the withdrawal before the small deposit and shrink it.
    let patch = TxPatch {
        amount: Some(dec("20")),
        date: Some(at("2025-01-02")),
        ..Default::default()
    };
    ledger::modify_transaction(&mut conn, user, w, &patch).unwrap();

    assert_eq!(chain(&conn, acc), vec![dec("100"), dec("80"), dec("90")]);
    let row = ledger::get_row(&conn, user, w).unwrap();
    assert_eq!(row.amount, dec("20"));
    assert_eq!(row.date, at("2025-01-02"));
}

#[test]
fn deleting_a_row_replays_later_balances() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    ledger::record_deposit(&mut conn, user, acc, dec("100"), "", at("2025-01-01")).unwrap();
    let mid = ledger::record_deposit(&mut conn, user, acc, dec("50"), "", at("2025-01-02")).unwrap();
    ledger::record_withdrawal(&mut conn, user, acc, dec("30"), "", at("2025-01-03")).unwrap();

    ledger::delete_transaction(&mut conn, user, mid).unwrap();

    assert_eq!(chain(&conn, acc), vec![dec("100"), dec("70")]);
    assert_eq!(balance(&conn, user, acc), dec("70"));
}

#[test]
fn delete_that_breaks_the_chain_is_rejected() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);

    let dep = ledger::record_deposit(&mut conn, user, acc, dec("50"), "", at("2025-01-01")).unwrap();
    ledger::record_withdrawal(&mut conn, user, acc, dec("40"), "", at("2025-01-02")).unwrap();

    let err = ledger::delete_transaction(&mut conn, user, dep).unwrap_err();
    assert!(matches!(err, LedgerError::WouldCauseNegativeBalance { .. }));
    assert_eq!(chain(&conn, acc), vec![dec("50"), dec("10")]);
}

#[test]
fn accounts_are_scoped_to_their_owner() {
    let mut conn = setup();
    let alice = utils::ensure_user(&conn, "alice").unwrap();
    let bob = utils::ensure_user(&conn, "bob").unwrap();
    let acc = account(&conn, alice, "Current", false);

    let err = ledger::record_deposit(&mut conn, bob, acc, dec("10"), "", at("2025-01-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwned(_)));
}

#[test]
fn store_lock_contention_surfaces_as_timeout() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut conn = Connection::open(file.path()).unwrap();
    db::init_schema(&mut conn).unwrap();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = account(&conn, user, "Current", false);
    ledger::record_deposit(&mut conn, user, acc, dec("100"), "", at("2025-01-01")).unwrap();

    let mut other = Connection::open(file.path()).unwrap();
    other
        .busy_timeout(std::time::Duration::from_millis(20))
        .unwrap();

    // Holding the write lock from the first connection starves the second.
    let hold = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    let err = ledger::record_deposit(&mut other, user, acc, dec("10"), "", at("2025-01-02"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout));
    drop(hold);

    ledger::record_deposit(&mut other, user, acc, dec("10"), "", at("2025-01-02")).unwrap();
    assert_eq!(balance(&other, user, acc), dec("110"));
}
