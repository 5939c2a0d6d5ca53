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
use ledgerclip::ledger;
use ledgerclip::models::AccountRef;
use ledgerclip::registry::{self, NewPrincipal, NewSubAccount};
use ledgerclip::tags;
use ledgerclip::utils;
use ledgerclip::{contacts, periods};

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

fn principal(conn: &Connection, user_id: i64, name: &str, initial: &str) -> i64 {
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
            initial_balance: dec(initial),
            currency: "CHF",
            opening_date: None,
            allow_overdraft: false,
        },
    )
    .unwrap()
}

#[test]
fn initial_balance_seeds_the_cached_balance() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "250.5");
    let snap = registry::load_account(&conn, user, AccountRef::Principal(id)).unwrap();
    assert_eq!(snap.balance, dec("250.50"));
    assert_eq!(snap.initial_balance, dec("250.50"));
}

#[test]
fn duplicate_account_names_per_user_are_rejected() {
    let conn = setup();
    let alice = utils::ensure_user(&conn, "alice").unwrap();
    let bob = utils::ensure_user(&conn, "bob").unwrap();
    principal(&conn, alice, "Main", "0");

    let err = registry::create_principal(
        &conn,
        alice,
        &NewPrincipal {
            name: "Main",
            bank_id: None,
            account_number: None,
            iban: None,
            bic: None,
            kind: "checking",
            initial_balance: Decimal::ZERO,
            currency: "CHF",
            opening_date: None,
            allow_overdraft: false,
        },
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Another user may reuse the name.
    principal(&conn, bob, "Main", "0");
}

#[test]
fn closing_an_account_requires_a_zero_balance() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "0");
    ledger::record_deposit(
        &mut conn,
        user,
        AccountRef::Principal(id),
        dec("10"),
        "",
        utils::parse_flex_datetime("2025-01-01").unwrap(),
    )
    .unwrap();

    let err = registry::deactivate_principal(&conn, user, id).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(id),
        dec("10"),
        "",
        utils::parse_flex_datetime("2025-01-02").unwrap(),
    )
    .unwrap();
    registry::deactivate_principal(&conn, user, id).unwrap();

    let err = registry::load_account(&conn, user, AccountRef::Principal(id)).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn closing_an_account_with_active_subs_is_refused() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "0");
    let sid = registry::create_sub_account(
        &conn,
        user,
        id,
        &NewSubAccount {
            name: "Holiday",
            description: None,
            target_amount: None,
            colour: None,
            icon: None,
            target_date: None,
        },
    )
    .unwrap();

    let err = registry::deactivate_principal(&conn, user, id).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    registry::deactivate_sub_account(&conn, user, sid).unwrap();
    registry::deactivate_principal(&conn, user, id).unwrap();
}

#[test]
fn tag_budget_tracks_monthly_spend() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "500");
    let tag = tags::create_tag(&conn, user, "food", "expense", None, None, Some(dec("200")))
        .unwrap();

    let t1 = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(id),
        dec("120"),
        "",
        utils::parse_flex_datetime("2025-07-05").unwrap(),
    )
    .unwrap();
    let t2 = ledger::record_withdrawal(
        &mut conn,
        user,
        AccountRef::Principal(id),
        dec("30"),
        "",
        utils::parse_flex_datetime("2025-08-05").unwrap(),
    )
    .unwrap();
    tags::apply_tag(&conn, user, t1, tag).unwrap();
    tags::apply_tag(&conn, user, t2, tag).unwrap();

    let status = tags::budget_status(&conn, user, tag, "2025-07").unwrap();
    assert_eq!(status.spent, dec("120"));
    assert_eq!(status.remaining, Some(dec("80")));

    tags::remove_tag(&conn, user, t1, tag).unwrap();
    let status = tags::budget_status(&conn, user, tag, "2025-07").unwrap();
    assert_eq!(status.spent, Decimal::ZERO);
}

#[test]
fn contacts_link_to_principal_accounts() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "0");
    let c = contacts::create_contact(&conn, user, "Dana", None, None, None, None).unwrap();

    contacts::link_account(&conn, user, c, id).unwrap();
    assert_eq!(contacts::accounts_for_contact(&conn, user, c).unwrap(), vec![id]);
    contacts::unlink_account(&conn, user, c, id).unwrap();
    assert!(contacts::accounts_for_contact(&conn, user, c).unwrap().is_empty());
}

#[test]
fn favourite_periods_validate_their_range() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let id = principal(&conn, user, "Main", "0");
    let acc = AccountRef::Principal(id);

    let err = periods::save_period(&conn, user, acc, "bad", day("2025-02-01"), day("2025-01-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidDate(_)));

    let p = periods::save_period(&conn, user, acc, "Jan", day("2025-01-01"), day("2025-01-31"))
        .unwrap();
    assert_eq!(periods::list_periods(&conn, user).unwrap().len(), 1);
    periods::delete_period(&conn, user, p).unwrap();
    assert!(periods::list_periods(&conn, user).unwrap().is_empty());
}

#[test]
fn users_are_created_once() {
    let conn = setup();
    let a = utils::ensure_user(&conn, "alice").unwrap();
    let again = utils::ensure_user(&conn, "alice").unwrap();
    assert_eq!(a, again);
    let b = utils::ensure_user(&conn, "bob").unwrap();
    assert_ne!(a, b);
}
