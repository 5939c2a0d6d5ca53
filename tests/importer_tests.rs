// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;

use ledgerclip::db;
use ledgerclip::error::LedgerError;
use ledgerclip::import::{self, ColumnMapping, RowKind};
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

fn mapping() -> ColumnMapping {
    ColumnMapping {
        date: "Date".into(),
        amount: "Amount".into(),
        kind: "Type".into(),
        description: Some("Label".into()),
        source: "Who".into(),
        dest: None,
    }
}

const CSV: &str = "\
Date;Amount;Type;Label;Who
2025-04-03;30,50;debit;groceries;Main
2025-04-02;100;credit;salary;Main
bad-date;10;credit;oops;Main
";

#[test]
fn delimiter_sniffing_counts_header_hits() {
    assert_eq!(import::sniff_delimiter("a;b;c\n1;2;3"), b';');
    assert_eq!(import::sniff_delimiter("a,b,c\n1,2,3"), b',');
    assert_eq!(import::sniff_delimiter("a\tb\tc"), b'\t');
    assert_eq!(import::sniff_delimiter("a|b|c"), b'|');
    // No candidate at all falls back to the semicolon.
    assert_eq!(import::sniff_delimiter("abc"), b';');
}

#[test]
fn upload_stages_rows_and_account_snapshot() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = principal(&conn, user, "Main", "0");

    let token = import::upload(&conn, user, CSV).unwrap();
    let staging = import::load_staging(&conn, user, &token).unwrap();
    assert_eq!(staging.delimiter, b';');
    assert_eq!(staging.headers, ["Date", "Amount", "Type", "Label", "Who"]);
    assert_eq!(staging.rows.len(), 3);
    assert_eq!(staging.accounts, vec![(acc.key(), "Main".to_string())]);
}

#[test]
fn staging_is_scoped_to_its_owner() {
    let conn = setup();
    let alice = utils::ensure_user(&conn, "alice").unwrap();
    let bob = utils::ensure_user(&conn, "bob").unwrap();
    let token = import::upload(&conn, alice, CSV).unwrap();

    let err = import::load_staging(&conn, bob, &token).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn mapping_previews_rows_in_date_order_with_errors_last() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    principal(&conn, user, "Main", "0");
    let token = import::upload(&conn, user, CSV).unwrap();

    let rows = import::map_rows(&conn, user, &token, &mapping()).unwrap();
    assert_eq!(rows.len(), 3);
    // Valid rows sort by parsed date ascending; the broken row is last.
    assert_eq!(rows[0].index, 1);
    assert_eq!(rows[0].kind, RowKind::Deposit);
    assert_eq!(rows[0].amount, Some(dec("100")));
    assert_eq!(rows[1].index, 0);
    assert_eq!(rows[1].amount, Some(dec("30.50")));
    assert_eq!(rows[2].index, 2);
    assert!(rows[2].error.is_some());

    assert_eq!(import::distinct_names(&rows), vec!["Main".to_string()]);
}

#[test]
fn unknown_mapped_column_is_reported() {
    let conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    principal(&conn, user, "Main", "0");
    let token = import::upload(&conn, user, CSV).unwrap();

    let mut m = mapping();
    m.amount = "Betrag".into();
    let err = import::map_rows(&conn, user, &token, &m).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn finalise_by_names_replays_rows_and_reports_failures() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let acc = principal(&conn, user, "Main", "0");
    let token = import::upload(&conn, user, CSV).unwrap();

    let mut names = HashMap::new();
    names.insert("Main".to_string(), acc.key());
    let summary = import::finalise_by_names(&mut conn, user, &token, &mapping(), &names).unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].row_index, 2);
    assert_eq!(summary.failures[0].kind, "invalid_date");
    assert!(summary.failures[0].message.starts_with("row 2:"));

    // Credit lands before the debit, so the no-overdraft account accepts both.
    let snap = registry::load_account(&conn, user, acc).unwrap();
    assert_eq!(snap.balance, dec("69.50"));

    // Staging is burned after finalisation.
    let err = import::load_staging(&conn, user, &token).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn finalise_per_row_uses_the_per_row_selection() {
    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    let main = principal(&conn, user, "Main", "0");
    let other = principal(&conn, user, "Other", "0");
    let token = import::upload(&conn, user, CSV).unwrap();

    let mut selections = HashMap::new();
    for i in 0..3 {
        let key = if i == 0 { other.key() } else { main.key() };
        selections.insert(
            i,
            import::RowSelection {
                source: key,
                dest: None,
            },
        );
    }
    let summary =
        import::finalise_per_row(&mut conn, user, &token, &mapping(), &selections).unwrap();
    assert_eq!(summary.succeeded, 1);
    // Row 0 is a debit on an empty account and the bad row has no date.
    assert_eq!(summary.failures.len(), 2);

    assert_eq!(registry::load_account(&conn, user, main).unwrap().balance, dec("100"));
    assert_eq!(registry::load_account(&conn, user, other).unwrap().balance, dec("0"));
}

#[test]
fn upload_command_reads_a_csv_file() {
    use std::io::Write;

    let mut conn = setup();
    let user = utils::ensure_user(&conn, "alice").unwrap();
    principal(&conn, user, "Main", "0");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CSV.as_bytes()).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let m = ledgerclip::cli::build_cli().get_matches_from([
        "ledgerclip", "import", "upload", "--path", &path,
    ]);
    let (_, sub) = m.subcommand().unwrap();
    ledgerclip::commands::importer::handle(&mut conn, user, sub).unwrap();

    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM csv_imports", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 1);
}

#[test]
fn kind_normalisation_is_forgiving() {
    assert_eq!(import::normalize_kind(" Credit "), RowKind::Deposit);
    assert_eq!(import::normalize_kind("DEBIT"), RowKind::Withdrawal);
    assert_eq!(import::normalize_kind("virement"), RowKind::Transfer);
    assert_eq!(import::normalize_kind("mystery"), RowKind::Unknown);
}
