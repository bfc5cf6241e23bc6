//! Ledger persistence, error-message and JSON-compatibility tests.

use assert_fs::prelude::*;
use cardwatch_core::{
    ledger::{self, ConfigDocument},
    Credential, Ledger, LedgerError, LedgerStore, Upsert,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load errors
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_json_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.write_str("{ \"GitHub\": [unclosed").expect("write");

    let err = ledger::load(file.path()).unwrap_err();
    assert!(matches!(err, LedgerError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.json"), "must contain file path, got: {err}");
}

#[test]
fn load_wrong_shape_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.write_str(r#"{"GitHub":{"repository":"not a list"}}"#).expect("write");

    let err = ledger::load(file.path()).unwrap_err();
    assert!(matches!(err, LedgerError::Parse { .. }), "got: {err}");
}

#[test]
fn load_empty_file_yields_empty_ledger() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.touch().expect("touch");
    assert!(ledger::load(file.path()).expect("load").is_empty());
}

// ---------------------------------------------------------------------------
// 2. Legacy config format
// ---------------------------------------------------------------------------

const LEGACY_CONFIG: &str = r#"{
    "GitHub": {
        "username": "yume",
        "backgrounds": "/srv/backgrounds",
        "token": "ghp_example",
        "repository": [
            { "owner": "A", "branch": "main", "repo": "B", "lastsha": "" },
            { "owner": "octo", "branch": "dev", "repo": "cat", "lastsha": "c3", "description": "kept" }
        ]
    },
    "Theme": { "accent": "pink" }
}"#;

#[test]
fn reads_legacy_config_fields() {
    let doc: ConfigDocument = serde_json::from_str(LEGACY_CONFIG).expect("parse");
    let ledger = Ledger::from_document(doc);

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.username(), "yume");
    assert_eq!(ledger.credential().expose(), "ghp_example");
    assert_eq!(
        ledger.background_dir().as_deref(),
        Some(std::path::Path::new("/srv/backgrounds"))
    );

    let octo = ledger.find("octo", "cat").expect("octo/cat");
    assert_eq!(octo.branch, "dev");
    assert_eq!(octo.last_revision, "c3");
    assert!(ledger.find("A", "B").expect("A/B").never_checked());
}

#[test]
fn unknown_keys_survive_load_save() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("config.json");
    file.write_str(LEGACY_CONFIG).expect("write");

    let store = LedgerStore::new(file.path());
    store
        .update(|ledger| ledger.update_revision("A", "B", "c9"))
        .expect("update");

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(saved["Theme"]["accent"], "pink");
    assert_eq!(saved["GitHub"]["repository"][1]["description"], "kept");
    assert_eq!(saved["GitHub"]["repository"][0]["lastsha"], "c9");
}

#[rstest]
#[case::missing_branch(r#"{"owner":"A","repo":"B"}"#, "main", "")]
#[case::explicit_branch(r#"{"owner":"A","repo":"B","branch":"trunk","lastsha":"c1"}"#, "trunk", "c1")]
#[case::empty_branch(r#"{"owner":"A","repo":"B","branch":""}"#, "main", "")]
fn repository_record_defaults(#[case] record: &str, #[case] branch: &str, #[case] rev: &str) {
    let json = format!(r#"{{"GitHub":{{"repository":[{record}]}}}}"#);
    let ledger = Ledger::from_document(serde_json::from_str(&json).expect("parse"));
    let entry = ledger.find("A", "B").expect("entry");
    assert_eq!(entry.branch, branch);
    assert_eq!(entry.last_revision, rev);
}

#[test]
fn duplicate_records_keep_first() {
    let json = r#"{"GitHub":{"repository":[
        {"owner":"A","repo":"B","branch":"main","lastsha":"c1"},
        {"owner":"A","repo":"B","branch":"dev","lastsha":"c2"}
    ]}}"#;
    let ledger = Ledger::from_document(serde_json::from_str(json).expect("parse"));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.find("A", "B").unwrap().last_revision, "c1");
}

// ---------------------------------------------------------------------------
// 3. Store round trips
// ---------------------------------------------------------------------------

#[test]
fn upsert_twice_through_store_leaves_one_entry() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = LedgerStore::new(home.child("config/config.json").path());

    let first = store.update(|l| Ok(l.upsert("A", "B", "main"))).expect("first");
    let second = store.update(|l| Ok(l.upsert("A", "B", "main"))).expect("second");

    assert_eq!(first, Upsert::Added);
    assert_eq!(second, Upsert::AlreadyExists);
    assert_eq!(store.load().expect("load").len(), 1);
    home.child("config/config.json").assert(predicate::path::exists());
    home.child("config/config.json.tmp").assert(predicate::path::missing());
}

#[test]
fn entries_keep_insertion_order() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = LedgerStore::new(home.child("config.json").path());
    store
        .update(|l| {
            l.upsert("zeta", "one", "main");
            l.upsert("alpha", "two", "main");
            l.upsert("mid", "three", "main");
            Ok(())
        })
        .expect("update");

    let loaded = store.load().expect("load");
    let order: Vec<_> = loaded.entries().map(|e| e.owner.as_str()).collect();
    assert_eq!(order, ["zeta", "alpha", "mid"]);
}

#[test]
fn credential_roundtrip_and_file_contains_token() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let store = LedgerStore::new(home.child("config.json").path());
    store
        .update(|l| {
            l.set_credential(Credential::from("ghp_abc"));
            Ok(())
        })
        .expect("set");

    assert_eq!(store.load().unwrap().credential().expose(), "ghp_abc");
    home.child("config.json")
        .assert(predicate::str::contains("\"token\": \"ghp_abc\""));
}
