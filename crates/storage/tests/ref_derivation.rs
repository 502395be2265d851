#![forbid(unsafe_code)]

use std::path::PathBuf;
use tt_core::ids::WorkspaceId;
use tt_storage::refs::{has_tag_mark, referenced_titles};
use tt_storage::{GraphOp, SqliteStore};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("tt_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn titles(text: &str) -> Vec<String> {
    referenced_titles(text).into_iter().collect()
}

#[test]
fn bracketed_links_extract_exact_titles() {
    assert_eq!(titles("see [[Work/Done]] later"), vec!["Work/Done"]);
    assert_eq!(titles("[[ Spaced Title ]]"), vec!["Spaced Title"]);
    assert_eq!(titles("[[A]] and [[B]]"), vec!["A", "B"]);
    assert!(titles("[[]]").is_empty());
    assert!(titles("nothing here").is_empty());
    assert!(titles("[single] brackets").is_empty());
}

#[test]
fn unterminated_brackets_extract_nothing() {
    assert!(titles("[[dangling").is_empty());
    assert_eq!(titles("[[dangling [[Inner]]"), vec!["Inner"]);
}

#[test]
fn nested_openers_yield_only_the_inner_title() {
    assert_eq!(titles("[[Outer [[Inner]] tail]]"), vec!["Inner"]);
}

#[test]
fn hash_marked_links_extract_exact_titles() {
    assert_eq!(titles("todo #[[Work/Done]] now"), vec!["Work/Done"]);
    assert_eq!(titles("#Work"), vec!["Work"]);
    assert_eq!(titles("deep tag #Work/Sub here"), vec!["Work/Sub"]);
    assert_eq!(titles("#a#b"), vec!["a", "b"]);
}

#[test]
fn bare_tags_stop_at_whitespace_and_shed_punctuation() {
    assert_eq!(titles("end with #Work."), vec!["Work"]);
    assert_eq!(titles("(see #Work)"), vec!["Work"]);
    assert_eq!(titles("ask #Work?!"), vec!["Work"]);
    assert_eq!(titles("#Work[[Other]]"), vec!["Other", "Work"]);
    assert!(titles("# lone hash").is_empty());
    assert!(titles("#...").is_empty());
}

#[test]
fn tag_mark_filter_accepts_hash_forms_only() {
    assert!(has_tag_mark("note #Work item", "Work"));
    assert!(has_tag_mark("note #[[Work]] item", "Work"));
    assert!(!has_tag_mark("note [[Work]] item", "Work"));
    assert!(!has_tag_mark("note #Home item", "Work"));
    // Substring match over the raw text, exactly like the host filter.
    assert!(has_tag_mark("note #Workshop item", "Work"));
}

#[test]
fn block_upserts_derive_refs_for_known_titles_only() {
    let storage_dir = temp_dir("block_upserts_derive_refs_for_known_titles_only");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let workspace = WorkspaceId::try_new("ws1").expect("workspace id");

    store
        .graph_apply(
            &workspace,
            vec![
                GraphOp::PageUpsert {
                    uid: "p1".to_string(),
                    title: "Work".to_string(),
                },
                GraphOp::BlockUpsert {
                    uid: "b1".to_string(),
                    page_uid: None,
                    text: Some("#Work and #Unknown and [[Work]]".to_string()),
                },
            ],
        )
        .expect("seed graph");

    let records = store.scan_tag_refs(&workspace).expect("scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Work");
    assert_eq!(records[0].refs.len(), 1);
    assert_eq!(records[0].refs[0].block_uid, "b1");
}

#[test]
fn editing_text_rederives_refs() {
    let storage_dir = temp_dir("editing_text_rederives_refs");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let workspace = WorkspaceId::try_new("ws1").expect("workspace id");

    store
        .graph_apply(
            &workspace,
            vec![
                GraphOp::PageUpsert {
                    uid: "p1".to_string(),
                    title: "Work".to_string(),
                },
                GraphOp::PageUpsert {
                    uid: "p2".to_string(),
                    title: "Home".to_string(),
                },
                GraphOp::BlockUpsert {
                    uid: "b1".to_string(),
                    page_uid: None,
                    text: Some("#Work".to_string()),
                },
            ],
        )
        .expect("seed graph");
    assert_eq!(store.scan_tag_refs(&workspace).expect("scan")[0].title, "Work");

    store
        .graph_apply(
            &workspace,
            vec![GraphOp::BlockUpsert {
                uid: "b1".to_string(),
                page_uid: None,
                text: Some("#Home".to_string()),
            }],
        )
        .expect("edit block");

    let records = store.scan_tag_refs(&workspace).expect("scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Home");

    store
        .graph_apply(
            &workspace,
            vec![GraphOp::BlockUpsert {
                uid: "b1".to_string(),
                page_uid: None,
                text: None,
            }],
        )
        .expect("clear text");
    assert!(store.scan_tag_refs(&workspace).expect("scan").is_empty());
}

#[test]
fn renaming_a_page_rederives_refs_across_the_workspace() {
    let storage_dir = temp_dir("renaming_a_page_rederives_refs_across_the_workspace");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let workspace = WorkspaceId::try_new("ws1").expect("workspace id");

    store
        .graph_apply(
            &workspace,
            vec![
                GraphOp::PageUpsert {
                    uid: "p1".to_string(),
                    title: "Old".to_string(),
                },
                GraphOp::BlockUpsert {
                    uid: "b1".to_string(),
                    page_uid: None,
                    text: Some("#Old mention".to_string()),
                },
                GraphOp::BlockUpsert {
                    uid: "b2".to_string(),
                    page_uid: None,
                    text: Some("#New mention".to_string()),
                },
            ],
        )
        .expect("seed graph");

    let records = store.scan_tag_refs(&workspace).expect("scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].refs[0].block_uid, "b1");

    store
        .graph_apply(
            &workspace,
            vec![GraphOp::PageUpsert {
                uid: "p1".to_string(),
                title: "New".to_string(),
            }],
        )
        .expect("rename page");

    let records = store.scan_tag_refs(&workspace).expect("scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "New");
    assert_eq!(records[0].refs.len(), 1);
    assert_eq!(records[0].refs[0].block_uid, "b2");
}

#[test]
fn late_page_creation_picks_up_existing_mentions() {
    let storage_dir = temp_dir("late_page_creation_picks_up_existing_mentions");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let workspace = WorkspaceId::try_new("ws1").expect("workspace id");

    store
        .graph_apply(
            &workspace,
            vec![GraphOp::BlockUpsert {
                uid: "b1".to_string(),
                page_uid: None,
                text: Some("waiting for #Future".to_string()),
            }],
        )
        .expect("block first");
    assert!(store.scan_tag_refs(&workspace).expect("scan").is_empty());

    store
        .graph_apply(
            &workspace,
            vec![GraphOp::PageUpsert {
                uid: "p1".to_string(),
                title: "Future".to_string(),
            }],
        )
        .expect("page later");

    let records = store.scan_tag_refs(&workspace).expect("scan");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Future");
    assert_eq!(records[0].refs[0].block_uid, "b1");
}
