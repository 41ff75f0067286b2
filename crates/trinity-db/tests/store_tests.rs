// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use trinity_app::{AgreeOutcome, AgreeRejection, CommentId, ItemDraft, ItemId, ListQuery};
use trinity_db::{Store, validate_db_path};
use trinity_testkit::{TrinityFaker, temp_db_path};

fn store_with_items(count: usize, seed: u64) -> Result<(Store, Vec<ItemId>)> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let mut faker = TrinityFaker::new(seed);
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        ids.push(store.create_item(&faker.draft(), None)?);
    }
    Ok((store, ids))
}

fn query(page: u32, per_page: u32) -> ListQuery {
    ListQuery {
        page,
        per_page,
        field: None,
        search: None,
    }
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/trinity.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.seed_demo_data()?;
    }
    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert!(store.item_count()? > 0);
    assert_eq!(store.seed_demo_data()?, 0, "seed must not duplicate");
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    store.raw_connection().execute_batch(
        "
        DROP TABLE agreements;
        CREATE TABLE agreements (
          user_id INTEGER NOT NULL,
          created_at TEXT NOT NULL
        );
        ",
    )?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `agreements` is missing required columns"));
    assert!(message.contains("item_id"));
    Ok(())
}

#[test]
fn pages_are_newest_first_and_disjoint() -> Result<()> {
    let (store, ids) = store_with_items(30, 11)?;

    let first = store.list_page(&query(1, 12))?;
    let second = store.list_page(&query(2, 12))?;
    let third = store.list_page(&query(3, 12))?;

    assert_eq!(first.items.len(), 12);
    assert!(first.has_more);
    assert_eq!(first.next_page, Some(2));
    assert_eq!(second.items.len(), 12);
    assert!(second.has_more);
    assert_eq!(third.items.len(), 6);
    assert!(!third.has_more);
    assert_eq!(third.next_page, None);

    let seen: Vec<ItemId> = first
        .items
        .iter()
        .chain(&second.items)
        .chain(&third.items)
        .map(|item| item.id)
        .collect();
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(seen, expected);
    Ok(())
}

#[test]
fn equal_timestamps_break_ties_by_id() -> Result<()> {
    let (store, ids) = store_with_items(3, 12)?;
    store.raw_connection().execute(
        "UPDATE items SET created_at = ?",
        rusqlite::params!["2026-02-19T12:00:00.000000Z"],
    )?;

    let page = store.list_page(&query(1, 10))?;
    let order: Vec<ItemId> = page.items.iter().map(|item| item.id).collect();
    assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
    Ok(())
}

#[test]
fn repeated_queries_are_stable() -> Result<()> {
    let (store, _) = store_with_items(15, 13)?;
    let once = store.list_page(&query(2, 5))?;
    let again = store.list_page(&query(2, 5))?;
    assert_eq!(once, again);
    Ok(())
}

#[test]
fn exact_page_boundary_reports_no_more() -> Result<()> {
    let (store, _) = store_with_items(24, 14)?;
    let second = store.list_page(&query(2, 12))?;
    assert_eq!(second.items.len(), 12);
    assert!(!second.has_more);
    Ok(())
}

#[test]
fn field_filter_matches_exactly() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let mut faker = TrinityFaker::new(21);
    for _ in 0..5 {
        store.create_item(&faker.draft_in_field("Economics"), None)?;
    }
    for _ in 0..4 {
        store.create_item(&faker.draft_in_field("Economics History"), None)?;
    }
    store.create_item(&faker.draft_in_field(""), None)?;

    let page = store.list_page(&ListQuery {
        field: Some("Economics".to_owned()),
        ..query(1, 12)
    })?;
    assert_eq!(page.items.len(), 5);
    assert!(!page.has_more);
    assert!(
        page.items
            .iter()
            .all(|item| item.field.as_deref() == Some("Economics"))
    );

    assert_eq!(
        store.list_fields()?,
        vec!["Economics".to_owned(), "Economics History".to_owned()]
    );
    Ok(())
}

#[test]
fn search_covers_name_description_and_elements() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;

    let mut by_element = ItemDraft::new("CAP Theorem", "Computer Science", [
        "Consistency",
        "Availability",
        "Partition tolerance",
    ]);
    by_element.description = "Distributed stores pick two.".to_owned();
    store.create_item(&by_element, None)?;

    let mut by_description = ItemDraft::new("Iron Triangle", "Management", ["Fast", "Good", "Cheap"]);
    by_description.description = "Scope, schedule and cost; 100% of the time.".to_owned();
    store.create_item(&by_description, None)?;

    let search = |term: &str| -> Result<Vec<String>> {
        let page = store.list_page(&ListQuery {
            search: Some(term.to_owned()),
            ..query(1, 12)
        })?;
        Ok(page.items.into_iter().map(|item| item.name).collect())
    };

    assert_eq!(search("partition")?, vec!["CAP Theorem".to_owned()]);
    assert_eq!(search("SCHEDULE")?, vec!["Iron Triangle".to_owned()]);
    assert_eq!(search("100%")?, vec!["Iron Triangle".to_owned()]);
    assert!(search("0_")?.is_empty(), "underscore must not act as a wildcard");
    Ok(())
}

#[test]
fn empty_optional_columns_read_back_as_none() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let id = store.create_item(&ItemDraft::new("Zooko's Triangle", "", ["A", "B", "C"]), None)?;

    let item = store.get_item(id)?;
    assert_eq!(item.field, None);
    assert_eq!(item.description, None);
    assert_eq!(item.element1_sacrifice_explanation, None);
    assert_eq!(item.agree_count, 0);
    assert_eq!(item.comments_count, 0);
    Ok(())
}

#[test]
fn agree_counts_once_per_user() -> Result<()> {
    let (store, ids) = store_with_items(1, 31)?;
    let alice = store.create_user("alice", false)?;
    let bob = store.create_user("bob", false)?;
    let item = ids[0];

    assert_eq!(store.agree(Some(alice), item.get())?, AgreeOutcome::agreed(1));
    assert_eq!(
        store.agree(Some(alice), item.get())?,
        AgreeOutcome::rejected(AgreeRejection::AlreadyAgreed)
    );
    assert_eq!(store.agree(Some(bob), item.get())?, AgreeOutcome::agreed(2));
    assert!(store.has_agreed(alice, item)?);
    assert_eq!(store.get_item(item)?.agree_count, 2);
    Ok(())
}

#[test]
fn agree_rejects_anonymous_invalid_and_missing() -> Result<()> {
    let (store, ids) = store_with_items(1, 32)?;
    let carol = store.create_user("carol", false)?;

    assert_eq!(
        store.agree(None, ids[0].get())?,
        AgreeOutcome::rejected(AgreeRejection::NotLoggedIn)
    );
    assert_eq!(
        store.agree(Some(carol), 0)?,
        AgreeOutcome::rejected(AgreeRejection::InvalidId)
    );
    assert_eq!(
        store.agree(Some(carol), 9_999)?,
        AgreeOutcome::rejected(AgreeRejection::NotFound)
    );
    assert_eq!(store.get_item(ids[0])?.agree_count, 0);
    Ok(())
}

#[test]
fn duplicate_usernames_are_rejected() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.create_user("dana", true)?;
    assert!(store.create_user("dana", false).is_err());
    assert!(store.create_user("   ", false).is_err());
    let dana = store.find_user("dana")?.expect("dana exists");
    assert!(dana.is_admin);
    assert_eq!(store.ensure_user("dana")?, dana.id);
    Ok(())
}

#[test]
fn comments_feed_the_list_count() -> Result<()> {
    let (store, ids) = store_with_items(1, 41)?;
    let erin = store.create_user("erin", false)?;
    store.add_comment(ids[0], Some(erin), "Two out of three is fine.")?;
    store.add_comment(ids[0], None, "Agreed.")?;
    assert!(store.add_comment(ids[0], None, "  ").is_err());
    assert!(store.add_comment(ItemId::new(404), None, "lost").is_err());

    let comments = store.list_comments(ids[0])?;
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].author, "erin");
    assert_eq!(comments[1].author, "anonymous");

    let page = store.list_page(&query(1, 12))?;
    assert_eq!(page.items[0].comments_count, 2);
    Ok(())
}

#[test]
fn update_and_delete_items() -> Result<()> {
    let (store, ids) = store_with_items(2, 51)?;
    let mut draft = ItemDraft::new("Renamed", "Physics", ["x", "y", "z"]);
    draft.hyperlink = "https://example.com/trinity".to_owned();
    store.update_item(ids[0], &draft)?;

    let detail = store.item_detail(ids[0])?.expect("detail exists");
    assert_eq!(detail.item.name, "Renamed");
    assert_eq!(detail.hyperlink.as_deref(), Some("https://example.com/trinity"));
    assert_eq!(detail.name_en, "Impossible Trinity");

    store.delete_item(ids[1])?;
    assert!(store.item_detail(ids[1])?.is_none());
    assert!(store.delete_item(ids[1]).is_err());
    assert!(store.update_item(ids[1], &draft).is_err());
    Ok(())
}

#[test]
fn drafts_and_authors_read_back() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let frank = store.create_user("frank", false)?;
    let draft = ItemDraft::new("Mundell-Fleming", "Economics", ["Fixed rate", "Capital flow", "Policy"]);
    let owned = store.create_item(&draft, Some(frank))?;
    let orphan = store.create_item(&draft, None)?;

    assert_eq!(store.item_author(owned)?, Some(Some(frank)));
    assert_eq!(store.item_author(orphan)?, Some(None));
    assert_eq!(store.item_author(ItemId::new(404))?, None);

    let read = store.item_draft(owned)?.expect("draft exists");
    assert_eq!(read.name, "Mundell-Fleming");
    assert_eq!(read.element2, "Capital flow");
    assert_eq!(read.name_en, "Impossible Trinity");
    assert_eq!(store.item_draft(ItemId::new(404))?, None);
    Ok(())
}

#[test]
fn comments_can_be_deleted() -> Result<()> {
    let (store, ids) = store_with_items(1, 61)?;
    let comment = store.add_comment(ids[0], None, "Remove me.")?;
    assert_eq!(store.comment_item(comment)?, Some(ids[0]));

    store.delete_comment(comment)?;
    assert!(store.list_comments(ids[0])?.is_empty());
    assert_eq!(store.comment_item(comment)?, None);
    assert!(store.delete_comment(comment).is_err());
    assert_eq!(store.comment_item(CommentId::new(999))?, None);
    Ok(())
}

#[test]
fn demo_seed_carries_author_and_fields() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let inserted = store.seed_demo_data()?;
    assert!(inserted >= 5);

    let fields = store.list_fields()?;
    assert!(fields.contains(&"Economics".to_owned()));
    assert!(fields.contains(&"Computer Science".to_owned()));

    let first = store.list_page(&query(1, 1))?;
    let detail = store
        .item_detail(first.items[0].id)?
        .expect("seeded item has detail");
    assert_eq!(detail.author.as_deref(), Some("demo"));
    Ok(())
}

#[test]
fn csv_round_trip_preserves_drafts() -> Result<()> {
    let (source, _) = store_with_items(6, 61)?;
    let mut buffer = Vec::new();
    assert_eq!(source.export_csv(&mut buffer)?, 6);

    let target = Store::open_memory()?;
    target.bootstrap()?;
    let summary = target.import_csv(buffer.as_slice(), None)?;
    assert_eq!(summary.imported, 6);
    assert_eq!(summary.skipped, 0);
    assert_eq!(target.list_drafts()?, source.list_drafts()?);
    Ok(())
}

#[test]
fn import_skips_invalid_rows_and_keeps_the_rest() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let csv = "name,field,element1,element2,element3\n\
               Good,Economics,a,b,c\n\
               ,Economics,a,b,c\n\
               Missing element,Economics,a,,c\n\
               Short row,Economics\n\
               Also good,Physics,x,y,z,extra\n";

    let summary = store.import_csv(csv.as_bytes(), None)?;
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 3);
    assert_eq!(store.item_count()?, 2);
    Ok(())
}

#[test]
fn export_and_import_through_files() -> Result<()> {
    let (dir, _) = temp_db_path()?;
    let csv_path = dir.path().join("catalog.csv");
    let (source, _) = store_with_items(3, 71)?;
    source.export_csv_path(&csv_path)?;

    let target = Store::open_memory()?;
    target.bootstrap()?;
    let summary = target.import_csv_path(&csv_path, None)?;
    assert_eq!(summary.imported, 3);
    Ok(())
}
