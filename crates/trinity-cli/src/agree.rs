// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc;

use anyhow::{Result, anyhow, bail};
use trinity_app::{FilterStrategy, ItemId};
use trinity_view::{ActionController, CatalogRuntime, FilterStrip, ScrollMemo, ViewEvent};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreeReport {
    pub agreed: bool,
    pub count: u64,
    pub message: String,
}

/// Press the agree control for `item_id` once and wait for the reply.
/// Business-rule refusals come back as a report with `agreed == false`.
pub fn agree<R: CatalogRuntime>(
    runtime: &mut R,
    listing: &Url,
    item_id: ItemId,
    displayed_count: u64,
) -> Result<AgreeReport> {
    let mut memo = ScrollMemo::default();
    let mut actions = ActionController::mount(
        listing.clone(),
        FilterStrip::new(&[], None),
        FilterStrategy::default(),
        &mut memo,
    );
    let Some(request) = actions.click_agree(item_id, displayed_count) else {
        bail!("agree control for item {item_id} is busy");
    };

    let (tx, rx) = mpsc::channel();
    runtime.spawn_agree(&request, &tx)?;
    let event = rx
        .recv()
        .map_err(|_| anyhow!("agree reply for item {item_id} never arrived"))?;
    if let ViewEvent::AgreeFinished { result: Err(error), .. } = &event {
        bail!("agree item {item_id}: {error}");
    }
    actions.handle_event(event, &tx);

    let control = actions
        .agree_control(item_id)
        .ok_or_else(|| anyhow!("agree control for item {item_id} vanished"))?;
    Ok(AgreeReport {
        agreed: control.has_agreed(),
        count: control.count(),
        message: control.message().unwrap_or_default().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::agree;
    use crate::runtime::StoreRuntime;
    use anyhow::Result;
    use trinity_app::{ItemId, ListQuery, ViewMode};
    use trinity_db::Store;
    use trinity_testkit::TrinityFaker;
    use url::Url;

    fn store_with_item() -> Result<(Store, ItemId)> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.create_user("alice", false)?;
        store.create_item(&TrinityFaker::new(5).draft(), None)?;
        let item = store.list_page(&ListQuery::first_page(ViewMode::Card))?.items[0].id;
        Ok((store, item))
    }

    fn listing() -> Url {
        Url::parse("http://localhost/").expect("valid url")
    }

    #[test]
    fn agree_reports_server_count() -> Result<()> {
        let (store, item) = store_with_item()?;
        let mut runtime = StoreRuntime::new(&store).as_user(Some("alice"))?;

        let report = agree(&mut runtime, &listing(), item, 0)?;
        assert!(report.agreed);
        assert_eq!(report.count, 1);
        assert!(!report.message.is_empty());
        Ok(())
    }

    #[test]
    fn repeat_agree_is_refused_not_failed() -> Result<()> {
        let (store, item) = store_with_item()?;
        let mut runtime = StoreRuntime::new(&store).as_user(Some("alice"))?;
        agree(&mut runtime, &listing(), item, 0)?;

        let report = agree(&mut runtime, &listing(), item, 1)?;
        assert!(!report.agreed);
        assert_eq!(report.count, 1, "count stays at what was displayed");
        assert!(!report.message.is_empty());
        Ok(())
    }

    #[test]
    fn anonymous_agree_is_refused() -> Result<()> {
        let (store, item) = store_with_item()?;
        let report = agree(&mut StoreRuntime::new(&store), &listing(), item, 0)?;
        assert!(!report.agreed);
        assert_eq!(store.item_detail(item)?.map(|d| d.item.agree_count), Some(0));
        Ok(())
    }
}
