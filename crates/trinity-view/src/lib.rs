// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod actions;
pub mod controller;
pub mod render;
pub mod scaffold;
pub mod surface;
pub mod trigger;

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use trinity_app::{AgreeOutcome, ItemId, ListQuery, PageResponse};

pub use actions::{
    ActionController, AgreeControl, AgreeRequest, FilterAction, FilterChip, FilterStrip,
    RowActivation, ScrollMemo, activate_row, filter_url, switch_view_url,
};
pub use controller::{FetchKind, FetchRequest, ListController, LoadOutcome};
pub use render::{ListingPage, Renderer};
pub use scaffold::Scaffold;
pub use surface::{Fragment, Surface};
pub use trigger::ProximityTrigger;

/// Backend a listing talks to: the list-query and agree endpoints.
///
/// The `spawn_*` defaults run the call on the current thread and post the
/// result as an event; runtimes with a worker pool override them.
pub trait CatalogRuntime {
    fn fetch_page(&mut self, query: &ListQuery) -> Result<PageResponse>;
    fn agree(&mut self, item_id: ItemId) -> Result<AgreeOutcome>;

    fn spawn_fetch(&mut self, request: &FetchRequest, tx: &Sender<ViewEvent>) -> Result<()> {
        let result = self
            .fetch_page(&request.query)
            .map_err(|error| format!("{error:#}"));
        tx.send(ViewEvent::PageFetched {
            request_id: request.request_id,
            result,
        })
        .map_err(|_| anyhow::anyhow!("view event channel closed"))?;
        Ok(())
    }

    fn spawn_agree(&mut self, request: &AgreeRequest, tx: &Sender<ViewEvent>) -> Result<()> {
        let result = self
            .agree(request.item_id)
            .map_err(|error| format!("{error:#}"));
        tx.send(ViewEvent::AgreeFinished {
            request_id: request.request_id,
            item_id: request.item_id,
            result,
        })
        .map_err(|_| anyhow::anyhow!("view event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    PageFetched {
        request_id: u64,
        result: Result<PageResponse, String>,
    },
    AgreeFinished {
        request_id: u64,
        item_id: ItemId,
        result: Result<AgreeOutcome, String>,
    },
    ClearConfirmation {
        item_id: ItemId,
        token: u64,
    },
}

fn schedule_confirmation_clear(
    tx: &Sender<ViewEvent>,
    item_id: ItemId,
    token: u64,
    delay: Duration,
) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(ViewEvent::ClearConfirmation { item_id, token });
    });
}
