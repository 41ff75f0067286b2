// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Incremental loading for one listing surface.
//!
//! The controller never performs I/O itself. Operations hand back a
//! [`FetchRequest`]; the host runs it (directly through [`ListController::drive`]
//! or on a worker through [`CatalogRuntime::spawn_fetch`]) and reports the
//! result with [`ListController::complete`]. At most one request is
//! outstanding at a time.

use anyhow::{Result, anyhow, bail};
use tracing::{debug, warn};
use trinity_app::{ListPageState, ListQuery, PageResponse};

use crate::render::Renderer;
use crate::scaffold::Scaffold;
use crate::surface::{Fragment, Surface};
use crate::trigger::ProximityTrigger;
use crate::{CatalogRuntime, ViewEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    LoadMore,
    Reset,
}

impl FetchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadMore => "load_more",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub request_id: u64,
    pub kind: FetchKind,
    pub query: ListQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A load-more page was appended.
    Appended { count: usize, has_more: bool },
    /// A reset page replaced the rendered set.
    Replaced { count: usize, has_more: bool },
    /// The fetch failed; the listing is as it was before the request.
    Failed { kind: FetchKind, error: String },
    /// The response did not belong to the outstanding request.
    Stale,
    /// The response was dropped in favour of a queued reset, which the host
    /// must now run.
    Superseded(FetchRequest),
}

#[derive(Debug, Clone)]
struct Snapshot {
    state: ListPageState,
    fragments: Vec<Fragment>,
    trigger: ProximityTrigger,
    sentinel_visible: bool,
}

#[derive(Debug, Clone)]
pub struct ListController {
    state: ListPageState,
    surface: Surface,
    renderer: Renderer,
    trigger: ProximityTrigger,
    in_flight: Option<FetchRequest>,
    queued_reset: Option<ListQuery>,
    rollback: Option<Snapshot>,
    next_request_id: u64,
}

impl ListController {
    /// Mount on a server-rendered page. `rendered` holds the fragments
    /// already on screen, in display order.
    pub fn initialize(
        scaffold: Scaffold,
        rendered: Vec<Fragment>,
        renderer: Renderer,
        trigger_margin: u32,
    ) -> Self {
        let state = scaffold.into_state();
        let mut trigger = ProximityTrigger::new(trigger_margin);
        if !state.has_more() {
            trigger.disarm();
        }
        debug!(
            view = state.view_mode().as_str(),
            page = state.current_page(),
            has_more = state.has_more(),
            rendered = rendered.len(),
            "listing mounted"
        );
        Self {
            surface: Surface::new(state.view_mode(), rendered, state.has_more()),
            state,
            renderer,
            trigger,
            in_flight: None,
            queued_reset: None,
            rollback: None,
            next_request_id: 0,
        }
    }

    pub fn state(&self) -> &ListPageState {
        &self.state
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn trigger(&self) -> &ProximityTrigger {
        &self.trigger
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref()
    }

    pub fn scaffold(&self) -> Scaffold {
        Scaffold::from_state(&self.state)
    }

    pub fn html(&self) -> String {
        self.surface.html(&self.renderer)
    }

    /// Report the sentinel's distance below the viewport. Starts a
    /// load-more when the sentinel enters the trigger margin.
    pub fn on_proximity(&mut self, distance: i64) -> Option<FetchRequest> {
        if self.trigger.observe(distance) {
            self.load_more()
        } else {
            None
        }
    }

    /// Request the next page. `None` while any fetch is outstanding or the
    /// listing is exhausted.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let query = self.state.begin_load_more()?;
        self.surface.set_loader_visible(true);
        Some(self.issue(FetchKind::LoadMore, query))
    }

    /// Switch the active filter and reload from page 1. The rendered set is
    /// cleared immediately. If a fetch is already outstanding the reset is
    /// queued and handed back through [`LoadOutcome::Superseded`] once that
    /// fetch settles.
    pub fn reset_for_filter(&mut self, filter: Option<&str>) -> Option<FetchRequest> {
        if self.rollback.is_none() {
            self.rollback = Some(Snapshot {
                state: self.state.clone(),
                fragments: self.surface.fragments().to_vec(),
                trigger: self.trigger.clone(),
                sentinel_visible: self.surface.sentinel_visible(),
            });
        }

        let query = self.state.begin_reset(filter);
        self.surface.clear();
        self.surface.set_loader_visible(true);
        self.surface.set_sentinel_visible(false);
        self.trigger.disarm();

        if self.in_flight.is_some() {
            debug!(filter = ?query.field, "reset queued behind outstanding fetch");
            self.queued_reset = Some(query);
            return None;
        }
        Some(self.issue(FetchKind::Reset, query))
    }

    /// Apply the result of the outstanding request.
    pub fn complete(&mut self, request_id: u64, result: Result<PageResponse>) -> LoadOutcome {
        let Some(pending) = self
            .in_flight
            .take_if(|pending| pending.request_id == request_id)
        else {
            debug!(request_id, "ignoring response for superseded request");
            return LoadOutcome::Stale;
        };

        if let Some(query) = self.queued_reset.take() {
            debug!(
                request_id,
                kind = pending.kind.as_str(),
                "dropping response in favour of queued reset"
            );
            return LoadOutcome::Superseded(self.issue(FetchKind::Reset, query));
        }

        let page = result.and_then(|page| validate_page(&pending.query, page));
        let outcome = match pending.kind {
            FetchKind::LoadMore => self.apply_load_more(page),
            FetchKind::Reset => self.apply_reset(page),
        };
        self.state.release();
        self.surface.set_loader_visible(false);
        outcome
    }

    /// Run `request` to completion against `runtime`, following any queued
    /// reset.
    pub fn drive<R: CatalogRuntime>(
        &mut self,
        request: FetchRequest,
        runtime: &mut R,
    ) -> LoadOutcome {
        let mut request = request;
        loop {
            let result = runtime.fetch_page(&request.query);
            match self.complete(request.request_id, result) {
                LoadOutcome::Superseded(next) => request = next,
                outcome => return outcome,
            }
        }
    }

    /// Apply a page event from a worker. Other events are not ours.
    pub fn handle_event(&mut self, event: ViewEvent) -> Option<LoadOutcome> {
        match event {
            ViewEvent::PageFetched { request_id, result } => {
                Some(self.complete(request_id, result.map_err(|error| anyhow!(error))))
            }
            _ => None,
        }
    }

    fn apply_load_more(&mut self, page: Result<PageResponse>) -> LoadOutcome {
        match page {
            Ok(page) => {
                let count = page.items.len();
                let fragments = self.renderer.fragments(self.state.view_mode(), &page.items);
                self.surface.append(fragments);
                self.state.advance(page.has_more);
                if !page.has_more {
                    self.trigger.disarm();
                    self.surface.set_sentinel_visible(false);
                }
                debug!(
                    page = self.state.current_page(),
                    count,
                    has_more = page.has_more,
                    "page appended"
                );
                LoadOutcome::Appended {
                    count,
                    has_more: page.has_more,
                }
            }
            Err(error) => {
                warn!(
                    page = self.state.current_page() + 1,
                    error = %format!("{error:#}"),
                    "load more failed"
                );
                // Let the next observation inside the margin retry.
                self.trigger.rearm();
                LoadOutcome::Failed {
                    kind: FetchKind::LoadMore,
                    error: format!("{error:#}"),
                }
            }
        }
    }

    fn apply_reset(&mut self, page: Result<PageResponse>) -> LoadOutcome {
        match page {
            Ok(page) => {
                let count = page.items.len();
                let fragments = self.renderer.fragments(self.state.view_mode(), &page.items);
                self.surface.replace(fragments);
                self.state.confirm_reset(page.has_more);
                self.surface.set_sentinel_visible(page.has_more);
                if page.has_more {
                    self.trigger.rearm();
                } else {
                    self.trigger.disarm();
                }
                self.rollback = None;
                debug!(
                    filter = ?self.state.active_filter(),
                    count,
                    has_more = page.has_more,
                    "listing reset"
                );
                LoadOutcome::Replaced {
                    count,
                    has_more: page.has_more,
                }
            }
            Err(error) => {
                warn!(
                    filter = ?self.state.active_filter(),
                    error = %format!("{error:#}"),
                    "filter reset failed; restoring previous listing"
                );
                if let Some(snapshot) = self.rollback.take() {
                    self.state = snapshot.state;
                    self.surface.replace(snapshot.fragments);
                    self.surface.set_sentinel_visible(snapshot.sentinel_visible);
                    self.trigger = snapshot.trigger;
                }
                LoadOutcome::Failed {
                    kind: FetchKind::Reset,
                    error: format!("{error:#}"),
                }
            }
        }
    }

    fn issue(&mut self, kind: FetchKind, query: ListQuery) -> FetchRequest {
        self.next_request_id = self.next_request_id.saturating_add(1);
        if self.next_request_id == 0 {
            self.next_request_id = 1;
        }
        let request = FetchRequest {
            request_id: self.next_request_id,
            kind,
            query,
        };
        debug!(
            request_id = request.request_id,
            kind = kind.as_str(),
            page = request.query.page,
            "fetch issued"
        );
        self.in_flight = Some(request.clone());
        request
    }
}

/// A page larger than requested, or an empty page that claims more
/// results, cannot be applied without breaking pagination.
fn validate_page(query: &ListQuery, page: PageResponse) -> Result<PageResponse> {
    if page.items.len() > query.per_page as usize {
        bail!(
            "page {} returned {} items, more than the {} requested",
            query.page,
            page.items.len(),
            query.per_page
        );
    }
    if page.items.is_empty() && page.has_more {
        bail!("page {} is empty but reports more results", query.page);
    }
    Ok(page)
}
