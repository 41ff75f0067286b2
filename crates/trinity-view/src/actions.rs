// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Discrete user actions on a listing: view switch, field filter and
//! agree. None of these go through the list fetch cycle except the
//! in-place filter, which hands off to [`ListController::reset_for_filter`].

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, warn};
use trinity_app::{AgreeOutcome, FilterStrategy, ItemId, ViewMode, normalize_filter};
use url::Url;

use crate::controller::{FetchKind, FetchRequest, ListController, LoadOutcome};
use crate::render::Renderer;
use crate::{ViewEvent, schedule_confirmation_clear};

/// How long the agree confirmation stays up.
pub const CONFIRMATION_DELAY: Duration = Duration::from_secs(2);
pub const AGREE_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
pub const ALL_FIELDS_LABEL: &str = "All";

const PAGE_CURSOR_KEYS: [&str; 2] = ["page", "paged"];

/// `current` with the view replaced. The field filter and search survive;
/// the page cursor does not.
pub fn switch_view_url(current: &Url, view: ViewMode) -> Url {
    rewrite_query(current, &["view"], Some(("view", view.as_str())))
}

/// `current` with the field filter replaced, or removed for `None`. The
/// page cursor is dropped.
pub fn filter_url(current: &Url, field: Option<&str>) -> Url {
    let field = normalize_filter(field);
    rewrite_query(current, &["field"], field.as_deref().map(|field| ("field", field)))
}

fn rewrite_query(current: &Url, replaced: &[&str], append: Option<(&str, &str)>) -> Url {
    let kept: Vec<(String, String)> = current
        .query_pairs()
        .filter(|(key, _)| !replaced.contains(&key.as_ref()) && !PAGE_CURSOR_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = current.clone();
    if kept.is_empty() && append.is_none() {
        url.set_query(None);
        return url;
    }
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        if let Some((key, value)) = append {
            pairs.append_pair(key, value);
        }
    }
    url
}

/// Filter-strip scroll offsets saved for one pending navigation each,
/// keyed by the destination URL. Taking an entry removes it.
#[derive(Debug, Clone, Default)]
pub struct ScrollMemo {
    offsets: HashMap<String, u32>,
}

impl ScrollMemo {
    pub fn save(&mut self, target: &Url, offset: u32) {
        self.offsets.insert(target.as_str().to_owned(), offset);
    }

    pub fn take(&mut self, target: &Url) -> Option<u32> {
        self.offsets.remove(target.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    pub field: Option<String>,
    pub label: String,
    pub active: bool,
}

/// The horizontal strip of filter controls. Exactly one chip is active;
/// the "All" chip stands for no filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStrip {
    chips: Vec<FilterChip>,
    widths: Vec<u32>,
    viewport_width: u32,
    scroll_offset: u32,
}

impl FilterStrip {
    pub fn new(fields: &[String], active: Option<&str>) -> Self {
        let mut chips: Vec<FilterChip> = std::iter::once(FilterChip {
            field: None,
            label: ALL_FIELDS_LABEL.to_owned(),
            active: false,
        })
        .chain(fields.iter().filter_map(|field| {
            normalize_filter(Some(field.as_str())).map(|field| FilterChip {
                label: field.clone(),
                field: Some(field),
                active: false,
            })
        }))
        .collect();

        let active = normalize_filter(active);
        if let Some(field) = &active
            && !chips.iter().any(|chip| chip.field.as_ref() == Some(field))
        {
            chips.push(FilterChip {
                field: Some(field.clone()),
                label: field.clone(),
                active: false,
            });
        }

        let mut strip = Self {
            chips,
            widths: Vec::new(),
            viewport_width: 0,
            scroll_offset: 0,
        };
        strip.select(active.as_deref());
        strip
    }

    /// Record measured chip widths, in chip order, and the visible width.
    pub fn with_layout(mut self, viewport_width: u32, widths: Vec<u32>) -> Self {
        self.viewport_width = viewport_width;
        self.widths = widths;
        self.scroll_offset = self.scroll_offset.min(self.max_offset());
        self
    }

    pub fn chips(&self) -> &[FilterChip] {
        &self.chips
    }

    pub fn active(&self) -> Option<&str> {
        self.chips
            .iter()
            .find(|chip| chip.active)
            .and_then(|chip| chip.field.as_deref())
    }

    pub fn scroll_offset(&self) -> u32 {
        self.scroll_offset
    }

    /// Mark the chip for `field` active. An unknown field falls back to
    /// "All".
    pub fn select(&mut self, field: Option<&str>) {
        let field = normalize_filter(field);
        let target = self
            .chips
            .iter()
            .position(|chip| chip.field == field)
            .unwrap_or(0);
        for (index, chip) in self.chips.iter_mut().enumerate() {
            chip.active = index == target;
        }
    }

    pub fn scroll_to(&mut self, offset: u32) {
        self.scroll_offset = offset.min(self.max_offset());
    }

    /// Scroll the least distance that brings the active chip fully into
    /// view. Without a layout this does nothing.
    pub fn scroll_active_into_view(&mut self) {
        let Some(index) = self.chips.iter().position(|chip| chip.active) else {
            return;
        };
        let Some(&width) = self.widths.get(index) else {
            return;
        };
        let start: u32 = self.widths[..index].iter().sum();
        let end = start + width;
        if start < self.scroll_offset {
            self.scroll_offset = start;
        } else if end > self.scroll_offset + self.viewport_width {
            self.scroll_offset = end.saturating_sub(self.viewport_width);
        }
        self.scroll_offset = self.scroll_offset.min(self.max_offset());
    }

    fn max_offset(&self) -> u32 {
        if self.widths.is_empty() {
            return u32::MAX;
        }
        self.widths
            .iter()
            .sum::<u32>()
            .saturating_sub(self.viewport_width)
    }
}

/// What the host must do after a filter selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Load this URL.
    Navigate(Url),
    /// Run the reset fetch, if one was issued; a `None` reset is queued
    /// behind the outstanding fetch.
    Reset(Option<FetchRequest>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreeRequest {
    pub request_id: u64,
    pub item_id: ItemId,
}

/// Display state of one item's agree control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreeControl {
    count: u64,
    disabled: bool,
    agreed: bool,
    message: Option<String>,
    confirmation_token: Option<u64>,
    pending: Option<u64>,
}

impl AgreeControl {
    fn new(count: u64) -> Self {
        Self {
            count,
            disabled: false,
            agreed: false,
            message: None,
            confirmation_token: None,
            pending: None,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn has_agreed(&self) -> bool {
        self.agreed
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn confirmation_visible(&self) -> bool {
        self.confirmation_token.is_some()
    }
}

/// How a table row was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowActivation<'a> {
    Click,
    Key(&'a str),
}

/// Detail URL for an activated row, or `None` for keys that do not
/// activate.
pub fn activate_row(
    renderer: &Renderer,
    item_id: ItemId,
    activation: RowActivation<'_>,
) -> Option<String> {
    match activation {
        RowActivation::Click | RowActivation::Key("Enter" | " " | "Space") => {
            Some(renderer.detail_url(item_id))
        }
        RowActivation::Key(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct ActionController {
    url: Url,
    strategy: FilterStrategy,
    strip: FilterStrip,
    previous_filter: Option<Option<String>>,
    agree: BTreeMap<ItemId, AgreeControl>,
    confirmation_delay: Duration,
    next_request_id: u64,
    next_token: u64,
}

impl ActionController {
    /// Attach to a freshly rendered listing at `url`. A scroll offset saved
    /// for this URL is restored, then the active chip is brought into view.
    pub fn mount(
        url: Url,
        mut strip: FilterStrip,
        strategy: FilterStrategy,
        memo: &mut ScrollMemo,
    ) -> Self {
        if let Some(offset) = memo.take(&url) {
            strip.scroll_to(offset);
        }
        strip.scroll_active_into_view();
        Self {
            url,
            strategy,
            strip,
            previous_filter: None,
            agree: BTreeMap::new(),
            confirmation_delay: CONFIRMATION_DELAY,
            next_request_id: 0,
            next_token: 0,
        }
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn strategy(&self) -> FilterStrategy {
        self.strategy
    }

    pub fn strip(&self) -> &FilterStrip {
        &self.strip
    }

    pub fn strip_mut(&mut self) -> &mut FilterStrip {
        &mut self.strip
    }

    pub fn switch_view(&self, view: ViewMode) -> Url {
        switch_view_url(&self.url, view)
    }

    /// Apply a filter-control click under the configured strategy. The
    /// strip's scroll offset is saved for the destination first.
    pub fn select_filter(
        &mut self,
        field: Option<&str>,
        list: &mut ListController,
        memo: &mut ScrollMemo,
    ) -> FilterAction {
        let field = normalize_filter(field);
        let target = filter_url(&self.url, field.as_deref());
        memo.save(&target, self.strip.scroll_offset());

        match self.strategy {
            FilterStrategy::Navigate => {
                debug!(url = %target, "filter navigation");
                FilterAction::Navigate(target)
            }
            FilterStrategy::InPlace => {
                if self.previous_filter.is_none() {
                    self.previous_filter = Some(self.strip.active().map(str::to_owned));
                }
                self.strip.select(field.as_deref());
                self.url = target;
                FilterAction::Reset(list.reset_for_filter(field.as_deref()))
            }
        }
    }

    /// Follow up an in-place reset once it settles: restore the strip on
    /// success, revert the indicator and URL on failure.
    pub fn filter_settled(&mut self, outcome: &LoadOutcome, memo: &mut ScrollMemo) {
        match outcome {
            LoadOutcome::Replaced { .. } => {
                self.previous_filter = None;
                if let Some(offset) = memo.take(&self.url) {
                    self.strip.scroll_to(offset);
                }
                self.strip.scroll_active_into_view();
            }
            LoadOutcome::Failed {
                kind: FetchKind::Reset,
                ..
            } => {
                memo.take(&self.url);
                if let Some(previous) = self.previous_filter.take() {
                    self.strip.select(previous.as_deref());
                    self.url = filter_url(&self.url, previous.as_deref());
                }
            }
            _ => {}
        }
    }

    pub fn agree_control(&self, item_id: ItemId) -> Option<&AgreeControl> {
        self.agree.get(&item_id)
    }

    /// Start an agree request. `None` while the control is disabled, which
    /// covers a request already in flight.
    pub fn click_agree(&mut self, item_id: ItemId, displayed_count: u64) -> Option<AgreeRequest> {
        let control = self
            .agree
            .entry(item_id)
            .or_insert_with(|| AgreeControl::new(displayed_count));
        if control.disabled {
            return None;
        }

        self.next_request_id = self.next_request_id.saturating_add(1);
        if self.next_request_id == 0 {
            self.next_request_id = 1;
        }
        control.disabled = true;
        control.message = None;
        control.confirmation_token = None;
        control.pending = Some(self.next_request_id);
        Some(AgreeRequest {
            request_id: self.next_request_id,
            item_id,
        })
    }

    /// Apply the agree reply. Returns `false` for replies to requests that
    /// are no longer pending.
    pub fn complete_agree(
        &mut self,
        request_id: u64,
        item_id: ItemId,
        result: Result<AgreeOutcome>,
        tx: &Sender<ViewEvent>,
    ) -> bool {
        let Some(control) = self.agree.get_mut(&item_id) else {
            return false;
        };
        if control.pending != Some(request_id) {
            return false;
        }
        control.pending = None;
        control.disabled = false;

        match result {
            Ok(AgreeOutcome::Agreed { count, message }) => {
                self.next_token = self.next_token.saturating_add(1);
                control.count = count;
                control.agreed = true;
                control.message = Some(message);
                control.confirmation_token = Some(self.next_token);
                schedule_confirmation_clear(tx, item_id, self.next_token, self.confirmation_delay);
                debug!(%item_id, count, "agree recorded");
            }
            Ok(AgreeOutcome::Rejected { reason, message }) => {
                debug!(%item_id, ?reason, "agree rejected");
                control.message = Some(message);
            }
            Err(error) => {
                warn!(%item_id, error = %format!("{error:#}"), "agree request failed");
                control.message = Some(AGREE_ERROR_MESSAGE.to_owned());
            }
        }
        true
    }

    pub fn clear_confirmation(&mut self, item_id: ItemId, token: u64) {
        if let Some(control) = self.agree.get_mut(&item_id)
            && control.confirmation_token == Some(token)
        {
            control.confirmation_token = None;
            control.message = None;
        }
    }

    /// Apply agree and confirmation events. Page events are not ours.
    pub fn handle_event(&mut self, event: ViewEvent, tx: &Sender<ViewEvent>) -> bool {
        match event {
            ViewEvent::AgreeFinished {
                request_id,
                item_id,
                result,
            } => self.complete_agree(request_id, item_id, result.map_err(|error| anyhow!(error)), tx),
            ViewEvent::ClearConfirmation { item_id, token } => {
                self.clear_confirmation(item_id, token);
                true
            }
            ViewEvent::PageFetched { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ALL_FIELDS_LABEL, FilterStrip, RowActivation, ScrollMemo, activate_row, filter_url,
        switch_view_url,
    };
    use crate::render::Renderer;
    use trinity_app::{ItemId, ViewMode};
    use url::Url;

    fn url(text: &str) -> Url {
        Url::parse(text).expect("valid url")
    }

    #[test]
    fn view_switch_keeps_field_and_drops_cursor() {
        let current = url("http://localhost/?field=Economics&paged=3&view=card&search=rate");
        assert_eq!(
            switch_view_url(&current, ViewMode::Table).as_str(),
            "http://localhost/?field=Economics&search=rate&view=table"
        );
    }

    #[test]
    fn filter_url_replaces_or_removes_field() {
        let current = url("http://localhost/?view=table&field=Economics&page=2");
        assert_eq!(
            filter_url(&current, Some("Computer Science")).as_str(),
            "http://localhost/?view=table&field=Computer+Science"
        );
        assert_eq!(
            filter_url(&current, None).as_str(),
            "http://localhost/?view=table"
        );
        assert_eq!(
            filter_url(&url("http://localhost/?field=Energy"), Some(" ")).as_str(),
            "http://localhost/"
        );
    }

    #[test]
    fn strip_has_exactly_one_active_chip() {
        let fields = vec!["Economics".to_owned(), "Energy".to_owned()];
        let mut strip = FilterStrip::new(&fields, None);
        assert_eq!(strip.chips()[0].label, ALL_FIELDS_LABEL);
        assert!(strip.chips()[0].active);

        strip.select(Some("Energy"));
        assert_eq!(strip.active(), Some("Energy"));
        assert_eq!(strip.chips().iter().filter(|chip| chip.active).count(), 1);

        let strip = FilterStrip::new(&fields, Some("Physics"));
        assert_eq!(strip.chips().len(), 4);
        assert_eq!(strip.active(), Some("Physics"));
    }

    #[test]
    fn active_chip_scrolls_into_view() {
        let fields: Vec<String> = (0..10).map(|index| format!("Field {index}")).collect();
        let mut strip =
            FilterStrip::new(&fields, Some("Field 9")).with_layout(300, vec![100; 11]);
        strip.scroll_active_into_view();
        assert_eq!(strip.scroll_offset(), 800);

        strip.select(Some("Field 0"));
        strip.scroll_active_into_view();
        assert_eq!(strip.scroll_offset(), 100);

        strip.scroll_to(5_000);
        assert_eq!(strip.scroll_offset(), 800);
    }

    #[test]
    fn memo_entries_are_single_use() {
        let mut memo = ScrollMemo::default();
        let target = url("http://localhost/?field=Energy");
        memo.save(&target, 240);
        assert_eq!(memo.take(&target), Some(240));
        assert_eq!(memo.take(&target), None);
        assert!(memo.is_empty());
    }

    #[test]
    fn rows_activate_on_click_and_confirm_keys() {
        let renderer = Renderer::default();
        let id = ItemId::new(42);
        assert_eq!(
            activate_row(&renderer, id, RowActivation::Click).as_deref(),
            Some("/detail/42")
        );
        assert_eq!(
            activate_row(&renderer, id, RowActivation::Key("Enter")).as_deref(),
            Some("/detail/42")
        );
        assert!(activate_row(&renderer, id, RowActivation::Key(" ")).is_some());
        assert_eq!(activate_row(&renderer, id, RowActivation::Key("Tab")), None);
    }
}
