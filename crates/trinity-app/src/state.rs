// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ListQuery, ViewMode, normalize_filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Exhausted,
}

/// Pagination and filter state for one listing surface. Each card grid or
/// table owns its own instance; nothing here is shared between surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPageState {
    view_mode: ViewMode,
    page_size: u32,
    current_page: u32,
    has_more: bool,
    active_filter: Option<String>,
    search: Option<String>,
    loading_in_flight: bool,
}

impl ListPageState {
    /// State for a freshly mounted surface: page 1 already rendered.
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            page_size: view_mode.page_size(),
            current_page: 1,
            has_more: false,
            active_filter: None,
            search: None,
            loading_in_flight: false,
        }
    }

    /// Overrides the page size the view would otherwise use. Only valid at
    /// mount time; there is no setter afterwards.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn resume_at(mut self, current_page: u32, has_more: bool) -> Self {
        self.current_page = current_page.max(1);
        self.has_more = has_more;
        self
    }

    pub fn with_filter(mut self, filter: Option<&str>) -> Self {
        self.active_filter = normalize_filter(filter);
        self
    }

    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = normalize_filter(search);
        self
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_filter.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn loading_in_flight(&self) -> bool {
        self.loading_in_flight
    }

    pub fn phase(&self) -> LoadPhase {
        if self.loading_in_flight {
            LoadPhase::Loading
        } else if self.has_more {
            LoadPhase::Idle
        } else {
            LoadPhase::Exhausted
        }
    }

    fn query_for(&self, page: u32) -> ListQuery {
        ListQuery {
            page,
            per_page: self.page_size,
            field: self.active_filter.clone(),
            search: self.search.clone(),
        }
    }

    /// Claim the in-flight slot for the next page. `None` while a fetch is
    /// already running or once the listing is exhausted.
    pub fn begin_load_more(&mut self) -> Option<ListQuery> {
        if self.loading_in_flight || !self.has_more {
            return None;
        }
        self.loading_in_flight = true;
        Some(self.query_for(self.current_page + 1))
    }

    /// Record a confirmed page. The in-flight slot is released separately.
    pub fn advance(&mut self, has_more: bool) {
        self.current_page += 1;
        self.has_more = has_more;
    }

    pub fn release(&mut self) {
        self.loading_in_flight = false;
    }

    /// Switch to `filter` and claim the in-flight slot for its first page.
    /// Always issues a fetch, superseding any pending load-more.
    pub fn begin_reset(&mut self, filter: Option<&str>) -> ListQuery {
        self.active_filter = normalize_filter(filter);
        self.current_page = 1;
        self.loading_in_flight = true;
        self.query_for(1)
    }

    pub fn confirm_reset(&mut self, has_more: bool) {
        self.current_page = 1;
        self.has_more = has_more;
    }
}
