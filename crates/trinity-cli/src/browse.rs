// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::io::Write;

use anyhow::{Context, Result, bail};
use trinity_app::{ListQuery, ViewMode, normalize_filter};
use trinity_view::{CatalogRuntime, ListController, LoadOutcome, Renderer, Scaffold};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseOptions {
    pub view: Option<ViewMode>,
    pub field: Option<String>,
    pub search: Option<String>,
    pub pages: u32,
    /// Fetch from a running server instead of the local store.
    pub remote: bool,
    /// Overrides `[client].base_url`; implies `remote`.
    pub base_url: Option<String>,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            view: None,
            field: None,
            search: None,
            pages: 1,
            remote: false,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseSummary {
    pub pages: u32,
    pub items: usize,
    pub has_more: bool,
}

/// Render page 1, then scroll to the end up to `pages - 1` times, writing
/// each fragment as it lands.
pub fn browse<R: CatalogRuntime, W: Write>(
    runtime: &mut R,
    renderer: Renderer,
    view: ViewMode,
    trigger_margin: u32,
    options: &BrowseOptions,
    out: &mut W,
) -> Result<BrowseSummary> {
    let query = ListQuery {
        field: normalize_filter(options.field.as_deref()),
        search: normalize_filter(options.search.as_deref()),
        ..ListQuery::first_page(view)
    };
    let first = runtime
        .fetch_page(&query)
        .context("load first page -- check the store or the remote server")?;
    let rendered = renderer.fragments(view, &first.items);
    for fragment in &rendered {
        writeln!(out, "{}", fragment.html).context("write fragment")?;
    }

    let scaffold = Scaffold::for_query(view, &query, first.has_more);
    let mut controller = ListController::initialize(scaffold, rendered, renderer, trigger_margin);

    while controller.state().current_page() < options.pages {
        // The sentinel sits below the margin after each append; scroll it in.
        controller.on_proximity(i64::from(trigger_margin) + 1);
        let Some(request) = controller.on_proximity(0) else {
            break;
        };
        match controller.drive(request, runtime) {
            LoadOutcome::Appended { count, .. } => {
                let fragments = controller.surface().fragments();
                for fragment in &fragments[fragments.len() - count..] {
                    writeln!(out, "{}", fragment.html).context("write fragment")?;
                }
            }
            LoadOutcome::Failed { error, .. } => {
                bail!(
                    "load page {}: {error} -- rerun to retry",
                    controller.state().current_page() + 1
                );
            }
            LoadOutcome::Replaced { .. } | LoadOutcome::Stale | LoadOutcome::Superseded(_) => {
                break;
            }
        }
    }

    Ok(BrowseSummary {
        pages: controller.state().current_page(),
        items: controller.surface().len(),
        has_more: controller.state().has_more(),
    })
}
