// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use trinity_app::{ItemId, ViewMode};

use crate::render::Renderer;

/// Rendered markup for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub item_id: ItemId,
    pub html: String,
}

/// The rendered list region: fragments in display order plus the loader
/// and sentinel flags. Order is whatever was appended; nothing here
/// re-sorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    view: ViewMode,
    fragments: Vec<Fragment>,
    loader_visible: bool,
    sentinel_visible: bool,
}

impl Surface {
    pub fn new(view: ViewMode, fragments: Vec<Fragment>, sentinel_visible: bool) -> Self {
        Self {
            view,
            fragments,
            loader_visible: false,
            sentinel_visible,
        }
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn append(&mut self, fragments: Vec<Fragment>) {
        self.fragments.extend(fragments);
    }

    pub fn replace(&mut self, fragments: Vec<Fragment>) {
        self.fragments = fragments;
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.fragments.iter().map(|fragment| fragment.item_id).collect()
    }

    pub fn loader_visible(&self) -> bool {
        self.loader_visible
    }

    pub fn set_loader_visible(&mut self, visible: bool) {
        self.loader_visible = visible;
    }

    pub fn sentinel_visible(&self) -> bool {
        self.sentinel_visible
    }

    pub fn set_sentinel_visible(&mut self, visible: bool) {
        self.sentinel_visible = visible;
    }

    /// The list region's inner markup. An empty surface shows the
    /// empty-state message.
    pub fn html(&self, renderer: &Renderer) -> String {
        if self.fragments.is_empty() {
            return renderer.empty_state(self.view);
        }
        self.fragments
            .iter()
            .map(|fragment| fragment.html.as_str())
            .collect()
    }
}
