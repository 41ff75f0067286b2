// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_EN: &str = "Impossible Trinity";

/// The full editable record behind one catalog entry. Import rows, the
/// seed data and item edits all go through this shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub name_en: String,
    pub field: String,
    pub element1: String,
    pub element2: String,
    pub element3: String,
    pub description: String,
    pub element1_sacrifice_explanation: String,
    pub element2_sacrifice_explanation: String,
    pub element3_sacrifice_explanation: String,
    pub hyperlink: String,
    pub element1_image_url: String,
    pub element2_image_url: String,
    pub element3_image_url: String,
}

impl ItemDraft {
    pub fn new(name: &str, field: &str, elements: [&str; 3]) -> Self {
        Self {
            name: name.to_owned(),
            field: field.to_owned(),
            element1: elements[0].to_owned(),
            element2: elements[1].to_owned(),
            element3: elements[2].to_owned(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("item name is required -- enter a name and retry");
        }
        for (index, element) in [&self.element1, &self.element2, &self.element3]
            .into_iter()
            .enumerate()
        {
            if element.trim().is_empty() {
                bail!(
                    "element {} is required -- every trinity needs all three elements",
                    index + 1
                );
            }
        }
        if !self.hyperlink.trim().is_empty() && !looks_like_http_url(&self.hyperlink) {
            bail!("reference link must start with http:// or https://");
        }
        Ok(())
    }

    /// English subtitle, falling back to the catalog's generic name.
    pub fn name_en_or_default(&self) -> &str {
        let trimmed = self.name_en.trim();
        if trimmed.is_empty() {
            DEFAULT_NAME_EN
        } else {
            trimmed
        }
    }
}

fn looks_like_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}
