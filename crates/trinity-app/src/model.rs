// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

/// Upper bound on the page size a list query may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Card,
    Table,
}

impl ViewMode {
    pub const ALL: [Self; 2] = [Self::Card, Self::Table];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Table => "table",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "card" => Some(Self::Card),
            "table" => Some(Self::Table),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card View",
            Self::Table => "Table View",
        }
    }

    /// Items per page for this view. Fixed for the lifetime of a listing.
    pub const fn page_size(self) -> u32 {
        match self {
            Self::Card => 12,
            Self::Table => 20,
        }
    }
}

/// How a field-filter selection is applied to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStrategy {
    /// Rewrite the URL and reload the page.
    #[default]
    Navigate,
    /// Refetch page 1 under the new filter and replace the rendered set.
    InPlace,
}

impl FilterStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::InPlace => "in_place",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "navigate" => Some(Self::Navigate),
            "in_place" | "in-place" => Some(Self::InPlace),
            _ => None,
        }
    }
}

/// Blank filter and search inputs mean "none".
pub fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// One catalog entry as it appears on a list surface and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub field: Option<String>,
    pub element1: String,
    pub element2: String,
    pub element3: String,
    #[serde(default)]
    pub element1_sacrifice_explanation: Option<String>,
    #[serde(default)]
    pub element2_sacrifice_explanation: Option<String>,
    #[serde(default)]
    pub element3_sacrifice_explanation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub agree_count: u64,
    pub comments_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An element label paired with what is lost when it cannot be met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRef<'a> {
    pub label: &'a str,
    pub explanation: Option<&'a str>,
}

impl Item {
    pub fn elements(&self) -> [ElementRef<'_>; 3] {
        [
            element_ref(&self.element1, &self.element1_sacrifice_explanation),
            element_ref(&self.element2, &self.element2_sacrifice_explanation),
            element_ref(&self.element3, &self.element3_sacrifice_explanation),
        ]
    }

    pub fn field_label(&self) -> &str {
        self.field.as_deref().unwrap_or_default()
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

fn element_ref<'a>(label: &'a str, explanation: &'a Option<String>) -> ElementRef<'a> {
    ElementRef {
        label,
        explanation: explanation
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty()),
    }
}

/// Extended record shown on the per-item detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: Item,
    pub name_en: String,
    pub hyperlink: Option<String>,
    pub element_image_urls: [Option<String>; 3],
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub item_id: ItemId,
    pub author: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Parameters of one list-query request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListQuery {
    pub fn first_page(view: ViewMode) -> Self {
        Self {
            page: 1,
            per_page: view.page_size(),
            field: None,
            search: None,
        }
    }

    /// Build a query from `key=value` pairs, ignoring unknown keys and
    /// falling back to page 1 of the card view for missing or bad numbers.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::first_page(ViewMode::Card);
        for (key, value) in pairs {
            match key {
                "page" | "paged" => query.page = value.parse().unwrap_or(1),
                "per_page" => query.per_page = value.parse().unwrap_or(query.per_page),
                "field" => query.field = normalize_filter(Some(value)),
                "search" | "s" => query.search = normalize_filter(Some(value)),
                _ => {}
            }
        }
        query.clamped()
    }

    /// Page at least 1, page size within `1..=MAX_PAGE_SIZE`.
    pub fn clamped(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = self.per_page.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// One page of list-query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub items: Vec<Item>,
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<u32>,
}

impl PageResponse {
    pub fn new(items: Vec<Item>, page: u32, has_more: bool) -> Self {
        Self {
            items,
            has_more,
            next_page: has_more.then_some(page + 1),
        }
    }
}

pub const AGREE_SUCCESS_MESSAGE: &str = "Thanks for your agreement!";

/// Why the server refused an agree request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreeRejection {
    NotLoggedIn,
    InvalidId,
    NotFound,
    AlreadyAgreed,
}

impl AgreeRejection {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "You must be logged in to agree.",
            Self::InvalidId => "Invalid item ID.",
            Self::NotFound => "Item not found.",
            Self::AlreadyAgreed => "You have already agreed to this.",
        }
    }

    pub fn from_message(message: &str) -> Option<Self> {
        [
            Self::NotLoggedIn,
            Self::InvalidId,
            Self::NotFound,
            Self::AlreadyAgreed,
        ]
        .into_iter()
        .find(|rejection| rejection.message() == message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgreeOutcome {
    Agreed {
        count: u64,
        message: String,
    },
    Rejected {
        reason: Option<AgreeRejection>,
        message: String,
    },
}

impl AgreeOutcome {
    pub fn agreed(count: u64) -> Self {
        Self::Agreed {
            count,
            message: AGREE_SUCCESS_MESSAGE.to_owned(),
        }
    }

    pub fn rejected(reason: AgreeRejection) -> Self {
        Self::Rejected {
            reason: Some(reason),
            message: reason.message().to_owned(),
        }
    }
}

/// Wire shape of the agree endpoint's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&AgreeOutcome> for AgreeResponse {
    fn from(outcome: &AgreeOutcome) -> Self {
        match outcome {
            AgreeOutcome::Agreed { count, message } => Self {
                success: true,
                count: Some(*count),
                message: Some(message.clone()),
            },
            AgreeOutcome::Rejected { message, .. } => Self {
                success: false,
                count: None,
                message: Some(message.clone()),
            },
        }
    }
}

impl AgreeResponse {
    /// Interpret the reply. A success without a count is malformed.
    pub fn into_outcome(self) -> Option<AgreeOutcome> {
        if self.success {
            let count = self.count?;
            return Some(AgreeOutcome::Agreed {
                count,
                message: self
                    .message
                    .unwrap_or_else(|| AGREE_SUCCESS_MESSAGE.to_owned()),
            });
        }
        let message = self.message.filter(|message| !message.trim().is_empty())?;
        Some(AgreeOutcome::Rejected {
            reason: AgreeRejection::from_message(&message),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgreeOutcome, AgreeRejection, AgreeResponse, Item, ItemId, ListQuery, MAX_PAGE_SIZE,
        PageResponse, ViewMode,
    };
    use time::macros::datetime;

    fn sample_item() -> Item {
        Item {
            id: ItemId::new(3),
            name: "Mundell-Fleming Trilemma".to_owned(),
            field: Some("Economics".to_owned()),
            element1: "Fixed exchange rate".to_owned(),
            element2: "Free capital movement".to_owned(),
            element3: "Independent monetary policy".to_owned(),
            element1_sacrifice_explanation: Some("  ".to_owned()),
            element2_sacrifice_explanation: None,
            element3_sacrifice_explanation: Some("Rates follow the anchor".to_owned()),
            description: None,
            agree_count: 4,
            comments_count: 1,
            created_at: datetime!(2026-01-09 10:00 UTC),
        }
    }

    #[test]
    fn page_size_is_fixed_per_view() {
        assert_eq!(ViewMode::Card.page_size(), 12);
        assert_eq!(ViewMode::Table.page_size(), 20);
        assert_eq!(ViewMode::parse("table"), Some(ViewMode::Table));
        assert_eq!(ViewMode::parse("grid"), None);
    }

    #[test]
    fn blank_explanations_are_absent() {
        let item = sample_item();
        let elements = item.elements();
        assert_eq!(elements[0].explanation, None);
        assert_eq!(elements[1].explanation, None);
        assert_eq!(elements[2].explanation, Some("Rates follow the anchor"));
        assert_eq!(elements[2].label, "Independent monetary policy");
    }

    #[test]
    fn item_wire_format_uses_flat_fields() {
        let item = sample_item();
        let json = serde_json::to_value(&item).expect("serialize item");
        assert_eq!(json["id"], 3);
        assert_eq!(json["created_at"], "2026-01-09T10:00:00Z");
        assert!(json["description"].is_null());

        let back: Item = serde_json::from_value(json).expect("parse item");
        assert_eq!(back, item);
    }

    #[test]
    fn query_pairs_are_clamped_and_normalized() {
        let query = ListQuery::from_pairs([
            ("page", "0"),
            ("per_page", "5000"),
            ("field", "  "),
            ("search", "cap"),
            ("view", "table"),
        ]);
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PAGE_SIZE);
        assert_eq!(query.field, None);
        assert_eq!(query.search.as_deref(), Some("cap"));
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn next_page_follows_has_more() {
        assert_eq!(PageResponse::new(Vec::new(), 2, true).next_page, Some(3));
        assert_eq!(PageResponse::new(Vec::new(), 2, false).next_page, None);
    }

    #[test]
    fn agree_reply_maps_known_rejections() {
        let reply = AgreeResponse {
            success: false,
            count: None,
            message: Some("You have already agreed to this.".to_owned()),
        };
        assert_eq!(
            reply.into_outcome(),
            Some(AgreeOutcome::rejected(AgreeRejection::AlreadyAgreed))
        );
    }

    #[test]
    fn agree_success_without_count_is_malformed() {
        let reply = AgreeResponse {
            success: true,
            count: None,
            message: None,
        };
        assert_eq!(reply.into_outcome(), None);

        let silent_failure = AgreeResponse {
            success: false,
            count: None,
            message: None,
        };
        assert_eq!(silent_failure.into_outcome(), None);
    }
}
