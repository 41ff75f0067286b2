// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use trinity_app::{ListPageState, ListQuery, ViewMode, normalize_filter};

use crate::render::escape_html;

pub const LIST_CONTAINER_ID: &str = "it-list";
pub const LOADER_ID: &str = "it-loader";
pub const SENTINEL_ID: &str = "it-sentinel";

/// Listing state handed from the server render to the client controller
/// through attributes on the list container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    pub view: ViewMode,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
    pub field: Option<String>,
    pub search: Option<String>,
}

impl Scaffold {
    pub fn new(view: ViewMode) -> Self {
        Self {
            view,
            page: 1,
            per_page: view.page_size(),
            has_more: false,
            field: None,
            search: None,
        }
    }

    /// The scaffold for a server render of `query` under `view`.
    pub fn for_query(view: ViewMode, query: &ListQuery, has_more: bool) -> Self {
        Self {
            view,
            page: query.page.max(1),
            per_page: query.per_page.max(1),
            has_more,
            field: normalize_filter(query.field.as_deref()),
            search: normalize_filter(query.search.as_deref()),
        }
    }

    pub fn from_state(state: &ListPageState) -> Self {
        Self {
            view: state.view_mode(),
            page: state.current_page(),
            per_page: state.page_size(),
            has_more: state.has_more(),
            field: state.active_filter().map(str::to_owned),
            search: state.search().map(str::to_owned),
        }
    }

    pub fn into_state(self) -> ListPageState {
        ListPageState::new(self.view)
            .with_page_size(self.per_page)
            .resume_at(self.page, self.has_more)
            .with_filter(self.field.as_deref())
            .with_search(self.search.as_deref())
    }

    /// Attribute text for the list container, with a leading space.
    pub fn render_attributes(&self) -> String {
        let mut attributes = format!(
            r#" data-view="{}" data-page="{}" data-per-page="{}" data-has-more="{}""#,
            self.view.as_str(),
            self.page,
            self.per_page,
            self.has_more,
        );
        if let Some(field) = &self.field {
            attributes.push_str(&format!(r#" data-field="{}""#, escape_html(field)));
        }
        if let Some(search) = &self.search {
            attributes.push_str(&format!(r#" data-search="{}""#, escape_html(search)));
        }
        attributes
    }

    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut view = None;
        let mut page = None;
        let mut per_page = None;
        let mut has_more = false;
        let mut field = None;
        let mut search = None;

        for (name, value) in attributes {
            match name {
                "data-view" => {
                    view = Some(
                        ViewMode::parse(value)
                            .ok_or_else(|| anyhow!("unknown view {value:?} on list container"))?,
                    );
                }
                "data-page" => {
                    page = Some(parse_page_number(name, value)?);
                }
                "data-per-page" => {
                    per_page = Some(parse_page_number(name, value)?);
                }
                "data-has-more" => {
                    has_more = match value {
                        "true" => true,
                        "false" => false,
                        other => bail!("data-has-more must be true or false, got {other:?}"),
                    };
                }
                "data-field" => field = normalize_filter(Some(value)),
                "data-search" => search = normalize_filter(Some(value)),
                _ => {}
            }
        }

        let view = view.context("list container is missing data-view")?;
        Ok(Self {
            view,
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or_else(|| view.page_size()),
            has_more,
            field,
            search,
        })
    }

    /// Find the list container in a rendered page and read its scaffold.
    pub fn parse_html(html: &str) -> Result<Self> {
        let marker = format!(r#"id="{LIST_CONTAINER_ID}""#);
        let at = html
            .find(&marker)
            .with_context(|| format!("no #{LIST_CONTAINER_ID} container in page"))?;
        let start = html[..at]
            .rfind('<')
            .context("list container has no opening tag")?;
        let end = at
            + html[at..]
                .find('>')
                .context("list container tag is not closed")?;

        let attributes = parse_attributes(&html[start + 1..end]);
        Self::from_attributes(
            attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}

fn parse_page_number(name: &str, value: &str) -> Result<u32> {
    let number: u32 = value
        .parse()
        .with_context(|| format!("{name} must be a positive integer, got {value:?}"))?;
    if number == 0 {
        bail!("{name} must be at least 1");
    }
    Ok(number)
}

/// `name="value"` pairs from the inside of a start tag. The tag name and
/// bare attributes are skipped.
fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = tag;
    while let Some(eq) = rest.find("=\"") {
        let name = rest[..eq]
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default()
            .to_owned();
        let after = &rest[eq + 2..];
        let Some(close) = after.find('"') else {
            break;
        };
        attributes.push((name, unescape_html(&after[..close])));
        rest = &after[close + 1..];
    }
    attributes
}

fn unescape_html(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::Scaffold;
    use trinity_app::{ListQuery, ViewMode};

    #[test]
    fn attributes_survive_a_render() {
        let scaffold = Scaffold {
            view: ViewMode::Table,
            page: 3,
            per_page: 20,
            has_more: true,
            field: Some("R&D \"labs\"".to_owned()),
            search: None,
        };
        let html = format!(
            r#"<table><tbody id="it-list" class="rows"{}></tbody></table>"#,
            scaffold.render_attributes()
        );
        assert_eq!(Scaffold::parse_html(&html).expect("parse scaffold"), scaffold);
    }

    #[test]
    fn missing_view_is_an_error() {
        let error = Scaffold::from_attributes([("data-page", "1")])
            .expect_err("view is required");
        assert!(error.to_string().contains("data-view"));
    }

    #[test]
    fn defaults_follow_the_view() {
        let scaffold = Scaffold::from_attributes([("data-view", "card")]).expect("parse");
        assert_eq!(scaffold.page, 1);
        assert_eq!(scaffold.per_page, 12);
        assert!(!scaffold.has_more);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(Scaffold::from_attributes([("data-view", "card"), ("data-page", "0")]).is_err());
        assert!(
            Scaffold::from_attributes([("data-view", "card"), ("data-per-page", "x")]).is_err()
        );
        assert!(
            Scaffold::from_attributes([("data-view", "card"), ("data-has-more", "yes")]).is_err()
        );
    }

    #[test]
    fn state_round_trip_keeps_filter() {
        let query = ListQuery {
            page: 2,
            per_page: 12,
            field: Some(" Economics ".to_owned()),
            search: Some(String::new()),
        };
        let scaffold = Scaffold::for_query(ViewMode::Card, &query, true);
        assert_eq!(scaffold.field.as_deref(), Some("Economics"));
        assert_eq!(scaffold.search, None);

        let state = scaffold.clone().into_state();
        assert_eq!(state.current_page(), 2);
        assert!(state.has_more());
        assert_eq!(Scaffold::from_state(&state), scaffold);
    }

    #[test]
    fn page_without_container_is_an_error() {
        assert!(Scaffold::parse_html("<div></div>").is_err());
    }
}
