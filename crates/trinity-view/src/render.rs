// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Markup for list surfaces and the detail page.
//!
//! Rendering is a pure function of its inputs: one item maps to one
//! fragment, and a page of items maps to fragments in the order given.
//! Nothing here sorts, filters or deduplicates.

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::macros::format_description;
use trinity_app::{Comment, FilterStrategy, Item, ItemDetail, ItemId, ViewMode};
use url::Url;

use crate::actions::{FilterStrip, filter_url, switch_view_url};
use crate::scaffold::{LIST_CONTAINER_ID, LOADER_ID, SENTINEL_ID, Scaffold};
use crate::surface::Fragment;

pub const DEFAULT_DESCRIPTION_BUDGET: usize = 100;
pub const ELLIPSIS: &str = "...";
pub const EMPTY_STATE: &str = "No impossible trinities found.";
pub const CTA_LABEL: &str = "View Details →";

const TABLE_HEADINGS: [&str; 8] = [
    "Name", "Field", "Element 1", "Element 2", "Element 3", "Agree", "Comments", "Date",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    description_budget: usize,
    detail_base: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTION_BUDGET)
    }
}

impl Renderer {
    pub fn new(description_budget: usize) -> Self {
        Self {
            description_budget,
            detail_base: "/detail".to_owned(),
        }
    }

    pub fn with_detail_base(mut self, base: &str) -> Self {
        self.detail_base = base.trim_end_matches('/').to_owned();
        self
    }

    pub fn description_budget(&self) -> usize {
        self.description_budget
    }

    pub fn detail_url(&self, item_id: ItemId) -> String {
        format!("{}/{item_id}", self.detail_base)
    }

    /// Keep the first `description_budget` characters and mark the cut.
    /// Text at or under the budget comes back unchanged.
    pub fn truncate_description(&self, text: &str) -> String {
        let mut chars = text.chars();
        let kept: String = chars.by_ref().take(self.description_budget).collect();
        if chars.next().is_some() {
            format!("{kept}{ELLIPSIS}")
        } else {
            kept
        }
    }

    pub fn fragment(&self, view: ViewMode, item: &Item) -> Fragment {
        let html = match view {
            ViewMode::Card => self.card(item),
            ViewMode::Table => self.table_row(item),
        };
        Fragment {
            item_id: item.id,
            html,
        }
    }

    pub fn fragments(&self, view: ViewMode, items: &[Item]) -> Vec<Fragment> {
        items.iter().map(|item| self.fragment(view, item)).collect()
    }

    pub fn card(&self, item: &Item) -> String {
        let href = escape_html(&self.detail_url(item.id));
        let mut html = String::new();
        let _ = write!(
            html,
            r#"<article class="it-card" data-id="{id}"><h3 class="it-card-title"><a href="{href}">{name}</a></h3>"#,
            id = item.id,
            name = escape_html(&item.name),
        );
        if let Some(field) = &item.field {
            let _ = write!(
                html,
                r#"<span class="it-card-field">{}</span>"#,
                escape_html(field)
            );
        }

        html.push_str(r#"<ul class="it-elements">"#);
        for element in item.elements() {
            match element.explanation {
                Some(explanation) => {
                    let _ = write!(
                        html,
                        r#"<li class="it-element has-tip" title="{tip}">{label}<span class="it-element-tip">If unmet: {explanation}</span></li>"#,
                        tip = escape_html(&format!("{} if unmet: {explanation}", element.label)),
                        label = escape_html(element.label),
                        explanation = escape_html(explanation),
                    );
                }
                None => {
                    let _ = write!(
                        html,
                        r#"<li class="it-element">{}</li>"#,
                        escape_html(element.label)
                    );
                }
            }
        }
        html.push_str("</ul>");

        let _ = write!(
            html,
            r#"<p class="it-card-description">{description}</p><footer class="it-card-meta"><span class="it-agree-count" data-id="{id}">{agree}</span><span class="it-comment-count">{comments}</span></footer><a class="it-card-cta" href="{href}">{cta}</a></article>"#,
            description = escape_html(&self.truncate_description(item.description_text())),
            id = item.id,
            agree = item.agree_count,
            comments = item.comments_count,
            cta = escape_html(CTA_LABEL),
        );
        html
    }

    /// A keyboard-focusable row; `data-href` is the activation target.
    pub fn table_row(&self, item: &Item) -> String {
        let href = escape_html(&self.detail_url(item.id));
        format!(
            concat!(
                r#"<tr class="it-row" data-id="{id}" data-href="{href}" tabindex="0" role="link">"#,
                r#"<td class="it-col-name"><a href="{href}">{name}</a></td>"#,
                r#"<td class="it-col-field">{field}</td>"#,
                r#"<td class="it-col-element">{e1}</td>"#,
                r#"<td class="it-col-element">{e2}</td>"#,
                r#"<td class="it-col-element">{e3}</td>"#,
                r#"<td class="it-col-agree">{agree}</td>"#,
                r#"<td class="it-col-comments">{comments}</td>"#,
                r#"<td class="it-col-date">{date}</td>"#,
                "</tr>"
            ),
            id = item.id,
            href = href,
            name = escape_html(&item.name),
            field = escape_html(item.field_label()),
            e1 = escape_html(&item.element1),
            e2 = escape_html(&item.element2),
            e3 = escape_html(&item.element3),
            agree = item.agree_count,
            comments = item.comments_count,
            date = format_date(item.created_at),
        )
    }

    pub fn empty_state(&self, view: ViewMode) -> String {
        match view {
            ViewMode::Card => format!(r#"<p class="it-empty">{EMPTY_STATE}</p>"#),
            ViewMode::Table => format!(
                r#"<tr class="it-empty"><td colspan="{}">{EMPTY_STATE}</td></tr>"#,
                TABLE_HEADINGS.len()
            ),
        }
    }

    /// The server-rendered listing: view switch, filter chips, the list
    /// container carrying the scaffold attributes, loader and sentinel.
    pub fn listing_page(&self, page: &ListingPage<'_>) -> String {
        let scaffold = page.scaffold;
        let mut body = String::new();

        body.push_str(r#"<nav class="it-view-switch">"#);
        for view in ViewMode::ALL {
            let class = if view == scaffold.view {
                "it-view-link active"
            } else {
                "it-view-link"
            };
            let _ = write!(
                body,
                r#"<a class="{class}" data-view="{view}" href="{href}">{label}</a>"#,
                view = view.as_str(),
                href = escape_html(switch_view_url(page.current_url, view).as_str()),
                label = view.label(),
            );
        }
        body.push_str("</nav>");

        let _ = write!(
            body,
            r#"<nav class="it-field-strip" data-strategy="{}">"#,
            page.strategy.as_str()
        );
        let strip = FilterStrip::new(page.fields, scaffold.field.as_deref());
        for chip in strip.chips() {
            let class = if chip.active {
                "field-chip active"
            } else {
                "field-chip"
            };
            let _ = write!(
                body,
                r#"<a class="{class}" data-field="{data}" href="{href}">{label}</a>"#,
                data = escape_html(chip.field.as_deref().unwrap_or_default()),
                href = escape_html(filter_url(page.current_url, chip.field.as_deref()).as_str()),
                label = escape_html(&chip.label),
            );
        }
        body.push_str("</nav>");

        let attributes = scaffold.render_attributes();
        let rendered = if page.items.is_empty() {
            self.empty_state(scaffold.view)
        } else {
            self.fragments(scaffold.view, page.items)
                .into_iter()
                .map(|fragment| fragment.html)
                .collect()
        };
        match scaffold.view {
            ViewMode::Card => {
                let _ = write!(
                    body,
                    r#"<div id="{LIST_CONTAINER_ID}" class="it-grid"{attributes}>{rendered}</div>"#
                );
            }
            ViewMode::Table => {
                let headings: String = TABLE_HEADINGS
                    .iter()
                    .map(|heading| format!("<th>{heading}</th>"))
                    .collect();
                let _ = write!(
                    body,
                    r#"<table class="it-table"><thead><tr>{headings}</tr></thead><tbody id="{LIST_CONTAINER_ID}"{attributes}>{rendered}</tbody></table>"#
                );
            }
        }

        let _ = write!(
            body,
            r#"<div id="{LOADER_ID}" class="it-loader" hidden>Loading...</div><div id="{SENTINEL_ID}"{hidden}></div>"#,
            hidden = if scaffold.has_more { "" } else { " hidden" },
        );

        layout("Impossible Trinities", &body)
    }

    /// `viewer_agreed` marks the agree control for a viewer who already
    /// agreed; the server still refuses repeats.
    pub fn detail_page(&self, detail: &ItemDetail, comments: &[Comment], viewer_agreed: bool) -> String {
        let item = &detail.item;
        let mut body = String::new();
        let _ = write!(
            body,
            r#"<article class="it-detail" data-id="{id}"><h1>{name}</h1><p class="it-subtitle">{name_en}</p><p class="it-meta">"#,
            id = item.id,
            name = escape_html(&item.name),
            name_en = escape_html(&detail.name_en),
        );
        if let Some(field) = &item.field {
            let _ = write!(body, r#"<span class="it-field">{}</span>"#, escape_html(field));
        }
        if let Some(author) = &detail.author {
            let _ = write!(body, r#"<span class="it-author">{}</span>"#, escape_html(author));
        }
        let _ = write!(
            body,
            r#"<time datetime="{date}">{date}</time></p><div class="it-detail-elements">"#,
            date = format_date(item.created_at),
        );

        for (element, image) in item.elements().iter().zip(&detail.element_image_urls) {
            body.push_str(r#"<section class="it-detail-element">"#);
            if let Some(image) = image {
                let _ = write!(
                    body,
                    r#"<img src="{}" alt="{}">"#,
                    escape_html(image),
                    escape_html(element.label)
                );
            }
            let _ = write!(body, "<h2>{}</h2>", escape_html(element.label));
            if let Some(explanation) = element.explanation {
                let _ = write!(
                    body,
                    r#"<p class="it-sacrifice">If unmet: {}</p>"#,
                    escape_html(explanation)
                );
            }
            body.push_str("</section>");
        }
        body.push_str("</div>");

        if !item.description_text().is_empty() {
            let _ = write!(
                body,
                r#"<div class="it-description">{}</div>"#,
                escape_html(item.description_text())
            );
        }
        if let Some(link) = &detail.hyperlink {
            let _ = write!(
                body,
                r#"<p class="it-reference"><a href="{link}" rel="noopener" target="_blank">Reference</a></p>"#,
                link = escape_html(link),
            );
        }
        let _ = write!(
            body,
            r#"<button class="{class}" data-id="{id}" data-endpoint="/api/agree/{id}">Agree (<span class="it-agree-count" data-id="{id}">{count}</span>)</button>"#,
            class = if viewer_agreed { "it-agree agreed" } else { "it-agree" },
            id = item.id,
            count = item.agree_count,
        );

        let _ = write!(
            body,
            r#"<section class="it-comments"><h2>Comments ({})</h2><ol>"#,
            comments.len()
        );
        for comment in comments {
            let _ = write!(
                body,
                r#"<li class="it-comment" data-delete="/api/comment/{id}/delete"><span class="it-comment-author">{author}</span><time>{date}</time><p>{content}</p></li>"#,
                id = comment.id,
                author = escape_html(&comment.author),
                date = format_date(comment.created_at),
                content = escape_html(&comment.content),
            );
        }
        let _ = write!(
            body,
            r#"</ol><form class="it-comment-form" data-endpoint="/api/comment/{}"><textarea name="content"></textarea><button type="submit">Post</button></form></section></article>"#,
            item.id
        );

        layout(&item.name, &body)
    }
}

/// Inputs for [`Renderer::listing_page`].
#[derive(Debug, Clone, Copy)]
pub struct ListingPage<'a> {
    pub scaffold: &'a Scaffold,
    pub fields: &'a [String],
    pub items: &'a [Item],
    pub current_url: &'a Url,
    pub strategy: FilterStrategy,
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html><html lang="en"><head><meta charset="utf-8"><title>{}</title></head><body>{body}</body></html>"#,
        escape_html(title)
    )
}

pub fn format_date(value: OffsetDateTime) -> String {
    value
        .date()
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
