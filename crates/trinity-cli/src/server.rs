// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The standalone catalog site: server-rendered listing and detail pages
//! plus the JSON list-query, field, agree and comment endpoints.

use std::io::Read as _;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method};
use tracing::{debug, info, warn};
use trinity_app::{
    AgreeOutcome, AgreeRejection, AgreeResponse, CommentId, FilterStrategy, ItemId, ListQuery,
    User, ViewMode,
};
use trinity_client::USER_HEADER;
use trinity_db::Store;
use trinity_view::{ListingPage, Renderer, Scaffold};
use url::Url;

use crate::manage::{self, Refusal};

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: HTML,
            body,
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        Ok(Self {
            status,
            content_type: JSON,
            body: serde_json::to_string(value).context("encode JSON response")?,
        })
    }

    fn json_error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: JSON,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    fn refused(refusal: Refusal) -> Self {
        Self::json_error(refusal.status(), refusal.message())
    }
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Listing,
    Page,
    Fields,
    Agree,
    Comment,
    DeleteComment,
    Detail,
}

impl Route {
    fn method(self) -> Method {
        match self {
            Self::Agree | Self::Comment | Self::DeleteComment => Method::Post,
            _ => Method::Get,
        }
    }

    fn is_api(self) -> bool {
        !matches!(self, Self::Listing | Self::Detail)
    }
}

pub struct Site<'a> {
    store: &'a Store,
    renderer: Renderer,
    default_view: ViewMode,
    strategy: FilterStrategy,
    origin: Url,
}

impl<'a> Site<'a> {
    pub fn new(store: &'a Store, renderer: Renderer, default_view: ViewMode, addr: &str) -> Result<Self> {
        let origin = Url::parse(&format!("http://{addr}/"))
            .with_context(|| format!("build site origin from {addr:?}"))?;
        Ok(Self {
            store,
            renderer,
            default_view,
            strategy: FilterStrategy::default(),
            origin,
        })
    }

    pub fn with_filter_strategy(mut self, strategy: FilterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn handle(&self, method: &Method, raw_url: &str, user: Option<&str>) -> Reply {
        self.handle_with_body(method, raw_url, user, "")
    }

    /// Answer one request. Store failures become 500 replies; nothing here
    /// returns an error.
    pub fn handle_with_body(
        &self,
        method: &Method,
        raw_url: &str,
        user: Option<&str>,
        body: &str,
    ) -> Reply {
        let url = match self.origin.join(raw_url) {
            Ok(url) => url,
            Err(error) => return Reply::json_error(400, &format!("bad request URL: {error}")),
        };
        let Some((route, id)) = route(url.path()) else {
            return Reply::html(404, self.not_found_page());
        };
        if *method != route.method() {
            return Reply::json_error(405, &format!("{method} not allowed on {}", url.path()));
        }

        let result = match route {
            Route::Listing => self.listing(&url),
            Route::Page => self.page(&url),
            Route::Fields => self
                .store
                .list_fields()
                .and_then(|fields| Reply::json(200, &fields)),
            Route::Agree => self.agree(id, user),
            Route::Comment => self.comment(id, user, body),
            Route::DeleteComment => self.delete_comment(id, user),
            Route::Detail => self.detail(id, user),
        };
        result.unwrap_or_else(|error| {
            warn!(path = url.path(), error = %format!("{error:#}"), "request failed");
            if route.is_api() {
                Reply::json_error(500, &format!("{error:#}"))
            } else {
                Reply::html(500, "<!doctype html><h1>Something went wrong.</h1>".to_owned())
            }
        })
    }

    fn listing(&self, url: &Url) -> Result<Reply> {
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let view = pairs
            .iter()
            .find(|(key, _)| key == "view")
            .and_then(|(_, value)| ViewMode::parse(value))
            .unwrap_or(self.default_view);
        let query = ListQuery {
            per_page: view.page_size(),
            ..ListQuery::from_pairs(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
        };

        let page = self.store.list_page(&query)?;
        let fields = self.store.list_fields()?;
        let scaffold = Scaffold::for_query(view, &query, page.has_more);
        Ok(Reply::html(
            200,
            self.renderer.listing_page(&ListingPage {
                scaffold: &scaffold,
                fields: &fields,
                items: &page.items,
                current_url: url,
                strategy: self.strategy,
            }),
        ))
    }

    fn page(&self, url: &Url) -> Result<Reply> {
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let query = ListQuery::from_pairs(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())));
        let page = self.store.list_page(&query)?;
        debug!(
            page = query.page,
            field = ?query.field,
            count = page.items.len(),
            has_more = page.has_more,
            "list query"
        );
        Reply::json(200, &page)
    }

    /// An unknown or blank user header reads as not logged in.
    fn viewer(&self, user: Option<&str>) -> Result<Option<User>> {
        match user.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => self.store.find_user(name),
            None => Ok(None),
        }
    }

    fn agree(&self, raw_id: Option<&str>, user: Option<&str>) -> Result<Reply> {
        let outcome = match raw_id.and_then(|raw| raw.parse::<i64>().ok()) {
            None => AgreeOutcome::rejected(AgreeRejection::InvalidId),
            Some(raw_id) => {
                let user = self.viewer(user)?.map(|user| user.id);
                self.store.agree(user, raw_id)?
            }
        };

        let status = match &outcome {
            AgreeOutcome::Agreed { .. } => 200,
            AgreeOutcome::Rejected { reason, .. } => match reason {
                Some(AgreeRejection::NotLoggedIn) => 401,
                Some(AgreeRejection::InvalidId) => 400,
                Some(AgreeRejection::NotFound) => 404,
                Some(AgreeRejection::AlreadyAgreed) => 409,
                None => 400,
            },
        };
        Reply::json(status, &AgreeResponse::from(&outcome))
    }

    fn comment(&self, raw_id: Option<&str>, user: Option<&str>, body: &str) -> Result<Reply> {
        let Some(item_id) = parse_id(raw_id).map(ItemId::new) else {
            return Ok(Reply::json_error(400, "Invalid item ID."));
        };
        let form: CommentForm = match serde_json::from_str(body) {
            Ok(form) => form,
            Err(error) => return Ok(Reply::json_error(400, &format!("bad comment body: {error}"))),
        };
        let viewer = self.viewer(user)?;
        match manage::add_comment(self.store, viewer.as_ref(), item_id, &form.content)? {
            Ok(comment_id) => {
                debug!(%item_id, %comment_id, "comment posted");
                Reply::json(201, &serde_json::json!({ "id": comment_id }))
            }
            Err(refusal) => Ok(Reply::refused(refusal)),
        }
    }

    fn delete_comment(&self, raw_id: Option<&str>, user: Option<&str>) -> Result<Reply> {
        let Some(comment_id) = parse_id(raw_id).map(CommentId::new) else {
            return Ok(Reply::json_error(400, "Invalid comment ID."));
        };
        let viewer = self.viewer(user)?;
        match manage::delete_comment(self.store, viewer.as_ref(), comment_id)? {
            Ok(item_id) => Reply::json(200, &serde_json::json!({ "item_id": item_id })),
            Err(refusal) => Ok(Reply::refused(refusal)),
        }
    }

    fn detail(&self, raw_id: Option<&str>, user: Option<&str>) -> Result<Reply> {
        let Some(item_id) = parse_id(raw_id).map(ItemId::new) else {
            return Ok(Reply::html(404, self.not_found_page()));
        };
        let Some(detail) = self.store.item_detail(item_id)? else {
            return Ok(Reply::html(404, self.not_found_page()));
        };
        let comments = self.store.list_comments(item_id)?;
        let viewer_agreed = match self.viewer(user)? {
            Some(viewer) => self.store.has_agreed(viewer.id, item_id)?,
            None => false,
        };
        Ok(Reply::html(
            200,
            self.renderer.detail_page(&detail, &comments, viewer_agreed),
        ))
    }

    fn not_found_page(&self) -> String {
        format!(
            r#"<!doctype html><h1>Not found</h1><p><a href="{}">Back to the catalog</a></p>"#,
            self.origin
        )
    }
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|raw| raw.parse::<i64>().ok())
}

fn route(path: &str) -> Option<(Route, Option<&str>)> {
    match path {
        "/" => return Some((Route::Listing, None)),
        "/api/its" => return Some((Route::Page, None)),
        "/api/fields" => return Some((Route::Fields, None)),
        _ => {}
    }
    if let Some(id) = path.strip_prefix("/api/agree/") {
        return Some((Route::Agree, Some(id)));
    }
    if let Some(rest) = path.strip_prefix("/api/comment/") {
        return Some(match rest.strip_suffix("/delete") {
            Some(id) => (Route::DeleteComment, Some(id)),
            None => (Route::Comment, Some(rest)),
        });
    }
    if let Some(id) = path.strip_prefix("/detail/") {
        return Some((Route::Detail, Some(id.trim_end_matches('/'))));
    }
    None
}

/// Serve `site` on `addr` until the process is stopped.
pub fn serve(site: &Site<'_>, addr: &str) -> Result<()> {
    let server = tiny_http::Server::http(addr)
        .map_err(|error| anyhow!("bind {addr}: {error} -- is another `trinity serve` running?"))?;
    info!(%addr, "serving catalog");

    for mut request in server.incoming_requests() {
        let user = request
            .headers()
            .iter()
            .find(|header| header.field.equiv(USER_HEADER))
            .map(|header| header.value.as_str().to_owned());
        let mut body = String::new();
        let reply = match request.as_reader().read_to_string(&mut body) {
            Ok(_) => site.handle_with_body(request.method(), request.url(), user.as_deref(), &body),
            Err(error) => Reply::json_error(400, &format!("read request body: {error}")),
        };
        info!(
            method = %request.method(),
            url = request.url(),
            status = reply.status,
            "request"
        );

        let mut response = tiny_http::Response::from_string(reply.body).with_status_code(reply.status);
        match Header::from_bytes("Content-Type", reply.content_type) {
            Ok(header) => response = response.with_header(header),
            Err(()) => warn!(content_type = reply.content_type, "invalid content type header"),
        }
        if let Err(error) = request.respond(response) {
            warn!(%error, "write response");
        }
    }
    Ok(())
}
