// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use trinity_app::{AgreeOutcome, AgreeResponse, ItemId, ListQuery, PageResponse};
use url::Url;

/// Header carrying the caller's username to the agree endpoint.
pub const USER_HEADER: &str = "X-Trinity-User";

/// Blocking client for a catalog server's list-query and agree endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    user: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("client.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("client.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            user: None,
            timeout,
            http,
        })
    }

    pub fn with_user(mut self, user: Option<&str>) -> Self {
        self.user = user
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(str::to_owned);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The list-query URL for `query`.
    pub fn page_url(&self, query: &ListQuery) -> Result<Url> {
        let mut url = self.endpoint("/api/its")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.to_string());
            pairs.append_pair("per_page", &query.per_page.to_string());
            if let Some(field) = &query.field {
                pairs.append_pair("field", field);
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
        }
        Ok(url)
    }

    pub fn fetch_page(&self, query: &ListQuery) -> Result<PageResponse> {
        let url = self.page_url(query)?;
        debug!(%url, "fetch page");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response
            .json::<PageResponse>()
            .with_context(|| format!("decode page {} response", query.page))
    }

    pub fn list_fields(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.endpoint("/api/fields")?)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().context("decode field list")
    }

    /// Ask the server to record an agreement. Business-rule refusals come
    /// back as `AgreeOutcome::Rejected`; transport and decode problems are
    /// errors.
    pub fn agree(&self, item_id: ItemId) -> Result<AgreeOutcome> {
        let mut request = self.http.post(self.endpoint(&format!("/api/agree/{item_id}"))?);
        if let Some(user) = &self.user {
            request = request.header(USER_HEADER, user);
        }
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let body = response.text().context("read agree response")?;
        if status.is_success() || status.is_client_error() {
            if let Ok(reply) = serde_json::from_str::<AgreeResponse>(&body)
                && (status.is_success() || !reply.success)
            {
                return reply
                    .into_outcome()
                    .ok_or_else(|| anyhow!("malformed agree response for item {item_id}"));
            }
            if status.is_success() {
                bail!("decode agree response for item {item_id}: {}", snippet(&body));
            }
        }
        Err(clean_error_response(status, &body))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{path}", self.base_url))
            .with_context(|| format!("build URL for {path}"))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- start it with `trinity serve` ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty body".to_owned();
    }
    trimmed.chars().take(80).collect()
}
