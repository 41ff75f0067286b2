// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use trinity_app::{AgreeOutcome, ItemId, ListQuery, PageResponse, UserId};
use trinity_db::Store;
use trinity_view::CatalogRuntime;

/// Serves a listing straight from the local store.
pub struct StoreRuntime<'a> {
    store: &'a Store,
    user: Option<UserId>,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store, user: None }
    }

    /// Act as `username`, which must already exist.
    pub fn as_user(mut self, username: Option<&str>) -> Result<Self> {
        self.user = match username {
            Some(name) => match self.store.find_user(name)? {
                Some(user) => Some(user.id),
                None => bail!("unknown user {name:?} -- create it with `trinity add-user {name}`"),
            },
            None => None,
        };
        Ok(self)
    }
}

impl CatalogRuntime for StoreRuntime<'_> {
    fn fetch_page(&mut self, query: &ListQuery) -> Result<PageResponse> {
        self.store.list_page(query)
    }

    fn agree(&mut self, item_id: ItemId) -> Result<AgreeOutcome> {
        self.store.agree(self.user, item_id.get())
    }
}

/// Talks to a running `trinity serve` over HTTP.
pub struct RemoteRuntime {
    client: trinity_client::Client,
}

impl RemoteRuntime {
    pub fn new(client: trinity_client::Client) -> Self {
        Self { client }
    }
}

impl CatalogRuntime for RemoteRuntime {
    fn fetch_page(&mut self, query: &ListQuery) -> Result<PageResponse> {
        self.client.fetch_page(query)
    }

    fn agree(&mut self, item_id: ItemId) -> Result<AgreeOutcome> {
        self.client.agree(item_id)
    }
}
