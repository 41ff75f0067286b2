// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trinity_app::{FilterStrategy, ViewMode};
use trinity_view::render::DEFAULT_DESCRIPTION_BUDGET;
use trinity_view::trigger::DEFAULT_TRIGGER_MARGIN;
use url::Url;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:5002";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5002";
const DEFAULT_TIMEOUT: &str = "5s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            server: Server::default(),
            client: ClientSettings::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub addr: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: Some(DEFAULT_SERVER_ADDR.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub user: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            user: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub view: Option<String>,
    pub description_budget: Option<i64>,
    pub filter_strategy: Option<String>,
    pub trigger_margin: Option<i64>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            view: Some(ViewMode::default().as_str().to_owned()),
            description_budget: Some(DEFAULT_DESCRIPTION_BUDGET as i64),
            filter_strategy: Some(FilterStrategy::default().as_str().to_owned()),
            trigger_margin: Some(i64::from(DEFAULT_TRIGGER_MARGIN)),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TRINITY_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TRINITY_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(trinity_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [storage], [server], [client], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            trinity_db::validate_db_path(db_path)?;
        }

        if let Some(addr) = &self.server.addr {
            addr.parse::<SocketAddr>().with_context(|| {
                format!(
                    "server.addr in {} must be host:port, got {addr:?}",
                    path.display()
                )
            })?;
        }

        if let Some(base_url) = &self.client.base_url {
            Url::parse(base_url).with_context(|| {
                format!(
                    "client.base_url in {} is not a valid URL: {base_url:?}",
                    path.display()
                )
            })?;
        }

        if let Some(timeout) = &self.client.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "client.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(view) = &self.ui.view
            && ViewMode::parse(view).is_none()
        {
            bail!(
                "ui.view in {} must be \"card\" or \"table\", got {view:?}",
                path.display()
            );
        }

        if let Some(strategy) = &self.ui.filter_strategy
            && FilterStrategy::parse(strategy).is_none()
        {
            bail!(
                "ui.filter_strategy in {} must be \"navigate\" or \"in_place\", got {strategy:?}",
                path.display()
            );
        }

        if let Some(budget) = self.ui.description_budget
            && budget <= 0
        {
            bail!(
                "ui.description_budget in {} must be positive, got {}",
                path.display(),
                budget
            );
        }

        if let Some(margin) = self.ui.trigger_margin
            && !(0..=i64::from(u32::MAX)).contains(&margin)
        {
            bail!(
                "ui.trigger_margin in {} must be a non-negative pixel count, got {}",
                path.display(),
                margin
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => trinity_db::default_db_path(),
        }
    }

    pub fn server_addr(&self) -> &str {
        self.server.addr.as_deref().unwrap_or(DEFAULT_SERVER_ADDR)
    }

    pub fn client_base_url(&self) -> &str {
        self.client
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn client_timeout(&self) -> Result<Duration> {
        parse_duration(self.client.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn client_user(&self) -> Option<&str> {
        self.client
            .user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
    }

    pub fn view_mode(&self) -> ViewMode {
        self.ui
            .view
            .as_deref()
            .and_then(ViewMode::parse)
            .unwrap_or_default()
    }

    pub fn description_budget(&self) -> usize {
        self.ui
            .description_budget
            .and_then(|budget| usize::try_from(budget).ok())
            .unwrap_or(DEFAULT_DESCRIPTION_BUDGET)
    }

    pub fn filter_strategy(&self) -> FilterStrategy {
        self.ui
            .filter_strategy
            .as_deref()
            .and_then(FilterStrategy::parse)
            .unwrap_or_default()
    }

    pub fn trigger_margin(&self) -> u32 {
        self.ui
            .trigger_margin
            .and_then(|margin| u32::try_from(margin).ok())
            .unwrap_or(DEFAULT_TRIGGER_MARGIN)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# trinity config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/trinity/trinity.db)\n# db_path = \"/absolute/path/to/trinity.db\"\n\n[server]\naddr = \"{}\"\n\n[client]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# user = \"alice\"\n\n[ui]\nview = \"card\"\ndescription_budget = {}\nfilter_strategy = \"navigate\"\ntrigger_margin = {}\n",
            path.display(),
            DEFAULT_SERVER_ADDR,
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_DESCRIPTION_BUDGET,
            DEFAULT_TRIGGER_MARGIN,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
