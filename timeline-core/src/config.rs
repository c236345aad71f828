use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ApiError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api/";
pub const DEFAULT_MAX_CATALOG_PAGES: usize = 50;

/// How the grid asks for the reservations of many reservables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// One `reservations/bulk/` round trip for every reservable.
    #[default]
    Bulk,
    /// One `reservations/` request per reservable, issued concurrently.
    PerReservable,
}

impl FromStr for FetchStrategy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bulk" => Ok(FetchStrategy::Bulk),
            "per-reservable" | "per_reservable" => Ok(FetchStrategy::PerReservable),
            other => Err(ApiError::InvalidArgument(format!(
                "unknown fetch strategy `{}`",
                other
            ))),
        }
    }
}

/// Fetch tuning without the base URL, which the browser takes from its own
/// origin. The server reads these from its environment and hands them over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub max_catalog_pages: usize,
    pub strategy: FetchStrategy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_catalog_pages: DEFAULT_MAX_CATALOG_PAGES,
            strategy: FetchStrategy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub max_catalog_pages: usize,
    pub strategy: FetchStrategy,
}

impl ClientConfig {
    /// `base_url` is normalized to end with a slash so endpoint paths append to it.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            max_catalog_pages: DEFAULT_MAX_CATALOG_PAGES,
            strategy: FetchStrategy::default(),
        })
    }

    /// Reads `RESERVATIONS_API_URL`, `RESERVATIONS_MAX_CATALOG_PAGES` and
    /// `RESERVATIONS_FETCH_STRATEGY`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url =
            env::var("RESERVATIONS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(pages) = env::var("RESERVATIONS_MAX_CATALOG_PAGES") {
            config.max_catalog_pages = pages.parse().map_err(|_| {
                ApiError::InvalidArgument(format!("RESERVATIONS_MAX_CATALOG_PAGES=`{}`", pages))
            })?;
        }
        if let Ok(strategy) = env::var("RESERVATIONS_FETCH_STRATEGY") {
            config.strategy = strategy.parse()?;
        }

        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_catalog_pages(mut self, pages: usize) -> Self {
        self.max_catalog_pages = pages;
        self
    }

    pub fn settings(&self) -> ClientSettings {
        ClientSettings {
            max_catalog_pages: self.max_catalog_pages,
            strategy: self.strategy,
        }
    }

    pub fn with_settings(self, settings: ClientSettings) -> Self {
        self.with_strategy(settings.strategy)
            .with_max_catalog_pages(settings.max_catalog_pages)
    }
}
