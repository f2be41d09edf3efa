//! HTTP client for the REST API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{EvolutionChain, Pokemon, ResourceList, Species, TypeMembers};
use crate::key::Identifier;
use crate::{CacheError, Result};

/// Default base URL of the public API.
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin typed wrapper over the REST endpoints. Performs no caching.
#[derive(Clone)]
pub struct DexApi {
    http: Client,
    base_url: String,
}

impl DexApi {
    /// Create a client for the public API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /pokemon?limit=&offset=`
    pub async fn pokemon_list(&self, limit: usize, offset: usize) -> Result<ResourceList> {
        let url = format!(
            "{}/pokemon?limit={limit}&offset={offset}",
            self.base_url
        );
        self.get_json(&url, "pokemon list").await
    }

    /// `GET /pokemon/{id or name}`
    pub async fn pokemon(&self, ident: &Identifier) -> Result<Pokemon> {
        let url = format!("{}/pokemon/{ident}", self.base_url);
        self.get_json(&url, &format!("pokemon {ident}")).await
    }

    /// `GET /pokemon-species/{id or name}`
    pub async fn species(&self, ident: &Identifier) -> Result<Species> {
        let url = format!("{}/pokemon-species/{ident}", self.base_url);
        self.get_json(&url, &format!("species {ident}")).await
    }

    /// `GET /evolution-chain/{id}`
    pub async fn evolution_chain(&self, id: u64) -> Result<EvolutionChain> {
        let url = format!("{}/evolution-chain/{id}", self.base_url);
        self.get_json(&url, &format!("evolution chain {id}")).await
    }

    /// `GET /type/{name}`
    pub async fn type_members(&self, type_name: &str) -> Result<TypeMembers> {
        let url = format!("{}/type/{type_name}", self.base_url);
        self.get_json(&url, &format!("type {type_name}")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::Http(e.to_string()))?;

        Self::handle_response_errors(&response, what)?;

        let body = response
            .text()
            .await
            .map_err(|e| CacheError::Http(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Check response status and map to appropriate error.
    fn handle_response_errors(response: &reqwest::Response, what: &str) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            404 => Err(CacheError::NotFound(what.to_string())),
            code => Err(CacheError::Api {
                status: code,
                message: format!("failed to fetch {what}: {status}"),
            }),
        }
    }
}
