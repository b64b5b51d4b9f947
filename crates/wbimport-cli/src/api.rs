//! Remote entities over the Wikibase action API (`wbgetentities`).

use crate::settings::Settings;
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use wbimport_core::{EntityFetcher, FetchError, FetchedEntities};
use wbimport_model::Entity;

/// Most ids `wbgetentities` accepts per request for regular clients.
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// Import batch size to use against the API: one request per batch.
pub fn request_batch_size(batch_size: usize) -> usize {
    batch_size.clamp(1, MAX_IDS_PER_REQUEST)
}

pub struct WikibaseApiFetcher {
    client: Client,
    api_url: Url,
}

impl WikibaseApiFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_url = Url::parse(&settings.api_url)
            .with_context(|| format!("invalid API URL {}", settings.api_url))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("wbimport")),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()
            .map_err(|e| anyhow!("failed to build http client: {e}"))?;

        Ok(Self { client, api_url })
    }

    fn request_url(&self, ids: &[String]) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "wbgetentities")
            .append_pair("format", "json")
            .append_pair("redirects", "yes")
            .append_pair("ids", &ids.join("|"));
        url
    }

    fn fetch_chunk(&self, ids: &[String]) -> Result<FetchedEntities, FetchError> {
        let url = self.request_url(ids);
        debug!(url = %url, "wbgetentities");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!("http status {status}")));
        }
        let body: Value = response
            .json()
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        entities_from_response(body)
    }
}

impl EntityFetcher for WikibaseApiFetcher {
    fn fetch_entities(&self, ids: &[String]) -> Result<FetchedEntities, FetchError> {
        let mut fetched = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            fetched.extend(self.fetch_chunk(chunk)?);
        }
        Ok(fetched)
    }
}

/// Entities of a `wbgetentities` response, keyed by the id that was asked
/// for. Missing entities are left out; an entity reached through a
/// redirect is keyed by the redirect source.
pub fn entities_from_response(body: Value) -> Result<FetchedEntities, FetchError> {
    if let Some(error) = body.get("error") {
        let field = |name: &str| {
            error
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(FetchError::Api {
            code: field("code"),
            info: field("info"),
        });
    }

    let Some(Value::Object(entities)) = body.get("entities") else {
        return Err(FetchError::Decode("response has no entities object".to_string()));
    };

    let mut fetched = Vec::with_capacity(entities.len());
    for (key, raw) in entities {
        if raw.get("missing").is_some() {
            debug!(id = %key, "missing in source graph");
            continue;
        }
        let requested = raw
            .get("redirects")
            .and_then(|r| r.get("from"))
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();
        match serde_json::from_value::<Entity>(raw.clone()) {
            Ok(entity) => fetched.push((requested, entity)),
            Err(err) => warn!(id = %key, error = %err, "skipping undecodable entity"),
        }
    }
    Ok(fetched)
}
