//! HTTP clients for the remote platform API
//!
//! The location hierarchy and the authoritative mosque dataset live behind
//! the platform API. Transport failures map to `StoreError::Unavailable`
//! (retryable by the caller); the service never retries internally.

use async_trait::async_trait;
use imar_common::StoreError;
use serde::Deserialize;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::models::{
    LocationLabels, LocationLevel, MosqueId, NewMosqueRecord, ResolvedLocation,
};
use crate::stores::{LocationResolver, MosqueStore, ResolveError};

/// Shared reqwest client plus the upstream base URL.
#[derive(Debug, Clone)]
pub struct RemoteApi {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteApi {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

// ============================================================================
// Location Resolver
// ============================================================================

/// Body of a 404 from the resolve endpoint: the first level with no match.
#[derive(Debug, Deserialize)]
struct ResolveMiss {
    level: LocationLevel,
    label: String,
}

/// Resolves location label tuples via `GET /locations/resolve`.
#[derive(Debug, Clone)]
pub struct HttpLocationResolver {
    api: RemoteApi,
}

impl HttpLocationResolver {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LocationResolver for HttpLocationResolver {
    #[tracing::instrument(skip(self), fields(governorate = %labels.governorate))]
    async fn resolve(&self, labels: &LocationLabels) -> Result<ResolvedLocation, ResolveError> {
        let response = self
            .api
            .http
            .get(self.api.url("/locations/resolve"))
            .query(&[
                ("governorate", labels.governorate.as_str()),
                ("district", labels.district.as_str()),
                ("sub_district", labels.sub_district.as_str()),
                ("neighborhood", labels.neighborhood.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let resolved = response
                    .json::<ResolvedLocation>()
                    .await
                    .map_err(transport_error)?;
                Ok(resolved)
            },
            reqwest::StatusCode::NOT_FOUND => {
                let miss = response.json::<ResolveMiss>().await.map_err(|_| {
                    // Unparseable miss body: report the coarsest level.
                    ResolveError::Unresolved {
                        level: LocationLevel::Governorate,
                        label: labels.governorate.clone(),
                    }
                });
                match miss {
                    Ok(miss) => Err(ResolveError::Unresolved {
                        level: miss.level,
                        label: miss.label,
                    }),
                    Err(err) => Err(err),
                }
            },
            status if status.is_server_error() => Err(ResolveError::Store(
                StoreError::Unavailable(format!("resolve returned {}", status)),
            )),
            status => Err(ResolveError::Store(StoreError::Rejected(format!(
                "resolve returned {}",
                status
            )))),
        }
    }
}

// ============================================================================
// Authoritative Mosque Store
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreatedMosque {
    id: MosqueId,
}

/// Creates authoritative mosque records via `POST /mosques`.
#[derive(Debug, Clone)]
pub struct HttpMosqueStore {
    api: RemoteApi,
}

impl HttpMosqueStore {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MosqueStore for HttpMosqueStore {
    #[tracing::instrument(skip(self, record), fields(name_en = %record.name_en))]
    async fn create(&self, record: NewMosqueRecord) -> Result<MosqueId, StoreError> {
        let response = self
            .api
            .http
            .post(self.api.url("/mosques"))
            .json(&record)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => {
                let created = response
                    .json::<CreatedMosque>()
                    .await
                    .map_err(transport_error)?;
                tracing::info!(mosque_id = %created.id, "authoritative mosque record created");
                Ok(created.id)
            },
            status if status.is_server_error() => Err(StoreError::Unavailable(format!(
                "mosque store returned {}",
                status
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Rejected(format!(
                    "mosque store returned {}: {}",
                    status, body
                )))
            },
        }
    }
}
