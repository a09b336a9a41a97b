// src/sync.rs
//! Remote endpoints and the save coordinator.
//!
//! [`SyncClient`] is the reqwest-backed transport for the catalog resource,
//! the plan-generation endpoint, the plan-persistence endpoint and the auth
//! probe. [`SyncAgent`] serializes saves: one request slot, a pending
//! snapshot that newer submissions supersede, and a short coalescing delay
//! so a burst of edits collapses into a single save of the latest snapshot.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::plan::Plan;

pub const DEFAULT_COALESCE_MS: u64 = 300;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not authenticated; please log in first")]
    NotAuthenticated,
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },
}

/// Inputs to the plan-generation endpoint. `difficulty`,
/// `max_session_duration` and `max_workout_days` are passthrough fields; the
/// client attaches no semantics to them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub age: u32,
    pub height: u32,
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(rename = "maxSessionDuration", skip_serializing_if = "Option::is_none")]
    pub max_session_duration: Option<u32>,
    #[serde(rename = "maxWorkoutDays", skip_serializing_if = "Option::is_none")]
    pub max_workout_days: Option<u32>,
    pub gym: bool,
    #[serde(rename = "equipmentList")]
    pub equipment_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSuggestion {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub link: String,
}

/// Raw generation response; `plan` is a JSON-encoded plan document or a
/// plain-text program when the generator fell back to prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub plan: String,
    #[serde(default)]
    pub products: Vec<ProductSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Serialize)]
struct SavePlanBody<'a> {
    plan: &'a Plan,
}

/// The remote collaborators the plan service needs. Implemented by
/// [`SyncClient`] over HTTP and by in-memory fakes in tests.
pub trait PlanTransport {
    async fn fetch_catalog(&self) -> Result<Catalog, SyncError>;
    async fn generate_plan(&self, request: &GenerateRequest) -> Result<GenerateResponse, SyncError>;
    async fn save_plan(&self, plan: &Plan) -> Result<(), SyncError>;
    async fn check_auth(&self) -> Result<AuthStatus, SyncError>;
}

pub struct SyncClient {
    http_client: Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn error_from(response: reqwest::Response) -> SyncError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return SyncError::NotAuthenticated;
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        error!(%status, body, "server request failed");
        SyncError::Server {
            status: status.as_u16(),
            body,
        }
    }
}

impl PlanTransport for SyncClient {
    async fn fetch_catalog(&self) -> Result<Catalog, SyncError> {
        let url = format!("{}/static/data/exercises.json", self.base_url);
        debug!(%url, "fetching exercise catalog");
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let entries: Vec<CatalogEntry> = response.json().await?;
        info!(count = entries.len(), "exercise catalog loaded");
        Ok(Catalog::new(entries))
    }

    async fn generate_plan(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, SyncError> {
        let url = format!("{}/generate", self.base_url);
        info!(%url, age = request.age, gym = request.gym, "requesting plan generation");
        let response = self.http_client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let generated: GenerateResponse = response.json().await?;
        info!(
            products = generated.products.len(),
            "plan generation response received"
        );
        Ok(generated)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), SyncError> {
        let url = format!("{}/save-plan", self.base_url);
        info!(%url, days = plan.days.len(), "persisting plan");
        let response = self
            .http_client
            .post(&url)
            .json(&SavePlanBody { plan })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }

    async fn check_auth(&self) -> Result<AuthStatus, SyncError> {
        let url = format!("{}/check-auth", self.base_url);
        debug!(%url, "checking authentication state");
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Result of one save submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot (or a newer one that superseded it) was persisted.
    Saved,
    /// A newer snapshot arrived while this one waited; nothing to send.
    Superseded,
    /// The save failed; changes stay dirty and the next signal retries.
    Failed,
}

/// Watches for plan mutations and persists whole-plan snapshots, one request
/// in flight at a time.
pub struct SyncAgent<T> {
    transport: T,
    pending: Mutex<Option<Plan>>,
    in_flight: Mutex<()>,
    coalesce: Duration,
}

impl<T: PlanTransport> SyncAgent<T> {
    pub fn new(transport: T) -> Self {
        Self::with_coalesce(transport, Duration::from_millis(DEFAULT_COALESCE_MS))
    }

    pub fn with_coalesce(transport: T, coalesce: Duration) -> Self {
        Self {
            transport,
            pending: Mutex::new(None),
            in_flight: Mutex::new(()),
            coalesce,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submits a snapshot for persistence. The snapshot replaces any pending
    /// one; the send happens after a short coalescing delay, under the single
    /// request slot, and always ships the latest snapshot available. Failures
    /// are logged, never propagated: the dirty flag stays with the store and
    /// the next modification signal re-attempts a full save.
    pub async fn submit(&self, snapshot: Plan) -> SaveOutcome {
        *self.pending.lock().await = Some(snapshot);
        let _slot = self.in_flight.lock().await;
        tokio::time::sleep(self.coalesce).await;
        let Some(plan) = self.pending.lock().await.take() else {
            debug!("save superseded by a newer snapshot");
            return SaveOutcome::Superseded;
        };
        match self.transport.save_plan(&plan).await {
            Ok(()) => {
                info!(days = plan.days.len(), "plan saved");
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!(error = %e, "plan save failed; changes remain unsaved");
                SaveOutcome::Failed
            }
        }
    }
}
