//! HTTP persistence backend client.
//!
//! Every call resolves to a [`PersistenceResponse`]; transport errors and
//! non-2xx statuses come back as `isSuccess: false` instead of an `Err`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::MapDescription;

use crate::context::EditorContext;
use crate::events;
use crate::store::{DirtyState, EntityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceRequest {
    pub method: RequestMethod,
    /// Path below the backend base URL, e.g. `hdmap/roads/R1`
    pub namespace: String,
    /// Query parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl PersistenceRequest {
    pub fn get(namespace: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            namespace: namespace.into(),
            payload: None,
            body: None,
        }
    }

    pub fn post(namespace: impl Into<String>, body: Value) -> Self {
        Self {
            method: RequestMethod::Post,
            namespace: namespace.into(),
            payload: None,
            body: Some(body),
        }
    }

    pub fn delete(namespace: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Delete,
            namespace: namespace.into(),
            payload: None,
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceResponse {
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PersistenceResponse {
    pub fn failure() -> Self {
        Self {
            is_success: false,
            data: None,
        }
    }
}

/// Thin async wrapper over `reqwest`.
#[derive(Debug, Clone)]
pub struct PersistenceClient {
    base_url: String,
    http: reqwest::Client,
}

impl PersistenceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send(&self, request: &PersistenceRequest) -> PersistenceResponse {
        let url = format!("{}/{}", self.base_url, request.namespace.trim_start_matches('/'));
        let mut builder = match request.method {
            RequestMethod::Get => self.http.get(&url),
            RequestMethod::Post => self.http.post(&url),
            RequestMethod::Delete => self.http.delete(&url),
        };
        if let Some(payload) = &request.payload {
            builder = builder.query(payload);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Persistence {:?} {} failed: {e}", request.method, url);
                return PersistenceResponse::failure();
            }
        };
        if !response.status().is_success() {
            tracing::warn!(
                "Persistence {:?} {} returned {}",
                request.method,
                url,
                response.status()
            );
            return PersistenceResponse::failure();
        }
        match response.json::<PersistenceResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Persistence {} sent an unreadable body: {e}", url);
                PersistenceResponse::failure()
            }
        }
    }
}

// ============================================================================
// Dirty sync
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Road,
    Junction,
    Signal,
}

impl EntityKind {
    fn collection(&self) -> &'static str {
        match self {
            EntityKind::Road => "roads",
            EntityKind::Junction => "junctions",
            EntityKind::Signal => "signals",
        }
    }

    fn clean_channel(&self) -> &'static str {
        match self {
            EntityKind::Road => events::CLEAN_DIRTY_ROAD,
            EntityKind::Junction => events::CLEAN_DIRTY_JUNCTION,
            EntityKind::Signal => events::CLEAN_DIRTY_SIGNAL,
        }
    }
}

/// A pending request and the dirty entry it clears.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRequest {
    pub kind: EntityKind,
    pub id: String,
    pub request: PersistenceRequest,
}

/// One request per dirty entity: upserts post the entity, removals delete it.
pub fn dirty_requests(store: &EntityStore, prefix: &str) -> Vec<DirtyRequest> {
    fn request(kind: EntityKind, id: &str, prefix: &str, state: DirtyState, body: Option<Value>) -> DirtyRequest {
        let namespace = format!("{}/{}/{}", prefix, kind.collection(), id);
        let request = match (state, body) {
            (DirtyState::Upserted, Some(body)) => PersistenceRequest::post(namespace, body),
            _ => PersistenceRequest::delete(namespace),
        };
        DirtyRequest {
            kind,
            id: id.to_string(),
            request,
        }
    }

    let mut out = Vec::new();
    for (id, state) in store.dirty_roads() {
        let body = store.road(id).and_then(|r| serde_json::to_value(&*r).ok());
        out.push(request(EntityKind::Road, id, prefix, *state, body));
    }
    for (id, state) in store.dirty_junctions() {
        let body = store.junction(id).and_then(|j| serde_json::to_value(&*j).ok());
        out.push(request(EntityKind::Junction, id, prefix, *state, body));
    }
    for (id, state) in store.dirty_signals() {
        let body = store.signal(id).and_then(|s| serde_json::to_value(&*s).ok());
        out.push(request(EntityKind::Signal, id, prefix, *state, body));
    }
    out
}

/// Outcome of [`flush_dirty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub synced: usize,
    pub failed: usize,
}

/// Send every dirty entity. Entries the backend accepted are cleaned through
/// the `CleanDirty*` channels; failed ones stay dirty.
pub async fn flush_dirty(client: &PersistenceClient, ctx: &EditorContext) -> FlushReport {
    let prefix = ctx.settings.persistence.namespace.clone();
    let pending = dirty_requests(&ctx.store.borrow(), &prefix);
    let mut report = FlushReport::default();
    for item in pending {
        if client.send(&item.request).await.is_success {
            ctx.bus.emit_event(item.kind.clean_channel(), Some(item.id));
            report.synced += 1;
        } else {
            report.failed += 1;
        }
    }
    tracing::info!("Flushed dirty entities: {} synced, {} failed", report.synced, report.failed);
    report
}

/// Fetch the whole map stored under `prefix`.
pub async fn fetch_map(client: &PersistenceClient, prefix: &str) -> Result<MapDescription, String> {
    let response = client.send(&PersistenceRequest::get(format!("{prefix}/map"))).await;
    if !response.is_success {
        return Err(format!("Failed to fetch map from {}", client.base_url()));
    }
    let data = response.data.ok_or("Map response carries no data")?;
    serde_json::from_value(data).map_err(|e| format!("Invalid map payload: {e}"))
}
