use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::logic::{reconcile_all, Delta, DeltaComputer, DeltaEntry, DeltaError, DeltaType, ReconcileSummary};
use crate::model::{ContainerRef, Id};
use crate::store::traits::Store;

/// Store plus the engine configuration shared by all handlers
pub struct ServiceState<S> {
    pub store: S,
    pub computer: DeltaComputer,
}

impl<S: Store> ServiceState<S> {
    pub fn new(store: S, computer: DeltaComputer) -> Self {
        Self { store, computer }
    }
}

pub type AppState<S> = Arc<ServiceState<S>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn delta_error(err: DeltaError) -> ApiError {
    let status = match err {
        DeltaError::ContainerNotFound(_) | DeltaError::ProductTypeNotFound { .. } => StatusCode::NOT_FOUND,
        DeltaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

#[derive(Debug, Serialize)]
pub struct ComponentSummary {
    pub id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<Id>,
    pub uses_template: bool,
    pub generations: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DeltaQuery {
    /// Restrict the listed entries to one delta type
    #[serde(rename = "type")]
    pub delta_type: Option<DeltaType>,
}

#[derive(Debug, Serialize)]
pub struct DeltaResponse {
    pub component: Id,
    pub empty: bool,
    pub entry_count: usize,
    /// Entries of the whole tree, each with a readable description
    pub entries: Vec<EntryView>,
    pub delta: Delta,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub container: ContainerRef,
    pub delta_type: DeltaType,
    pub description: String,
}

impl DeltaResponse {
    fn new(component: Id, delta: Delta, filter: Option<DeltaType>) -> Self {
        let mut entries = Vec::new();
        collect_entries(&delta, filter, &mut entries);
        Self {
            component,
            empty: delta.is_empty(),
            entry_count: delta.entry_count(),
            entries,
            delta,
        }
    }
}

fn collect_entries(delta: &Delta, filter: Option<DeltaType>, out: &mut Vec<EntryView>) {
    let own: Vec<&DeltaEntry> = match filter {
        Some(delta_type) => delta.entries_of_type(delta_type),
        None => delta.entries().iter().collect(),
    };
    out.extend(own.into_iter().map(|entry| EntryView {
        container: entry.container().clone(),
        delta_type: entry.delta_type(),
        description: entry.description(),
    }));
    for child in delta.children() {
        collect_entries(child, filter, out);
    }
}

#[derive(Debug, Serialize)]
pub struct FixResponse {
    pub component: Id,
    pub fixed_entries: usize,
    /// Delta recomputed after the fix
    pub remaining: DeltaResponse,
}

// Component handlers
pub async fn list_components<S: Store>(State(state): State<AppState<S>>) -> Json<ListResponse<ComponentSummary>> {
    let store = &state.store;
    let items = store
        .component_ids()
        .into_iter()
        .map(|id| {
            let root = ContainerRef::component(id.clone());
            ComponentSummary {
                product_type: store.product_type_of(&root),
                uses_template: store.uses_template(&root),
                generations: store
                    .nested_containers(&root)
                    .iter()
                    .filter_map(ContainerRef::valid_from)
                    .collect(),
                id,
            }
        })
        .collect();
    Json(ListResponse::new(items))
}

pub async fn get_component_delta<S: Store>(
    State(state): State<AppState<S>>,
    Path(component_id): Path<Id>,
    Query(query): Query<DeltaQuery>,
) -> Result<Json<DeltaResponse>, ApiError> {
    let container = ContainerRef::component(component_id.clone());
    let delta = state
        .computer
        .compute_delta(&state.store, &state.store, &container)
        .map_err(delta_error)?;
    Ok(Json(DeltaResponse::new(component_id, delta, query.delta_type)))
}

pub async fn fix_component<S: Store>(
    State(state): State<AppState<S>>,
    Path(component_id): Path<Id>,
) -> Result<Json<FixResponse>, ApiError> {
    let container = ContainerRef::component(component_id.clone());
    let compute = || {
        state
            .computer
            .compute_delta(&state.store, &state.store, &container)
            .map_err(delta_error)
    };

    let fixed_entries = compute()?
        .fix(&state.store)
        .map_err(|e| delta_error(e.into()))?;
    let remaining = compute()?;

    Ok(Json(FixResponse {
        component: component_id.clone(),
        fixed_entries,
        remaining: DeltaResponse::new(component_id, remaining, None),
    }))
}

pub async fn reconcile_workspace<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<ReconcileSummary>>, ApiError> {
    let summaries = reconcile_all(&state.computer, &state.store).map_err(delta_error)?;
    Ok(Json(ListResponse::new(summaries)))
}
