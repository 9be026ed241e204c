use crate::state::AppState;
use crate::tenant::TenantLookupError;
use crate::types::{HealthResponse, IngressEvent};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use companion_core::error::PipelineError;
use companion_core::model::{GameEvent, Language, Persona, TenantContext};
use std::collections::HashMap;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", components: serde_json::json!({"dispatcher": "ok"}) })
}

pub async fn post_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<IngressEvent>,
) -> Response {
    let tenant = match authenticate(&state, &headers).await {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    let (persona, language) = resolve_locale(&tenant, &event);
    let game_event = GameEvent {
        tenant: tenant.tenant_id.clone(),
        game: event.game.clone(),
        player: event.player_id.clone(),
        kind: event.kind,
        payload: event.payload,
        context: event.context,
        client_seq: event.client_seq.unwrap_or(0),
        received_at: chrono::Utc::now(),
    };

    match state.dispatcher.handle(game_event, tenant, persona, language).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => pipeline_error_response(&e),
    }
}

pub async fn get_costs(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(tenant) = params.get("tenant") else {
        return (StatusCode::BAD_REQUEST, "missing tenant query parameter").into_response();
    };
    match companion_budget::tenant_cost_rollup(&state.store, tenant).await {
        Ok(rollup) => Json(rollup).into_response(),
        Err(e) => {
            tracing::warn!("cost rollup query failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "rollup query failed").into_response()
        }
    }
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<TenantContext, Response> {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing X-API-Key header").into_response())?;

    state.tenants.lookup(api_key).await.map_err(|e| match e {
        TenantLookupError::NotFound => (StatusCode::UNAUTHORIZED, "unknown tenant key").into_response(),
        TenantLookupError::Inactive => (StatusCode::UNAUTHORIZED, "tenant inactive").into_response(),
    })
}

pub fn resolve_locale(tenant: &TenantContext, event: &IngressEvent) -> (Persona, Language) {
    let persona = event.persona.unwrap_or(Persona::Cheerful);
    let requested = event.language.unwrap_or(Language::En);
    let language = if tenant.language_allowed(requested) {
        requested
    } else {
        tenant.language_whitelist.first().copied().unwrap_or(Language::En)
    };
    (persona, language)
}

fn pipeline_error_response(error: &anyhow::Error) -> Response {
    if let Some(pipeline_error) = error.downcast_ref::<PipelineError>() {
        // Sub-deadline timeouts are absorbed into a `partial` 200 response
        // inside the dispatcher; an error surfacing here means the whole
        // request never got a reply, which is total unavailability.
        let status = match pipeline_error {
            PipelineError::DependencyTimeout { .. } | PipelineError::DependencyUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            other => StatusCode::from_u16(other.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };
        return (status, pipeline_error.to_string()).into_response();
    }
    tracing::error!("unhandled dispatcher error: {}", error);
    (StatusCode::SERVICE_UNAVAILABLE, "downstream dependencies unavailable").into_response()
}
