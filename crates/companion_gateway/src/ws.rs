//! `/v1/realtime`: one duplex session per player. Handshake carries
//! `api_key`/`player_id` as query parameters; once accepted, the session is
//! registered with the [`PushRegistry`](crate::push_registry::PushRegistry)
//! so the dispatcher can deliver pushes, and a heartbeat loop closes the
//! socket after two missed pongs.

use crate::state::AppState;
use crate::types::{IngressEvent, RealtimeClientMessage, RealtimeServerMessage};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use companion_core::model::{GameEvent, TenantContext};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HANDSHAKE_AUTH_FAILED: u16 = 4001;
const HANDSHAKE_TENANT_INACTIVE: u16 = 4002;

pub async fn realtime_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let api_key = params.get("api_key").cloned().unwrap_or_default();
    let player_id = params.get("player_id").cloned().unwrap_or_default();

    ws.on_upgrade(move |socket| async move {
        match state.tenants.lookup(&api_key).await {
            Ok(tenant) => handle_session(socket, state, tenant, player_id).await,
            Err(crate::tenant::TenantLookupError::NotFound) => close_with(socket, HANDSHAKE_AUTH_FAILED, "AUTH_FAILED").await,
            Err(crate::tenant::TenantLookupError::Inactive) => close_with(socket, HANDSHAKE_TENANT_INACTIVE, "TENANT_INACTIVE").await,
        }
    })
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame { code, reason: reason.into() })))
        .await;
}

async fn handle_session(socket: WebSocket, state: AppState, tenant: TenantContext, player_id: String) {
    let session = state.push_registry.register(&player_id);
    session.last_pong_at.store(now_epoch_millis(), Ordering::SeqCst);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let heartbeat = Duration::from_secs(state.heartbeat_seconds);

    loop {
        tokio::select! {
            message = session.next_message() => {
                let json = match serde_json::to_string(&message) {
                    Ok(j) => j,
                    Err(e) => { tracing::warn!("failed to serialize push message: {}", e); continue; }
                };
                if ws_tx.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&state, &tenant, &player_id, &text, &mut ws_tx).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        session.last_pong_at.store(now_epoch_millis(), Ordering::SeqCst);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("realtime session read error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(heartbeat) => {
                let elapsed = now_epoch_millis().saturating_sub(session.last_pong_at.load(Ordering::SeqCst));
                if elapsed > heartbeat.as_millis() as u64 * 2 {
                    tracing::info!("closing realtime session for {}: missed two heartbeats", player_id);
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.push_registry.unregister(&player_id);
}

async fn handle_client_text(
    state: &AppState,
    tenant: &TenantContext,
    player_id: &str,
    text: &str,
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) {
    let parsed: Result<RealtimeClientMessage, _> = serde_json::from_str(text);
    match parsed {
        Ok(RealtimeClientMessage::Event(ingress)) => {
            let (persona, language) = crate::http::resolve_locale(tenant, &ingress);
            let game_event = to_game_event(tenant, player_id, ingress);
            if let Err(e) = state.dispatcher.handle_async(game_event, tenant.clone(), persona, language).await {
                tracing::warn!("failed to enqueue realtime event: {}", e);
            }
        }
        Ok(RealtimeClientMessage::Ack { .. }) => {}
        Ok(RealtimeClientMessage::Ping) => {
            let reply = serde_json::to_string(&RealtimeServerMessage::Pong).unwrap_or_default();
            let _ = ws_tx.send(Message::Text(reply)).await;
        }
        Err(e) => {
            let reply = serde_json::to_string(&RealtimeServerMessage::Error { reason: e.to_string() }).unwrap_or_default();
            let _ = ws_tx.send(Message::Text(reply)).await;
        }
    }
}

fn to_game_event(tenant: &TenantContext, player_id: &str, ingress: IngressEvent) -> GameEvent {
    GameEvent {
        tenant: tenant.tenant_id.clone(),
        game: ingress.game,
        player: player_id.to_string(),
        kind: ingress.kind,
        payload: ingress.payload,
        context: ingress.context,
        client_seq: ingress.client_seq.unwrap_or(0),
        received_at: chrono::Utc::now(),
    }
}

fn now_epoch_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
