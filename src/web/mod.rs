//! JSON/SSE API over a running engine.
//!
//! A clock task steps the engine at the scenario cadence while request
//! handlers apply tools. Both go through the same mutex, and every tick or
//! interaction is broadcast to `/api/events` subscribers as a [`Frame`].
//! Frames are sent before the lock is released so subscribers see visual ops
//! in the order the engine produced them.

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    engine::{self, CityView, Clock, Engine, Interaction, TickSummary},
    reconcile::ReconcileReport,
    render::{PointerEvent, RecordingRenderer},
    scenario::Scenario,
    tools::ToolSwitch,
};

pub type SharedEngine = Arc<Mutex<Engine<RecordingRenderer>>>;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    Tick(TickSummary),
    Interaction(Interaction),
    ToolChanged(ToolChange),
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolChange {
    pub tool: String,
    pub switch: ToolSwitch,
    pub report: ReconcileReport,
}

#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
}

#[derive(Clone)]
pub struct AppState {
    engine: SharedEngine,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(engine: SharedEngine) -> Self {
        let (broadcaster, _) = broadcast::channel(512);
        Self {
            engine,
            broadcaster,
        }
    }

    fn publish(&self, frame: &Frame) {
        match serde_json::to_string(frame) {
            Ok(payload) => {
                // No subscribers is fine.
                let _ = self.broadcaster.send(payload);
            }
            Err(err) => warn!(error = %err, "failed to encode frame"),
        }
    }
}

type ApiError = (StatusCode, String);

fn poisoned() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "engine lock poisoned".to_string(),
    )
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub ticks: Option<u64>,
    pub host: String,
    pub port: u16,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(city_state))
        .route("/api/tool", post(set_tool))
        .route("/api/select", post(select))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        ticks,
        host,
        port,
    } = config;

    let renderer = RecordingRenderer::new(scenario.grid_size);
    let engine = scenario
        .build_engine(renderer)
        .context("Failed to build engine from scenario")?;
    let engine: SharedEngine = Arc::new(Mutex::new(engine));
    let state = Arc::new(AppState::new(engine.clone()));

    let clock = Clock::new(scenario.tick_interval()).with_ticks(ticks);
    let state_for_clock = state.clone();
    let clock_task = tokio::spawn(async move {
        engine::drive(engine, clock, |summary| {
            state_for_clock.publish(&Frame::Tick(summary.clone()));
        })
        .await;
    });

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    info!(scenario = %scenario.name, %addr, "serving city API");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    clock_task.abort();
    let removed = release_visuals(&state);
    info!(removed, "released rendered visuals");
    Ok(())
}

/// Stops rendering the city: every live visual is removed and the handle
/// table emptied. Returns how many visuals were removed.
fn release_visuals(state: &AppState) -> usize {
    match state.engine.lock() {
        Ok(mut engine) => engine.shutdown(),
        Err(_) => {
            warn!("engine lock poisoned, skipping visual cleanup");
            0
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down city API");
}

pub async fn city_state(State(state): State<Arc<AppState>>) -> Result<Json<CityView>, ApiError> {
    let engine = state.engine.lock().map_err(|_| poisoned())?;
    Ok(Json(engine.view()))
}

pub async fn set_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ToolRequest>,
) -> Result<Json<ToolChange>, ApiError> {
    let mut engine = state.engine.lock().map_err(|_| poisoned())?;
    let (switch, report) = engine
        .set_active_tool_id(&request.tool)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    let change = ToolChange {
        tool: request.tool,
        switch,
        report,
    };
    state.publish(&Frame::ToolChanged(change.clone()));
    drop(engine);
    Ok(Json(change))
}

pub async fn select(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<Interaction>, ApiError> {
    let mut engine = state.engine.lock().map_err(|_| poisoned())?;
    let interaction = engine.interact(&event);
    state.publish(&Frame::Interaction(interaction.clone()));
    drop(engine);
    Ok(Json(interaction))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
