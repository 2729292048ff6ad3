// API module for headless mode - HTTP endpoints to drive the simulation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::render::TallySink;
use crate::simulation::{GridSnapshot, Simulation, SimulationStats, TickReport};
use crate::types::Position;

pub type SharedSimulation = Arc<Mutex<Simulation<TallySink>>>;

#[derive(Deserialize)]
pub struct StepQuery {
    pub steps: Option<usize>,
}

#[derive(Serialize)]
pub struct StepResponse {
    /// Reports for the ticks that actually ran; empty while stopped.
    pub reports: Vec<TickReport>,
    pub stats: SimulationStats,
}

#[derive(Serialize)]
pub struct RunState {
    pub running: bool,
    pub tick: u64,
}

#[derive(Serialize)]
pub struct Notifications {
    pub placed: u64,
    pub removed: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: SimulationStats,
    pub notifications: Notifications,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Shared state for the API server
#[derive(Clone)]
pub struct ApiState {
    pub simulation: SharedSimulation,
}

impl ApiState {
    pub fn new(sim: Simulation<TallySink>) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(sim)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Simulation<TallySink>>, StatusCode> {
        self.simulation
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn sim_error(e: SimError) -> ApiError {
    let status = match e {
        SimError::OutOfBounds { .. } => StatusCode::BAD_REQUEST,
        SimError::NotEmpty(_) => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn poisoned(status: StatusCode) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: "simulation lock poisoned".to_string(),
        }),
    )
}

// GET /stats - Grid counters plus render notification totals
async fn get_stats(State(api_state): State<ApiState>) -> Result<Json<StatsResponse>, StatusCode> {
    let sim = api_state.lock()?;
    let sink = sim.sink();
    Ok(Json(StatsResponse {
        stats: sim.stats(),
        notifications: Notifications {
            placed: sink.placed,
            removed: sink.removed,
        },
    }))
}

// GET /state - Full grid snapshot
async fn get_state(State(api_state): State<ApiState>) -> Result<Json<GridSnapshot>, StatusCode> {
    let sim = api_state.lock()?;
    Ok(Json(sim.snapshot()))
}

// POST /step - Tick the simulation forward (only while running), capped at
// max_steps_per_request so one call can't hold the lock indefinitely
async fn step_simulation(
    Query(params): Query<StepQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<StepResponse>, StatusCode> {
    let mut sim = api_state.lock()?;
    let steps = params
        .steps
        .unwrap_or(1)
        .min(sim.config().max_steps_per_request);
    let reports = (0..steps).map_while(|_| sim.tick()).collect();
    Ok(Json(StepResponse {
        reports,
        stats: sim.stats(),
    }))
}

// POST /start
async fn start_simulation(State(api_state): State<ApiState>) -> Result<Json<RunState>, StatusCode> {
    let mut sim = api_state.lock()?;
    sim.start();
    Ok(Json(RunState {
        running: sim.is_running(),
        tick: sim.tick_index(),
    }))
}

// POST /stop
async fn stop_simulation(State(api_state): State<ApiState>) -> Result<Json<RunState>, StatusCode> {
    let mut sim = api_state.lock()?;
    sim.stop();
    Ok(Json(RunState {
        running: sim.is_running(),
        tick: sim.tick_index(),
    }))
}

// POST /reset - New grid, food and head
async fn reset_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStats>, ApiError> {
    let mut sim = api_state
        .lock()
        .map_err(poisoned)?;
    sim.reset().map_err(sim_error)?;
    Ok(Json(sim.stats()))
}

// POST /head - Place a new mould head at a tile
async fn place_head(
    State(api_state): State<ApiState>,
    Json(pos): Json<Position>,
) -> Result<Json<SimulationStats>, ApiError> {
    let mut sim = api_state
        .lock()
        .map_err(poisoned)?;
    sim.place_head(pos).map_err(sim_error)?;
    Ok(Json(sim.stats()))
}

// GET /config - Get simulation configuration
async fn get_config(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationConfig>, StatusCode> {
    let sim = api_state.lock()?;
    Ok(Json(sim.config().clone()))
}

// Create the API router
pub fn create_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/stats", get(get_stats))
        .route("/step", post(step_simulation))
        .route("/start", post(start_simulation))
        .route("/stop", post(stop_simulation))
        .route("/reset", post(reset_simulation))
        .route("/head", post(place_head))
        .route("/config", get(get_config))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

// Run the API server with automatic ticking
pub async fn run_server(api_state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(api_state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port, "mould headless API server listening");
    info!("endpoints: GET /state /stats /config, POST /step?steps=N /start /stop /reset /head");

    let tick_interval = {
        let sim = api_state.lock().map_err(|_| "simulation lock poisoned")?;
        Duration::from_millis(sim.config().tick_interval_ms)
    };

    // Spawn background task to drive ticks at a fixed rate
    let simulation_task = tokio::spawn(simulation_loop(api_state.clone(), tick_interval));

    // Run the server
    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    // Wait for either task to complete
    tokio::select! {
        result = server_handle => {
            result??;
        }
        _ = simulation_task => {
            error!("simulation loop ended unexpectedly");
        }
    }

    Ok(())
}

// Background task that ticks the simulation; `tick` itself ignores calls while stopped
async fn simulation_loop(api_state: ApiState, tick_interval: Duration) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Ok(mut sim) = api_state.simulation.lock() else {
            break;
        };
        sim.tick();
    }
}
