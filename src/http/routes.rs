//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::sim::{FleetError, VehicleState};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = match &state.config.client_origin {
        // Support multiple origins (comma-separated in CLIENT_ORIGIN)
        Some(origins) => {
            let allowed_origins: Vec<header::HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
                .collect();
            CorsLayer::new().allow_origin(allowed_origins)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/simdata", get(simdata_handler))
        .route("/simdata/:name", get(vehicle_handler))
        .route("/vehicles", post(add_vehicle_handler))
        .route("/vehicles/:name", delete(remove_vehicle_handler))
        .route("/vehicles/:name/actions", post(action_handler));

    Router::new()
        .merge(api_routes)
        // Dashboard and other static assets
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick: u64,
    vehicles: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick: state.fleet.snapshot().tick,
        vehicles: state.fleet.vehicle_count(),
    })
}

// ============================================================================
// State export
// ============================================================================

async fn simdata_handler(State(state): State<AppState>) -> Json<Vec<VehicleState>> {
    Json(state.fleet.snapshot().vehicles.clone())
}

async fn vehicle_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<VehicleState>, AppError> {
    state
        .fleet
        .vehicle(&name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("unknown vehicle: {}", name)))
}

// ============================================================================
// Fleet management
// ============================================================================

#[derive(Deserialize)]
struct AddVehicleRequest {
    name: String,
}

#[derive(Serialize)]
struct VehicleResponse {
    status: &'static str,
    name: String,
}

async fn add_vehicle_handler(
    State(state): State<AppState>,
    Json(req): Json<AddVehicleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim().to_string();
    state.fleet.add_vehicle(&name)?;
    info!(vehicle = %name, "Vehicle added");

    Ok((
        StatusCode::CREATED,
        Json(VehicleResponse {
            status: "added",
            name,
        }),
    ))
}

async fn remove_vehicle_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.fleet.remove_vehicle(&name)?;
    info!(vehicle = %name, "Vehicle removed");

    Ok((
        StatusCode::ACCEPTED,
        Json(VehicleResponse {
            status: "removed",
            name,
        }),
    ))
}

// ============================================================================
// Driver actions
// ============================================================================

#[derive(Deserialize)]
struct ActionRequest {
    action: String,
    #[serde(default)]
    payload: i64,
}

#[derive(Serialize)]
struct ActionResponse {
    status: &'static str,
    vehicle: String,
    action: String,
    payload: i64,
}

async fn action_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let action = state.fleet.submit_action(&name, &req.action, req.payload)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ActionResponse {
            status: "queued",
            vehicle: name,
            action: action.to_string(),
            payload: req.payload,
        }),
    ))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<FleetError> for AppError {
    fn from(err: FleetError) -> Self {
        let message = err.to_string();
        match err {
            FleetError::Action(_) | FleetError::InvalidName => AppError::BadRequest(message),
            FleetError::UnknownVehicle(_) => AppError::NotFound(message),
            FleetError::DuplicateVehicle(_) => AppError::Conflict(message),
            FleetError::Busy | FleetError::Stopped => AppError::Unavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::sim::FleetSimulation;

    fn setup() -> (Router, AppState, FleetSimulation) {
        let config = Config::from_lookup(|key| match key {
            "VEHICLES" => Some("Test1,Test2".to_string()),
            "TICK_INTERVAL_MS" => Some("1000".to_string()),
            _ => None,
        })
        .unwrap();
        let (state, simulation) = AppState::new(config);
        (build_router(state.clone()), state, simulation)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _state, mut sim) = setup();
        sim.tick();

        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tick"], 1);
        assert_eq!(body["vehicles"], 2);
    }

    #[tokio::test]
    async fn test_simdata_exports_fleet() {
        let (router, _state, mut sim) = setup();
        sim.tick();

        let (status, body) = send(&router, Method::GET, "/simdata", None).await;
        assert_eq!(status, StatusCode::OK);

        let vehicles = body.as_array().unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0]["name"], "Test1");
        assert_eq!(vehicles[0]["battery"]["wh"], 1317.12);
        assert_eq!(vehicles[0]["motor"]["motor-health"], 100);
        assert_eq!(vehicles[1]["name"], "Test2");
    }

    #[tokio::test]
    async fn test_single_vehicle_lookup() {
        let (router, _state, _sim) = setup();

        let (status, body) = send(&router, Method::GET, "/simdata/Test2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Test2");

        let (status, body) = send(&router, Method::GET, "/simdata/Ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Ghost"));
    }

    #[tokio::test]
    async fn test_action_is_queued_and_applied() {
        let (router, state, mut sim) = setup();

        let (status, body) = send(
            &router,
            Method::POST,
            "/vehicles/Test1/actions",
            Some(serde_json::json!({ "action": "set_throttle", "payload": 180 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["action"], "set_throttle");

        sim.tick();
        let vehicle = state.fleet.vehicle("Test1").unwrap();
        assert_eq!(vehicle.throttle, 100.0);
        assert!(vehicle.motor.speed > 0.0);
    }

    #[tokio::test]
    async fn test_action_errors_map_to_status() {
        let (router, _state, _sim) = setup();

        let (status, body) = send(
            &router,
            Method::POST,
            "/vehicles/Test1/actions",
            Some(serde_json::json!({ "action": "turbo_boost", "payload": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown action: turbo_boost");

        let (status, _) = send(
            &router,
            Method::POST,
            "/vehicles/Ghost/actions",
            Some(serde_json::json!({ "action": "accelerate", "payload": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stopped_simulation_is_unavailable() {
        let (router, _state, sim) = setup();
        drop(sim);

        let (status, _) = send(
            &router,
            Method::POST,
            "/vehicles/Test1/actions",
            Some(serde_json::json!({ "action": "accelerate", "payload": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_add_and_remove_vehicle() {
        let (router, state, mut sim) = setup();

        let (status, _) = send(
            &router,
            Method::POST,
            "/vehicles",
            Some(serde_json::json!({ "name": "Test3" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &router,
            Method::POST,
            "/vehicles",
            Some(serde_json::json!({ "name": "Test3" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        sim.tick();
        assert!(state.fleet.vehicle("Test3").unwrap().initialized);

        let (status, _) = send(&router, Method::DELETE, "/vehicles/Test1", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let (status, _) = send(&router, Method::DELETE, "/vehicles/Test1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        sim.tick();
        let (_, body) = send(&router, Method::GET, "/simdata", None).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Test2", "Test3"]);
    }
}
