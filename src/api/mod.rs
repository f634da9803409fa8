pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{
    dashboard::{DashboardCache, DashboardCompiler},
    gateway::GatewayClient,
    status::StatusInferencer,
};

/// Shared handles every handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub gateway: GatewayClient,
    pub cache: DashboardCache,
    pub compiler: DashboardCompiler,
    pub status: StatusInferencer,
    pub gardener_id: i64,
}

impl AppState {
    pub fn new(gateway: GatewayClient, cache: DashboardCache, gardener_id: i64) -> Self {
        Self {
            compiler: DashboardCompiler::new(gateway.clone()),
            status: StatusInferencer::new(gateway.clone()),
            gateway,
            cache,
            gardener_id,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/dashboard/refresh", post(handlers::refresh_dashboard))
        .route("/sensors/{sensor}/chart", get(handlers::get_sensor_chart))
        .route("/sensors/{sensor}/status", get(handlers::get_sensor_status))
        .route("/sensors/{sensor}/average", get(handlers::get_sensor_average))
        .route("/logs", get(handlers::get_logs))
        .route("/water-pumps", get(handlers::get_water_pumps))
        .route("/health", get(handlers::health))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
