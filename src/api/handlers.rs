use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use utoipa::OpenApi;

use super::{
    dto::{
        AggregateDto, AverageDto, AverageStatus, BucketDto, ChartQuery, DashboardDto, DateQuery,
        LogEntryDto, LogKindDto, ReadingDto, SensorSummaryDto, StatusDto, WaterPumpDto,
    },
    errors::{ApiError, AppError},
    AppState,
};
use crate::{
    aggregation::{self, Timeframe},
    gateway::{
        models::{SensorSelector, SensorType},
        Fetched,
    },
};

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ApiError::InvalidDate(raw.to_owned()))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// The most recently compiled dashboard.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Compiled dashboard", body = DashboardDto),
        (status = 503, description = "No dashboard compiled yet"),
    ),
    tag = "dashboard"
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<DashboardDto>, AppError> {
    let view = state.cache.get().await.ok_or(ApiError::DashboardNotReady)?;
    Ok(Json(view.into()))
}

/// Compile the dashboard now and publish it to the cache.
#[utoipa::path(
    post,
    path = "/dashboard/refresh",
    responses(
        (status = 200, description = "Freshly compiled dashboard", body = DashboardDto),
        (status = 502, description = "A backend request failed"),
    ),
    tag = "dashboard"
)]
pub async fn refresh_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardDto>, AppError> {
    let view = state.compiler.compile(state.gardener_id, Utc::now()).await?;
    state.cache.update(view.clone()).await;
    Ok(Json(view.into()))
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Chart buckets for one sensor's full history.
#[utoipa::path(
    get,
    path = "/sensors/{sensor}/chart",
    params(
        ("sensor" = String, Path, description = "temperature, humidity, light or soilMoisture"),
        ChartQuery,
    ),
    responses(
        (status = 200, description = "Oldest-first buckets", body = Vec<BucketDto>),
        (status = 400, description = "Unknown sensor or timeframe"),
        (status = 502, description = "Backend request failed"),
    ),
    tag = "sensors"
)]
pub async fn get_sensor_chart(
    State(state): State<AppState>,
    Path(sensor): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Vec<BucketDto>>, AppError> {
    let sensor: SensorType = sensor.parse()?;
    let timeframe: Timeframe = query.timeframe.as_deref().unwrap_or("24h").parse()?;

    let history = state.gateway.readings_by_sensor(sensor).await?;
    let buckets = aggregation::bucketize(&history, timeframe, Utc::now());
    Ok(Json(buckets.into_iter().map(Into::into).collect()))
}

/// Whether a sensor (or every sensor, for `all`) has reported recently.
#[utoipa::path(
    get,
    path = "/sensors/{sensor}/status",
    params(
        ("sensor" = String, Path, description = "A sensor name or `all`"),
    ),
    responses(
        (status = 200, description = "On/off status", body = StatusDto),
        (status = 400, description = "Unknown sensor"),
        (status = 502, description = "Backend request failed"),
    ),
    tag = "sensors"
)]
pub async fn get_sensor_status(
    State(state): State<AppState>,
    Path(selector): Path<String>,
) -> Result<Json<StatusDto>, AppError> {
    let selector: SensorSelector = selector.parse()?;
    let on = state.status.status(selector, Utc::now()).await?;
    Ok(Json(StatusDto {
        selector: selector.to_string(),
        on,
    }))
}

/// Average of one sensor over a date (today when omitted).
#[utoipa::path(
    get,
    path = "/sensors/{sensor}/average",
    params(
        ("sensor" = String, Path, description = "A sensor name or `all`"),
        DateQuery,
    ),
    responses(
        (status = 200, description = "Average, or no_data", body = AverageDto),
        (status = 400, description = "Unknown sensor or malformed date"),
        (status = 502, description = "Backend request failed"),
    ),
    tag = "sensors"
)]
pub async fn get_sensor_average(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<AverageDto>, AppError> {
    let selector: SensorSelector = selector.parse()?;
    let date = match query.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };

    let dto = match state.gateway.sensor_average_by_date(selector, date).await {
        Fetched::Data(avg) => AverageDto {
            status: AverageStatus::Ok,
            average: Some(avg.into()),
        },
        Fetched::Empty => AverageDto {
            status: AverageStatus::NoData,
            average: None,
        },
        Fetched::Failed(e) => return Err(e.into()),
    };
    Ok(Json(dto))
}

// ---------------------------------------------------------------------------
// Logs & pumps
// ---------------------------------------------------------------------------

/// Backend log entries, optionally for one date. Empty when there are none.
#[utoipa::path(
    get,
    path = "/logs",
    params(DateQuery),
    responses(
        (status = 200, description = "Log entries", body = Vec<LogEntryDto>),
        (status = 400, description = "Malformed date"),
        (status = 502, description = "Backend request failed"),
    ),
    tag = "logs"
)]
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<LogEntryDto>>, AppError> {
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let logs = match state.gateway.logs(date).await {
        Fetched::Data(logs) => logs,
        Fetched::Empty => Vec::new(),
        Fetched::Failed(e) => return Err(e.into()),
    };
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/water-pumps",
    responses(
        (status = 200, description = "Water pumps", body = Vec<WaterPumpDto>),
        (status = 502, description = "Backend request failed"),
    ),
    tag = "water-pumps"
)]
pub async fn get_water_pumps(
    State(state): State<AppState>,
) -> Result<Json<Vec<WaterPumpDto>>, AppError> {
    let pumps = state.gateway.water_pumps().await?;
    Ok(Json(pumps.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec struct (used in api/mod.rs)
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_dashboard,
        refresh_dashboard,
        get_sensor_chart,
        get_sensor_status,
        get_sensor_average,
        get_logs,
        get_water_pumps,
        health,
    ),
    components(schemas(
        DashboardDto,
        SensorSummaryDto,
        ReadingDto,
        AggregateDto,
        BucketDto,
        StatusDto,
        AverageDto,
        AverageStatus,
        LogEntryDto,
        LogKindDto,
        WaterPumpDto,
    )),
    tags(
        (name = "dashboard", description = "Compiled dashboard view"),
        (name = "sensors", description = "Charts, status and averages per sensor"),
        (name = "logs", description = "Backend event log"),
        (name = "water-pumps", description = "Water pump state"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = "Greenhouse Dashboard API",
        version = "0.1.0",
        description = "Dashboard view models compiled from the greenhouse backend"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, routing::get, Json, Router};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        dashboard::DashboardCache,
        gateway::GatewayClient,
        test_support::{greenhouse_backend, spawn_backend, KNOWN_GARDENER},
    };

    async fn test_server(backend: Router, gardener_id: i64) -> TestServer {
        let base = spawn_backend(backend).await;
        let state = AppState::new(
            GatewayClient::with_base_url(&base, None),
            DashboardCache::new(),
            gardener_id,
        );
        TestServer::new(router(state)).unwrap()
    }

    // -----------------------------------------------------------------------
    // /dashboard
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn dashboard_is_unavailable_until_compiled() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        let resp = server.get("/dashboard").await;
        resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let resp = server.post("/dashboard/refresh").await;
        resp.assert_status_ok();
        let refreshed: Value = resp.json();
        assert_eq!(refreshed["greenhouse_name"], "Sunny Side");
        assert_eq!(refreshed["sensors"].as_array().unwrap().len(), 4);
        assert_eq!(refreshed["sensors"][3]["sensor"], "soilMoisture");
        assert_eq!(refreshed["sensors"][0]["latest"]["value"], 14.0);

        let resp = server.get("/dashboard").await;
        resp.assert_status_ok();
        let cached: Value = resp.json();
        assert_eq!(cached["compiled_at"], refreshed["compiled_at"]);
    }

    #[tokio::test]
    async fn refresh_for_unknown_gardener_is_bad_gateway() {
        let server = test_server(greenhouse_backend(None), 77).await;
        let resp = server.post("/dashboard/refresh").await;
        resp.assert_status(StatusCode::BAD_GATEWAY);
        let body: Value = resp.json();
        assert_eq!(body["backendStatus"], 404);
    }

    // -----------------------------------------------------------------------
    // /sensors/...
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn chart_has_fixed_bucket_count() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        let resp = server.get("/sensors/temperature/chart").await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Vec<Value>>().len(), 24);

        let resp = server
            .get("/sensors/soilMoisture/chart")
            .add_query_param("timeframe", "30d")
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Vec<Value>>().len(), 30);
    }

    #[tokio::test]
    async fn bad_sensor_or_timeframe_is_bad_request() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        server
            .get("/sensors/pressure/chart")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/sensors/light/chart")
            .add_query_param("timeframe", "1y")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/sensors/pressure/status")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_reports_selector() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        // The fake log is dated 2024-01-01, so everything reads as off today.
        let resp = server.get("/sensors/temperature/status").await;
        resp.assert_status_ok();
        resp.assert_json(&json!({ "selector": "temperature", "on": false }));

        let resp = server.get("/sensors/all/status").await;
        resp.assert_json(&json!({ "selector": "all", "on": false }));
    }

    #[tokio::test]
    async fn average_distinguishes_data_from_no_data() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        let resp = server
            .get("/sensors/temperature/average")
            .add_query_param("date", "2024-01-01")
            .await;
        resp.assert_status_ok();
        resp.assert_json(&json!({
            "status": "ok",
            "average": { "date": "2024-01-01", "value": 21.0, "sensor": "temperature" }
        }));

        let resp = server
            .get("/sensors/temperature/average")
            .add_query_param("date", "2020-05-05")
            .await;
        resp.assert_json(&json!({ "status": "no_data" }));

        // Backend answers this date with an error object, not an array
        let resp = server
            .get("/sensors/temperature/average")
            .add_query_param("date", "2024-02-01")
            .await;
        resp.assert_status_ok();
        resp.assert_json(&json!({ "status": "no_data" }));

        let resp = server
            .get("/sensors/all/average")
            .add_query_param("date", "2024-01-01")
            .await;
        resp.assert_json(&json!({ "status": "no_data" }));

        server
            .get("/sensors/temperature/average")
            .add_query_param("date", "01/01/2024")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    // -----------------------------------------------------------------------
    // /logs, /water-pumps, /health
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn logs_are_classified() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        let resp = server.get("/logs").await;
        resp.assert_status_ok();
        let logs: Vec<Value> = resp.json();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["kind"], "sensor");
        assert_eq!(logs[1]["kind"], "watering");
    }

    #[tokio::test]
    async fn logs_without_data_are_empty_list() {
        let backend = Router::new().route("/Log/{date}", get(|| async { Json(json!({ "message": "none" })) }));
        let server = test_server(backend, KNOWN_GARDENER).await;

        let resp = server.get("/logs").add_query_param("date", "2024-02-02").await;
        resp.assert_status_ok();
        resp.assert_json(&json!([]));
    }

    #[tokio::test]
    async fn water_pumps_include_fill_level() {
        let server = test_server(greenhouse_backend(None), KNOWN_GARDENER).await;

        let resp = server.get("/water-pumps").await;
        resp.assert_status_ok();
        let pumps: Vec<Value> = resp.json();
        assert_eq!(pumps[0]["fill_percent"], 64.0);
        assert_eq!(pumps[0]["auto_watering"], true);
    }

    #[tokio::test]
    async fn health_and_openapi_are_served() {
        let server = test_server(Router::new(), KNOWN_GARDENER).await;

        server.get("/health").await.assert_json(&json!({ "status": "ok" }));

        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let doc: Value = resp.json();
        assert!(doc["paths"]["/sensors/{sensor}/status"].is_object());
        assert!(doc["paths"]["/dashboard/refresh"]["post"].is_object());
    }
}
