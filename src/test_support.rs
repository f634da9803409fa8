//! Helpers shared by the unit tests: an in-process fake backend.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral loopback port and return its base URL.
///
/// The server task lives until the test runtime shuts down.
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Gardener id the fake backend knows; any other id gets a 404.
pub const KNOWN_GARDENER: i64 = 1;

/// A small but complete greenhouse backend.
///
/// Per sensor type `n`, history holds two readings on 2024-01-01 at 10:00
/// and 10:30 with values `10n` and `10n + 4`. Date queries return data for
/// 2024-01-01 and 2023-12-31 only; 2024-02-01 answers with an error object
/// instead of an array. `empty_sensor` makes that type's history empty.
pub fn greenhouse_backend(empty_sensor: Option<u8>) -> Router {
    Router::new()
        .route(
            "/Greenhouse/gardener/{id}",
            get(|Path(id): Path<i64>| async move {
                if id != KNOWN_GARDENER {
                    return StatusCode::NOT_FOUND.into_response();
                }
                Json(json!({ "id": 10, "name": "Sunny Side", "gardenerId": id })).into_response()
            }),
        )
        .route(
            "/SensorReading/sensor/{id}",
            get(move |Path(id): Path<u8>| async move {
                if Some(id) == empty_sensor {
                    return Json(json!([]));
                }
                let base = f64::from(id) * 10.0;
                Json(json!([
                    { "id": i64::from(id) * 100, "date": "2024-01-01T10:00:00Z", "value": base, "sensorId": id },
                    { "id": i64::from(id) * 100 + 1, "date": "2024-01-01T10:30:00Z", "value": base + 4.0, "sensorId": id }
                ]))
            }),
        )
        .route("/SensorReading/date/{date}", get(readings_for_date))
        .route(
            "/Log",
            get(|| async {
                Json(json!([
                    { "id": 1, "date": "2024-01-01T11:30:00Z", "message": "reading", "sensorReadingId": 1, "greenhouseId": 10 },
                    { "id": 2, "date": "2024-01-01T11:40:00Z", "message": "pump", "waterPumpId": 1, "greenhouseId": 10 }
                ]))
            }),
        )
        .route(
            "/WaterPump",
            get(|| async {
                Json(json!([{
                    "id": 1,
                    "greenhouseId": 10,
                    "currentWaterLevel": 640,
                    "capacity": 1000,
                    "threshold": 200,
                    "autoWatering": true
                }]))
            }),
        )
}

async fn readings_for_date(Path(date): Path<String>) -> Response {
    let body: Value = match date.as_str() {
        "2024-01-01" => json!([
            { "id": 1, "date": "2024-01-01T01:00:00Z", "value": 20, "sensorId": 1 },
            { "id": 2, "date": "2024-01-01T02:00:00Z", "value": 22, "sensorId": 1 },
            { "id": 3, "date": "2024-01-01T03:00:00Z", "value": 50, "sensorId": 2 },
            { "id": 4, "date": "2024-01-01T03:00:00Z", "value": 60, "sensorId": 2 },
            { "id": 5, "date": "2024-01-01T04:00:00Z", "value": 300, "sensorId": 3 },
            { "id": 6, "date": "2024-01-01T05:00:00Z", "value": 40, "sensorId": 4 }
        ]),
        "2023-12-31" => json!([
            { "id": 7, "date": "2023-12-31T01:00:00Z", "value": 18, "sensorId": 1 },
            { "id": 8, "date": "2023-12-31T02:00:00Z", "value": 55, "sensorId": 2 },
            { "id": 9, "date": "2023-12-31T03:00:00Z", "value": 250, "sensorId": 3 },
            { "id": 10, "date": "2023-12-31T04:00:00Z", "value": 42, "sensorId": 4 }
        ]),
        "2024-02-01" => json!({ "message": "No readings for date" }),
        _ => json!([]),
    };
    Json(body).into_response()
}
