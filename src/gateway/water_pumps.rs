use reqwest::Method;

use super::{
    models::{
        AutoWateringUpdate, NewWaterPump, PumpCapacityUpdate, PumpThresholdUpdate, WaterLevel,
        WaterLevelUpdate, WaterPump,
    },
    GatewayClient, GatewayError,
};

impl GatewayClient {
    pub async fn water_pumps(&self) -> Result<Vec<WaterPump>, GatewayError> {
        self.get_json("water pumps", "/WaterPump").await
    }

    pub async fn water_pump(&self, pump_id: i64) -> Result<WaterPump, GatewayError> {
        self.get_json("water pump", &format!("/WaterPump/{pump_id}"))
            .await
    }

    pub async fn create_water_pump(&self, pump: &NewWaterPump) -> Result<WaterPump, GatewayError> {
        if pump.threshold > pump.capacity {
            return Err(GatewayError::InvalidRequest {
                resource: "water pump creation",
                reason: format!(
                    "threshold {} exceeds capacity {}",
                    pump.threshold, pump.capacity
                ),
            });
        }
        self.send_json(Method::POST, "water pump creation", "/WaterPump", pump)
            .await
    }

    pub async fn delete_water_pump(&self, pump_id: i64) -> Result<(), GatewayError> {
        self.send_unit::<()>(
            Method::DELETE,
            "water pump deletion",
            &format!("/WaterPump/{pump_id}"),
            None,
        )
        .await
    }

    pub async fn water_level(&self, pump_id: i64) -> Result<WaterLevel, GatewayError> {
        self.get_json("water level", &format!("/WaterPump/{pump_id}/water-level"))
            .await
    }

    /// Record `amount` of water added to the pump's tank.
    pub async fn add_water(&self, pump_id: i64, amount: f64) -> Result<(), GatewayError> {
        if amount <= 0.0 {
            return Err(GatewayError::InvalidRequest {
                resource: "water level update",
                reason: format!("amount must be positive, got {amount}"),
            });
        }
        self.send_unit(
            Method::PATCH,
            "water level update",
            &format!("/WaterPump/{pump_id}/water-level"),
            Some(&WaterLevelUpdate { amount }),
        )
        .await
    }

    pub async fn update_pump_threshold(&self, pump_id: i64, threshold: f64) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PATCH,
            "water pump threshold update",
            &format!("/WaterPump/{pump_id}/threshold"),
            Some(&PumpThresholdUpdate { threshold }),
        )
        .await
    }

    pub async fn update_pump_capacity(&self, pump_id: i64, capacity: f64) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PATCH,
            "water pump capacity update",
            &format!("/WaterPump/{pump_id}/capacity"),
            Some(&PumpCapacityUpdate { capacity }),
        )
        .await
    }

    pub async fn set_auto_watering(&self, pump_id: i64, enabled: bool) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PATCH,
            "auto-watering update",
            &format!("/WaterPump/{pump_id}/auto-watering"),
            Some(&AutoWateringUpdate { auto_watering: enabled }),
        )
        .await
    }

    /// Run the pump once, regardless of its automation setting.
    pub async fn trigger_manual_watering(&self, pump_id: i64) -> Result<(), GatewayError> {
        self.send_unit::<()>(
            Method::POST,
            "manual watering",
            &format!("/WaterPump/{pump_id}/manual-watering"),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::Path,
        http::{Method as HttpMethod, StatusCode, Uri},
        routing::{any, get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::spawn_backend;

    fn pump_json(id: i64) -> Value {
        json!({
            "id": id,
            "greenhouseId": 1,
            "currentWaterLevel": 750,
            "capacity": 1000,
            "threshold": 200,
            "autoWatering": true
        })
    }

    #[tokio::test]
    async fn list_get_and_level() {
        let router = Router::new()
            .route("/WaterPump", get(|| async { Json(json!([pump_json(1), pump_json(2)])) }))
            .route(
                "/WaterPump/{id}",
                get(|Path(id): Path<i64>| async move { Json(pump_json(id)) }),
            )
            .route(
                "/WaterPump/{id}/water-level",
                get(|| async { Json(json!({ "currentWaterLevel": 750, "capacity": 1000 })) }),
            );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, None);

        let pumps = client.water_pumps().await.unwrap();
        assert_eq!(pumps.len(), 2);
        assert!(pumps[0].auto_watering);

        let pump = client.water_pump(7).await.unwrap();
        assert_eq!(pump.id, 7);
        assert_eq!(pump.current_water_level, 750.0);

        let level = client.water_level(7).await.unwrap();
        assert_eq!(level.capacity, Some(1000.0));
    }

    #[tokio::test]
    async fn updates_hit_expected_routes_with_bodies() {
        let calls = Arc::new(Mutex::new(Vec::<(String, String, Value)>::new()));
        let sink = calls.clone();
        let router = Router::new().route(
            "/WaterPump/{id}/{action}",
            any(move |method: HttpMethod, uri: Uri, body: String| {
                let sink = sink.clone();
                async move {
                    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
                    sink.lock()
                        .unwrap()
                        .push((method.to_string(), uri.path().to_owned(), body));
                    StatusCode::OK
                }
            }),
        );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, None);

        client.update_pump_threshold(3, 150.0).await.unwrap();
        client.update_pump_capacity(3, 2000.0).await.unwrap();
        client.set_auto_watering(3, false).await.unwrap();
        client.add_water(3, 250.0).await.unwrap();
        client.trigger_manual_watering(3).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("PATCH".into(), "/WaterPump/3/threshold".into(), json!({ "threshold": 150.0 }))
        );
        assert_eq!(calls[1].2, json!({ "capacity": 2000.0 }));
        assert_eq!(calls[2].2, json!({ "autoWatering": false }));
        assert_eq!(calls[3].2, json!({ "amount": 250.0 }));
        assert_eq!(
            calls[4],
            ("POST".into(), "/WaterPump/3/manual-watering".into(), Value::Null)
        );
    }

    #[tokio::test]
    async fn create_validates_and_posts() {
        let router = Router::new().route(
            "/WaterPump",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["greenhouseId"], 1);
                (StatusCode::CREATED, Json(pump_json(9)))
            }),
        );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, None);

        let bad = NewWaterPump {
            greenhouse_id: 1,
            capacity: 100.0,
            threshold: 500.0,
            auto_watering: false,
        };
        assert!(matches!(
            client.create_water_pump(&bad).await,
            Err(GatewayError::InvalidRequest { .. })
        ));

        let good = NewWaterPump { threshold: 50.0, ..bad };
        assert_eq!(client.create_water_pump(&good).await.unwrap().id, 9);
    }

    #[tokio::test]
    async fn non_positive_water_amount_is_rejected() {
        let client = GatewayClient::with_base_url("http://127.0.0.1:9", None);
        assert!(client.add_water(1, 0.0).await.is_err());
    }
}
