use reqwest::Method;

use super::{
    models::{
        ConfirmPasswordRequest, Greenhouse, GreenhouseNameUpdate, Notification,
        NotificationPreference, NotificationPreferenceToggle,
    },
    GatewayClient, GatewayError,
};

impl GatewayClient {
    /// Re-authenticate the current session before a sensitive action.
    ///
    /// A wrong password surfaces as `RequestFailed` with the backend's status
    /// (typically 401).
    pub async fn confirm_password(&self, password: &str) -> Result<(), GatewayError> {
        self.send_unit(
            Method::POST,
            "password confirmation",
            "/Auth/confirm-password",
            Some(&ConfirmPasswordRequest { password }),
        )
        .await
    }

    pub async fn greenhouse_for_gardener(&self, gardener_id: i64) -> Result<Greenhouse, GatewayError> {
        self.get_json("greenhouse", &format!("/Greenhouse/gardener/{gardener_id}"))
            .await
    }

    pub async fn update_greenhouse_name(
        &self,
        greenhouse_id: i64,
        name: &str,
    ) -> Result<(), GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest {
                resource: "greenhouse name update",
                reason: "name must not be blank".to_owned(),
            });
        }
        self.send_unit(
            Method::PUT,
            "greenhouse name update",
            &format!("/Greenhouse/update/{greenhouse_id}"),
            Some(&GreenhouseNameUpdate { name: name.trim() }),
        )
        .await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, GatewayError> {
        self.get_json("notifications", "/Notification").await
    }

    pub async fn notification_preferences(&self) -> Result<Vec<NotificationPreference>, GatewayError> {
        self.get_json("notification preferences", "/notificationpref")
            .await
    }

    /// Flip the enabled flag of the preference named `kind`.
    pub async fn toggle_notification_preference(&self, kind: &str) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PATCH,
            "notification preference toggle",
            "/notificationpref/toggle",
            Some(&NotificationPreferenceToggle { kind }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        http::StatusCode,
        routing::{get, patch, post, put},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::spawn_backend;

    #[tokio::test]
    async fn wrong_password_is_request_failed() {
        let router = Router::new().route(
            "/Auth/confirm-password",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "hunter2" {
                    StatusCode::OK
                } else {
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, Some("t".into()));

        client.confirm_password("hunter2").await.unwrap();
        let err = client.confirm_password("guess").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn greenhouse_name_update_sends_trimmed_name() {
        let bodies = Arc::new(Mutex::new(Vec::<Value>::new()));
        let sink = bodies.clone();
        let router = Router::new().route(
            "/Greenhouse/update/{id}",
            put(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, None);

        client.update_greenhouse_name(4, "  Glasshouse ").await.unwrap();
        assert_eq!(bodies.lock().unwrap()[0], json!({ "name": "Glasshouse" }));
    }

    #[tokio::test]
    async fn blank_greenhouse_name_is_rejected_locally() {
        let client = GatewayClient::with_base_url("http://127.0.0.1:9", None);
        let err = client.update_greenhouse_name(4, "   ").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn notification_preferences_round_trip() {
        let router = Router::new()
            .route(
                "/notificationpref",
                get(|| async {
                    Json(json!([
                        { "type": "Temperature", "isEnabled": true, "gardenerId": 1 },
                        { "type": "Humidity", "isEnabled": false }
                    ]))
                }),
            )
            .route(
                "/notificationpref/toggle",
                patch(|Json(body): Json<Value>| async move {
                    assert_eq!(body["type"], "Humidity");
                    StatusCode::OK
                }),
            )
            .route(
                "/Notification",
                get(|| async {
                    Json(json!([{ "id": 3, "type": "Alert", "message": "Too hot", "timeStamp": "2024-01-01T10:00:00", "isRead": false }]))
                }),
            );
        let base = spawn_backend(router).await;
        let client = GatewayClient::with_base_url(&base, None);

        let prefs = client.notification_preferences().await.unwrap();
        assert_eq!(prefs.len(), 2);
        assert!(prefs[0].is_enabled);
        assert_eq!(prefs[1].gardener_id, None);

        client.toggle_notification_preference("Humidity").await.unwrap();

        let notes = client.notifications().await.unwrap();
        assert_eq!(notes[0].message, "Too hot");
        assert_eq!(notes[0].kind, "Alert");
    }
}
