use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::DashboardView;

/// The most recently compiled dashboard, shared between the refresh loop
/// and the HTTP handlers.
#[derive(Debug, Clone, Default)]
pub struct DashboardCache {
    inner: Arc<RwLock<Option<DashboardView>>>,
}

impl DashboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached view.
    pub async fn update(&self, view: DashboardView) {
        *self.inner.write().await = Some(view);
    }

    /// Snapshot of the cached view, if one has been compiled yet.
    pub async fn get(&self) -> Option<DashboardView> {
        self.inner.read().await.clone()
    }

    pub async fn compiled_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.as_ref().map(|v| v.compiled_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::gateway::models::Greenhouse;

    fn view(name: &str) -> DashboardView {
        DashboardView {
            greenhouse: Greenhouse {
                id: 1,
                name: name.into(),
                gardener_id: Some(1),
            },
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            compiled_at: Utc::now(),
            sensors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn starts_empty_and_keeps_latest() {
        let cache = DashboardCache::new();
        assert!(cache.get().await.is_none());
        assert!(cache.compiled_at().await.is_none());

        cache.update(view("first")).await;
        let shared = cache.clone();
        shared.update(view("second")).await;

        assert_eq!(cache.get().await.unwrap().greenhouse.name, "second");
        assert!(cache.compiled_at().await.is_some());
    }
}
