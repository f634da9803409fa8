//! Shared push-notification connection.
//!
//! A [`NotificationHub`] owns at most one live connection to the backend's
//! notification hub. The connection is opened by the first
//! [`Subscription`] and torn down when the last one is dropped.

pub mod signalr;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

use crate::gateway::{models::Notification, GatewayError};

pub use self::signalr::SignalRTransport;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid hub URL: {0}")]
    InvalidUrl(String),

    #[error("negotiation response carries no connection token")]
    MissingConnectionToken,

    #[error("handshake rejected: {0}")]
    Handshake(String),

    #[error("malformed hub record")]
    Malformed(#[source] serde_json::Error),

    #[error("notification stream interrupted")]
    Stream(#[source] reqwest::Error),

    #[error("connection closed by server: {0}")]
    Closed(String),
}

/// What a transport reports back to the hub while connected.
///
/// Each connection task gets its own link, so a task that outlives its
/// abort can't mark a later (or absent) connection as open.
#[derive(Debug, Clone)]
pub struct HubLink {
    sender: broadcast::Sender<Notification>,
    connected: Arc<AtomicBool>,
}

impl HubLink {
    pub(crate) fn new(sender: broadcast::Sender<Notification>) -> Self {
        Self {
            sender,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the connection as established.
    pub fn opened(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Fan a notification out to every live subscription.
    pub fn deliver(&self, notification: Notification) {
        // An error only means nobody is listening right now.
        let _ = self.sender.send(notification);
    }

    pub fn is_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn closed(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// One way of holding a connection to the notification hub.
#[async_trait]
pub trait HubTransport: Send + Sync + 'static {
    /// Connect and forward notifications into `link` until the connection
    /// ends. `Ok` means the server closed it cleanly.
    async fn run(&self, link: &HubLink) -> Result<(), HubError>;
}

/// Reference-counted manager of the push connection.
///
/// Cheap to clone. `subscribe` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    transport: Arc<dyn HubTransport>,
    sender: broadcast::Sender<Notification>,
    reconnect_delay: Duration,
    state: Mutex<HubState>,
}

#[derive(Default)]
struct HubState {
    subscribers: usize,
    connection: Option<Connection>,
}

struct Connection {
    task: JoinHandle<()>,
    link: HubLink,
}

impl HubInner {
    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationHub {
    pub fn new(transport: impl HubTransport, reconnect_delay: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                transport: Arc::new(transport),
                sender,
                reconnect_delay,
                state: Mutex::new(HubState::default()),
            }),
        }
    }

    /// Register interest in notifications, opening the connection if this
    /// is the first live subscription.
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.inner.sender.subscribe();

        let mut state = self.inner.state();
        state.subscribers += 1;
        if state.connection.is_none() {
            info!("First subscriber; opening notification hub connection");
            let link = HubLink::new(self.inner.sender.clone());
            let task = tokio::spawn(maintain(
                self.inner.transport.clone(),
                link.clone(),
                self.inner.reconnect_delay,
            ));
            state.connection = Some(Connection { task, link });
        }
        debug!(subscribers = state.subscribers, "Notification subscription added");
        drop(state);

        Subscription {
            receiver,
            hub: self.inner.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state().subscribers
    }

    /// Whether the transport currently reports an open connection.
    pub fn is_connected(&self) -> bool {
        self.inner
            .state()
            .connection
            .as_ref()
            .map_or(false, |c| c.link.is_open())
    }
}

/// Keep a connection open for as long as the task lives, reconnecting
/// after a fixed delay whenever it ends.
async fn maintain(transport: Arc<dyn HubTransport>, link: HubLink, delay: Duration) {
    loop {
        match transport.run(&link).await {
            Ok(()) => info!("Notification hub connection closed by server"),
            Err(e) => warn!(error = %e, "Notification hub connection failed"),
        }
        link.closed();
        debug!(delay_secs = delay.as_secs_f64(), "Reconnecting to notification hub after delay");
        time::sleep(delay).await;
    }
}

/// A live interest in push notifications. Dropping it releases the
/// connection once no other subscription remains.
pub struct Subscription {
    receiver: broadcast::Receiver<Notification>,
    hub: Arc<HubInner>,
}

impl Subscription {
    /// Wait for the next notification. Notifications missed because this
    /// subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagged; dropping missed notifications");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut state = self.hub.state();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers == 0 {
            if let Some(connection) = state.connection.take() {
                info!("Last subscriber gone; closing notification hub connection");
                connection.task.abort();
                connection.link.closed();
            }
        }
    }
}
