//! Queue-backed [`NotificationSink`] and the worker that drains it.
//!
//! Lifecycle handlers push into a bounded channel and return immediately.
//! A single background task logs each notification and, when a webhook is
//! configured, POSTs it as JSON. Delivery failures are logged and dropped.

use std::time::Duration;

use anyhow::{Context as _, anyhow};
use reqwest::Client;
use rounds_core::notify::{Notification, NotificationSink};
use tokio::{
  sync::mpsc::{self, error::TrySendError},
  task::JoinHandle,
};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Sending half of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
  /// A notifier and the receiver its worker should drain. A zero capacity
  /// is raised to one.
  pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }
}

impl NotificationSink for ChannelNotifier {
  fn notify(&self, notification: Notification) {
    match self.tx.try_send(notification) {
      Ok(()) => {}
      Err(TrySendError::Full(n)) => tracing::warn!(
        obligation_id = %n.obligation_id(),
        "notification queue full; dropping"
      ),
      Err(TrySendError::Closed(n)) => tracing::warn!(
        obligation_id = %n.obligation_id(),
        "notification worker gone; dropping"
      ),
    }
  }
}

/// Outbound JSON webhook.
#[derive(Debug, Clone)]
pub struct Webhook {
  client: Client,
  url:    String,
}

impl Webhook {
  pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(WEBHOOK_TIMEOUT)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, url: url.into() })
  }

  async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
    let resp = self
      .client
      .post(&self.url)
      .json(notification)
      .send()
      .await
      .with_context(|| format!("POST {} failed", self.url))?;
    if !resp.status().is_success() {
      return Err(anyhow!("POST {} → {}", self.url, resp.status()));
    }
    Ok(())
  }
}

fn event_name(notification: &Notification) -> &'static str {
  match notification {
    Notification::DeliveryCompleted { .. } => "delivery_completed",
    Notification::DeliveryFailed { .. } => "delivery_failed",
  }
}

/// Drain `rx` until every sender is dropped.
pub async fn run_worker(mut rx: mpsc::Receiver<Notification>, webhook: Option<Webhook>) {
  while let Some(notification) = rx.recv().await {
    let obligation_id = notification.obligation_id();
    let event = event_name(&notification);
    tracing::info!(%obligation_id, event, "customer notification");

    if let Some(hook) = &webhook
      && let Err(e) = hook.deliver(&notification).await
    {
      tracing::warn!(%obligation_id, event, error = %e, "webhook delivery failed");
    }
  }
  tracing::debug!("notification worker stopped");
}

/// Create the queue and spawn its worker on the current runtime.
pub fn spawn_notifier(
  capacity: usize,
  webhook: Option<Webhook>,
) -> (ChannelNotifier, JoinHandle<()>) {
  let (notifier, rx) = ChannelNotifier::channel(capacity);
  let handle = tokio::spawn(run_worker(rx, webhook));
  (notifier, handle)
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Json, Router, extract::State, routing::post};
  use serde_json::Value;
  use tokio::net::TcpListener;
  use uuid::Uuid;

  use super::*;

  fn failed() -> Notification {
    Notification::DeliveryFailed {
      customer_id:   Uuid::new_v4(),
      obligation_id: Uuid::new_v4(),
      reason:        "Customer not available".into(),
    }
  }

  #[tokio::test]
  async fn notifications_reach_the_receiver() {
    let (notifier, mut rx) = ChannelNotifier::channel(4);
    let n = failed();
    notifier.notify(n.clone());
    assert_eq!(rx.recv().await, Some(n));
  }

  #[tokio::test]
  async fn full_queue_drops_without_blocking() {
    let (notifier, mut rx) = ChannelNotifier::channel(1);
    let first = failed();
    notifier.notify(first.clone());
    notifier.notify(failed());
    assert_eq!(rx.recv().await, Some(first));
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn closed_queue_is_tolerated() {
    let (notifier, rx) = ChannelNotifier::channel(1);
    drop(rx);
    notifier.notify(failed());
  }

  #[tokio::test]
  async fn worker_posts_to_webhook_and_stops_when_senders_drop() {
    let received: Arc<Mutex<Vec<Value>>> = Arc::default();
    let app = Router::new()
      .route(
        "/hook",
        post(|State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
          seen.lock().unwrap().push(body);
        }),
      )
      .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let webhook = Webhook::new(format!("http://{addr}/hook")).unwrap();
    let (notifier, worker) = spawn_notifier(8, Some(webhook));
    let n = failed();
    notifier.notify(n.clone());
    drop(notifier);
    worker.await.unwrap();

    let seen = received.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["event"], "delivery_failed");
    assert_eq!(seen[0]["obligation_id"], n.obligation_id().to_string());
  }
}
