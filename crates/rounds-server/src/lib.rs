//! HTTP server wiring for Rounds.
//!
//! Mounts the [`rounds_api`] router over an [`Engine`] backed by SQLite, with
//! request tracing and a queue-backed customer notifier.

pub mod notify;

pub use notify::{ChannelNotifier, Webhook, spawn_notifier};

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use rounds_core::{Engine, notify::NotificationSink, store::DeliveryStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `rounds.toml` and
/// `ROUNDS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  /// When set, every customer notification is POSTed here as JSON.
  #[serde(default)]
  pub notify_webhook_url:    Option<String>,
  #[serde(default = "default_queue_capacity")]
  pub notify_queue_capacity: usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("rounds.db") }
fn default_queue_capacity() -> usize { 1024 }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S, N>(engine: Arc<Engine<S, N>>) -> Router
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  rounds_api::api_router(engine).layer(TraceLayer::new_for_http())
}
