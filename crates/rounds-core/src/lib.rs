//! Core types, algorithms and trait definitions for the Rounds delivery
//! engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! schedule predicate, coverage resolver, cascade planner, route optimizer
//! and lifecycle state machine are all pure; storage sits behind
//! [`store::DeliveryStore`] and notifications behind
//! [`notify::NotificationSink`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cascade;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod route;
pub mod schedule;
pub mod store;
pub mod subscription;

pub use engine::Engine;
pub use error::{Error, Result};
