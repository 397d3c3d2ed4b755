//! # simplex-server
//!
//! Axum HTTP + `WebSocket` gateway multiplexing one connection into many
//! concurrently running, independently cancellable generation streams.
//!
//! - `WebSocket` session loop: one receive loop per connection, one writer
//!   task serializing all outbound frames, one task per in-flight stream
//! - Per-stream cancellation registry (`CancellationToken` entries)
//! - Per-connection task tracking with cooperative teardown
//! - Config frames delegated to `simplex-settings`, generation to
//!   `simplex-llm`
//! - HTTP: health check
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod ws;
