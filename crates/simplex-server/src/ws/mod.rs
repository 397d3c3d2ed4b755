//! WebSocket gateway: connection state, stream registry, task tracking,
//! frame dispatch, stream runners, and the per-client session loop.

pub mod connection;
pub mod dispatcher;
pub mod runner;
pub mod session;
pub mod streams;
pub mod tasks;
