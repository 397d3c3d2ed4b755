//! # simplex-core
//!
//! Wire frame model and shared types for the simplex gateway.
//!
//! - Closed inbound/outbound frame enums with exhaustive dispatch
//! - Error categories surfaced in `metadata.error_type`
//! - Connection id generation

#![deny(unsafe_code)]

pub mod errors;
pub mod frames;
pub mod ids;

pub use errors::{ErrorType, FrameError};
pub use frames::{ClientFrame, FrameMetadata, ServerFrame};
pub use ids::ConnectionId;
