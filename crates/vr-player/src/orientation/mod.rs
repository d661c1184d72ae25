//! Orientation server connection: WebSocket client delivering head motion.

pub mod client;
pub mod connection;
pub mod types;

pub use client::{OrientationClient, DEFAULT_RECONNECT_INTERVAL};
pub use types::{MotionSample, SocketEvent, SocketState};
