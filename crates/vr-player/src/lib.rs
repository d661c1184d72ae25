//! Playback coordination core for a desktop 360° video player.
//!
//! A [`Coordinator`](coordinator::Coordinator) owns the media engine and runs a
//! single event context. Head orientation arrives from a WebSocket orientation
//! server and is applied to the engine viewpoint once per video frame.

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod filters;
pub mod frame_clock;
pub mod host;
pub mod logging;
pub mod loop_mode;
pub mod orientation;
pub mod player;
pub mod playlist;
pub mod probe;
pub mod settings;
pub mod sizer;
pub mod surface;
pub mod timer;
pub mod viewpoint;

#[cfg(test)]
mod testing;
