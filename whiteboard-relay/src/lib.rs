//! Whiteboard relay server library.
//!
//! Exposes the relay server for use in tests and embedding.
//! The relay accepts WebSocket connections on `/<room-name>` and forwards
//! every frame a client sends to the other clients in the same room,
//! without interpreting it.

pub mod config;
pub mod registry;
pub mod relay;
pub mod room;
