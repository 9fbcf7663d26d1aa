//! Stub HTTP server for exercising REST clients in tests.
//!
//! A [`StubServer`] answers one registered path with either a fixed
//! [`StubReply`] or a custom axum handler, and every other path with a 404.
//! It serves until its [`StopHandle`] is signalled.

pub mod config;
mod handler;
pub mod server;

pub use config::{StubConfig, StubReply};
pub use handler::NOT_FOUND_BODY;
pub use server::{BoundStub, StopHandle, StubError, StubServer};
