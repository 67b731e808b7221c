//! Test harness utilities for running scenarios against an in-process service.
//!
//! [`MockService`] implements the full HTTP/WebSocket contract the harness
//! verifies, on a random local port, with optional fault injection.

#![allow(dead_code)]

mod service;
mod websocket;

pub use service::{Fault, MockService};
