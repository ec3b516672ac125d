//! Common test utilities and helpers
//!
//! - In-memory [`ChatApi`](xfchat::client::ChatApi) and
//!   [`RealtimeTransport`](xfchat::client::RealtimeTransport) fakes
//! - Fixture builders
//! - Assertion and polling macros
#![allow(dead_code)]

#[macro_use]
pub mod assertions;
pub mod fake_api;
pub mod fake_transport;
pub mod fixtures;

pub use fake_api::*;
pub use fake_transport::*;
pub use fixtures::*;
