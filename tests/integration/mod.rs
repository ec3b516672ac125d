//! Integration tests for the synchronization engine
//!
//! Sessions run against the in-memory fakes in `tests/common`, plus one
//! end-to-end pass over HTTP and SSE against `wiremock`.

#[macro_use]
#[path = "../common/mod.rs"]
mod common;

mod reconciliation_test;
