//! End-to-end tests for the FSM harness against the in-memory backend

#[path = "../common/mod.rs"]
mod common;

mod composition;
mod names;
mod sampling;
mod scenarios;
mod suites;
