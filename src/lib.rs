//! datagen_bridge: WebSocket chat bridge to the DataGen sample-data agent.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod config;
pub mod gateway;
pub mod models;
pub mod session;
pub mod tools;
