//! REST API module for reelmatch
//!
//! Exposes the recommendation service over HTTP for conversational agents.
//! Uses axum for routing and schemars for the tool descriptors served at
//! `/tools`.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routing;
pub mod services;
pub mod startup;
pub mod types;
