//! Reelmatch - movie recommendations over precomputed embeddings
//!
//! Finds movies similar to a known title, or matching a free-text
//! description, by nearest-neighbor search in a LanceDB collection.

pub mod cli;
pub mod config;
pub mod error;
pub mod server;
