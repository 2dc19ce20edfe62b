//! Storage, embedding, and retrieval services

pub mod context;
pub mod embeddings;
pub mod ingest;
pub mod lancedb;
pub mod recommender;
pub mod vector_store;
