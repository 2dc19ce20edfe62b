//! Domain models shared by the store, services, and API layers

pub mod movie;
