//! Network layer: wire DTOs and the REST client.

pub mod api;
pub mod types;
