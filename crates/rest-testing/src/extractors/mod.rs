//! Axum extractors for request entities.
//!
//! - [`Entity`] - reads a JSON request body with the deployment's mapper
//! - [`Valid`] - reads an entity and checks its constraints

mod entity;

pub use entity::{Entity, Valid};
