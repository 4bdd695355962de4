//! HTTP handlers, one module per resource.

pub mod health;
pub mod resolve;
pub mod rules;
pub mod specs;

pub use crate::error::ServerResult;
