//! HTTP API handlers for sitelapse-api

pub mod dates;
pub mod error;
pub mod health;
pub mod layers;
pub mod progress;

pub use dates::get_delivery_dates;
pub use error::ApiError;
pub use health::health_check;
pub use layers::get_layer;
pub use progress::query_progress;
