//! ArcGIS Online implementation of the feature-layer services.

mod client;
pub mod types;

pub use client::ArcGisClient;
