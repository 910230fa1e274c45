//! Core domain logic for client home/work analytics.
//!
//! This crate contains the fundamental types and logic for:
//! - Event admission: coordinate sanity rules and period windows
//! - Place inference: night/workday classification and grid clustering
//! - Activity histograms, heatmap points and meeting-planner context

mod activity;
mod classify;
mod cluster;
pub mod config;
pub mod event;
pub mod heatmap;
pub mod period;
mod places;
pub mod planner;
pub mod types;

pub use activity::ActivityProfile;
pub use classify::TimeWindows;
pub use cluster::{GridCell, LocatedPoint, PlaceEstimate, most_frequent_cell};
pub use config::InferenceConfig;
pub use event::{EventFilter, GeoEvent, RawGeoEvent};
pub use period::TimeRange;
pub use places::{EventCounts, HomeWorkFeatures, infer_many, infer_places_and_activity};
pub use types::{ClientId, Confidence, PlaceKind, ValidationError};
