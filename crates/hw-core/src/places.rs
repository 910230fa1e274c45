//! Home/work inference: classification, clustering and result assembly.
//!
//! # Algorithm Summary
//!
//! 1. Localize every admitted event to the project timezone
//! 2. Record it in the hourly and weekday histograms
//! 3. Add it to the night subset and/or the workday subset
//! 4. Cluster each subset independently ([`most_frequent_cell`])
//! 5. Drop winners whose cell holds fewer than `min_cluster_size` events
//!
//! Inference never fails. Empty input yields no places, zero histograms
//! and zero counts, which callers treat as "insufficient data".

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityProfile;
use crate::classify::TimeWindows;
use crate::cluster::{LocatedPoint, PlaceEstimate, most_frequent_cell};
use crate::config::InferenceConfig;
use crate::event::GeoEvent;
use crate::types::{ClientId, PlaceKind};

/// Sizes of the event sets that fed an inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    /// All admitted events.
    pub total: usize,
    /// Events in the night window.
    pub night: usize,
    /// Events in workday hours (not the number of work places).
    pub work: usize,
}

/// Output of one inference call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HomeWorkFeatures {
    /// Surviving estimates, home first. Zero, one or two entries.
    pub places: Vec<PlaceEstimate>,
    pub activity: ActivityProfile,
    pub counts: EventCounts,
}

impl HomeWorkFeatures {
    pub fn home(&self) -> Option<&PlaceEstimate> {
        self.place(PlaceKind::Home)
    }

    pub fn work(&self) -> Option<&PlaceEstimate> {
        self.place(PlaceKind::Work)
    }

    fn place(&self, kind: PlaceKind) -> Option<&PlaceEstimate> {
        self.places.iter().find(|p| p.kind == kind)
    }
}

/// Infers home and work places plus activity histograms for one client.
pub fn infer_places_and_activity(
    events: &[GeoEvent],
    config: &InferenceConfig,
) -> HomeWorkFeatures {
    let windows = TimeWindows::from_config(config);
    let mut activity = ActivityProfile::default();
    let mut night = Vec::new();
    let mut workday = Vec::new();

    for event in events {
        let local = windows.local(event.timestamp);
        activity.record(&local);

        let point = LocatedPoint {
            latitude: event.latitude,
            longitude: event.longitude,
            timestamp: local,
        };
        if windows.is_night(&local) {
            night.push(point);
        }
        if windows.is_workday(&local) {
            workday.push(point);
        }
    }

    let home = most_frequent_cell(&night, PlaceKind::Home, config);
    let work = most_frequent_cell(&workday, PlaceKind::Work, config);

    let places: Vec<PlaceEstimate> = [home, work]
        .into_iter()
        .flatten()
        .filter(|place| place.size >= config.min_cluster_size)
        .collect();

    let counts = EventCounts {
        total: events.len(),
        night: night.len(),
        work: workday.len(),
    };
    tracing::debug!(
        total = counts.total,
        night = counts.night,
        work = counts.work,
        places = places.len(),
        "inferred home/work places"
    );

    HomeWorkFeatures {
        places,
        activity,
        counts,
    }
}

/// Runs independent inferences for several clients in parallel.
///
/// Output order matches input order.
pub fn infer_many(
    batches: Vec<(ClientId, Vec<GeoEvent>)>,
    config: &InferenceConfig,
) -> Vec<(ClientId, HomeWorkFeatures)> {
    batches
        .into_par_iter()
        .map(|(client_id, events)| {
            let features = infer_places_and_activity(&events, config);
            (client_id, features)
        })
        .collect()
}
