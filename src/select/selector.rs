use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{CollectionRef, ImageryKind, SceneRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoSceneReason {
    /// Nothing in the candidate list belongs to the requested collection.
    NoCollectionMatch,
    /// Collection matches existed, but none passed the cloud-cover ceiling.
    CloudCeilingExceeded,
}

impl NoSceneReason {
    pub fn describe(&self) -> &'static str {
        match self {
            NoSceneReason::NoCollectionMatch => "no scenes of the requested collection were found",
            NoSceneReason::CloudCeilingExceeded => {
                "every matching scene exceeded the cloud-cover ceiling"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionResult<'a> {
    Selected {
        record: &'a SceneRecord,
        day_distance: u32,
    },
    Empty(NoSceneReason),
}

/// Picks the eligible record whose acquisition date is closest to `target`.
///
/// Optical records must carry a cloud cover at or below `cloud_ceiling`; SAR
/// records are never cloud-filtered. Equal distances resolve to the record
/// that appears first in `records`.
pub fn select_scene<'a>(
    records: &'a [SceneRecord],
    target: NaiveDate,
    collection: &CollectionRef,
    cloud_ceiling: f64,
) -> SelectionResult<'a> {
    let mut matched_collection = false;
    let mut best: Option<(&SceneRecord, u32)> = None;

    for record in records {
        if record.collection != collection.id {
            continue;
        }
        matched_collection = true;

        if collection.kind == ImageryKind::Optical {
            match record.cloud_cover {
                Some(cover) if cover <= cloud_ceiling => {}
                _ => continue,
            }
        }

        let distance = day_distance(record, target);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((record, distance));
        }
    }

    match best {
        Some((record, day_distance)) => SelectionResult::Selected {
            record,
            day_distance,
        },
        None if matched_collection => SelectionResult::Empty(NoSceneReason::CloudCeilingExceeded),
        None => SelectionResult::Empty(NoSceneReason::NoCollectionMatch),
    }
}

fn day_distance(record: &SceneRecord, target: NaiveDate) -> u32 {
    let days = (record.acquired.date_naive() - target).num_days().unsigned_abs();
    u32::try_from(days).unwrap_or(u32::MAX)
}
