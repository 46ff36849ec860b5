//! Turns decoded feed entities into one flat, deduplicated table per mode.

use std::collections::HashSet;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::debug;

use crate::gtfs_rt::FeedEntity;
use crate::mode::TransitMode;

/// Column order of the staged CSV, also used as the remote field mapping.
pub const HEADER: [&str; 13] = [
    "vehicle_id",
    "trip_id",
    "route_id",
    "bearing",
    "start_date",
    "start_time",
    "speed",
    "congestion_level",
    "occupancy_status",
    "TransitType",
    "longitude",
    "latitude",
    "APIdate",
];

/// Labels for `VehiclePosition.congestion_level`, indexed by code.
pub const CONGESTION_LEVELS: [&str; 5] = [
    "UNKNOWN_CONGESTION_LEVEL",
    "RUNNING_SMOOTHLY",
    "STOP_AND_GO",
    "CONGESTION",
    "SEVERE_CONGESTION",
];

/// Labels for `VehiclePosition.occupancy_status`, indexed by code.
pub const OCCUPANCY_STATUSES: [&str; 7] = [
    "EMPTY",
    "MANY_SEATS_AVAILABLE",
    "FEW_SEATS_AVAILABLE",
    "STANDING_ROOM_ONLY",
    "CRUSHED_STANDING_ROOM_ONLY",
    "FULL",
    "NOT_ACCEPTING_PASSENGERS",
];

/// Sydney Trains occasionally reports run identifiers far longer than a real
/// vehicle id; those are collapsed to this value.
pub const RAIL_SENTINEL_VEHICLE_ID: &str = "R.29";
pub const MAX_RAIL_VEHICLE_ID_LEN: usize = 40;

fn lookup(table: &[&'static str], code: Option<i32>) -> Option<&'static str> {
    let idx = usize::try_from(code?).ok()?;
    table.get(idx).copied()
}

/// Out-of-range or absent codes map to `UNKNOWN_CONGESTION_LEVEL`.
pub fn congestion_label(code: Option<i32>) -> &'static str {
    lookup(&CONGESTION_LEVELS, code).unwrap_or(CONGESTION_LEVELS[0])
}

/// Out-of-range or absent codes map to an empty string.
///
/// Decoders that fill absent enums with their zero value would report a
/// missing occupancy as `EMPTY`; here absence stays distinguishable.
pub fn occupancy_label(code: Option<i32>) -> &'static str {
    lookup(&OCCUPANCY_STATUSES, code).unwrap_or("")
}

/// One observed vehicle, already corrected and labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePositionRecord {
    pub vehicle_id: String,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub bearing: Option<f32>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub speed: Option<f32>,
    pub congestion_level: &'static str,
    pub occupancy_status: &'static str,
    pub mode: TransitMode,
    pub longitude: f32,
    pub latitude: f32,
    /// Observation time in epoch seconds; `0` when the feed omits it.
    pub timestamp: u64,
}

fn or_empty<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl VehiclePositionRecord {
    /// Fields in [`HEADER`] order. Missing values are empty strings, except
    /// `APIdate`, which is always numeric so the purge window can match it.
    pub fn to_row(&self) -> [String; 13] {
        [
            self.vehicle_id.clone(),
            or_empty(&self.trip_id),
            or_empty(&self.route_id),
            or_empty(&self.bearing),
            or_empty(&self.start_date),
            or_empty(&self.start_time),
            or_empty(&self.speed),
            self.congestion_level.to_string(),
            self.occupancy_status.to_string(),
            self.mode.to_string(),
            self.longitude.to_string(),
            self.latitude.to_string(),
            self.timestamp.to_string(),
        ]
    }
}

/// Rows for one mode and one synchronization cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    pub mode: TransitMode,
    pub records: Vec<VehiclePositionRecord>,
}

impl TabularDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header plus one line per record, comma separated.
    ///
    /// Values are written verbatim: a field containing a comma or quote will
    /// shift or break the columns downstream.
    pub fn to_csv(&self) -> csv::Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(HEADER)?;
        for record in &self.records {
            writer.write_record(record.to_row())?;
        }

        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Builds the record for one entity, or `None` if the mode's rules drop it.
fn to_record(entity: &FeedEntity, mode: TransitMode) -> Option<VehiclePositionRecord> {
    let vehicle = entity.vehicle.as_ref()?;
    let position = vehicle.position.as_ref()?;
    let trip = vehicle.trip.as_ref()?;
    let descriptor = vehicle.vehicle.as_ref();

    let mut vehicle_id = descriptor
        .and_then(|d| d.id.clone())
        .unwrap_or_default();

    match mode {
        TransitMode::SydneyTrains if vehicle_id.chars().count() > MAX_RAIL_VEHICLE_ID_LEN => {
            vehicle_id = RAIL_SENTINEL_VEHICLE_ID.to_string();
        }
        TransitMode::Buses => {
            let prior_trip = descriptor
                .and_then(|d| d.tfnsw_vehicle_descriptor.as_ref())
                .and_then(|t| t.performing_prior_trip)
                .unwrap_or(false);
            if prior_trip {
                return None;
            }
        }
        _ => {}
    }

    Some(VehiclePositionRecord {
        vehicle_id,
        trip_id: trip.trip_id.clone(),
        route_id: trip.route_id.clone(),
        bearing: position.bearing,
        start_date: trip.start_date.clone(),
        start_time: trip.start_time.clone(),
        speed: position.speed,
        congestion_level: congestion_label(vehicle.congestion_level),
        occupancy_status: occupancy_label(vehicle.occupancy_status),
        mode,
        longitude: position.longitude,
        latitude: position.latitude,
        timestamp: vehicle.timestamp.unwrap_or(0),
    })
}

/// Normalizes a decoded batch, in feed order, keeping the first record seen
/// for each vehicle id.
#[tracing::instrument(skip(entities), fields(entity_count = entities.len(), mode = %mode))]
pub fn normalize(entities: &[FeedEntity], mode: TransitMode) -> TabularDataset {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for entity in entities {
        let Some(record) = to_record(entity, mode) else {
            continue;
        };
        if !seen.insert(record.vehicle_id.clone()) {
            continue;
        }
        records.push(record);
    }

    debug!(rows = records.len(), "Normalized vehicle positions");
    TabularDataset { mode, records }
}
