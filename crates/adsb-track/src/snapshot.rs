//! Builds the periodic `aircraft.json` snapshot (spec.md §6.2): `{now,
//! messages, aircraft: [...]}`, one object per tracked aircraft with a
//! known-reliable or JAERO position, after the stale filter.
//!
//! Grounded on the teacher's `Snapshot`/`StateVectors` struct in the
//! original `snapshot.rs`, generalized from raw per-message field shuffling
//! (a match over every `DF`/`ME`/`BDS` variant) to reading straight off the
//! already-arbitrated `Aircraft` record the rest of the tracker maintains.

use crate::track::aircraft::Aircraft;
use crate::track::store::{Store, AIRCRAFT_BUCKETS};
use crate::track::validity::Source;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct AircraftSnapshot {
    pub icao24: String,
    pub first: u64,
    pub last: u64,
    pub callsign: Option<String>,
    pub squawk: Option<u16>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<i32>,
    pub selected_altitude: Option<i32>,
    pub groundspeed: Option<f64>,
    pub vertical_rate: Option<i32>,
    pub track: Option<f64>,
    pub ias: Option<f64>,
    pub tas: Option<f64>,
    pub mach: Option<f64>,
    pub roll: Option<f64>,
    pub heading: Option<f64>,
    pub nacp: Option<u8>,
    pub on_ground: bool,
}

impl AircraftSnapshot {
    fn from_aircraft(a: &Aircraft) -> AircraftSnapshot {
        AircraftSnapshot {
            icao24: a.address.to_string(),
            first: a.seen_pos_reliable_ms,
            last: a.seen_ms,
            callsign: a.callsign.get().cloned(),
            squawk: a.squawk.get().copied(),
            latitude: a.lat_reliable,
            longitude: a.lon_reliable,
            altitude: a.altitude_baro.get().copied(),
            selected_altitude: a.selected_altitude.get().copied(),
            groundspeed: a.gs.get().copied(),
            vertical_rate: a.baro_rate.get().copied(),
            track: a.track.get().copied(),
            ias: a.ias.get().copied(),
            tas: a.tas.get().copied(),
            mach: a.mach.get().copied(),
            roll: a.roll.get().copied(),
            heading: a.mag_heading.get().copied(),
            nacp: a.nacp,
            on_ground: a.on_ground,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AircraftJson {
    pub now: u64,
    pub messages: u64,
    pub aircraft: Vec<AircraftSnapshot>,
}

/// An aircraft is published once it has a known-reliable position, or its
/// current source is JAERO (which never ramps through the reliability
/// counters but is still trustworthy enough to publish), and it has not
/// gone past the maintenance sweep's stale horizon.
fn eligible(a: &Aircraft, stale_ms: u64, now_ms: u64) -> bool {
    if now_ms.saturating_sub(a.seen_ms) >= stale_ms {
        return false;
    }
    a.seen_pos_reliable_ms != 0 || a.position_valid.current_source == Source::Jaero
}

pub async fn build(store: &Store, now_ms: u64, messages: u64, stale_ms: u64) -> AircraftJson {
    let mut aircraft = Vec::new();
    store
        .for_each_in_range(0..AIRCRAFT_BUCKETS, |a| {
            if eligible(a, stale_ms, now_ms) {
                aircraft.push(AircraftSnapshot::from_aircraft(a));
            }
        })
        .await;
    AircraftJson { now: now_ms, messages, aircraft }
}

/// Writes `aircraft.json` atomically: serialize to a `.tmp` sibling, then
/// rename over the published file so readers never see a partial write.
pub async fn write_snapshot(
    store: &Store,
    json_dir: &Path,
    now_ms: u64,
    messages: u64,
    stale_ms: u64,
) -> std::io::Result<()> {
    let snapshot = build(store, now_ms, messages, stale_ms).await;
    let json = serde_json::to_vec(&snapshot)?;
    let tmp = json_dir.join("aircraft.json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, json_dir.join("aircraft.json")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsb_core::decode::ICAO;

    #[test]
    fn eligible_requires_reliable_or_jaero_position() {
        let mut a = Aircraft::new(ICAO(1));
        a.seen_ms = 1_000;
        assert!(!eligible(&a, 60_000, 1_000));
        a.seen_pos_reliable_ms = 1_000;
        assert!(eligible(&a, 60_000, 1_000));
    }

    #[test]
    fn eligible_excludes_stale_aircraft() {
        let mut a = Aircraft::new(ICAO(2));
        a.seen_ms = 0;
        a.position_valid.current_source = Source::Jaero;
        assert!(eligible(&a, 1_000, 500));
        assert!(!eligible(&a, 1_000, 2_000));
    }
}
