//! Trace ring, leg segmentation and gzip/JSON persistence (spec.md §4.6, §6.2).

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Bits packed into the altitude word on disk, preserved verbatim from the
/// reference layout (spec.md §9) behind a typed accessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceFlags {
    pub rate_valid: bool,
    pub rate_geom: bool,
    pub stale: bool,
    pub on_ground: bool,
    pub altitude_valid: bool,
    pub gs_valid: bool,
    pub track_valid: bool,
    pub leg_marker: bool,
    pub altitude_geom: bool,
}

impl TraceFlags {
    pub fn to_bits(self) -> u32 {
        (self.rate_valid as u32)
            | (self.rate_geom as u32) << 1
            | (self.stale as u32) << 2
            | (self.on_ground as u32) << 3
            | (self.altitude_valid as u32) << 4
            | (self.gs_valid as u32) << 5
            | (self.track_valid as u32) << 6
            | (self.leg_marker as u32) << 7
            | (self.altitude_geom as u32) << 8
    }

    pub fn from_bits(bits: u32) -> Self {
        TraceFlags {
            rate_valid: bits & 1 != 0,
            rate_geom: bits & (1 << 1) != 0,
            stale: bits & (1 << 2) != 0,
            on_ground: bits & (1 << 3) != 0,
            altitude_valid: bits & (1 << 4) != 0,
            gs_valid: bits & (1 << 5) != 0,
            track_valid: bits & (1 << 6) != 0,
            leg_marker: bits & (1 << 7) != 0,
            altitude_geom: bits & (1 << 8) != 0,
        }
    }

    /// The on-disk Basestation-style bitfield used in trace_*.json (spec.md
    /// §6.2): `(altGeom<<3)|(rateGeom<<2)|(legMarker<<1)|stale`.
    pub fn json_bitfield(self) -> u8 {
        ((self.altitude_geom as u8) << 3)
            | ((self.rate_geom as u8) << 2)
            | ((self.leg_marker as u8) << 1)
            | (self.stale as u8)
    }
}

/// One sampled history record. Units match the on-disk layout: altitude in
/// 25 ft steps, vertical rate in 32 fpm steps, ground speed and track ×10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp_ms: u64,
    pub lat_1e6: i32,
    pub lon_1e6: i32,
    pub altitude_25ft: i16,
    pub flags: u32,
    pub vrate_32fpm: i16,
    pub gs_x10: i16,
    pub track_x10: i16,
    pub full_snapshot: Option<StateAll>,
}

impl TraceEntry {
    pub fn flags(&self) -> TraceFlags {
        TraceFlags::from_bits(self.flags)
    }
}

/// Slowly-varying fields captured every fourth trace entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateAll {
    pub callsign: Option<String>,
    pub squawk: Option<u16>,
    pub nic: u8,
    pub rc: u32,
    pub selected_altitude: Option<i32>,
    pub selected_heading: Option<f64>,
    pub nacp: Option<u8>,
    pub nacv: Option<u8>,
    pub sil: Option<u8>,
    pub gva: Option<u8>,
}

const STATE_ALL_EVERY: usize = 4;
const RECENT_TRACE_LEN: usize = 142;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSchedule {
    Recent,
    Full,
    DailyHistory,
}

pub struct Trace {
    pub entries: Vec<TraceEntry>,
    last_append_ms: u64,
    last_on_ground: bool,
    last_track_x10: i16,
    last_altitude_25ft: i16,
}

pub const TRACE_INTERVAL_MS: u64 = 30_000;
const TRACK_THRESHOLD_X10: i16 = 20; // 2 degrees
const ALTITUDE_THRESHOLD_25FT: i16 = 12; // 300 ft

impl Default for Trace {
    fn default() -> Self {
        Trace {
            entries: Vec::new(),
            last_append_ms: 0,
            last_on_ground: false,
            last_track_x10: 0,
            last_altitude_25ft: 0,
        }
    }
}

impl Trace {
    /// Sampling rule (spec.md §4.6): append only when reliable and either
    /// the interval elapsed, a heading/altitude threshold was crossed, or
    /// ground state changed.
    #[allow(clippy::too_many_arguments)]
    pub fn maybe_append(
        &mut self,
        now_ms: u64,
        lat: f64,
        lon: f64,
        altitude_25ft: i16,
        flags: TraceFlags,
        vrate_32fpm: i16,
        gs_x10: i16,
        track_x10: i16,
        on_ground: bool,
        full_snapshot: impl FnOnce() -> StateAll,
    ) -> bool {
        let elapsed = now_ms.saturating_sub(self.last_append_ms);
        let track_jump =
            (track_x10 - self.last_track_x10).unsigned_abs() as i32 > TRACK_THRESHOLD_X10 as i32;
        let altitude_jump = (altitude_25ft - self.last_altitude_25ft).unsigned_abs() as i32
            > ALTITUDE_THRESHOLD_25FT as i32;
        let ground_changed = on_ground != self.last_on_ground;

        if !self.entries.is_empty()
            && elapsed < TRACE_INTERVAL_MS
            && !track_jump
            && !altitude_jump
            && !ground_changed
        {
            return false;
        }

        let snapshot = if self.entries.len() % STATE_ALL_EVERY == 0 {
            Some(full_snapshot())
        } else {
            None
        };

        self.entries.push(TraceEntry {
            timestamp_ms: now_ms,
            lat_1e6: (lat * 1e6).round() as i32,
            lon_1e6: (lon * 1e6).round() as i32,
            altitude_25ft,
            flags: flags.to_bits(),
            vrate_32fpm,
            gs_x10,
            track_x10,
            full_snapshot: snapshot,
        });

        self.last_append_ms = now_ms;
        self.last_on_ground = on_ground;
        self.last_track_x10 = track_x10;
        self.last_altitude_25ft = altitude_25ft;
        true
    }

    /// Recomputes leg markers over the whole trace (`markLegs`, spec.md
    /// §4.6). Rewrites the `leg_marker` bit of the chosen entries in place.
    pub fn mark_legs(&mut self) {
        if self.entries.len() < 2 {
            return;
        }

        let mean_altitude: f64 = self
            .entries
            .iter()
            .map(|e| e.altitude_25ft as f64 * 25.0)
            .sum::<f64>()
            / self.entries.len() as f64;
        let threshold = (mean_altitude / 3.0).clamp(1000.0, 10_000.0);

        // clear previous markers
        for e in self.entries.iter_mut() {
            let mut f = e.flags();
            f.leg_marker = false;
            e.flags = f.to_bits();
        }

        let mut high = self.entries[0].altitude_25ft as f64 * 25.0;
        let mut low = high;
        let mut last_low_idx = 0usize;
        let mut last_high_idx = 0usize;
        let mut last_airborne_idx = 0usize;
        let mut climb_start_idx: Option<usize> = None;
        let mut descent_end_ms: Option<u64> = None;

        for i in 1..self.entries.len() {
            let entry = &self.entries[i];
            let alt = entry.altitude_25ft as f64 * 25.0;
            let on_ground = entry.flags().on_ground;

            if !on_ground {
                last_airborne_idx = i;
            }

            if alt > high {
                high = alt;
            }
            if alt < low {
                low = alt;
            }

            let mut boundary = false;

            if high - low > threshold {
                if alt >= high - 0.1 {
                    // climbing: remember where the low was, this could be
                    // the start of a new leg
                    last_low_idx = i;
                    climb_start_idx = Some(i);
                    low = high - threshold * 0.9;
                } else {
                    last_high_idx = i;
                    descent_end_ms = Some(entry.timestamp_ms);
                    high = low + threshold * 0.9;
                }
            }

            let prev = &self.entries[i - 1];
            let gap_ms = entry.timestamp_ms.saturating_sub(prev.timestamp_ms);

            if let (Some(desc_end), Some(climb_idx)) = (descent_end_ms, climb_start_idx) {
                if climb_idx >= last_high_idx
                    && self.entries[climb_idx].timestamp_ms.saturating_sub(desc_end)
                        >= 10 * 60 * 1000
                {
                    boundary = true;
                }
            }

            if prev.flags().on_ground && gap_ms >= 25 * 60 * 1000 {
                boundary = true;
            }

            if !on_ground && entry.timestamp_ms.saturating_sub(self.entries[last_airborne_idx.min(i.saturating_sub(1))].timestamp_ms) >= 45 * 60 * 1000 {
                boundary = true;
            }

            if boundary {
                let marker_idx = self.pick_leg_marker_index(last_low_idx, i);
                let mut f = self.entries[marker_idx].flags();
                f.leg_marker = true;
                self.entries[marker_idx].flags = f.to_bits();
                climb_start_idx = None;
                descent_end_ms = None;
            }
        }
    }

    /// Placement rule: prefer a sample at least 5 minutes into the gap,
    /// else the midpoint, else the climb index itself.
    fn pick_leg_marker_index(&self, gap_start: usize, climb_idx: usize) -> usize {
        if climb_idx <= gap_start {
            return climb_idx;
        }
        let gap_start_ts = self.entries[gap_start].timestamp_ms;
        for i in gap_start..=climb_idx {
            if self.entries[i].timestamp_ms.saturating_sub(gap_start_ts) >= 5 * 60 * 1000 {
                return i;
            }
        }
        gap_start + (climb_idx - gap_start) / 2
    }

    pub fn recent_slice(&self) -> &[TraceEntry] {
        let start = self.entries.len().saturating_sub(RECENT_TRACE_LEN);
        &self.entries[start..]
    }
}

#[derive(Serialize)]
struct TraceJson<'a> {
    icao: String,
    timestamp: u64,
    trace: Vec<(
        f64,
        f64,
        f64,
        serde_json::Value,
        Option<f64>,
        Option<f64>,
        u8,
        Option<f64>,
        Option<&'a StateAll>,
    )>,
}

/// Encode a slice of trace entries as the gzipped `{icao, timestamp, trace}`
/// structure described in spec.md §6.2; `Δt` is seconds since `timestamp`.
pub fn encode_trace_gz(
    icao_hex: &str,
    base_timestamp_ms: u64,
    entries: &[TraceEntry],
) -> std::io::Result<Vec<u8>> {
    let rows = entries
        .iter()
        .map(|e| {
            let dt = (e.timestamp_ms as i64 - base_timestamp_ms as i64) as f64 / 1000.0;
            let flags = e.flags();
            let alt_or_ground: serde_json::Value = if flags.on_ground {
                serde_json::Value::String("ground".to_string())
            } else if flags.altitude_valid {
                serde_json::Value::from(e.altitude_25ft as i32 * 25)
            } else {
                serde_json::Value::Null
            };
            (
                dt,
                e.lat_1e6 as f64 / 1e6,
                e.lon_1e6 as f64 / 1e6,
                alt_or_ground,
                flags.gs_valid.then_some(e.gs_x10 as f64 / 10.0),
                flags.track_valid.then_some(e.track_x10 as f64 / 10.0),
                flags.json_bitfield(),
                flags.rate_valid.then_some(e.vrate_32fpm as f64 * 32.0),
                e.full_snapshot.as_ref(),
            )
        })
        .collect();

    let doc = TraceJson {
        icao: icao_hex.to_string(),
        timestamp: base_timestamp_ms,
        trace: rows,
    };

    let json = serde_json::to_vec(&doc)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(on_ground: bool) -> TraceFlags {
        TraceFlags {
            altitude_valid: true,
            gs_valid: true,
            track_valid: true,
            on_ground,
            ..Default::default()
        }
    }

    #[test]
    fn bitfield_roundtrip() {
        let f = TraceFlags {
            leg_marker: true,
            stale: true,
            altitude_geom: true,
            ..Default::default()
        };
        let bits = f.to_bits();
        assert_eq!(TraceFlags::from_bits(bits), f);
    }

    #[test]
    fn sampling_respects_interval_and_thresholds() {
        let mut trace = Trace::default();
        let appended = trace.maybe_append(
            0,
            50.0,
            10.0,
            1400,
            flags(false),
            0,
            2500,
            900,
            false,
            || StateAll {
                callsign: None,
                squawk: None,
                nic: 0,
                rc: 0,
                selected_altitude: None,
                selected_heading: None,
                nacp: None,
                nacv: None,
                sil: None,
                gva: None,
            },
        );
        assert!(appended);
        // too soon, no threshold crossed: rejected
        let appended = trace.maybe_append(
            1000,
            50.001,
            10.001,
            1401,
            flags(false),
            0,
            2500,
            901,
            false,
            || unreachable!(),
        );
        assert!(!appended);
    }

    #[test]
    fn leg_detection_places_single_marker_after_ground_gap() {
        let mut trace = Trace::default();
        let mut t = 0u64;
        let push = |trace: &mut Trace, t: u64, alt_ft: i16, ground: bool| {
            trace.entries.push(TraceEntry {
                timestamp_ms: t,
                lat_1e6: 0,
                lon_1e6: 0,
                altitude_25ft: alt_ft / 25,
                flags: flags(ground).to_bits(),
                vrate_32fpm: 0,
                gs_x10: 0,
                track_x10: 0,
                full_snapshot: None,
            });
        };

        // climb 0->35000 over 20 min, sampled every 2 min
        for i in 0..=10 {
            push(&mut trace, t, (35000 / 10) * i, false);
            t += 2 * 60 * 1000;
        }
        // cruise 60 min
        for _ in 0..6 {
            push(&mut trace, t, 35000, false);
            t += 10 * 60 * 1000;
        }
        // descent to 0 over 20 min
        for i in (0..=10).rev() {
            push(&mut trace, t, (35000 / 10) * i, false);
            t += 2 * 60 * 1000;
        }
        // on ground for 30 min: one sample at start, one at end of the gap
        push(&mut trace, t, 0, true);
        t += 30 * 60 * 1000;
        push(&mut trace, t, 0, true);
        // climb again for 20 min
        for i in 0..=10 {
            t += 2 * 60 * 1000;
            push(&mut trace, t, (35000 / 10) * i, false);
        }

        trace.mark_legs();
        let markers: Vec<usize> = trace
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.flags().leg_marker)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(markers.len(), 1);
    }
}
