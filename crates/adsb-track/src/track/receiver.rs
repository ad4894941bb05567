//! Per-remote-feed reputation table (spec.md §3.4).
//!
//! Keyed by a 64-bit receiver-id (today: a hash of the configured
//! `host:port`, see `source::Source::serial`; later replaceable by a UUID
//! advertised through a Beast 0xE4 sub-record). Tracks how trustworthy a
//! feed's messages have been and, incidentally, learns a surface-CPR
//! reference point from the bounding box of its reliable positions.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Receiver {
    pub id: u64,
    pub good_counter: u64,
    pub bad_counter: u64,
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub last_seen_ms: u64,
}

/// Bad-counter threshold past which a receiver's messages get the
/// per-message `garbage` flag (spec.md §3.4).
pub const BAD_COUNTER_GARBAGE_THRESHOLD: u64 = 50;

impl Receiver {
    fn new(id: u64) -> Self {
        Receiver {
            id,
            good_counter: 0,
            bad_counter: 0,
            lat_min: None,
            lat_max: None,
            lon_min: None,
            lon_max: None,
            last_seen_ms: 0,
        }
    }

    pub fn is_garbage(&self) -> bool {
        self.bad_counter >= BAD_COUNTER_GARBAGE_THRESHOLD
    }

    pub fn observe_position(&mut self, lat: f64, lon: f64) {
        self.lat_min = Some(self.lat_min.map_or(lat, |v| v.min(lat)));
        self.lat_max = Some(self.lat_max.map_or(lat, |v| v.max(lat)));
        self.lon_min = Some(self.lon_min.map_or(lon, |v| v.min(lon)));
        self.lon_max = Some(self.lon_max.map_or(lon, |v| v.max(lon)));
    }

    /// The learned reference point for surface CPR decode: the center of
    /// the bounding box observed so far, once at least one position has
    /// been recorded.
    pub fn learned_reference(&self) -> Option<(f64, f64)> {
        match (self.lat_min, self.lat_max, self.lon_min, self.lon_max) {
            (Some(lo_lat), Some(hi_lat), Some(lo_lon), Some(hi_lon)) => {
                Some(((lo_lat + hi_lat) / 2.0, (lo_lon + hi_lon) / 2.0))
            }
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct ReceiverTable {
    receivers: HashMap<u64, Receiver>,
}

impl ReceiverTable {
    pub fn entry(&mut self, id: u64, now_ms: u64) -> &mut Receiver {
        let r = self.receivers.entry(id).or_insert_with(|| Receiver::new(id));
        r.last_seen_ms = now_ms;
        r
    }

    pub fn get(&self, id: u64) -> Option<&Receiver> {
        self.receivers.get(&id)
    }

    pub fn record_good(&mut self, id: u64, now_ms: u64) {
        self.entry(id, now_ms).good_counter += 1;
    }

    pub fn record_bad(&mut self, id: u64, now_ms: u64) {
        self.entry(id, now_ms).bad_counter += 1;
    }

    /// Maintenance-loop aging pass (spec.md §4.9): decay bad counters for
    /// receivers that have been quiet so stale garbage flags don't linger
    /// forever, and drop entries that have not been seen in over a day.
    pub fn age(&mut self, now_ms: u64) {
        const DAY_MS: u64 = 24 * 60 * 60 * 1000;
        self.receivers
            .retain(|_, r| now_ms.saturating_sub(r.last_seen_ms) < DAY_MS);
        for r in self.receivers.values_mut() {
            if now_ms.saturating_sub(r.last_seen_ms) > 60_000 {
                r.bad_counter = r.bad_counter.saturating_sub(1);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_reference_from_bounding_box() {
        let mut table = ReceiverTable::default();
        table.entry(1, 0).observe_position(51.0, -0.6);
        table.entry(1, 0).observe_position(52.0, -0.4);
        let r = table.get(1).unwrap();
        assert_eq!(r.learned_reference(), Some((51.5, -0.5)));
    }

    #[test]
    fn garbage_threshold() {
        let mut table = ReceiverTable::default();
        for _ in 0..BAD_COUNTER_GARBAGE_THRESHOLD {
            table.record_bad(7, 0);
        }
        assert!(table.get(7).unwrap().is_garbage());
    }
}
