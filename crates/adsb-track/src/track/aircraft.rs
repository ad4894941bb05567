//! Per-aircraft mutable state (spec.md §3.1).

use super::trace::Trace;
use super::validity::{Source, Validity};
use adsb_core::decode::ICAO;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Icao,
    IcaoNonIcao,
    ModeA,
    Tisb,
    Adsr,
    Mlat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CprKind {
    Airborne,
    Surface,
    Coarse,
}

/// One stashed CPR frame (odd or even), with its own validity so a frame
/// from a worse source cannot silently poison the pair used for a global
/// decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CprFrame {
    pub lat: u32,
    pub lon: u32,
    pub nic: u8,
    pub rc: u32,
    pub kind: CprKind,
    pub validity: Validity,
}

/// Plain lat/lon pair, distinct from `adsb_core`'s CPR-frame `Position`
/// (which carries `latitude`/`longitude` field names tied to the decode
/// layer) to avoid confusing the two when both are in scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A value with a validity record, generic over the stored field — this is
/// the building block `spec.md` §3.2 describes as attached to every mutable
/// field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field<T> {
    pub value: Option<T>,
    pub validity: Validity,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field {
            value: None,
            validity: Validity::default(),
        }
    }
}

impl<T: Clone> Field<T> {
    pub fn get(&self) -> Option<&T> {
        if self.validity.is_valid() {
            self.value.as_ref()
        } else {
            None
        }
    }
}

/// Mutable fields touched by the position pipeline; captured at message
/// entry and restored if the message is classified bad/duplicate. This
/// replaces the reference implementation's scratch-aircraft-and-memcpy
/// pattern with an explicit value type (spec.md §9).
#[derive(Debug, Clone)]
pub struct AircraftCheckpoint {
    pub position_valid: Validity,
    pub lat: f64,
    pub lon: f64,
    pub lat_reliable: f64,
    pub lon_reliable: f64,
    pub seen_pos_ms: u64,
    pub had_position: bool,
    pub seen_pos_reliable_ms: u64,
    pub pos_reliable_odd: u32,
    pub pos_reliable_even: u32,
    pub cpr_even: Option<CprFrame>,
    pub cpr_odd: Option<CprFrame>,
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub address: ICAO,
    pub address_type: AddressType,
    pub category: Option<u8>,
    pub callsign: Field<String>,
    pub squawk: Field<u16>,

    pub altitude_baro: Field<i32>,
    pub altitude_geom: Field<i32>,
    pub geom_baro_delta: Field<i32>,
    pub baro_rate: Field<i32>,
    pub geom_rate: Field<i32>,
    pub gs: Field<f64>,
    pub ias: Field<f64>,
    pub tas: Field<f64>,
    pub mach: Field<f64>,
    pub track: Field<f64>,
    pub track_rate: Field<f64>,
    pub roll: Field<f64>,
    pub mag_heading: Field<f64>,
    pub true_heading: Field<f64>,

    pub lat: f64,
    pub lon: f64,
    pub nic: u8,
    pub rc: u32,
    pub on_ground: bool,
    pub seen_pos_ms: u64,
    /// Whether any position has ever been recorded. `seen_pos_ms == 0` is a
    /// legitimate epoch-0 timestamp, not a "never set" sentinel, so this
    /// flag (not a zero check on `seen_pos_ms`) is what the position
    /// pipeline tests for "do we have a prior fix".
    pub had_position: bool,
    pub seen_pos_reliable_ms: u64,
    pub lat_reliable: f64,
    pub lon_reliable: f64,
    pub last_position_receiver_id: u64,
    pub position_valid: Validity,

    pub cpr_odd: Option<CprFrame>,
    pub cpr_even: Option<CprFrame>,

    pub pos_reliable_odd: u32,
    pub pos_reliable_even: u32,
    pub alt_reliable: i32,

    pub gs_last_pos: f64,

    pub selected_altitude: Field<i32>,
    pub selected_heading: Field<f64>,
    pub qnh: Field<f64>,
    pub nav_modes: u32,

    pub nacp: Option<u8>,
    pub nacv: Option<u8>,
    pub nic_a: Option<u8>,
    pub nic_b: Option<u8>,
    pub nic_c: Option<u8>,
    pub nic_baro: Option<u8>,
    pub sil: Option<u8>,
    pub sil_type: Option<u8>,
    pub gva: Option<u8>,
    pub sda: Option<u8>,

    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_ts_ms: u64,
    pub wind_altitude: Option<i32>,
    pub oat: Option<f64>,
    pub tat: Option<f64>,
    pub temp_ts_ms: u64,

    pub rssi: [Option<f32>; 8],
    pub rssi_next: usize,
    pub no_signal_count: u32,

    pub trace: Trace,
    pub trace_full_write_count: u32,

    pub seen_ms: u64,
}

pub const FILTER_PERSISTENCE_DEFAULT: u32 = 4;

/// Default "is reliable" gate (spec.md §3.1, B4): distinct from
/// `FILTER_PERSISTENCE_DEFAULT`, which only clamps how high the counters can
/// climb.
pub const JSON_RELIABLE_DEFAULT: u32 = 2;

impl Aircraft {
    pub fn new(address: ICAO) -> Self {
        Aircraft {
            address,
            address_type: AddressType::Icao,
            category: None,
            callsign: Field::default(),
            squawk: Field::default(),
            altitude_baro: Field::default(),
            altitude_geom: Field::default(),
            geom_baro_delta: Field::default(),
            baro_rate: Field::default(),
            geom_rate: Field::default(),
            gs: Field::default(),
            ias: Field::default(),
            tas: Field::default(),
            mach: Field::default(),
            track: Field::default(),
            track_rate: Field::default(),
            roll: Field::default(),
            mag_heading: Field::default(),
            true_heading: Field::default(),
            lat: 0.0,
            lon: 0.0,
            nic: 0,
            rc: 0,
            on_ground: false,
            seen_pos_ms: 0,
            had_position: false,
            seen_pos_reliable_ms: 0,
            lat_reliable: 0.0,
            lon_reliable: 0.0,
            last_position_receiver_id: 0,
            position_valid: Validity::default(),
            cpr_odd: None,
            cpr_even: None,
            pos_reliable_odd: 0,
            pos_reliable_even: 0,
            alt_reliable: 0,
            gs_last_pos: 0.0,
            selected_altitude: Field::default(),
            selected_heading: Field::default(),
            qnh: Field::default(),
            nav_modes: 0,
            nacp: None,
            nacv: None,
            nic_a: None,
            nic_b: None,
            nic_c: None,
            nic_baro: None,
            sil: None,
            sil_type: None,
            gva: None,
            sda: None,
            wind_speed: None,
            wind_direction: None,
            wind_ts_ms: 0,
            wind_altitude: None,
            oat: None,
            tat: None,
            temp_ts_ms: 0,
            rssi: [None; 8],
            rssi_next: 0,
            no_signal_count: 0,
            trace: Trace::default(),
            trace_full_write_count: 0,
            seen_ms: 0,
        }
    }

    /// Both counters reaching the configured threshold is what the spec
    /// calls a "reliable" position (globe-tile membership and trace
    /// sampling both gate on this).
    pub fn is_position_reliable(&self, threshold: u32) -> bool {
        self.pos_reliable_odd >= threshold && self.pos_reliable_even >= threshold
    }

    pub fn push_rssi(&mut self, rssi: Option<f32>) {
        self.rssi[self.rssi_next % 8] = rssi;
        self.rssi_next = self.rssi_next.wrapping_add(1);
        if rssi.is_none() {
            self.no_signal_count = self.no_signal_count.saturating_add(1);
        } else {
            self.no_signal_count = 0;
        }
    }

    pub fn checkpoint(&self) -> AircraftCheckpoint {
        AircraftCheckpoint {
            position_valid: self.position_valid.clone(),
            lat: self.lat,
            lon: self.lon,
            lat_reliable: self.lat_reliable,
            lon_reliable: self.lon_reliable,
            seen_pos_ms: self.seen_pos_ms,
            had_position: self.had_position,
            seen_pos_reliable_ms: self.seen_pos_reliable_ms,
            pos_reliable_odd: self.pos_reliable_odd,
            pos_reliable_even: self.pos_reliable_even,
            cpr_even: self.cpr_even.clone(),
            cpr_odd: self.cpr_odd.clone(),
        }
    }

    pub fn rollback(&mut self, checkpoint: AircraftCheckpoint) {
        self.position_valid = checkpoint.position_valid;
        self.lat = checkpoint.lat;
        self.lon = checkpoint.lon;
        self.lat_reliable = checkpoint.lat_reliable;
        self.lon_reliable = checkpoint.lon_reliable;
        self.seen_pos_ms = checkpoint.seen_pos_ms;
        self.had_position = checkpoint.had_position;
        self.seen_pos_reliable_ms = checkpoint.seen_pos_reliable_ms;
        self.pos_reliable_odd = checkpoint.pos_reliable_odd;
        self.pos_reliable_even = checkpoint.pos_reliable_even;
        self.cpr_even = checkpoint.cpr_even;
        self.cpr_odd = checkpoint.cpr_odd;
    }

    /// Invariant from spec.md §8.1: if either reliability counter is 0, the
    /// position validity must be INVALID.
    #[cfg(test)]
    pub fn check_reliability_invariant(&self) -> bool {
        if self.pos_reliable_odd == 0 || self.pos_reliable_even == 0 {
            self.position_valid.current_source == Source::Invalid
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icao(v: u32) -> ICAO {
        ICAO(v)
    }

    #[test]
    fn fresh_aircraft_satisfies_reliability_invariant() {
        let a = Aircraft::new(icao(0xabcdef));
        assert!(a.check_reliability_invariant());
    }

    #[test]
    fn checkpoint_roundtrips() {
        let mut a = Aircraft::new(icao(0x123456));
        a.lat = 10.0;
        a.lon = 20.0;
        a.pos_reliable_odd = 3;
        a.pos_reliable_even = 3;
        let cp = a.checkpoint();
        a.lat = 99.0;
        a.pos_reliable_odd = 0;
        a.rollback(cp);
        assert_eq!(a.lat, 10.0);
        assert_eq!(a.pos_reliable_odd, 3);
    }
}
