//! Position pipeline: CPR frame pairing, global/local decode selection,
//! speed/range plausibility, reliability counters and trace append
//! (spec.md §4.3–§4.5). This is the module spec.md calls out as where "the
//! hard engineering lives".

use super::aircraft::{Aircraft, CprFrame, CprKind};
use super::receiver::ReceiverTable;
use super::trace::{StateAll, TraceFlags};
use super::validity::{IncomingField, ReduceHint, Source, Validity};
use adsb_core::decode::cpr::raw;

const EARTH_RADIUS_KM: f64 = 6371.0;
const KT_TO_KMH: f64 = 1.852;
const NM_TO_KM: f64 = 1.852;

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial bearing from (lat1,lon1) to (lat2,lon2), in degrees [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_lambda = (lon2 - lon1).to_radians();
    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

fn angular_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedCheckOutcome {
    pub passed: bool,
    /// Track difference exceeded 160 degrees: counted but not treated as a
    /// hard failure (spec.md §4.5).
    pub ignore_for_reliability: bool,
}

/// `speedCheck` (spec.md §4.5).
pub fn speed_check(
    aircraft: &Aircraft,
    source: Source,
    new_lat: f64,
    new_lon: f64,
    now_ms: u64,
) -> SpeedCheckOutcome {
    if aircraft.pos_reliable_odd < 1 && aircraft.pos_reliable_even < 1 {
        return SpeedCheckOutcome {
            passed: true,
            ignore_for_reliability: false,
        };
    }

    let elapsed_s = now_ms.saturating_sub(aircraft.seen_pos_ms) as f64 / 1000.0;
    if elapsed_s > 120.0 || source > aircraft.position_valid.last_source_seen {
        return SpeedCheckOutcome {
            passed: true,
            ignore_for_reliability: false,
        };
    }

    let surface = aircraft.on_ground;
    let gs = aircraft.gs.get().copied();

    let mut allowed_kt = if surface {
        150.0
    } else if let Some(best_gs) = gs.map(|v| v.max(aircraft.gs_last_pos)) {
        best_gs
    } else if let Some(tas) = aircraft.tas.get().copied() {
        tas * 4.0 / 3.0
    } else if let Some(ias) = aircraft.ias.get().copied() {
        ias * 2.0
    } else {
        900.0
    };

    let gs_age_s = if gs.is_some() {
        now_ms.saturating_sub(aircraft.gs.validity.last_updated_ms) as f64 / 1000.0
    } else {
        0.0
    };
    allowed_kt += 3.0 * gs_age_s;

    if source <= Source::Mlat {
        allowed_kt = (allowed_kt * 2.0).min(2400.0);
    }

    allowed_kt *= 1.3;
    allowed_kt = if surface {
        allowed_kt.clamp(20.0, 150.0)
    } else {
        allowed_kt.max(200.0)
    };

    let mut ignore_for_reliability = false;
    if !surface {
        if let Some(track) = aircraft.track.get().copied() {
            let track_age_s =
                now_ms.saturating_sub(aircraft.track.validity.last_updated_ms) as f64 / 1000.0;
            if track_age_s < 60.0 {
                let bearing = bearing_deg(aircraft.lat, aircraft.lon, new_lat, new_lon);
                let diff = angular_diff(track, bearing);
                if diff > 160.0 {
                    ignore_for_reliability = true;
                }
                let attenuation = ((60.0 - track_age_s.min(60.0)) / 60.0).max(0.0);
                let bonus = ((90.0 - diff).max(0.0) / 90.0) * attenuation;
                allowed_kt *= 1.0 + bonus;
            }
        }
    }

    let allowed_km = (if surface { 0.1 } else { 0.0 })
        + allowed_kt * KT_TO_KMH * (elapsed_s + 1.0) / 3600.0;

    let actual_km = haversine_km(aircraft.lat, aircraft.lon, new_lat, new_lon);

    SpeedCheckOutcome {
        passed: actual_km <= allowed_km,
        ignore_for_reliability,
    }
}

pub fn range_check(
    user_position: Option<(f64, f64)>,
    max_range_km: f64,
    lat: f64,
    lon: f64,
) -> bool {
    match user_position {
        Some((ulat, ulon)) if max_range_km > 0.0 => {
            haversine_km(ulat, ulon, lat, lon) <= max_range_km
        }
        _ => true,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IncomingCprFrame {
    pub lat: u32,
    pub lon: u32,
    pub nic: u8,
    pub rc: u32,
    pub kind: CprKind,
    pub odd: bool,
    pub source: Source,
    pub now_ms: u64,
    pub is_sbs: bool,
    pub receiver_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionResult {
    Decoded {
        lat: f64,
        lon: f64,
        reliable: bool,
        duplicate: bool,
    },
    FrameRejected,
    AwaitingPair,
    WindowMiss,
    NoReference,
    RangeBad,
    SpeedBad,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Ceiling the reliability counters are clamped to (spec.md §3.1).
    pub filter_persistence: u32,
    /// Separate, usually lower, "is reliable" gate: both counters must
    /// reach this before a position counts as reliable (spec.md §3.1, B4).
    /// Distinct from `filter_persistence`, which only bounds how high the
    /// counters can climb.
    pub json_reliable: u32,
    pub max_range_km: f64,
    pub user_position: Option<(f64, f64)>,
    pub reduce_interval_ms: u64,
}

fn surface_reference(
    aircraft: &Aircraft,
    receivers: &ReceiverTable,
    receiver_id: u64,
    user_position: Option<(f64, f64)>,
) -> Option<(f64, f64)> {
    if let Some(r) = receivers.get(receiver_id).and_then(|r| r.learned_reference()) {
        return Some(r);
    }
    if aircraft.seen_pos_reliable_ms != 0 {
        return Some((aircraft.lat_reliable, aircraft.lon_reliable));
    }
    if let Some(u) = user_position {
        return Some(u);
    }
    if aircraft.had_position {
        return Some((aircraft.lat, aircraft.lon));
    }
    None
}

fn surface_window_ms(gs: Option<f64>) -> u64 {
    match gs {
        None => 25_000,
        Some(v) if v > 25.0 => 25_000,
        _ => 50_000,
    }
}

/// Entry point for any message carrying a CPR frame (spec.md §4.3). Stashes
/// the frame, attempts global then local decode, runs range/speed checks and
/// calls `set_position`/`position_bad` as appropriate.
pub fn process_cpr_frame(
    aircraft: &mut Aircraft,
    receivers: &ReceiverTable,
    frame: IncomingCprFrame,
    config: &PipelineConfig,
) -> PositionResult {
    let slot = if frame.odd {
        &mut aircraft.cpr_odd
    } else {
        &mut aircraft.cpr_even
    };
    let mut validity = slot.as_ref().map(|f| f.validity.clone()).unwrap_or_default();
    let outcome = validity.accept_data(
        IncomingField {
            source: frame.source,
            receive_time_ms: frame.now_ms,
            is_sbs: frame.is_sbs,
            carries_cpr: true,
        },
        config.reduce_interval_ms,
        ReduceHint::Normal,
    );
    if !outcome.accepted {
        return PositionResult::FrameRejected;
    }
    *slot = Some(CprFrame {
        lat: frame.lat,
        lon: frame.lon,
        nic: frame.nic,
        rc: frame.rc,
        kind: frame.kind,
        validity,
    });

    let (even, odd) = match (&aircraft.cpr_even, &aircraft.cpr_odd) {
        (Some(e), Some(o)) => (e.clone(), o.clone()),
        _ => return PositionResult::AwaitingPair,
    };

    // Invariant (spec.md §8 property 2): never invoke the global decoder
    // across different sources or CPR kinds.
    let same_source = even.validity.current_source == odd.validity.current_source;
    let same_kind = even.kind == odd.kind;

    let window_ms = match even.kind {
        CprKind::Airborne => 10_000,
        CprKind::Surface | CprKind::Coarse => surface_window_ms(aircraft.gs.get().copied()),
    };
    let dt_ms = even
        .validity
        .last_updated_ms
        .abs_diff(odd.validity.last_updated_ms);

    let mut decoded: Option<(f64, f64)> = None;

    if same_source && same_kind && dt_ms <= window_ms {
        match even.kind {
            CprKind::Airborne => {
                decoded = raw::decode_airborne_global(
                    even.lat, even.lon, odd.lat, odd.lon, frame.odd,
                )
                .map(|p| (p.latitude, p.longitude));
            }
            CprKind::Surface | CprKind::Coarse => {
                match surface_reference(
                    aircraft,
                    receivers,
                    frame.receiver_id,
                    config.user_position,
                ) {
                    Some((rlat, rlon)) => {
                        decoded = raw::decode_surface_global(
                            rlat, rlon, even.lat, even.lon, odd.lat, odd.lon, frame.odd,
                        )
                        .map(|p| (p.latitude, p.longitude));
                        if decoded.is_none() {
                            return PositionResult::NoReference;
                        }
                    }
                    None => return PositionResult::NoReference,
                }
            }
        }
    }

    if decoded.is_none() {
        let surface = matches!(even.kind, CprKind::Surface | CprKind::Coarse);
        let this_frame = if frame.odd { &odd } else { &even };

        let used_aircraft_relative = aircraft.position_valid.is_valid()
            && frame.now_ms < aircraft.seen_pos_ms.saturating_add(10 * 60 * 1000);

        if used_aircraft_relative {
            if let Some(p) = raw::decode_local_relative(
                aircraft.lat,
                aircraft.lon,
                this_frame.lat,
                this_frame.lon,
                frame.odd,
                surface,
            ) {
                if haversine_km(aircraft.lat, aircraft.lon, p.latitude, p.longitude)
                    <= 100.0 * NM_TO_KM
                {
                    decoded = Some((p.latitude, p.longitude));
                }
            }
        } else if let Some((ulat, ulon)) = config.user_position {
            let cell_ok = config.max_range_km > 0.0;
            if cell_ok {
                if let Some(p) = raw::decode_local_relative(
                    ulat,
                    ulon,
                    this_frame.lat,
                    this_frame.lon,
                    frame.odd,
                    surface,
                ) {
                    if haversine_km(ulat, ulon, p.latitude, p.longitude) <= config.max_range_km {
                        decoded = Some((p.latitude, p.longitude));
                    }
                }
            }
        }
    }

    let (lat, lon) = match decoded {
        Some(v) => v,
        None => return PositionResult::WindowMiss,
    };

    if !range_check(config.user_position, config.max_range_km, lat, lon) {
        position_bad(aircraft);
        return PositionResult::RangeBad;
    }

    let speed = speed_check(aircraft, frame.source, lat, lon, frame.now_ms);
    if !speed.passed {
        position_bad(aircraft);
        return PositionResult::SpeedBad;
    }

    if !aircraft
        .position_valid
        .accept_data(
            IncomingField {
                source: frame.source,
                receive_time_ms: frame.now_ms,
                is_sbs: frame.is_sbs,
                carries_cpr: true,
            },
            config.reduce_interval_ms,
            ReduceHint::Normal,
        )
        .accepted
    {
        return PositionResult::FrameRejected;
    }

    let (reliable, duplicate) = set_position(
        aircraft,
        frame.receiver_id,
        lat,
        lon,
        frame.now_ms,
        frame.source,
        frame.nic,
        frame.rc,
        config.filter_persistence,
        config.json_reliable,
        matches!(even.kind, CprKind::Surface | CprKind::Coarse),
        speed.ignore_for_reliability,
    );

    PositionResult::Decoded {
        lat,
        lon,
        reliable,
        duplicate,
    }
}

/// Entry point for an already-decoded SBS position (spec.md §4.3: "entered
/// whenever a message contributes a CPR frame or an SBS position"). Basestation
/// feeds hand over `lat`/`lon` directly rather than an odd/even CPR pair, so
/// this skips the frame-stash/global-decode steps and goes straight to the
/// range/speed checks and `setPosition` that a CPR-derived fix would also go
/// through.
#[allow(clippy::too_many_arguments)]
pub fn process_sbs_position(
    aircraft: &mut Aircraft,
    receiver_id: u64,
    lat: f64,
    lon: f64,
    now_ms: u64,
    source: Source,
    on_ground: bool,
    config: &PipelineConfig,
) -> PositionResult {
    if !range_check(config.user_position, config.max_range_km, lat, lon) {
        position_bad(aircraft);
        return PositionResult::RangeBad;
    }

    let speed = speed_check(aircraft, source, lat, lon, now_ms);
    if !speed.passed {
        position_bad(aircraft);
        return PositionResult::SpeedBad;
    }

    if !aircraft
        .position_valid
        .accept_data(
            IncomingField {
                source,
                receive_time_ms: now_ms,
                is_sbs: true,
                carries_cpr: false,
            },
            config.reduce_interval_ms,
            ReduceHint::Normal,
        )
        .accepted
    {
        return PositionResult::FrameRejected;
    }

    // SBS carries no NIC/Rc of its own; record the coarsest containment
    // radius so a later CPR-derived fix is always treated as at least as
    // good.
    let (reliable, duplicate) = set_position(
        aircraft,
        receiver_id,
        lat,
        lon,
        now_ms,
        source,
        0,
        37_040,
        config.filter_persistence,
        config.json_reliable,
        on_ground,
        speed.ignore_for_reliability,
    );

    PositionResult::Decoded { lat, lon, reliable, duplicate }
}

/// Bad-position path (spec.md §4.4): decrement both reliability counters,
/// drop validity to INVALID and clear both CPR buffers once either counter
/// bottoms out.
pub fn position_bad(aircraft: &mut Aircraft) {
    aircraft.pos_reliable_odd = aircraft.pos_reliable_odd.saturating_sub(1);
    aircraft.pos_reliable_even = aircraft.pos_reliable_even.saturating_sub(1);
    if aircraft.pos_reliable_odd == 0 || aircraft.pos_reliable_even == 0 {
        aircraft.position_valid = Validity::default();
        aircraft.cpr_odd = None;
        aircraft.cpr_even = None;
    }
}

/// `setPosition` (spec.md §4.3). Returns `(now_reliable, was_duplicate)`.
#[allow(clippy::too_many_arguments)]
fn set_position(
    aircraft: &mut Aircraft,
    receiver_id: u64,
    lat: f64,
    lon: f64,
    now_ms: u64,
    source: Source,
    nic: u8,
    rc: u32,
    filter_persistence: u32,
    json_reliable: u32,
    on_ground: bool,
    ignore_for_reliability: bool,
) -> (bool, bool) {
    let duplicate = aircraft.had_position
        && now_ms < aircraft.seen_pos_ms.saturating_add(3_000)
        && lat == aircraft.lat
        && lon == aircraft.lon;

    if duplicate {
        return (aircraft.is_position_reliable(json_reliable), true);
    }

    // Bootstrap fast-track (spec.md B4): the *second* close-agreeing fix
    // after the very first accepted position jumps straight to reliable
    // instead of ramping up one increment at a time. ADS-B only: other
    // sources climb to `json_reliable` through the ordinary ramp instead.
    let fast_track = aircraft.pos_reliable_odd == 1
        && aircraft.pos_reliable_even == 1
        && aircraft.had_position
        && now_ms <= aircraft.seen_pos_ms.saturating_add(2_000)
        && haversine_km(aircraft.lat, aircraft.lon, lat, lon) <= 0.5
        && source == Source::Adsb;

    if !ignore_for_reliability {
        if fast_track {
            let target = filter_persistence.max(1);
            aircraft.pos_reliable_odd = target;
            aircraft.pos_reliable_even = target;
        } else {
            aircraft.pos_reliable_odd =
                (aircraft.pos_reliable_odd + 1).min(filter_persistence.max(1));
            aircraft.pos_reliable_even =
                (aircraft.pos_reliable_even + 1).min(filter_persistence.max(1));
        }
    }

    let was_ever_reliable = aircraft.seen_pos_reliable_ms != 0;
    let previous_point = aircraft
        .had_position
        .then_some((aircraft.lat, aircraft.lon, aircraft.seen_pos_ms));

    aircraft.lat = lat;
    aircraft.lon = lon;
    aircraft.nic = nic;
    aircraft.rc = rc;
    aircraft.on_ground = on_ground;
    aircraft.seen_pos_ms = now_ms;
    aircraft.had_position = true;
    aircraft.last_position_receiver_id = receiver_id;

    let reliable = aircraft.is_position_reliable(json_reliable);
    if reliable {
        aircraft.lat_reliable = lat;
        aircraft.lon_reliable = lon;
        aircraft.seen_pos_reliable_ms = now_ms;

        // Fast-tracking to reliable (spec.md B4) skips straight past the
        // gradual ramp-up, so the point that got us here would otherwise
        // never make the trace; back-fill it once.
        if fast_track && !was_ever_reliable {
            if let Some((old_lat, old_lon, old_ts)) = previous_point {
                append_trace_point(aircraft, old_ts, old_lat, old_lon, on_ground);
            }
        }

        append_trace_point(aircraft, now_ms, lat, lon, on_ground);
    }

    (reliable, false)
}

fn append_trace_point(aircraft: &mut Aircraft, now_ms: u64, lat: f64, lon: f64, on_ground: bool) {
    let altitude_25ft = aircraft
        .altitude_baro
        .get()
        .map(|a| (*a as f64 / 25.0).round() as i16)
        .unwrap_or(0);
    let flags = TraceFlags {
        altitude_valid: aircraft.altitude_baro.get().is_some(),
        altitude_geom: false,
        gs_valid: aircraft.gs.get().is_some(),
        track_valid: aircraft.track.get().is_some(),
        on_ground,
        rate_valid: aircraft.baro_rate.get().is_some(),
        rate_geom: false,
        stale: false,
        leg_marker: false,
    };
    let gs_x10 = aircraft
        .gs
        .get()
        .map(|v| (*v * 10.0).round() as i16)
        .unwrap_or(0);
    let track_x10 = aircraft
        .track
        .get()
        .map(|v| (*v * 10.0).round() as i16)
        .unwrap_or(0);
    let vrate = aircraft
        .baro_rate
        .get()
        .map(|v| (*v as f64 / 32.0).round() as i16)
        .unwrap_or(0);

    let callsign = aircraft.callsign.get().cloned();
    let squawk = aircraft.squawk.get().copied();
    let nic = aircraft.nic;
    let rcv = aircraft.rc;
    let selected_altitude = aircraft.selected_altitude.get().copied();
    let selected_heading = aircraft.selected_heading.get().copied();
    let nacp = aircraft.nacp;
    let nacv = aircraft.nacv;
    let sil = aircraft.sil;
    let gva = aircraft.gva;

    aircraft.trace.maybe_append(
        now_ms,
        lat,
        lon,
        altitude_25ft,
        flags,
        vrate,
        gs_x10,
        track_x10,
        on_ground,
        || StateAll {
            callsign,
            squawk,
            nic,
            rc: rcv,
            selected_altitude,
            selected_heading,
            nacp,
            nacv,
            sil,
            gva,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsb_core::decode::ICAO;

    fn icao(v: u32) -> ICAO {
        ICAO(v)
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            filter_persistence: 4,
            json_reliable: 2,
            max_range_km: 0.0,
            user_position: None,
            reduce_interval_ms: 5_000,
        }
    }

    #[test]
    fn b1_global_airborne_cpr_success() {
        let mut a = Aircraft::new(icao(0x4001));
        let receivers = ReceiverTable::default();
        let cfg = config();

        let even = IncomingCprFrame {
            lat: 92095,
            lon: 39846,
            nic: 7,
            rc: 186,
            kind: CprKind::Airborne,
            odd: false,
            source: Source::Adsb,
            now_ms: 0,
            is_sbs: false,
            receiver_id: 1,
        };
        let r1 = process_cpr_frame(&mut a, &receivers, even, &cfg);
        assert_eq!(r1, PositionResult::AwaitingPair);

        let odd = IncomingCprFrame {
            lat: 88385,
            lon: 125818,
            nic: 7,
            rc: 186,
            kind: CprKind::Airborne,
            odd: true,
            source: Source::Adsb,
            now_ms: 5_000,
            is_sbs: false,
            receiver_id: 1,
        };
        let r2 = process_cpr_frame(&mut a, &receivers, odd, &cfg);
        match r2 {
            PositionResult::Decoded { lat, lon, .. } => {
                assert!((lat - 52.2572).abs() < 1e-3);
                assert!((lon - 3.9193).abs() < 1e-3);
            }
            other => panic!("expected decode, got {other:?}"),
        }
        assert_eq!(a.pos_reliable_even, 1);
        assert_eq!(a.pos_reliable_odd, 1);
        assert_eq!(a.position_valid.current_source, Source::Adsb);
    }

    #[test]
    fn b2_cpr_window_miss_leaves_counters_untouched() {
        let mut a = Aircraft::new(icao(0x4002));
        let receivers = ReceiverTable::default();
        let cfg = config();

        let even = IncomingCprFrame {
            lat: 92095,
            lon: 39846,
            nic: 7,
            rc: 186,
            kind: CprKind::Airborne,
            odd: false,
            source: Source::Adsb,
            now_ms: 0,
            is_sbs: false,
            receiver_id: 1,
        };
        process_cpr_frame(&mut a, &receivers, even, &cfg);

        let odd = IncomingCprFrame {
            lat: 88385,
            lon: 125818,
            nic: 7,
            rc: 186,
            kind: CprKind::Airborne,
            odd: true,
            source: Source::Adsb,
            now_ms: 12_000,
            is_sbs: false,
            receiver_id: 1,
        };
        let result = process_cpr_frame(&mut a, &receivers, odd, &cfg);
        assert_eq!(result, PositionResult::WindowMiss);
        assert_eq!(a.pos_reliable_even, 0);
        assert_eq!(a.pos_reliable_odd, 0);
    }

    #[test]
    fn b3_speed_check_rejection() {
        let mut a = Aircraft::new(icao(0x4003));
        a.lat = 50.0;
        a.lon = 10.0;
        a.pos_reliable_odd = 4;
        a.pos_reliable_even = 4;
        a.seen_pos_ms = 0;
        a.gs.value = Some(400.0);
        a.gs.validity.current_source = Source::Adsb;
        a.gs.validity.last_updated_ms = 0;
        a.position_valid.current_source = Source::Adsb;
        a.position_valid.last_source_seen = Source::Adsb;

        let outcome = speed_check(&a, Source::Adsb, 52.0, 10.0, 5_000);
        assert!(!outcome.passed);

        position_bad(&mut a);
        assert_eq!(a.pos_reliable_odd, 3);
        assert_eq!(a.pos_reliable_even, 3);
        assert_eq!(a.lat, 50.0);
    }

    #[test]
    fn b4_bootstrap_fast_track_reaches_threshold() {
        let mut a = Aircraft::new(icao(0x4004));
        let receivers = ReceiverTable::default();
        let cfg = config();

        // first ADS-B position: bootstrap accept at counters 0,0 -> set_position runs
        // via a synthetic global decode path is awkward here, so exercise set_position
        // semantics through two local-relative decodes against a pre-seeded reference.
        a.position_valid.current_source = Source::Invalid;

        let outcome1 = super::set_position(
            &mut a, 1, 48.0, 2.0, 0, Source::Adsb, 7, 100, 4, 2, false, false,
        );
        assert_eq!(outcome1, (false, false));
        assert_eq!(a.pos_reliable_odd, 1);

        let outcome2 = super::set_position(
            &mut a, 1, 48.0021, 2.0012, 2_000, Source::Adsb, 7, 100, 4, 2, false, false,
        );
        assert!(outcome2.0);
        assert_eq!(a.pos_reliable_odd, 4);
        assert_eq!(a.pos_reliable_even, 4);
        assert_eq!(a.trace.entries.len(), 2);
        let _ = receivers;
    }

    #[test]
    fn sbs_position_bypasses_cpr_stash_and_sets_reliable() {
        let mut a = Aircraft::new(icao(0x4005));
        let cfg = config();

        let first = process_sbs_position(&mut a, 1, 48.0, 2.0, 0, Source::Sbs, false, &cfg);
        assert!(matches!(first, PositionResult::Decoded { reliable: false, .. }));

        let second =
            process_sbs_position(&mut a, 1, 48.0021, 2.0012, 2_000, Source::Sbs, false, &cfg);
        assert!(matches!(second, PositionResult::Decoded { reliable: true, .. }));
        assert_eq!(a.lat, 48.0021);
        assert!(a.cpr_odd.is_none());
        assert!(a.cpr_even.is_none());
    }

    #[test]
    fn sbs_position_rejected_when_out_of_range() {
        let mut a = Aircraft::new(icao(0x4006));
        let mut cfg = config();
        cfg.user_position = Some((48.0, 2.0));
        cfg.max_range_km = 10.0;

        let result = process_sbs_position(&mut a, 1, 10.0, 10.0, 0, Source::Sbs, false, &cfg);
        assert_eq!(result, PositionResult::RangeBad);
    }
}
