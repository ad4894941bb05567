//! Per-field source arbitration.
//!
//! Ported from `accept_data`/`combine_validity`/`compare_validity` in
//! readsb's `track.c`: every mutable aircraft field is guarded by one of
//! these records so that a later, worse-quality message cannot clobber a
//! recent, better one.

use serde::{Deserialize, Serialize};

/// Totally ordered data source. Ordering is significant: arbitration always
/// compares sources with `<`/`>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Source {
    Invalid = 0,
    Indirect = 1,
    ModeAc = 2,
    Sbs = 3,
    Mlat = 4,
    ModeS = 5,
    Jaero = 6,
    ModeSChecked = 7,
    Tisb = 8,
    Adsr = 9,
    Adsb = 10,
    /// Never stored: `accept_data` rewrites this to `Adsb` on arrival.
    Prio = 11,
}

/// How eagerly this field should be pushed into the reduced-rate forward
/// stream; mirrors `accept_data`'s `reduce_often` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceHint {
    Normal,
    Often,
    VeryOften,
}

/// A single accepted message is carried through arbitration so that
/// `accept_data` can stamp its reduced-stream forwarding bit and know
/// whether it originated from SBS (which never schedules reduced forwards).
#[derive(Debug, Clone, Copy)]
pub struct IncomingField {
    pub source: Source,
    pub receive_time_ms: u64,
    pub is_sbs: bool,
    pub carries_cpr: bool,
}

/// Window within which a worse-or-equal source cannot override a stored one.
pub const TRACK_STALE_MS: u64 = 60_000;
const MLAT_DAMPER_MS: u64 = 30_000;
const JAERO_DAMPER_MS: u64 = 600_000;
const REDUCE_CPR_FLOOR_MS: u64 = 7_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validity {
    pub current_source: Source,
    pub last_source_seen: Source,
    pub last_updated_ms: u64,
    pub stale: bool,
    pub next_reduce_forward_ms: u64,
}

impl Default for Validity {
    fn default() -> Self {
        Validity {
            current_source: Source::Invalid,
            last_source_seen: Source::Invalid,
            last_updated_ms: 0,
            stale: true,
            next_reduce_forward_ms: 0,
        }
    }
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        self.current_source != Source::Invalid
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_updated_ms)
    }

    pub fn refresh_stale(&mut self, now_ms: u64) {
        self.stale = now_ms > self.last_updated_ms + TRACK_STALE_MS;
    }

    /// Returns true (and updates `self`) if `incoming` should be accepted.
    /// Also returns whether the message should be flagged for the reduced
    /// forward stream, via `forward_reduced`.
    pub fn accept_data(
        &mut self,
        incoming: IncomingField,
        reduce_interval_ms: u64,
        hint: ReduceHint,
    ) -> AcceptOutcome {
        let receive_time = incoming.receive_time_ms;

        if incoming.source == Source::Invalid {
            return AcceptOutcome::rejected();
        }

        if receive_time < self.last_updated_ms {
            return AcceptOutcome::rejected();
        }

        if incoming.source < self.current_source
            && receive_time < self.last_updated_ms + TRACK_STALE_MS
        {
            return AcceptOutcome::rejected();
        }

        // Prevent JAERO and other low-quality sources from disrupting a
        // recently-updated better source too quickly.
        if incoming.source < self.last_source_seen {
            if incoming.source <= Source::Mlat
                && receive_time < self.last_updated_ms + MLAT_DAMPER_MS
            {
                return AcceptOutcome::rejected();
            }
            if incoming.source == Source::Jaero
                && receive_time < self.last_updated_ms + JAERO_DAMPER_MS
            {
                return AcceptOutcome::rejected();
            }
        }

        self.current_source = if incoming.source == Source::Prio {
            Source::Adsb
        } else {
            incoming.source
        };
        self.last_source_seen = self.current_source;
        self.last_updated_ms = receive_time;
        self.stale = false;

        let mut forward_reduced = false;
        if receive_time > self.next_reduce_forward_ms && !incoming.is_sbs {
            let multiplier = match hint {
                ReduceHint::Normal => 4,
                ReduceHint::Often => 1,
                ReduceHint::VeryOften => 0, // handled as /2 below
            };
            self.next_reduce_forward_ms = if hint == ReduceHint::VeryOften {
                receive_time + reduce_interval_ms / 2
            } else {
                receive_time + reduce_interval_ms * multiplier
            };
            // keep global CPR possible even at large reduce intervals
            if reduce_interval_ms > REDUCE_CPR_FLOOR_MS && incoming.carries_cpr {
                self.next_reduce_forward_ms = receive_time + REDUCE_CPR_FLOOR_MS;
            }
            forward_reduced = true;
        }

        AcceptOutcome {
            accepted: true,
            forward_reduced,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AcceptOutcome {
    pub accepted: bool,
    pub forward_reduced: bool,
}

impl AcceptOutcome {
    fn rejected() -> Self {
        AcceptOutcome {
            accepted: false,
            forward_reduced: false,
        }
    }
}

/// Merge two validities (e.g. deriving geometric altitude from baro + delta):
/// the worse of the two sources, the later of the two update times.
pub fn combine_validity(a: &Validity, b: &Validity, now_ms: u64) -> Validity {
    if a.current_source == Source::Invalid {
        return b.clone();
    }
    if b.current_source == Source::Invalid {
        return a.clone();
    }

    let source = a.current_source.min(b.current_source);
    let updated = a.last_updated_ms.max(b.last_updated_ms);
    Validity {
        current_source: source,
        last_source_seen: source,
        last_updated_ms: updated,
        stale: now_ms > updated + TRACK_STALE_MS,
        next_reduce_forward_ms: 0,
    }
}

/// Total order used to pick the better of two already-accepted candidates
/// for the same logical field.
pub fn compare_validity(lhs: &Validity, rhs: &Validity) -> std::cmp::Ordering {
    use std::cmp::Ordering::*;
    if !lhs.stale && lhs.current_source > rhs.current_source {
        Greater
    } else if !rhs.stale && lhs.current_source < rhs.current_source {
        Less
    } else {
        lhs.last_updated_ms.cmp(&rhs.last_updated_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(source: Source, t: u64) -> IncomingField {
        IncomingField {
            source,
            receive_time_ms: t,
            is_sbs: false,
            carries_cpr: false,
        }
    }

    #[test]
    fn rejects_invalid_source() {
        let mut v = Validity::default();
        let out = v.accept_data(incoming(Source::Invalid, 10), 1000, ReduceHint::Normal);
        assert!(!out.accepted);
    }

    #[test]
    fn rejects_out_of_order() {
        let mut v = Validity::default();
        v.accept_data(incoming(Source::Adsb, 100), 1000, ReduceHint::Normal);
        let out = v.accept_data(incoming(Source::Adsb, 50), 1000, ReduceHint::Normal);
        assert!(!out.accepted);
        assert_eq!(v.last_updated_ms, 100);
    }

    #[test]
    fn lower_source_cannot_override_within_stale_window() {
        let mut v = Validity::default();
        v.accept_data(incoming(Source::Adsb, 0), 1000, ReduceHint::Normal);
        let out = v.accept_data(incoming(Source::Mlat, 1_000), 1000, ReduceHint::Normal);
        assert!(!out.accepted);
        assert_eq!(v.current_source, Source::Adsb);
    }

    #[test]
    fn lower_source_overrides_after_stale_window() {
        let mut v = Validity::default();
        v.accept_data(incoming(Source::Adsb, 0), 1000, ReduceHint::Normal);
        let out = v.accept_data(
            incoming(Source::Mlat, TRACK_STALE_MS + 1),
            1000,
            ReduceHint::Normal,
        );
        assert!(out.accepted);
        assert_eq!(v.current_source, Source::Mlat);
    }

    #[test]
    fn mlat_damper_window() {
        let mut v = Validity::default();
        v.accept_data(incoming(Source::Adsb, 0), 1000, ReduceHint::Normal);
        v.accept_data(
            incoming(Source::Mlat, TRACK_STALE_MS + 1),
            1000,
            ReduceHint::Normal,
        );
        // Mlat is now last_source_seen; a second Mlat frame within the
        // 30s damper after a *better* source cannot displace it further,
        // but here the previous source is itself Mlat, so acceptance
        // falls through to the ordinary staleness rule.
        let out = v.accept_data(
            incoming(Source::Mlat, TRACK_STALE_MS + 2),
            1000,
            ReduceHint::Normal,
        );
        assert!(out.accepted);
    }

    #[test]
    fn prio_is_recorded_as_adsb() {
        let mut v = Validity::default();
        let out = v.accept_data(incoming(Source::Prio, 0), 1000, ReduceHint::Normal);
        assert!(out.accepted);
        assert_eq!(v.current_source, Source::Adsb);
    }

    #[test]
    fn monotone_timestamp_invariant() {
        let mut v = Validity::default();
        let mut last = 0u64;
        for t in [0u64, 10, 5, 20, 15, 40] {
            let before = v.last_updated_ms;
            v.accept_data(incoming(Source::Adsb, t), 1000, ReduceHint::Normal);
            assert!(v.last_updated_ms >= before);
            last = last.max(v.last_updated_ms);
        }
        assert_eq!(v.last_updated_ms, last);
    }

    #[test]
    fn combine_picks_worse_source_and_later_time() {
        let mut a = Validity::default();
        a.accept_data(incoming(Source::Adsb, 100), 1000, ReduceHint::Normal);
        let mut b = Validity::default();
        b.accept_data(incoming(Source::Mlat, 200), 1000, ReduceHint::Normal);
        let combined = combine_validity(&a, &b, 500);
        assert_eq!(combined.current_source, Source::Mlat);
        assert_eq!(combined.last_updated_ms, 200);
    }
}
