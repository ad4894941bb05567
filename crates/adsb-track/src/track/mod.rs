//! The tracking engine: aircraft store, per-field source arbitration,
//! position pipeline, trace ring and the two static/learned reference
//! tables (receiver reputation, globe tiles) that feed it (spec.md §3, §4).

pub mod aircraft;
pub mod globe;
pub mod position;
pub mod receiver;
pub mod store;
pub mod tile_snapshot;
pub mod trace;
pub mod update;
pub mod validity;

pub use aircraft::Aircraft;
pub use store::Store;
