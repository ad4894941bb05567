//! Binary globe-tile snapshots (spec.md §6.2 `globeBin`): one file per
//! populated tile, little-endian header followed by a fixed-size record per
//! reliable aircraft currently assigned to that tile.
//!
//! Grounded on `globe.rs`'s tile index (itself grounded on
//! `original_source/globe_index.c`) for tile membership, and on
//! `snapshot.rs`'s atomic write-then-rename pattern for the file itself.
//! `original_source/` does not carry readsb's `binCraft` record layout (it
//! was filtered out by the size cap), so the per-aircraft record below is a
//! condensed, self-contained subset rather than a byte-for-byte port: icao,
//! scaled lat/lon, altitude, scaled groundspeed/track, squawk and a status
//! byte, padded to `ELEMENT_SIZE`.

use super::aircraft::Aircraft;
use super::globe::{globe_index, TileConfig};
use super::store::{Store, AIRCRAFT_BUCKETS};
use std::collections::HashMap;
use std::path::Path;

/// Bytes per `binCraft` record, including the reserved padding tail.
pub const ELEMENT_SIZE: u32 = 32;

const UNKNOWN_ALTITUDE: i32 = i32::MIN;

const FLAG_ON_GROUND: u8 = 1 << 0;
const FLAG_RELIABLE: u8 = 1 << 1;

fn encode_record(a: &Aircraft) -> [u8; ELEMENT_SIZE as usize] {
    let mut buf = [0u8; ELEMENT_SIZE as usize];
    let mut w = 0usize;
    let mut put = |bytes: &[u8]| {
        buf[w..w + bytes.len()].copy_from_slice(bytes);
        w += bytes.len();
    };

    put(&a.address.0.to_le_bytes());
    put(&((a.lat_reliable * 1e6) as i32).to_le_bytes());
    put(&((a.lon_reliable * 1e6) as i32).to_le_bytes());
    put(&a.altitude_baro.get().copied().unwrap_or(UNKNOWN_ALTITUDE).to_le_bytes());
    put(&((a.gs.get().copied().unwrap_or(0.0) * 10.0) as i16).to_le_bytes());
    put(&((a.track.get().copied().unwrap_or(0.0) * 10.0) as u16).to_le_bytes());
    put(&a.squawk.get().copied().unwrap_or(0).to_le_bytes());

    let mut flags = 0u8;
    if a.on_ground {
        flags |= FLAG_ON_GROUND;
    }
    if a.seen_pos_reliable_ms != 0 {
        flags |= FLAG_RELIABLE;
    }
    put(&[flags]);
    put(&[a.nacp.unwrap_or(0)]);

    buf
}

fn encode_header(now_ms: u64, pos_count: u32, index: u32, tile: super::globe::Tile) -> Vec<u8> {
    let mut out = Vec::with_capacity(28);
    out.extend_from_slice(&now_ms.to_le_bytes());
    out.extend_from_slice(&ELEMENT_SIZE.to_le_bytes());
    out.extend_from_slice(&pos_count.to_le_bytes());
    out.extend_from_slice(&index.to_le_bytes());
    out.extend_from_slice(&tile.south.to_le_bytes());
    out.extend_from_slice(&tile.west.to_le_bytes());
    out.extend_from_slice(&tile.north.to_le_bytes());
    out.extend_from_slice(&tile.east.to_le_bytes());
    out
}

/// One tile's worth of `globeBin` bytes: header plus `posCount` records.
pub fn encode_tile(config: &TileConfig, tile_id: u32, aircraft: &[&Aircraft], now_ms: u64) -> Vec<u8> {
    let tile = super::globe::globe_index_index(config, tile_id);
    let mut out = encode_header(now_ms, aircraft.len() as u32, tile_id, tile);
    for a in aircraft {
        out.extend_from_slice(&encode_record(a));
    }
    out
}

/// Buckets every aircraft with a reliable position into its globe tile and
/// writes one `globeBin` file per populated tile under
/// `json_dir/globe_<tile_id>.binCraft.tmp` (renamed into place once written,
/// spec.md §4.9's atomic-write convention).
pub async fn write_tile_snapshots(store: &Store, config: &TileConfig, json_dir: &Path, now_ms: u64) -> std::io::Result<()> {
    let mut by_tile: HashMap<u32, Vec<Aircraft>> = HashMap::new();
    store
        .for_each_in_range(0..AIRCRAFT_BUCKETS, |a| {
            if a.seen_pos_reliable_ms != 0 {
                let tile_id = globe_index(config, a.lat_reliable, a.lon_reliable);
                by_tile.entry(tile_id).or_default().push(a.clone());
            }
        })
        .await;

    for (tile_id, aircraft) in &by_tile {
        let refs: Vec<&Aircraft> = aircraft.iter().collect();
        let bytes = encode_tile(config, *tile_id, &refs, now_ms);
        let name = format!("globe_{tile_id}.binCraft");
        let tmp = json_dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, json_dir.join(name)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsb_core::decode::ICAO;

    #[test]
    fn record_round_trips_icao_and_position() {
        let mut a = Aircraft::new(ICAO(0x4b1234));
        a.lat_reliable = 48.8566;
        a.lon_reliable = 2.3522;
        a.seen_pos_reliable_ms = 1_000;
        let record = encode_record(&a);

        let icao = u32::from_le_bytes(record[0..4].try_into().unwrap());
        let lat = i32::from_le_bytes(record[4..8].try_into().unwrap());
        let lon = i32::from_le_bytes(record[8..12].try_into().unwrap());
        assert_eq!(icao, 0x4b1234);
        assert_eq!(lat, (48.8566 * 1e6) as i32);
        assert_eq!(lon, (2.3522 * 1e6) as i32);

        let flags = record[22];
        assert_eq!(flags & FLAG_RELIABLE, FLAG_RELIABLE);
    }

    #[test]
    fn header_carries_tile_bounds_and_element_size() {
        let config = TileConfig::default_tiles();
        let tile = super::super::globe::globe_index_index(&config, 5);
        let header = encode_header(123, 2, 5, tile);
        let element_size = u32::from_le_bytes(header[8..12].try_into().unwrap());
        let pos_count = u32::from_le_bytes(header[12..16].try_into().unwrap());
        assert_eq!(element_size, ELEMENT_SIZE);
        assert_eq!(pos_count, 2);
    }
}
