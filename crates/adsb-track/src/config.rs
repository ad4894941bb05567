//! Runtime configuration: the record the rest of the server reads, and the
//! thin `clap` CLI that produces it (spec.md §1, §6.3 — "the core only reads
//! a preconstructed config record"; we do not reimplement full flag parsing
//! policy beyond what the teacher's own `Options` struct already has).

use crate::filters::Filters;
use crate::net::framing::FramingMode;
use crate::source::Source;
use crate::track::globe::TileConfig;
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    BadListenAddress { spec: String, reason: String },
    BadTomlFile { path: PathBuf, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadListenAddress { spec, reason } => {
                write!(f, "invalid listen address {spec:?}: {reason}")
            }
            ConfigError::BadTomlFile { path, reason } => {
                write!(f, "failed to read config file {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// One server-side listening role (spec.md §3.6 "Service").
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub name: String,
    pub framing: FramingMode,
    pub separator: u8,
    pub bind: SocketAddr,
    pub heartbeat_interval: Option<Duration>,
    pub sendq_max: usize,
}

fn parse_listen(spec: &str, framing: FramingMode, name: &str) -> Result<ListenConfig, ConfigError> {
    let bind = SocketAddr::from_str(spec)
        .or_else(|_| format!("0.0.0.0:{spec}").parse())
        .map_err(|e: std::net::AddrParseError| ConfigError::BadListenAddress {
            spec: spec.to_string(),
            reason: e.to_string(),
        })?;
    Ok(ListenConfig {
        name: name.to_string(),
        framing,
        separator: b'\n',
        bind,
        heartbeat_interval: Some(Duration::from_secs(15)),
        sendq_max: 1024,
    })
}

/// Preconstructed config record every long-running task reads from (spec.md
/// §6.3). Cheap to clone; tasks keep their own `Arc` where sharing matters.
#[derive(Debug, Clone)]
pub struct Config {
    pub filter_persistence: u32,
    /// "Is reliable" gate (spec.md §3.1, B4): both counters must reach this
    /// before a position counts as reliable. Distinct from
    /// `filter_persistence`, which only clamps how high they can climb.
    pub json_reliable: u32,
    pub max_range_km: f64,
    pub user_position: Option<(f64, f64)>,
    pub reduce_interval_ms: u64,

    /// Horizon past which an ICAO-addressed aircraft with no traffic is
    /// evicted by the maintenance sweep (spec.md §3.6, §4.9).
    pub stale_icao_ms: u64,
    /// Shorter horizon for non-ICAO addresses (Mode A/C, TIS-B, ADS-R).
    pub stale_other_ms: u64,

    pub maintenance_interval_ms: u64,
    pub trace_interval_ms: u64,

    pub json_dir: Option<PathBuf>,
    pub tiles: TileConfig,

    pub listen: Vec<ListenConfig>,
    pub sources: Vec<Source>,
    pub reconnect_delay: Duration,

    pub output_jsonl: Option<PathBuf>,
    pub verbose: bool,

    /// TOML-only df/aircraft allowlist applied to every decoded message
    /// before it reaches the tracking pipeline (spec.md §4.2).
    pub filters: Filters,

    /// Window, in milliseconds, within which identical raw frames from
    /// different receivers are folded into one message with merged
    /// `SensorMetadata` (overlapping receiver coverage produces literal
    /// duplicates of the same Mode S frame). `0` disables deduplication.
    pub dedup_threshold_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter_persistence: crate::track::aircraft::FILTER_PERSISTENCE_DEFAULT,
            json_reliable: crate::track::aircraft::JSON_RELIABLE_DEFAULT,
            max_range_km: 0.0,
            user_position: None,
            reduce_interval_ms: 0,
            stale_icao_ms: 50 * 60 * 1000,
            stale_other_ms: 5 * 60 * 1000,
            maintenance_interval_ms: 1_000,
            trace_interval_ms: crate::track::trace::TRACE_INTERVAL_MS,
            json_dir: None,
            tiles: TileConfig::default_tiles(),
            listen: Vec::new(),
            sources: Vec::new(),
            reconnect_delay: Duration::from_secs(30),
            output_jsonl: None,
            verbose: false,
            filters: Filters::default(),
            dedup_threshold_ms: 0,
        }
    }
}

/// Mirrors the teacher's `Options` struct in shape (positional sources,
/// `-v`/`-o`/`-x` short flags) generalized to the listener/connector split
/// this server needs instead of a single TUI/REST-serving process.
#[derive(Debug, Parser)]
#[command(
    name = "adsb-track",
    version,
    about = "Track Mode S/ADS-B traffic from Beast/AVR/SBS feeds and serve JSON/tile snapshots"
)]
pub struct Options {
    /// Emit every decoded message as JSON on stdout.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Dump a copy of the received messages as .jsonl.
    #[arg(short, long, default_value = None)]
    pub output: Option<String>,

    /// Directory snapshots (aircraft.json, trace .json.gz) are written to.
    #[arg(long, default_value = None)]
    pub json_dir: Option<PathBuf>,

    /// Optional TOML file carrying listener/tile configuration beyond what
    /// fits comfortably on the command line.
    #[arg(short, long, default_value = None)]
    pub config: Option<PathBuf>,

    /// How long an aircraft with no fresh traffic is kept, in minutes.
    #[arg(long, short = 'x', default_value = None)]
    pub expire: Option<u64>,

    /// Reject positions further than this from `--lat`/`--lon`, in km.
    #[arg(long, default_value = "0.0")]
    pub max_range_km: f64,

    /// Receiver latitude, used as the initial surface-CPR reference and for
    /// `--max-range-km` filtering.
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,

    /// Listen for inbound Beast binary connections on `[host:]port`.
    #[arg(long = "beast-in")]
    pub beast_in: Vec<String>,

    /// Listen for inbound AVR raw-hex connections on `[host:]port`.
    #[arg(long = "avr-in")]
    pub avr_in: Vec<String>,

    /// Listen for inbound SBS Basestation CSV connections on `[host:]port`.
    #[arg(long = "sbs-in")]
    pub sbs_in: Vec<String>,

    /// List the outbound feeds to pull from, `[host:]port[@reference]`.
    pub sources: Vec<Source>,
}

/// File-based overlay for settings that don't belong on a command line
/// (mirrors the teacher's TOML-deserializable `Filters`, spec.md §1).
#[derive(Debug, Default, serde::Deserialize)]
struct FileConfig {
    tiles: Option<TileConfig>,
    reduce_interval_ms: Option<u64>,
    maintenance_interval_ms: Option<u64>,
    sendq_max: Option<usize>,
    dedup_threshold_ms: Option<u64>,
    #[serde(flatten)]
    filters: Filters,
}

impl FileConfig {
    fn load(path: &PathBuf) -> Result<FileConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::BadTomlFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::BadTomlFile {
            path: path.clone(),
            reason: e.to_string(),
        })
    }
}

impl Config {
    pub fn from_options(options: Options) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        config.verbose = options.verbose;
        config.output_jsonl = options.output.map(PathBuf::from);
        config.json_dir = options.json_dir;
        config.max_range_km = options.max_range_km;
        config.user_position = match (options.lat, options.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        };
        if let Some(minutes) = options.expire {
            config.stale_icao_ms = minutes * 60 * 1000;
            config.stale_other_ms = (minutes * 60 * 1000).min(config.stale_other_ms);
        }

        let file = options.config.as_ref().map(FileConfig::load).transpose()?;

        for spec in &options.beast_in {
            config
                .listen
                .push(parse_listen(spec, FramingMode::Beast, "beast-in")?);
        }
        for spec in &options.avr_in {
            config
                .listen
                .push(parse_listen(spec, FramingMode::Avr, "avr-in")?);
        }
        for spec in &options.sbs_in {
            config
                .listen
                .push(parse_listen(spec, FramingMode::Sbs, "sbs-in")?);
        }

        if let Some(file) = file {
            if let Some(tiles) = file.tiles {
                config.tiles = tiles;
            }
            if let Some(v) = file.reduce_interval_ms {
                config.reduce_interval_ms = v;
            }
            if let Some(v) = file.maintenance_interval_ms {
                config.maintenance_interval_ms = v;
            }
            if let Some(sendq_max) = file.sendq_max {
                for listen in config.listen.iter_mut() {
                    listen.sendq_max = sendq_max;
                }
            }
            config.filters = file.filters;
        }

        config.sources = options.sources;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_accepts_bare_port() {
        let listen = parse_listen("30005", FramingMode::Beast, "beast-in").unwrap();
        assert_eq!(listen.bind.port(), 30005);
    }

    #[test]
    fn from_options_builds_user_position_only_when_both_present() {
        let options = Options {
            verbose: false,
            output: None,
            json_dir: None,
            config: None,
            expire: None,
            max_range_km: 0.0,
            lat: Some(43.6),
            lon: Some(1.4),
            beast_in: vec![],
            avr_in: vec![],
            sbs_in: vec![],
            sources: vec![],
        };
        let config = Config::from_options(options).unwrap();
        assert_eq!(config.user_position, Some((43.6, 1.4)));
    }
}
