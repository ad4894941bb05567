//! Entry point: wires the preconstructed [`config::Config`] into the
//! tracking store, the outbound feed readers, the inbound listening
//! services and the maintenance loop (spec.md §1, §6.3).
//!
//! Grounded on the teacher's own `main.rs`: a single `tokio::main` that
//! parses `Options`, spawns one task per configured source into a shared
//! `mpsc` channel, and loops decoding messages off it. Generalized here to
//! also accept inbound connections (the teacher's server was outbound-only)
//! and to drive the maintenance sweep instead of a TUI.

mod config;
mod dedup;
mod filters;
mod maintenance;
mod net;
mod snapshot;
mod source;
mod track;

use adsb_core::decode::{Message, TimedMessage};
use clap::Parser;
use config::{Config, Options};
use maintenance::Stats;
use net::framing::{Frame, FramingMode};
use net::Service;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use track::position::PipelineConfig;
use track::receiver::ReceiverTable;
use track::update;
use track::Store;
use tracing::{info, warn};

/// Milliseconds since the Unix epoch; the clock the rest of the server's
/// timestamps (`seen_ms`, trace entries, stats buckets) are expressed in.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        filter_persistence: config.filter_persistence,
        json_reliable: config.json_reliable,
        max_range_km: config.max_range_km,
        user_position: config.user_position,
        reduce_interval_ms: config.reduce_interval_ms,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = Options::parse();
    let config = match Config::from_options(options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let mut output_file = match &config.output_jsonl {
        Some(path) => Some(
            tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .await?,
        ),
        None => None,
    };

    let store = Store::new();
    let receivers = Arc::new(Mutex::new(ReceiverTable::default()));
    let stats = Arc::new(Stats::default());

    tokio::spawn(maintenance::run(
        store.clone(),
        receivers.clone(),
        stats.clone(),
        config.clone(),
    ));

    let (tx, mut rx) = mpsc::channel::<TimedMessage>(1024);

    for source in &config.sources {
        let tx = tx.clone();
        let serial = source.serial();
        let name = source.name.clone();
        let source = source.clone();
        tokio::spawn(async move {
            source.receiver(tx, serial, name).await;
        });
    }

    for listen in &config.listen {
        let name = listen.name.clone();
        let framing = listen.framing;
        let bind = listen.bind;
        let port = bind.port();

        let service = Service::new(name.clone(), framing, listen.separator, listen.heartbeat_interval, listen.sendq_max);
        let (frame_tx, frame_rx) = mpsc::channel::<(u64, Frame)>(1024);
        let listen_service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = listen_service.listen(bind, frame_tx).await {
                warn!("listener {name}: {bind} failed: {e}");
            }
        });

        let pump_store = store.clone();
        let pump_stats = stats.clone();
        let pump_config = config.clone();
        let pump_service = service.clone();
        let pump_decode_tx = tx.clone();
        tokio::spawn(async move {
            frame_pump(frame_rx, pump_service, framing, port, pump_store, pump_stats, pump_config, pump_decode_tx).await;
        });
    }
    drop(tx);

    let pipeline = pipeline_config(&config);

    while let Some(mut msg) = rx.recv().await {
        if msg.message.is_none() {
            msg.message = Message::try_from(msg.frame.as_slice()).ok();
        }
        if msg.message.is_none() {
            continue;
        }
        if !filters::Filters::is_in(&config.filters, &msg) {
            continue;
        }

        stats.record_message();

        let receiver_id = msg
            .metadata
            .first()
            .map(|m| m.serial)
            .unwrap_or(0);

        let mut table = receivers.lock().await;
        let outcome = update::apply_message(&store, &mut table, &msg, &pipeline, receiver_id, false).await;
        drop(table);

        if let Some((_, Some(position))) = &outcome {
            record_position_stats(&stats, position);
        }

        if config.verbose || output_file.is_some() {
            if let Ok(json) = serde_json::to_string(&msg) {
                if config.verbose {
                    println!("{json}");
                }
                if let Some(file) = &mut output_file {
                    file.write_all(json.as_bytes()).await?;
                    file.write_all(b"\n").await?;
                }
            }
        }
    }

    Ok(())
}

fn record_position_stats(stats: &Stats, result: &track::position::PositionResult) {
    use track::position::PositionResult;
    match result {
        PositionResult::Decoded { reliable, .. } => stats.record_position(*reliable),
        PositionResult::RangeBad | PositionResult::SpeedBad => stats.record_position(false),
        PositionResult::FrameRejected
        | PositionResult::AwaitingPair
        | PositionResult::WindowMiss
        | PositionResult::NoReference => {}
    }
}

/// Drains framed records off one service's accept loop, turning them into
/// either a [`TimedMessage`] destined for the shared decode channel (Beast,
/// AVR) or a direct call into the SBS position pipeline (spec.md §4.7's
/// "ingest services feed the same tracking core regardless of wire
/// format").
#[allow(clippy::too_many_arguments)]
async fn frame_pump(
    mut frame_rx: mpsc::Receiver<(u64, Frame)>,
    service: Arc<Service>,
    framing: FramingMode,
    port: u16,
    store: Arc<Store>,
    stats: Arc<Stats>,
    config: Config,
    decode_tx: mpsc::Sender<TimedMessage>,
) {
    let pipeline = pipeline_config(&config);
    let sbs_source = net::encode::sbs_port_flavor(port);

    while let Some((client_id, frame)) = frame_rx.recv().await {
        let receiver_id = service
            .clients
            .read()
            .await
            .get(&client_id)
            .map(|c| c.receiver_id)
            .unwrap_or(client_id);

        match (framing, frame) {
            (FramingMode::Sbs, Frame::Ascii(line)) => {
                let now = now_ms();
                if let Some((_, Some(position))) =
                    update::apply_sbs(&store, &line, sbs_source, now, &pipeline, receiver_id).await
                {
                    stats.record_message();
                    record_position_stats(&stats, &position);
                }
            }
            (FramingMode::Avr, Frame::Ascii(line)) => {
                if let Some(frame_bytes) = net::encode::parse_avr_hex(&line) {
                    let msg = TimedMessage {
                        timestamp: now_ms() as f64 / 1000.0,
                        frame: frame_bytes,
                        message: None,
                        metadata: vec![],
                        decode_time: None,
                    };
                    let _ = decode_tx.send(msg).await;
                }
            }
            (FramingMode::Beast, Frame::Beast(beast_frame)) => {
                if let Some(msg) = beast_frame_to_message(beast_frame) {
                    let _ = decode_tx.send(msg).await;
                }
            }
            _ => {}
        }
    }
    info!("frame pump for service {} exiting", service.name);
}

fn beast_frame_to_message(frame: net::framing::BeastFrame) -> Option<TimedMessage> {
    use net::framing::BeastFrame;
    let (timestamp, payload): (u64, Vec<u8>) = match frame {
        BeastFrame::ModeSShort { timestamp, payload, .. } => (timestamp, payload.to_vec()),
        BeastFrame::ModeSLong { timestamp, payload, .. } => (timestamp, payload.to_vec()),
        BeastFrame::ModeAc { .. } | BeastFrame::ReceiverId(_) | BeastFrame::Uuid(_) => return None,
    };
    Some(TimedMessage {
        timestamp: timestamp as f64 / 12_000_000.0,
        frame: payload,
        message: None,
        metadata: vec![],
        decode_time: None,
    })
}

