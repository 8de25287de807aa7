use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use std::sync::Arc;
use std::time::{Duration, Instant};

use linkmon_core::radio::RadioCardRegistry;
use linkmon_core::sinks::{MemorySink, TracingSink};
use linkmon_core::video::VIDEO_LINK_COUNT;
use linkmon_core::{LinkMonitor, MonitorConfig};
use linkmon_proto::{LinkMessage, Role, SourceId};

use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "linkmon", version, about = "Wireless link telemetry monitor")]
struct Cli {
    /// TOML config; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration.
    Doctor,
    /// Feed a recorded JSON-lines message log through the monitor and print
    /// the resulting state of both endpoints.
    Replay {
        #[arg(long)]
        file: String,
    },
    /// Consume decoded messages (JSON lines) from stdin, live, with the 1 Hz
    /// liveness ticker running.
    Run,
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    monitor: Option<MonitorConfig>,
}

/// One decoded message as the replay/stdin harness carries it. `at_ms` is
/// the offset from the start of the recording; live input leaves it unset.
#[derive(Debug, serde::Deserialize)]
struct Envelope {
    #[serde(default)]
    at_ms: u64,
    source_id: SourceId,
    message: LinkMessage,
}

fn load_config(path: Option<&str>) -> Result<MonitorConfig> {
    let Some(path) = path else {
        return Ok(MonitorConfig::default());
    };
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    let cfg: Config = toml::from_str(&s).context("parse config toml")?;
    Ok(cfg.monitor.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg),
        Command::Replay { file } => replay(&cfg, &file).await,
        Command::Run => run(&cfg).await,
    }
}

fn doctor(cfg: &MonitorConfig) -> Result<()> {
    anyhow::ensure!(cfg.air_source_id != 0, "monitor.air_source_id must be nonzero");
    anyhow::ensure!(
        cfg.ground_source_id != 0,
        "monitor.ground_source_id must be nonzero"
    );
    anyhow::ensure!(
        cfg.air_source_id != cfg.ground_source_id,
        "air and ground source ids must differ"
    );
    info!("doctor: OK (air={}, ground={})", cfg.air_source_id, cfg.ground_source_id);
    Ok(())
}

async fn replay(cfg: &MonitorConfig, path: &str) -> Result<()> {
    let alerts = Arc::new(MemorySink::new());
    let log = Arc::new(MemorySink::new());
    let mon = LinkMonitor::new(*cfg, alerts.clone(), log.clone());

    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read replay file {}", path))?;

    let base = Instant::now();
    let mut next_tick_ms: u64 = 1000;
    let mut accepted = 0usize;
    let mut dropped = 0usize;

    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let env: Envelope = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: bad envelope", path, lineno + 1))?;

        // fire every ticker edge that falls before this message
        while next_tick_ms <= env.at_ms {
            mon.tick(base + Duration::from_millis(next_tick_ms));
            next_tick_ms += 1000;
        }

        let now = base + Duration::from_millis(env.at_ms);
        if mon.process(now, env.source_id, &env.message) {
            accepted += 1;
        } else {
            dropped += 1;
        }
    }
    // one settling tick past the end of the recording
    mon.tick(base + Duration::from_millis(next_tick_ms));

    println!("replayed: {} accepted, {} dropped", accepted, dropped);
    for role in [Role::Air, Role::Ground] {
        print_endpoint(&mon, role);
    }
    print_streams(&mon);
    let alert_lines = alerts.take();
    println!("alerts ({}):", alert_lines.len());
    for (severity, text) in alert_lines {
        println!("  [{:?}] {}", severity, text);
    }
    Ok(())
}

fn print_endpoint(mon: &LinkMonitor, role: Role) {
    let ep = mon.endpoint(role).lock().unwrap();
    let (rx_pps, tx_pps, rx_rate, tx_rate) = ep.telemetry_rates();
    println!("{}:", role.unit_name());
    println!("  alive={}", ep.is_alive());
    println!("  version={}", ep.version());
    match ep.current_rx_rssi_dbm() {
        Some(dbm) => println!("  rssi={} dBm", dbm),
        None => println!("  rssi=no signal"),
    }
    println!(
        "  loss={}% tx_dropping={} inj_errors={} dropped={}",
        ep.rx_packet_loss_perc(),
        ep.tx_dropping(),
        ep.count_tx_injection_errors(),
        ep.count_tx_dropped_packets()
    );
    println!(
        "  telemetry rx={} ({}) tx={} ({})",
        rx_pps, rx_rate, tx_pps, tx_rate
    );
    let sys = ep.system();
    println!(
        "  cpu={}% temp={}C ram={}%/{}MB",
        sys.cpu_load_perc, sys.soc_temperature_c, sys.ram_usage_perc, sys.ram_total_mb
    );
    drop(ep);

    let radio = mon.radio().lock().unwrap();
    for i in 0..RadioCardRegistry::card_count(role) {
        if let Some(card) = radio.card(role, i as u8) {
            println!(
                "  card{}: alive={} rssi={} dBm rx={}",
                i, card.alive, card.rssi_dbm, card.packets_received
            );
        }
    }
}

fn print_streams(mon: &LinkMonitor) {
    let video = mon.video().lock().unwrap();
    for i in 0..VIDEO_LINK_COUNT as u8 {
        let Some(slot) = video.slot(i) else { continue };
        if slot.air_updates == 0 && slot.ground_updates == 0 {
            continue;
        }
        println!("stream {}:", i);
        if let Some(air) = &slot.air {
            println!(
                "  air: encoder={} kbit/s injected={} kbit/s ({} pps) dropped={} fec={}% [{} updates]",
                air.measured_encoder_bitrate_kbits,
                air.injected_bitrate_kbits,
                air.injected_pps,
                air.dropped_packets,
                air.fec_percentage,
                slot.air_updates
            );
        }
        if let Some(gnd) = &slot.ground {
            println!(
                "  ground: incoming={} kbit/s recovered={}/{} lost={} fec_avg={}us [{} updates]",
                gnd.incoming_bitrate_kbits,
                gnd.count_fragments_recovered,
                gnd.count_blocks_recovered,
                gnd.count_blocks_lost,
                gnd.fec_decode_time_avg_us,
                slot.ground_updates
            );
        }
    }
    drop(video);

    if let Some(channels) = mon.rc().lock().unwrap().all() {
        let shown: Vec<u16> = channels.iter().take(8).copied().collect();
        println!("rc channels (1-8): {:?}", shown);
    }
}

async fn run(cfg: &MonitorConfig) -> Result<()> {
    let sink = Arc::new(TracingSink);
    let mon = LinkMonitor::new(*cfg, sink.clone(), sink);

    info!("run: reading decoded messages from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                mon.tick(Instant::now());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    info!("run: input closed, stopping");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Envelope>(line) {
                    Ok(env) => {
                        mon.process(Instant::now(), env.source_id, &env.message);
                    }
                    Err(e) => warn!("run: bad envelope skipped: {}", e),
                }
            }
        }
    }

    for role in [Role::Air, Role::Ground] {
        print_endpoint(&mon, role);
    }
    print_streams(&mon);
    Ok(())
}
