use serde::{Deserialize, Serialize};

/// Sender identifier carried by every decoded message (one fixed id per unit).
pub type SourceId = u8;

/// Which side of the wireless link an endpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Air,
    Ground,
}

impl Role {
    /// Short tag used for log lines, matches the on-screen naming.
    pub fn tag(&self) -> &'static str {
        match self {
            Role::Air => "OHD[A]",
            Role::Ground => "OHD[G]",
        }
    }

    pub fn unit_name(&self) -> &'static str {
        match self {
            Role::Air => "Air unit",
            Role::Ground => "Ground unit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionReport {
    pub version: String,
}

/// Snapshot of the onboard computer. Every field is last-value-wins on the
/// receiving side, there is no smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputerStatus {
    pub cpu_load_perc: u8,
    pub soc_temperature_c: i8,
    pub cpu_freq_mhz: u16,
    pub isp_freq_mhz: u16,
    pub h264_freq_mhz: u16,
    pub core_freq_mhz: u16,
    pub v3d_freq_mhz: u16,
    pub space_left_mb: u32,
    pub supply_voltage_mv: u32,
    pub supply_current_ma: u32,
    pub ram_usage_perc: u8,
    pub ram_total_mb: u32,
}

/// Per-physical-card monitor mode stats. `card_index` is 0 on air units,
/// 0..=3 on ground units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioCardStats {
    pub card_index: u8,
    pub rx_rssi_dbm: i16,
    pub count_packets_received: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioLinkStats {
    pub rx_packet_loss_perc: u8,
    pub count_tx_injection_errors: u64,
    pub count_tx_dropped_packets: u64,
}

/// Telemetry stream throughput, both directions, raw units. Display
/// formatting happens on the receiving side (see [`crate::units`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRates {
    pub rx_pps: u32,
    pub tx_pps: u32,
    pub rx_bps: u64,
    pub tx_bps: u64,
}

/// Video stats as measured on the transmitting (air) side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoStatsAir {
    pub link_index: u8,
    pub recommended_bitrate_kbits: u32,
    pub measured_encoder_bitrate_kbits: u32,
    pub injected_bitrate_kbits: u32,
    pub injected_pps: u32,
    /// Cumulative since air unit start. May reset when the air unit restarts.
    pub dropped_packets: i64,
    pub fec_percentage: u8,
}

/// Video stats as measured on the receiving (ground) side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoStatsGround {
    pub link_index: u8,
    pub incoming_bitrate_kbits: u32,
    pub count_fragments_recovered: u64,
    pub count_blocks_recovered: u64,
    pub count_blocks_lost: u64,
    pub fec_decode_time_avg_us: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Units never act as an autopilot; a sender claiming otherwise is
    /// misconfigured (logged, not rejected).
    #[serde(default)]
    pub claims_autopilot: bool,
}

/// 18 raw RC channel values, forwarded by the ground unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RcChannelsOverride {
    pub channels: [u16; 18],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusText {
    pub severity: Severity,
    pub text: String,
}

/// Reserved extension block; decoded for forward compatibility, carries
/// nothing the monitor consumes yet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComputerStatusExt {
    pub reserved: [u32; 4],
}

/// Every message kind the monitor understands, with its decoded payload.
/// The transport/decoder produces these; the core only dispatches on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkMessage {
    Version(VersionReport),
    ComputerStatus(ComputerStatus),
    RadioCardStats(RadioCardStats),
    RadioLinkStats(RadioLinkStats),
    TelemetryRates(TelemetryRates),
    VideoAir(VideoStatsAir),
    VideoGround(VideoStatsGround),
    ComputerStatusExt(ComputerStatusExt),
    Heartbeat(Heartbeat),
    RcChannels(RcChannelsOverride),
    StatusText(StatusText),
}

impl LinkMessage {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LinkMessage::Version(_) => "version",
            LinkMessage::ComputerStatus(_) => "computer-status",
            LinkMessage::RadioCardStats(_) => "radio-card-stats",
            LinkMessage::RadioLinkStats(_) => "radio-link-stats",
            LinkMessage::TelemetryRates(_) => "telemetry-rates",
            LinkMessage::VideoAir(_) => "video-stats-air",
            LinkMessage::VideoGround(_) => "video-stats-ground",
            LinkMessage::ComputerStatusExt(_) => "computer-status-ext",
            LinkMessage::Heartbeat(_) => "heartbeat",
            LinkMessage::RcChannels(_) => "rc-channels",
            LinkMessage::StatusText(_) => "status-text",
        }
    }
}
