//! Aggregated telemetry state for one side of the link.
//!
//! One `TelemetryEndpoint` exists per role (air, ground) for the process
//! lifetime. The decoder hands it every successfully decoded message via
//! [`TelemetryEndpoint::process_message`]; a 1 Hz ticker drives
//! [`TelemetryEndpoint::tick_liveness`]. Both run under the per-role lock in
//! [`crate::LinkMonitor`], so all state here assumes serialized access.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use linkmon_proto::message::{
    ComputerStatus, Heartbeat, LinkMessage, RadioCardStats, RadioLinkStats, StatusText,
    TelemetryRates, VideoStatsAir, VideoStatsGround,
};
use linkmon_proto::{units, Role, SourceId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::radio::RadioCardRegistry;
use crate::rc::RcChannels;
use crate::sinks::{AlertSink, DeviceActions, LogSink};
use crate::video::VideoStreamRegistry;

/// No heartbeat for this long means the unit is gone.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(4000);
/// Link stats older than this are reset to their displayed defaults.
pub const STATS_STALE_AFTER: Duration = Duration::from_secs(5);
/// Minimum spacing between repeated TX-drop alerts.
pub const TX_ALERT_COOLDOWN: Duration = Duration::from_secs(3);
/// Upper bound on version re-requests for a unit that never answers.
pub const MAX_VERSION_REQUESTS: u32 = 10;

const VERSION_UNKNOWN: &str = "N/A";
const RATE_UNKNOWN: &str = "N/A";
/// Status texts carrying this marker are shown on screen, not just logged.
const EXTERNAL_DEVICE_MARKER: &str = "External device";

/// Why an otherwise well-formed message was dropped. Identity mismatches are
/// filtered before dispatch and never reach this.
#[derive(Debug, Error, PartialEq, Eq)]
enum Reject {
    #[error("card index {index} out of range for {role:?}")]
    CardIndex { role: Role, index: u8 },
    #[error("air-origin video stats on a ground endpoint")]
    AirStatsOnGround,
    #[error("ground-origin video stats on an air endpoint")]
    GroundStatsOnAir,
}

/// Onboard computer metrics, each field independently last-value-wins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemMetrics {
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

pub struct TelemetryEndpoint {
    role: Role,
    own_source_id: SourceId,

    radio: Arc<Mutex<RadioCardRegistry>>,
    video: Arc<Mutex<VideoStreamRegistry>>,
    rc: Arc<Mutex<RcChannels>>,
    alerts: Arc<dyn AlertSink>,
    log: Arc<dyn LogSink>,
    actions: Option<Arc<dyn DeviceActions>>,

    last_message: Option<Instant>,
    last_heartbeat: Option<Instant>,
    alive: bool,

    version: String,
    version_requests: u32,

    system: SystemMetrics,

    current_rx_rssi_dbm: Option<i16>,
    rx_packet_loss_perc: u8,
    count_tx_injection_errors: u64,
    count_tx_dropped_packets: u64,
    telemetry_rx_pps: String,
    telemetry_tx_pps: String,
    telemetry_rx_rate: String,
    telemetry_tx_rate: String,

    tx_dropping: bool,
    last_dropped_packets: Option<i64>,
    last_tx_alert: Option<Instant>,
    last_link_stats: Option<Instant>,
}

impl TelemetryEndpoint {
    pub fn new(
        role: Role,
        own_source_id: SourceId,
        radio: Arc<Mutex<RadioCardRegistry>>,
        video: Arc<Mutex<VideoStreamRegistry>>,
        rc: Arc<Mutex<RcChannels>>,
        alerts: Arc<dyn AlertSink>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            role,
            own_source_id,
            radio,
            video,
            rc,
            alerts,
            log,
            actions: None,
            last_message: None,
            last_heartbeat: None,
            alive: false,
            version: VERSION_UNKNOWN.to_string(),
            version_requests: 0,
            system: SystemMetrics::default(),
            current_rx_rssi_dbm: None,
            rx_packet_loss_perc: 0,
            count_tx_injection_errors: 0,
            count_tx_dropped_packets: 0,
            telemetry_rx_pps: RATE_UNKNOWN.to_string(),
            telemetry_tx_pps: RATE_UNKNOWN.to_string(),
            telemetry_rx_rate: RATE_UNKNOWN.to_string(),
            telemetry_tx_rate: RATE_UNKNOWN.to_string(),
            tx_dropping: false,
            last_dropped_packets: None,
            last_tx_alert: None,
            last_link_stats: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn own_source_id(&self) -> SourceId {
        self.own_source_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn system(&self) -> &SystemMetrics {
        &self.system
    }

    pub fn current_rx_rssi_dbm(&self) -> Option<i16> {
        self.current_rx_rssi_dbm
    }

    pub fn rx_packet_loss_perc(&self) -> u8 {
        self.rx_packet_loss_perc
    }

    pub fn count_tx_injection_errors(&self) -> u64 {
        self.count_tx_injection_errors
    }

    pub fn count_tx_dropped_packets(&self) -> u64 {
        self.count_tx_dropped_packets
    }

    pub fn telemetry_rates(&self) -> (&str, &str, &str, &str) {
        (
            &self.telemetry_rx_pps,
            &self.telemetry_tx_pps,
            &self.telemetry_rx_rate,
            &self.telemetry_tx_rate,
        )
    }

    pub fn tx_dropping(&self) -> bool {
        self.tx_dropping
    }

    pub fn last_message(&self) -> Option<Instant> {
        self.last_message
    }

    /// Single inbound surface. Returns whether the message was accepted;
    /// callers use this for diagnostics only, never for retry.
    pub fn process_message(&mut self, now: Instant, source: SourceId, msg: &LinkMessage) -> bool {
        if source != self.own_source_id {
            debug!(
                role = ?self.role,
                source,
                expected = self.own_source_id,
                "message from unexpected source id"
            );
            return false;
        }
        self.last_message = Some(now);
        match self.dispatch(now, msg) {
            Ok(()) => true,
            Err(reject) => {
                warn!(role = ?self.role, kind = msg.kind_name(), "dropped: {}", reject);
                false
            }
        }
    }

    fn dispatch(&mut self, now: Instant, msg: &LinkMessage) -> Result<(), Reject> {
        match msg {
            LinkMessage::Version(v) => {
                self.version = v.version.clone();
                Ok(())
            }
            LinkMessage::ComputerStatus(s) => {
                self.apply_computer_status(s);
                Ok(())
            }
            LinkMessage::RadioCardStats(s) => self.handle_radio_card(s),
            LinkMessage::RadioLinkStats(s) => {
                self.apply_radio_link(now, s);
                Ok(())
            }
            LinkMessage::TelemetryRates(s) => {
                self.apply_telemetry_rates(now, s);
                Ok(())
            }
            LinkMessage::VideoAir(s) => self.handle_video_air(now, s),
            LinkMessage::VideoGround(s) => self.handle_video_ground(s),
            LinkMessage::ComputerStatusExt(_) => Ok(()),
            LinkMessage::Heartbeat(hb) => {
                self.handle_heartbeat(now, hb);
                Ok(())
            }
            LinkMessage::RcChannels(rc) => {
                self.rc.lock().unwrap().update_all(&rc.channels);
                Ok(())
            }
            LinkMessage::StatusText(st) => {
                self.handle_status_text(st);
                Ok(())
            }
        }
    }

    fn apply_computer_status(&mut self, s: &ComputerStatus) {
        self.system = SystemMetrics {
            cpu_load_perc: s.cpu_load_perc,
            soc_temperature_c: s.soc_temperature_c,
            cpu_freq_mhz: s.cpu_freq_mhz,
            isp_freq_mhz: s.isp_freq_mhz,
            h264_freq_mhz: s.h264_freq_mhz,
            core_freq_mhz: s.core_freq_mhz,
            v3d_freq_mhz: s.v3d_freq_mhz,
            space_left_mb: s.space_left_mb,
            supply_voltage_mv: s.supply_voltage_mv,
            supply_current_ma: s.supply_current_ma,
            ram_usage_perc: s.ram_usage_perc,
            ram_total_mb: s.ram_total_mb,
        };
    }

    fn handle_radio_card(&mut self, s: &RadioCardStats) -> Result<(), Reject> {
        let mut radio = self.radio.lock().unwrap();
        if !radio.set_alive(self.role, s.card_index, true) {
            return Err(Reject::CardIndex {
                role: self.role,
                index: s.card_index,
            });
        }
        radio.set_rssi(self.role, s.card_index, s.rx_rssi_dbm);
        radio.set_packets_received(self.role, s.card_index, s.count_packets_received);

        self.current_rx_rssi_dbm = match self.role {
            // single card, its reading is the link reading
            Role::Air => Some(s.rx_rssi_dbm),
            Role::Ground => radio.best_alive_rssi(Role::Ground),
        };
        Ok(())
    }

    fn apply_radio_link(&mut self, now: Instant, s: &RadioLinkStats) {
        self.rx_packet_loss_perc = s.rx_packet_loss_perc;
        self.count_tx_injection_errors = s.count_tx_injection_errors;
        self.count_tx_dropped_packets = s.count_tx_dropped_packets;
        self.last_link_stats = Some(now);
    }

    fn apply_telemetry_rates(&mut self, now: Instant, s: &TelemetryRates) {
        self.telemetry_rx_pps = units::pps_to_string(s.rx_pps);
        self.telemetry_tx_pps = units::pps_to_string(s.tx_pps);
        self.telemetry_rx_rate = units::bitrate_to_string(s.rx_bps);
        self.telemetry_tx_rate = units::bitrate_to_string(s.tx_bps);
        self.last_link_stats = Some(now);
    }

    fn handle_video_air(&mut self, now: Instant, s: &VideoStatsAir) -> Result<(), Reject> {
        if self.role == Role::Ground {
            return Err(Reject::AirStatsOnGround);
        }
        // indices past the supported streams are ignored, not an error
        self.video.lock().unwrap().update_from_air(s);
        if s.link_index == 0 {
            self.check_tx_drops(now, s.dropped_packets);
        }
        Ok(())
    }

    fn handle_video_ground(&mut self, s: &VideoStatsGround) -> Result<(), Reject> {
        if self.role == Role::Air {
            return Err(Reject::GroundStatsOnAir);
        }
        self.video.lock().unwrap().update_from_ground(s);
        Ok(())
    }

    /// Delta-tracks the cumulative dropped-packet counter of the primary
    /// stream. The first observation only primes the baseline; the remote
    /// side may reset the counter, so only positive deltas count as drops.
    fn check_tx_drops(&mut self, now: Instant, dropped_packets: i64) {
        let Some(baseline) = self.last_dropped_packets.replace(dropped_packets) else {
            return;
        };
        let delta = dropped_packets - baseline;
        if delta > 0 {
            self.tx_dropping = true;
            let cooled_down = self
                .last_tx_alert
                .map_or(true, |t| now.duration_since(t) >= TX_ALERT_COOLDOWN);
            if cooled_down {
                self.alerts.warning("TX error, reduce bitrate");
                self.last_tx_alert = Some(now);
            }
        } else {
            if delta < 0 {
                debug!(
                    role = ?self.role,
                    "dropped-packet counter went backwards, remote side likely restarted"
                );
            }
            self.tx_dropping = false;
        }
    }

    fn handle_heartbeat(&mut self, now: Instant, hb: &Heartbeat) {
        self.last_heartbeat = Some(now);
        // liveness flips only on the periodic tick, which debounces flapping
        // and keeps the connect/disconnect alert in one place
        if hb.claims_autopilot {
            debug!(role = ?self.role, "unit heartbeat claims an autopilot; none expected");
        }
    }

    fn handle_status_text(&self, st: &StatusText) {
        self.log.log(self.role.tag(), &st.text, st.severity);
        if st.text.contains(EXTERNAL_DEVICE_MARKER) {
            self.alerts.message(st.severity, &st.text);
        }
    }

    /// Periodic (1 Hz) liveness re-evaluation. Connect/disconnect alerts fire
    /// exactly once per transition edge, never while steady.
    pub fn tick_liveness(&mut self, now: Instant) {
        match self.last_heartbeat {
            // never heard from: NotAlive is the steady state, not a transition
            None => self.alive = false,
            Some(hb) => {
                let alive = now.duration_since(hb) < HEARTBEAT_TIMEOUT;
                if alive != self.alive {
                    self.notify_connection(alive);
                    self.alive = alive;
                }
            }
        }
        if let Some(t) = self.last_link_stats {
            if now.duration_since(t) > STATS_STALE_AFTER {
                self.reset_link_stats_display();
                self.last_link_stats = None;
            }
        }
    }

    fn notify_connection(&self, connected: bool) {
        let text = format!(
            "{} {}",
            self.role.unit_name(),
            if connected { "connected" } else { "disconnected" }
        );
        if connected {
            self.alerts.info(&text);
        } else {
            self.alerts.warning(&text);
        }
    }

    /// Rates are per-tick values and go stale immediately; cumulative
    /// counters keep their last reading.
    fn reset_link_stats_display(&mut self) {
        self.rx_packet_loss_perc = 0;
        self.telemetry_rx_pps = RATE_UNKNOWN.to_string();
        self.telemetry_tx_pps = RATE_UNKNOWN.to_string();
        self.telemetry_rx_rate = RATE_UNKNOWN.to_string();
        self.telemetry_tx_rate = RATE_UNKNOWN.to_string();
    }

    /// True while a version re-request should be issued, at most
    /// [`MAX_VERSION_REQUESTS`] times total. The unit may legitimately never
    /// answer; this bounds the retry traffic.
    pub fn should_request_version(&mut self) -> bool {
        if self.version == VERSION_UNKNOWN && self.version_requests < MAX_VERSION_REQUESTS {
            self.version_requests += 1;
            return true;
        }
        false
    }

    /// Binds the outbound action channel once the device session is up.
    /// Rebinding is refused; the session never changes once discovered.
    pub fn bind_session(&mut self, actions: Arc<dyn DeviceActions>) {
        if self.actions.is_some() {
            warn!(role = ?self.role, "device session already bound, ignoring");
            return;
        }
        self.actions = Some(actions);
    }

    /// Fire-and-forget reboot (or shutdown) of the unit. No-op before a
    /// session is bound; failures are logged, never alerted, never retried.
    pub fn send_command_reboot(&self, reboot: bool) -> bool {
        let Some(actions) = &self.actions else {
            debug!(role = ?self.role, "reboot requested before session bind");
            return false;
        };
        let ok = actions.send_reboot_shutdown(self.own_source_id, reboot);
        if ok {
            info!(role = ?self.role, reboot, "reboot/shutdown command sent");
        } else {
            warn!(role = ?self.role, reboot, "reboot/shutdown command failed");
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use linkmon_proto::message::{RcChannelsOverride, VersionReport};
    use linkmon_proto::Severity;

    const AIR_ID: SourceId = 1;

    struct Fixture {
        endpoint: TelemetryEndpoint,
        alerts: Arc<MemorySink>,
        log: Arc<MemorySink>,
        radio: Arc<Mutex<RadioCardRegistry>>,
        video: Arc<Mutex<VideoStreamRegistry>>,
    }

    fn fixture(role: Role) -> Fixture {
        let radio = Arc::new(Mutex::new(RadioCardRegistry::new()));
        let video = Arc::new(Mutex::new(VideoStreamRegistry::new()));
        let rc = Arc::new(Mutex::new(RcChannels::new()));
        let alerts = Arc::new(MemorySink::new());
        let log = Arc::new(MemorySink::new());
        let endpoint = TelemetryEndpoint::new(
            role,
            AIR_ID,
            radio.clone(),
            video.clone(),
            rc,
            alerts.clone(),
            log.clone(),
        );
        Fixture {
            endpoint,
            alerts,
            log,
            radio,
            video,
        }
    }

    fn video_air(link_index: u8, dropped_packets: i64) -> LinkMessage {
        LinkMessage::VideoAir(VideoStatsAir {
            link_index,
            recommended_bitrate_kbits: 8_000,
            measured_encoder_bitrate_kbits: 7_900,
            injected_bitrate_kbits: 8_400,
            injected_pps: 410,
            dropped_packets,
            fec_percentage: 20,
        })
    }

    fn video_ground(link_index: u8) -> LinkMessage {
        LinkMessage::VideoGround(VideoStatsGround {
            link_index,
            incoming_bitrate_kbits: 7_800,
            count_fragments_recovered: 12,
            count_blocks_recovered: 3,
            count_blocks_lost: 0,
            fec_decode_time_avg_us: 350,
        })
    }

    fn card_stats(card_index: u8, rssi: i16, received: u64) -> LinkMessage {
        LinkMessage::RadioCardStats(RadioCardStats {
            card_index,
            rx_rssi_dbm: rssi,
            count_packets_received: received,
        })
    }

    #[test]
    fn wrong_source_id_rejected_without_mutation() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();

        let accepted = f.endpoint.process_message(
            t0,
            AIR_ID + 1,
            &LinkMessage::Version(VersionReport {
                version: "2.5".into(),
            }),
        );

        assert!(!accepted);
        assert_eq!(f.endpoint.version(), "N/A");
        assert_eq!(f.endpoint.last_message(), None);
        assert_eq!(f.alerts.count(), 0);
        assert_eq!(f.log.count(), 0);
    }

    #[test]
    fn accepted_message_always_refreshes_last_message() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();
        // role violation: ground-origin stats on an air endpoint
        let accepted = f.endpoint.process_message(t0, AIR_ID, &video_ground(0));
        assert!(!accepted);
        // but the timestamp was taken before dispatch
        assert_eq!(f.endpoint.last_message(), Some(t0));
    }

    #[test]
    fn version_report_overwrites_default() {
        let mut f = fixture(Role::Ground);
        f.endpoint.process_message(
            Instant::now(),
            AIR_ID,
            &LinkMessage::Version(VersionReport {
                version: "2.5-evo".into(),
            }),
        );
        assert_eq!(f.endpoint.version(), "2.5-evo");
    }

    #[test]
    fn computer_status_is_last_value_wins() {
        let mut f = fixture(Role::Air);
        let mut status = ComputerStatus {
            cpu_load_perc: 35,
            soc_temperature_c: 52,
            cpu_freq_mhz: 1400,
            isp_freq_mhz: 500,
            h264_freq_mhz: 600,
            core_freq_mhz: 500,
            v3d_freq_mhz: 550,
            space_left_mb: 12_000,
            supply_voltage_mv: 5_050,
            supply_current_ma: 900,
            ram_usage_perc: 40,
            ram_total_mb: 4_096,
        };
        f.endpoint
            .process_message(Instant::now(), AIR_ID, &LinkMessage::ComputerStatus(status));
        status.cpu_load_perc = 80;
        f.endpoint
            .process_message(Instant::now(), AIR_ID, &LinkMessage::ComputerStatus(status));

        assert_eq!(f.endpoint.system().cpu_load_perc, 80);
        assert_eq!(f.endpoint.system().ram_total_mb, 4_096);
    }

    #[test]
    fn air_card_index_one_is_rejected() {
        let mut f = fixture(Role::Air);
        let accepted =
            f.endpoint
                .process_message(Instant::now(), AIR_ID, &card_stats(1, -50, 10));
        assert!(!accepted);
        assert_eq!(f.endpoint.current_rx_rssi_dbm(), None);
        assert_eq!(f.radio.lock().unwrap().best_alive_rssi(Role::Air), None);
    }

    #[test]
    fn air_card_zero_sets_link_rssi() {
        let mut f = fixture(Role::Air);
        assert!(f
            .endpoint
            .process_message(Instant::now(), AIR_ID, &card_stats(0, -60, 100)));
        assert_eq!(f.endpoint.current_rx_rssi_dbm(), Some(-60));
        let card = f.radio.lock().unwrap().card(Role::Air, 0).unwrap();
        assert!(card.alive);
        assert_eq!(card.packets_received, 100);
    }

    #[test]
    fn ground_rssi_is_best_of_alive_cards() {
        let mut f = fixture(Role::Ground);
        let now = Instant::now();
        f.endpoint.process_message(now, AIR_ID, &card_stats(0, -70, 50));
        f.endpoint.process_message(now, AIR_ID, &card_stats(1, -55, 60));
        assert_eq!(f.endpoint.current_rx_rssi_dbm(), Some(-55));

        // index 4 rejected, best stays put
        assert!(!f.endpoint.process_message(now, AIR_ID, &card_stats(4, -10, 1)));
        assert_eq!(f.endpoint.current_rx_rssi_dbm(), Some(-55));
    }

    #[test]
    fn video_role_gating_both_directions() {
        let mut air = fixture(Role::Air);
        assert!(!air
            .endpoint
            .process_message(Instant::now(), AIR_ID, &video_ground(0)));
        assert_eq!(
            air.video.lock().unwrap().slot(0).unwrap().ground_updates,
            0
        );

        let mut ground = fixture(Role::Ground);
        assert!(!ground
            .endpoint
            .process_message(Instant::now(), AIR_ID, &video_air(0, 0)));
        assert_eq!(ground.video.lock().unwrap().slot(0).unwrap().air_updates, 0);
    }

    #[test]
    fn drop_detector_primes_then_alerts_once_per_cooldown() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();

        // prime: no alert, no flag
        f.endpoint.process_message(t0, AIR_ID, &video_air(0, 10));
        assert!(!f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 0);

        // same value again: still quiet
        f.endpoint.process_message(t0, AIR_ID, &video_air(0, 10));
        assert!(!f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 0);

        // positive delta: flag + exactly one alert
        f.endpoint.process_message(t0, AIR_ID, &video_air(0, 15));
        assert!(f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 1);

        // more drops inside the cooldown: flag stays, no extra alert
        f.endpoint
            .process_message(t0 + Duration::from_secs(1), AIR_ID, &video_air(0, 20));
        assert!(f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 1);

        // cooldown elapsed: one more alert
        f.endpoint
            .process_message(t0 + Duration::from_secs(4), AIR_ID, &video_air(0, 25));
        assert_eq!(f.alerts.count(), 2);
    }

    #[test]
    fn drop_detector_clears_flag_on_non_positive_delta() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();
        f.endpoint.process_message(t0, AIR_ID, &video_air(0, 10));
        f.endpoint.process_message(t0, AIR_ID, &video_air(0, 15));
        assert!(f.endpoint.tx_dropping());

        // remote counter reset: treated as no drop, no alert
        f.endpoint
            .process_message(t0 + Duration::from_secs(4), AIR_ID, &video_air(0, 2));
        assert!(!f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 1);

        // and the new baseline is the reset value
        f.endpoint
            .process_message(t0 + Duration::from_secs(8), AIR_ID, &video_air(0, 5));
        assert!(f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 2);
    }

    #[test]
    fn drop_detector_only_watches_link_zero() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();
        f.endpoint.process_message(t0, AIR_ID, &video_air(1, 10));
        f.endpoint.process_message(t0, AIR_ID, &video_air(1, 50));
        assert!(!f.endpoint.tx_dropping());
        assert_eq!(f.alerts.count(), 0);
        // but the registry still aggregated link 1
        assert_eq!(f.video.lock().unwrap().slot(1).unwrap().air_updates, 2);
    }

    #[test]
    fn liveness_never_alerts_without_any_heartbeat() {
        let mut f = fixture(Role::Air);
        let t0 = Instant::now();
        for i in 0..10 {
            f.endpoint.tick_liveness(t0 + Duration::from_secs(i));
        }
        assert!(!f.endpoint.is_alive());
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn liveness_alerts_exactly_once_per_edge() {
        let mut f = fixture(Role::Ground);
        let t0 = Instant::now();
        f.endpoint
            .process_message(t0, AIR_ID, &LinkMessage::Heartbeat(Heartbeat::default()));
        // heartbeat alone does not flip liveness
        assert!(!f.endpoint.is_alive());

        f.endpoint.tick_liveness(t0 + Duration::from_millis(1000));
        assert!(f.endpoint.is_alive());
        assert_eq!(
            f.alerts.entries(),
            vec![(Severity::Info, "Ground unit connected".to_string())]
        );

        // steady alive: no further alerts
        f.endpoint.tick_liveness(t0 + Duration::from_millis(2000));
        assert_eq!(f.alerts.count(), 1);

        // past the 4000 ms window: one disconnect warning
        f.endpoint.tick_liveness(t0 + Duration::from_millis(4001));
        assert!(!f.endpoint.is_alive());
        assert_eq!(f.alerts.count(), 2);
        assert_eq!(
            f.alerts.entries()[1],
            (Severity::Warning, "Ground unit disconnected".to_string())
        );

        // steady not-alive: idempotent
        f.endpoint.tick_liveness(t0 + Duration::from_millis(6000));
        assert_eq!(f.alerts.count(), 2);
    }

    #[test]
    fn stale_link_stats_reset_to_defaults() {
        let mut f = fixture(Role::Ground);
        let t0 = Instant::now();
        f.endpoint.process_message(
            t0,
            AIR_ID,
            &LinkMessage::TelemetryRates(TelemetryRates {
                rx_pps: 30,
                tx_pps: 10,
                rx_bps: 2_000_000,
                tx_bps: 40_000,
            }),
        );
        f.endpoint.process_message(
            t0,
            AIR_ID,
            &LinkMessage::RadioLinkStats(RadioLinkStats {
                rx_packet_loss_perc: 7,
                count_tx_injection_errors: 2,
                count_tx_dropped_packets: 5,
            }),
        );
        assert_eq!(f.endpoint.telemetry_rates().0, "30 pps");
        assert_eq!(f.endpoint.rx_packet_loss_perc(), 7);

        f.endpoint.tick_liveness(t0 + Duration::from_secs(3));
        assert_eq!(f.endpoint.rx_packet_loss_perc(), 7);

        f.endpoint.tick_liveness(t0 + Duration::from_secs(6));
        assert_eq!(f.endpoint.telemetry_rates(), ("N/A", "N/A", "N/A", "N/A"));
        assert_eq!(f.endpoint.rx_packet_loss_perc(), 0);
        // cumulative counters keep their last reading
        assert_eq!(f.endpoint.count_tx_dropped_packets(), 5);
    }

    #[test]
    fn status_text_logs_always_and_escalates_external_device() {
        let mut f = fixture(Role::Air);
        f.endpoint.process_message(
            Instant::now(),
            AIR_ID,
            &LinkMessage::StatusText(StatusText {
                severity: Severity::Info,
                text: "camera pipeline up".into(),
            }),
        );
        assert_eq!(f.log.count(), 1);
        assert_eq!(f.alerts.count(), 0);

        f.endpoint.process_message(
            Instant::now(),
            AIR_ID,
            &LinkMessage::StatusText(StatusText {
                severity: Severity::Warning,
                text: "External device disconnected".into(),
            }),
        );
        assert_eq!(f.log.count(), 2);
        assert_eq!(
            f.alerts.entries(),
            vec![(
                Severity::Warning,
                "External device disconnected".to_string()
            )]
        );
    }

    #[test]
    fn version_gate_allows_exactly_ten_requests() {
        let mut f = fixture(Role::Air);
        let mut granted = 0;
        for _ in 0..25 {
            if f.endpoint.should_request_version() {
                granted += 1;
            }
        }
        assert_eq!(granted, 10);
        // still N/A, still capped
        assert!(!f.endpoint.should_request_version());
    }

    #[test]
    fn version_gate_stops_once_version_known() {
        let mut f = fixture(Role::Air);
        assert!(f.endpoint.should_request_version());
        f.endpoint.process_message(
            Instant::now(),
            AIR_ID,
            &LinkMessage::Version(VersionReport {
                version: "2.5".into(),
            }),
        );
        assert!(!f.endpoint.should_request_version());
    }

    #[test]
    fn reboot_is_noop_before_session_bind() {
        let f = fixture(Role::Air);
        assert!(!f.endpoint.send_command_reboot(true));
    }

    #[test]
    fn reboot_forwards_to_bound_session() {
        struct Recorder(Mutex<Vec<(SourceId, bool)>>);
        impl DeviceActions for Recorder {
            fn send_reboot_shutdown(&self, target: SourceId, reboot: bool) -> bool {
                self.0.lock().unwrap().push((target, reboot));
                true
            }
        }

        let mut f = fixture(Role::Ground);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        f.endpoint.bind_session(recorder.clone());
        assert!(f.endpoint.send_command_reboot(false));
        assert_eq!(recorder.0.lock().unwrap().as_slice(), &[(AIR_ID, false)]);
        // no alert ever escalates from command plumbing
        assert_eq!(f.alerts.count(), 0);
    }

    #[test]
    fn rc_channels_forwarded_to_registry() {
        let radio = Arc::new(Mutex::new(RadioCardRegistry::new()));
        let video = Arc::new(Mutex::new(VideoStreamRegistry::new()));
        let rc = Arc::new(Mutex::new(RcChannels::new()));
        let sink = Arc::new(MemorySink::new());
        let mut endpoint = TelemetryEndpoint::new(
            Role::Ground,
            AIR_ID,
            radio,
            video,
            rc.clone(),
            sink.clone(),
            sink,
        );

        let mut channels = [1500u16; 18];
        channels[0] = 1100;
        endpoint.process_message(
            Instant::now(),
            AIR_ID,
            &LinkMessage::RcChannels(RcChannelsOverride { channels }),
        );
        assert_eq!(rc.lock().unwrap().channel(0), Some(1100));
    }
}
