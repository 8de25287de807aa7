//! Runtime core of the link-quality monitor: telemetry aggregation and the
//! liveness state machine for the air and ground units of a wireless
//! video/telemetry link. Wire decoding and presentation live elsewhere; this
//! crate consumes already-decoded [`linkmon_proto::LinkMessage`]s.

pub mod endpoint;
pub mod radio;
pub mod rc;
pub mod sinks;
pub mod video;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use linkmon_proto::{LinkMessage, Role, SourceId};
use serde::Deserialize;
use tracing::debug;

use endpoint::TelemetryEndpoint;
use radio::RadioCardRegistry;
use rc::RcChannels;
use sinks::{AlertSink, LogSink};
use video::VideoStreamRegistry;

/// Which sender id each role is expected to use on the wire.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MonitorConfig {
    pub air_source_id: SourceId,
    pub ground_source_id: SourceId,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            air_source_id: 1,
            ground_source_id: 2,
        }
    }
}

/// Exactly one endpoint per role for the process lifetime, each behind its
/// own lock (message dispatch and the liveness tick are serialized per
/// role). The registries are shared between both endpoints but partitioned
/// by (role, index), so the two sides never write the same slot.
pub struct LinkMonitor {
    air: Mutex<TelemetryEndpoint>,
    ground: Mutex<TelemetryEndpoint>,
    air_source_id: SourceId,
    ground_source_id: SourceId,
    radio: Arc<Mutex<RadioCardRegistry>>,
    video: Arc<Mutex<VideoStreamRegistry>>,
    rc: Arc<Mutex<RcChannels>>,
}

impl LinkMonitor {
    pub fn new(cfg: MonitorConfig, alerts: Arc<dyn AlertSink>, log: Arc<dyn LogSink>) -> Self {
        let radio = Arc::new(Mutex::new(RadioCardRegistry::new()));
        let video = Arc::new(Mutex::new(VideoStreamRegistry::new()));
        let rc = Arc::new(Mutex::new(RcChannels::new()));
        let air = TelemetryEndpoint::new(
            Role::Air,
            cfg.air_source_id,
            radio.clone(),
            video.clone(),
            rc.clone(),
            alerts.clone(),
            log.clone(),
        );
        let ground = TelemetryEndpoint::new(
            Role::Ground,
            cfg.ground_source_id,
            radio.clone(),
            video.clone(),
            rc.clone(),
            alerts,
            log,
        );
        Self {
            air: Mutex::new(air),
            ground: Mutex::new(ground),
            air_source_id: cfg.air_source_id,
            ground_source_id: cfg.ground_source_id,
            radio,
            video,
            rc,
        }
    }

    pub fn endpoint(&self, role: Role) -> &Mutex<TelemetryEndpoint> {
        match role {
            Role::Air => &self.air,
            Role::Ground => &self.ground,
        }
    }

    pub fn radio(&self) -> &Arc<Mutex<RadioCardRegistry>> {
        &self.radio
    }

    pub fn video(&self) -> &Arc<Mutex<VideoStreamRegistry>> {
        &self.video
    }

    pub fn rc(&self) -> &Arc<Mutex<RcChannels>> {
        &self.rc
    }

    /// Routes a decoded message to the endpoint owning its source id.
    /// Unknown senders are dropped here, before either lock is taken.
    pub fn process(&self, now: Instant, source: SourceId, msg: &LinkMessage) -> bool {
        if source == self.air_source_id {
            self.air.lock().unwrap().process_message(now, source, msg)
        } else if source == self.ground_source_id {
            self.ground.lock().unwrap().process_message(now, source, msg)
        } else {
            debug!(source, kind = msg.kind_name(), "message from unknown source id");
            false
        }
    }

    /// Drives the 1 Hz liveness re-evaluation of both endpoints.
    pub fn tick(&self, now: Instant) {
        self.air.lock().unwrap().tick_liveness(now);
        self.ground.lock().unwrap().tick_liveness(now);
    }
}
