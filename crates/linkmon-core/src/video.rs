use linkmon_proto::message::{VideoStatsAir, VideoStatsGround};

/// At most two independent video streams per link.
pub const VIDEO_LINK_COUNT: usize = 2;

/// Aggregated state for one video stream. The air-origin and ground-origin
/// halves arrive in separate messages and are tracked independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSlot {
    pub air: Option<VideoStatsAir>,
    pub ground: Option<VideoStatsGround>,
    pub air_updates: u64,
    pub ground_updates: u64,
}

#[derive(Debug, Default)]
pub struct VideoStreamRegistry {
    slots: [StreamSlot; VIDEO_LINK_COUNT],
}

impl VideoStreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, link_index: u8) -> Option<&StreamSlot> {
        self.slots.get(link_index as usize)
    }

    /// Returns false for link indices past the supported range; those are
    /// ignored rather than treated as an error.
    pub fn update_from_air(&mut self, stats: &VideoStatsAir) -> bool {
        match self.slots.get_mut(stats.link_index as usize) {
            Some(slot) => {
                slot.air = Some(*stats);
                slot.air_updates += 1;
                true
            }
            None => false,
        }
    }

    pub fn update_from_ground(&mut self, stats: &VideoStatsGround) -> bool {
        match self.slots.get_mut(stats.link_index as usize) {
            Some(slot) => {
                slot.ground = Some(*stats);
                slot.ground_updates += 1;
                true
            }
            None => false,
        }
    }
}
