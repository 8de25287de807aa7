pub const RC_CHANNEL_COUNT: usize = 18;

/// Last-seen raw RC channel values as forwarded by the ground unit.
#[derive(Debug)]
pub struct RcChannels {
    channels: [u16; RC_CHANNEL_COUNT],
    seen_any: bool,
}

impl Default for RcChannels {
    fn default() -> Self {
        Self {
            channels: [0; RC_CHANNEL_COUNT],
            seen_any: false,
        }
    }
}

impl RcChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_all(&mut self, channels: &[u16; RC_CHANNEL_COUNT]) {
        self.channels = *channels;
        self.seen_any = true;
    }

    /// None until the first update arrives, so a reader can tell "no RC yet"
    /// from an all-zero frame.
    pub fn channel(&self, index: usize) -> Option<u16> {
        if !self.seen_any {
            return None;
        }
        self.channels.get(index).copied()
    }

    pub fn all(&self) -> Option<&[u16; RC_CHANNEL_COUNT]> {
        self.seen_any.then_some(&self.channels)
    }
}
