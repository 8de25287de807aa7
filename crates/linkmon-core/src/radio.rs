use linkmon_proto::Role;

/// Ground units run up to four diversity cards; air units always run one.
pub const GROUND_CARD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CardSlot {
    pub alive: bool,
    pub rssi_dbm: i16,
    pub packets_received: u64,
}

/// Per-physical-radio-card state, partitioned by role so air and ground
/// writes can never touch the same slot.
#[derive(Debug, Default)]
pub struct RadioCardRegistry {
    air: [CardSlot; 1],
    ground: [CardSlot; GROUND_CARD_COUNT],
}

impl RadioCardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card_count(role: Role) -> usize {
        match role {
            Role::Air => 1,
            Role::Ground => GROUND_CARD_COUNT,
        }
    }

    fn slot_mut(&mut self, role: Role, index: u8) -> Option<&mut CardSlot> {
        match role {
            Role::Air => self.air.get_mut(index as usize),
            Role::Ground => self.ground.get_mut(index as usize),
        }
    }

    pub fn card(&self, role: Role, index: u8) -> Option<CardSlot> {
        match role {
            Role::Air => self.air.get(index as usize).copied(),
            Role::Ground => self.ground.get(index as usize).copied(),
        }
    }

    /// Out-of-range indices leave the registry untouched and return false.
    pub fn set_alive(&mut self, role: Role, index: u8, alive: bool) -> bool {
        match self.slot_mut(role, index) {
            Some(slot) => {
                slot.alive = alive;
                true
            }
            None => false,
        }
    }

    pub fn set_rssi(&mut self, role: Role, index: u8, rssi_dbm: i16) -> bool {
        match self.slot_mut(role, index) {
            Some(slot) => {
                slot.rssi_dbm = rssi_dbm;
                true
            }
            None => false,
        }
    }

    pub fn set_packets_received(&mut self, role: Role, index: u8, count: u64) -> bool {
        match self.slot_mut(role, index) {
            Some(slot) => {
                slot.packets_received = count;
                true
            }
            None => false,
        }
    }

    /// Best RSSI among currently alive cards. None means no signal at all,
    /// never a stale last-best value.
    pub fn best_alive_rssi(&self, role: Role) -> Option<i16> {
        let slots: &[CardSlot] = match role {
            Role::Air => &self.air,
            Role::Ground => &self.ground,
        };
        slots
            .iter()
            .filter(|c| c.alive)
            .map(|c| c.rssi_dbm)
            .max()
    }
}
