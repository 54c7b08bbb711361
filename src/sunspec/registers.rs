//! SolarEdge SunSpec holding register map.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub start: u16,
    pub count: u16,
}

impl Block {
    pub const fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }

    /// One past the last register.
    pub fn end(&self) -> u32 {
        u32::from(self.start) + u32::from(self.count)
    }

    pub fn contains(&self, address: u16) -> bool {
        address >= self.start && u32::from(address) < self.end()
    }
}

pub const INVERTER_COMMON: Block = Block::new(40000, 70);
pub const INVERTER_MODEL: Block = Block::new(40069, 40);

pub const METER_1_COMMON: Block = Block::new(40121, 67);
pub const METER_1_MODEL: Block = Block::new(40188, 105);

pub const METER_2_COMMON: Block = Block::new(40295, 67);
pub const METER_2_MODEL: Block = Block::new(40362, 105);

/// "SunS", at the head of the inverter common block.
pub const SUNSPEC_MARKER: u32 = 0x5375_6e53;
