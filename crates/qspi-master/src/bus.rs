//! Bus signals shared by the master and the memory device.

/// Pin state driven by the master for one half-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSignals {
    /// Chip select, active low.
    pub cs_n: bool,
    pub sclk: bool,
    /// IO0 as driven by the master. Only meaningful while `mosi_enable`.
    pub mosi: bool,
    /// IO0 output enable: set for the command and address phases, released
    /// from the dummy phase on so the device can drive all four IO lines.
    pub mosi_enable: bool,
}

impl BusSignals {
    /// Bus at rest: deselected, clock low, IO0 released.
    pub const IDLE: Self = Self {
        cs_n: true,
        sclk: false,
        mosi: false,
        mosi_enable: false,
    };

    #[must_use]
    pub const fn selected(&self) -> bool {
        !self.cs_n
    }
}

impl Default for BusSignals {
    fn default() -> Self {
        Self::IDLE
    }
}

/// The memory side of the bus.
///
/// `step` is called once per half-cycle with the master's pins, in real
/// time, whether or not the serial clock is running. The device returns the
/// nibble it drives on IO[3:0] during that half-cycle.
pub trait QspiDevice {
    fn step(&mut self, bus: BusSignals) -> u8;
}

impl<D: QspiDevice + ?Sized> QspiDevice for &mut D {
    fn step(&mut self, bus: BusSignals) -> u8 {
        (**self).step(bus)
    }
}
