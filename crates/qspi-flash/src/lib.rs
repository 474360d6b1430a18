//! Serial NOR flash model for the RLE stream.
//!
//! 16 MB device answering the quad-output fast read (`0x6B`): 24-bit
//! address MSB first on IO0, 8 dummy clocks, then one nibble per clock on
//! IO[3:0], high nibble of each byte first. Reads past the loaded image
//! return erased flash (`0xFF`).
//!
//! Each data clock's nibble appears on the IO lines `latency` half-cycles
//! after the clock's rising edge and stays there until the next nibble
//! replaces it, even if the clock stops. The device's latency is a property
//! of the part; the controller has to be configured to match it.
//!
//! Any other command is ignored until CS goes high.

use std::collections::VecDeque;

use log::{debug, trace};
use qspi_master::{BusSignals, FAST_READ_QUAD, Latency, QspiDevice};
use vga_core::{Observable, Value};

/// 128 Mbit.
pub const FLASH_SIZE: usize = 16 * 1024 * 1024;

/// IO lines with nothing driving them (pulled up).
const HIGH_Z: u8 = 0x0F;

const DUMMY_CLOCKS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashState {
    Deselected,
    Command { bits: u8, opcode: u8 },
    Address { bits: u8, addr: u32 },
    Dummy { clocks: u8, addr: u32 },
    /// Streaming; `nibble` is the next nibble address (byte address * 2).
    Reading { nibble: u32 },
    /// Unsupported command: wait for CS high.
    Ignoring,
}

pub struct QspiFlash {
    data: Vec<u8>,
    latency: Latency,
    state: FlashState,
    prev: BusSignals,
    /// Half-cycles observed since power-on.
    now: u64,
    /// Nibbles launched but not yet on the IO lines: (visible at, nibble).
    pending: VecDeque<(u64, u8)>,
    io: u8,
    reads: u64,
    nibbles_sent: u64,
}

impl QspiFlash {
    /// Flash holding `image` at address 0; the rest reads as erased.
    #[must_use]
    pub fn new(image: &[u8], latency: Latency) -> Self {
        let len = image.len().min(FLASH_SIZE);
        if image.len() > FLASH_SIZE {
            debug!("flash: image truncated from {} to {FLASH_SIZE} bytes", image.len());
        }
        Self {
            data: image[..len].to_vec(),
            latency,
            state: FlashState::Deselected,
            prev: BusSignals::IDLE,
            now: 0,
            pending: VecDeque::with_capacity(4),
            io: HIGH_Z,
            reads: 0,
            nibbles_sent: 0,
        }
    }

    /// Erased device.
    #[must_use]
    pub fn blank(latency: Latency) -> Self {
        Self::new(&[], latency)
    }

    /// Byte at `addr` (wrapping at the device size).
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.data
            .get(addr as usize % FLASH_SIZE)
            .copied()
            .unwrap_or(0xFF)
    }

    fn nibble_at(&self, nibble: u32) -> u8 {
        let byte = self.peek(nibble >> 1);
        if nibble & 1 == 0 { byte >> 4 } else { byte & 0x0F }
    }

    #[must_use]
    pub fn latency(&self) -> Latency {
        self.latency
    }

    /// Fast-read commands accepted since power-on.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Data nibbles clocked out since power-on.
    #[must_use]
    pub fn nibbles_sent(&self) -> u64 {
        self.nibbles_sent
    }

    #[must_use]
    pub fn selected(&self) -> bool {
        self.state != FlashState::Deselected
    }

    fn clock_in(&mut self, mosi: bool) {
        let bit = u32::from(mosi);
        self.state = match self.state {
            FlashState::Deselected => FlashState::Deselected,
            FlashState::Command { bits, opcode } => {
                let opcode = (opcode << 1) | bit as u8;
                if bits + 1 < 8 {
                    FlashState::Command { bits: bits + 1, opcode }
                } else if opcode == FAST_READ_QUAD {
                    FlashState::Address { bits: 0, addr: 0 }
                } else {
                    debug!("flash: ignoring command {opcode:#04X}");
                    FlashState::Ignoring
                }
            }
            FlashState::Address { bits, addr } => {
                let addr = (addr << 1) | bit;
                if bits + 1 < 24 {
                    FlashState::Address { bits: bits + 1, addr }
                } else {
                    FlashState::Dummy { clocks: 0, addr }
                }
            }
            FlashState::Dummy { clocks, addr } => {
                if clocks + 1 < DUMMY_CLOCKS {
                    FlashState::Dummy { clocks: clocks + 1, addr }
                } else {
                    self.reads += 1;
                    trace!("flash: fast read from {addr:#08X}");
                    FlashState::Reading {
                        nibble: (addr % FLASH_SIZE as u32) << 1,
                    }
                }
            }
            FlashState::Reading { nibble } => {
                let value = self.nibble_at(nibble);
                self.pending
                    .push_back((self.now + u64::from(self.latency.get()), value));
                self.nibbles_sent += 1;
                FlashState::Reading {
                    nibble: (nibble + 1) % (FLASH_SIZE as u32 * 2),
                }
            }
            FlashState::Ignoring => FlashState::Ignoring,
        };
    }
}

impl QspiDevice for QspiFlash {
    fn step(&mut self, bus: BusSignals) -> u8 {
        if !bus.selected() {
            self.state = FlashState::Deselected;
            self.pending.clear();
            self.io = HIGH_Z;
        } else {
            if !self.prev.selected() {
                self.state = FlashState::Command { bits: 0, opcode: 0 };
            }
            if bus.sclk && !self.prev.sclk {
                self.clock_in(bus.mosi);
            }
            while let Some(&(at, value)) = self.pending.front() {
                if at > self.now {
                    break;
                }
                self.io = value;
                self.pending.pop_front();
            }
        }

        self.prev = bus;
        self.now += 1;
        self.io
    }
}

impl Observable for QspiFlash {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("data.") {
            let addr = rest
                .strip_prefix("0x")
                .map_or_else(|| rest.parse().ok(), |hex| u32::from_str_radix(hex, 16).ok());
            return addr.map(|a| Value::U8(self.peek(a)));
        }
        match path {
            "selected" => Some(self.selected().into()),
            "latency" => Some(self.latency.get().into()),
            "reads" => Some(self.reads.into()),
            "nibbles_sent" => Some(self.nibbles_sent.into()),
            "io" => Some(self.io.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "selected",
            "latency",
            "reads",
            "nibbles_sent",
            "io",
            "data.<address>",
        ]
    }
}
