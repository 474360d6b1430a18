//! Quad-SPI fast-read master.
//!
//! Reads the RLE stream from a serial memory with the quad-output fast-read
//! command. A transaction is:
//!
//! 1. CS asserted, one clock of setup with the first command bit on IO0.
//! 2. Command `0x6B`, 8 clocks, MSB first on IO0.
//! 3. Address, 24 clocks, MSB first on IO0 (always 0: every frame re-reads
//!    the stream from the start).
//! 4. 8 dummy clocks, IO0 released.
//! 5. Data: one nibble per clock on IO[3:0] until the stream consumer asks
//!    for the transaction to end.
//!
//! # Read latency
//!
//! The device returns the nibble for a data clock `latency` half-cycles
//! after that clock's rising edge. The master computes the matching
//! [`SamplePhase`] once at reset and samples every nibble with it. Odd
//! latencies therefore sample on falling edges.
//!
//! # Flow control
//!
//! The serial clock is gated. In the data phase a clock is only issued when
//! the caller's nibble credit covers every nibble already in flight plus the
//! new one, so the consumer's buffer can never overflow. Nibbles in flight
//! keep arriving after the clock stops.
//!
//! # Stepping
//!
//! [`QspiMaster::step`] advances one half-cycle. Even half-cycles are rising
//! edge slots, odd half-cycles falling edge slots.

mod bus;
mod latency;

use std::collections::VecDeque;

use log::{debug, trace, warn};
use vga_core::{Edge, Observable, Value};

pub use bus::{BusSignals, QspiDevice};
pub use latency::{Latency, LatencyError, SamplePhase};

/// Quad output fast read.
pub const FAST_READ_QUAD: u8 = 0x6B;
/// Start of the stream in the memory.
pub const STREAM_ADDRESS: u32 = 0;
/// Dummy clocks the fast-read command always requires.
pub const DUMMY_CLOCKS: u8 = 8;

const COMMAND_BITS: u8 = 8;
const ADDRESS_BITS: u8 = 24;
/// Minimum CS high time between transactions, in half-cycles.
const CS_DESELECT_HALF_CYCLES: u8 = 2;

/// Transaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Command { bit: u8 },
    Address { bit: u8 },
    Dummy { clock: u8 },
    Data,
    /// End requested: clock stopped, waiting for nibbles in flight.
    Drain,
}

impl Phase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Command { .. } => "command",
            Self::Address { .. } => "address",
            Self::Dummy { .. } => "dummy",
            Self::Data => "data",
            Self::Drain => "drain",
        }
    }
}

/// The Quad-SPI master.
pub struct QspiMaster {
    latency: Latency,
    sample: SamplePhase,
    phase: Phase,
    /// Pins as currently driven.
    signals: BusSignals,
    /// Half-cycles since reset.
    half_cycle: u64,
    /// A transaction start is waiting for CS deselect time to elapse.
    start_pending: bool,
    /// The consumer has seen the end of the stream.
    end_requested: bool,
    /// Half-cycles spent deselected since the last transaction.
    deselected_for: u8,
    /// Sample times (half-cycle numbers) of launched nibbles.
    in_flight: VecDeque<u64>,
    transactions: u64,
    aborted: u64,
    nibbles: u64,
}

impl QspiMaster {
    #[must_use]
    pub fn new(latency: Latency) -> Self {
        Self {
            latency,
            sample: latency.sample_phase(),
            phase: Phase::Idle,
            signals: BusSignals::IDLE,
            half_cycle: 0,
            start_pending: false,
            end_requested: false,
            deselected_for: CS_DESELECT_HALF_CYCLES,
            in_flight: VecDeque::with_capacity(4),
            transactions: 0,
            aborted: 0,
            nibbles: 0,
        }
    }

    /// Power-on state with a (possibly new) latency.
    pub fn reset(&mut self, latency: Latency) {
        *self = Self::new(latency);
    }

    /// Start a read of the stream. A transaction still in progress is
    /// abandoned: CS goes high for the deselect time first.
    pub fn begin_transaction(&mut self) {
        match self.phase {
            Phase::Idle => {}
            Phase::Drain => {
                debug!(
                    "qspi: new transaction while draining, dropping {} nibbles",
                    self.in_flight.len()
                );
                self.deselect();
            }
            phase => {
                warn!(
                    "qspi: aborting transaction {} in {} phase after {} nibbles",
                    self.transactions,
                    phase.name(),
                    self.nibbles
                );
                self.aborted += 1;
                self.deselect();
            }
        }
        self.start_pending = true;
        self.end_requested = false;
    }

    /// The consumer reached the end of the stream. The master stops the
    /// clock, lets nibbles in flight land (they are discarded) and then
    /// deasserts CS. Has no effect when no transaction is running.
    pub fn end_transaction(&mut self) {
        if self.phase != Phase::Idle && !self.end_requested {
            trace!("qspi: end of stream requested after {} nibbles", self.nibbles);
            self.end_requested = true;
        }
    }

    /// Advance one half-cycle.
    ///
    /// `nibble_credit` is how many more nibbles the consumer can take
    /// (free buffer space minus any partially assembled word). Returns the
    /// nibble sampled on this half-cycle, if one was due.
    pub fn step<D: QspiDevice>(&mut self, device: &mut D, nibble_credit: usize) -> Option<u8> {
        if self.end_requested && self.clocking() {
            self.phase = Phase::Drain;
            self.signals.sclk = false;
        }

        match Edge::of_half_cycle(self.half_cycle) {
            Edge::Rising => self.rising_edge(nibble_credit),
            Edge::Falling => self.falling_edge(),
        }

        let io = device.step(self.signals) & 0x0F;
        let nibble = self.sample(io);

        if self.phase == Phase::Drain && self.in_flight.is_empty() {
            debug!(
                "qspi: transaction {} complete, {} nibbles",
                self.transactions, self.nibbles
            );
            self.deselect();
        } else if self.phase == Phase::Idle {
            self.deselected_for = self.deselected_for.saturating_add(1);
        }

        self.half_cycle += 1;
        nibble
    }

    fn clocking(&self) -> bool {
        matches!(
            self.phase,
            Phase::Command { .. } | Phase::Address { .. } | Phase::Dummy { .. } | Phase::Data
        )
    }

    fn rising_edge(&mut self, nibble_credit: usize) {
        match self.phase {
            Phase::Idle => {
                if self.start_pending && self.deselected_for >= CS_DESELECT_HALF_CYCLES {
                    self.start_pending = false;
                    self.transactions += 1;
                    self.nibbles = 0;
                    // The first clock follows on the next rising slot,
                    // giving one clock period of CS setup.
                    self.phase = Phase::Command { bit: 0 };
                    self.signals = BusSignals {
                        cs_n: false,
                        sclk: false,
                        mosi: command_bit(0),
                        mosi_enable: true,
                    };
                    debug!(
                        "qspi: transaction {} begins, latency {}",
                        self.transactions, self.latency
                    );
                }
            }
            Phase::Command { .. } | Phase::Address { .. } | Phase::Dummy { .. } => {
                self.signals.sclk = true;
            }
            Phase::Data => {
                if self.in_flight.len() < nibble_credit {
                    self.signals.sclk = true;
                    self.in_flight
                        .push_back(self.half_cycle + self.sample.half_cycles());
                }
            }
            Phase::Drain => {}
        }
    }

    fn falling_edge(&mut self) {
        if !self.signals.sclk {
            return;
        }
        self.signals.sclk = false;

        self.phase = match self.phase {
            Phase::Command { bit } if bit + 1 < COMMAND_BITS => {
                self.signals.mosi = command_bit(bit + 1);
                Phase::Command { bit: bit + 1 }
            }
            Phase::Command { .. } => {
                self.signals.mosi = address_bit(0);
                Phase::Address { bit: 0 }
            }
            Phase::Address { bit } if bit + 1 < ADDRESS_BITS => {
                self.signals.mosi = address_bit(bit + 1);
                Phase::Address { bit: bit + 1 }
            }
            Phase::Address { .. } => {
                self.signals.mosi = false;
                self.signals.mosi_enable = false;
                Phase::Dummy { clock: 0 }
            }
            Phase::Dummy { clock } if clock + 1 < DUMMY_CLOCKS => Phase::Dummy { clock: clock + 1 },
            Phase::Dummy { .. } => Phase::Data,
            other => other,
        };
    }

    fn sample(&mut self, io: u8) -> Option<u8> {
        if self.in_flight.front() != Some(&self.half_cycle) {
            return None;
        }
        self.in_flight.pop_front();
        if self.phase == Phase::Drain {
            return None;
        }
        self.nibbles += 1;
        Some(io)
    }

    fn deselect(&mut self) {
        self.phase = Phase::Idle;
        self.signals = BusSignals::IDLE;
        self.in_flight.clear();
        self.end_requested = false;
        self.deselected_for = 0;
    }

    #[must_use]
    pub fn signals(&self) -> BusSignals {
        self.signals
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn latency(&self) -> Latency {
        self.latency
    }

    #[must_use]
    pub fn sample_phase(&self) -> SamplePhase {
        self.sample
    }

    /// True from the frame trigger until CS is released.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.start_pending || self.phase != Phase::Idle
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Transactions started since reset.
    #[must_use]
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Transactions abandoned before the end of the stream.
    #[must_use]
    pub fn aborted(&self) -> u64 {
        self.aborted
    }

    /// Nibbles delivered in the current (or last) transaction.
    #[must_use]
    pub fn nibbles(&self) -> u64 {
        self.nibbles
    }
}

fn command_bit(bit: u8) -> bool {
    FAST_READ_QUAD & (0x80 >> bit) != 0
}

fn address_bit(bit: u8) -> bool {
    STREAM_ADDRESS & (0x80_0000 >> bit) != 0
}

impl Observable for QspiMaster {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "phase" => Some(self.phase.name().into()),
            "cs_n" => Some(self.signals.cs_n.into()),
            "sclk" => Some(self.signals.sclk.into()),
            "latency" => Some(self.latency.get().into()),
            "in_flight" => Some((self.in_flight.len() as u8).into()),
            "transactions" => Some(self.transactions.into()),
            "aborted" => Some(self.aborted.into()),
            "nibbles" => Some(self.nibbles.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "phase",
            "cs_n",
            "sclk",
            "latency",
            "in_flight",
            "transactions",
            "aborted",
            "nibbles",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Device answering every read with the sequence 0, 1, 2, ... (mod 16),
    /// recording what the master sends.
    struct ScriptedDevice {
        latency: u64,
        now: u64,
        prev: BusSignals,
        clock: u32,
        mosi_bits: Vec<bool>,
        mosi_enabled_at: Vec<bool>,
        launched: VecDeque<(u64, u8)>,
        io: u8,
        selects: u32,
    }

    impl ScriptedDevice {
        fn new(latency: u8) -> Self {
            Self {
                latency: u64::from(latency),
                now: 0,
                prev: BusSignals::IDLE,
                clock: 0,
                mosi_bits: Vec::new(),
                mosi_enabled_at: Vec::new(),
                launched: VecDeque::new(),
                io: 0x0F,
                selects: 0,
            }
        }
    }

    impl QspiDevice for ScriptedDevice {
        fn step(&mut self, bus: BusSignals) -> u8 {
            if bus.cs_n {
                self.launched.clear();
                self.io = 0x0F;
            } else {
                if self.prev.cs_n {
                    self.selects += 1;
                    self.clock = 0;
                }
                if bus.sclk && !self.prev.sclk {
                    if self.clock < 32 {
                        self.mosi_bits.push(bus.mosi);
                    }
                    self.mosi_enabled_at.push(bus.mosi_enable);
                    if self.clock >= 40 {
                        let nibble = ((self.clock - 40) & 0x0F) as u8;
                        self.launched.push_back((self.now + self.latency, nibble));
                    }
                    self.clock += 1;
                }
                while let Some(&(at, nibble)) = self.launched.front() {
                    if at > self.now {
                        break;
                    }
                    self.io = nibble;
                    self.launched.pop_front();
                }
            }
            self.prev = bus;
            self.now += 1;
            self.io
        }
    }

    fn latency(n: u8) -> Latency {
        Latency::new(n).unwrap()
    }

    /// Run until `count` nibbles arrive, recording (half-cycle, nibble).
    fn collect(
        master: &mut QspiMaster,
        device: &mut ScriptedDevice,
        count: usize,
    ) -> Vec<(u64, u8)> {
        let mut out = Vec::new();
        for half in 0..10_000u64 {
            if let Some(n) = master.step(device, usize::MAX) {
                out.push((half, n));
                if out.len() == count {
                    break;
                }
            }
        }
        out
    }

    #[test]
    fn sends_fast_read_command_and_zero_address() {
        let mut master = QspiMaster::new(latency(1));
        let mut device = ScriptedDevice::new(1);
        master.begin_transaction();
        collect(&mut master, &mut device, 1);

        let mut expected: Vec<bool> = (0..8).map(|i| 0x6B & (0x80 >> i) != 0).collect();
        expected.extend([false; 24]);
        assert_eq!(device.mosi_bits, expected);
        assert_eq!(device.selects, 1);

        // IO0 driven for command and address, released from the dummy clocks on.
        assert!(device.mosi_enabled_at[..32].iter().all(|&e| e));
        assert!(device.mosi_enabled_at[32..].iter().all(|&e| !e));
    }

    #[test]
    fn nibbles_arrive_in_order_at_every_latency() {
        for lat in 1..=4 {
            let mut master = QspiMaster::new(latency(lat));
            let mut device = ScriptedDevice::new(lat);
            master.begin_transaction();
            let nibbles: Vec<u8> = collect(&mut master, &mut device, 40)
                .into_iter()
                .map(|(_, n)| n)
                .collect();
            let expected: Vec<u8> = (0..40).map(|i| (i & 0x0F) as u8).collect();
            assert_eq!(nibbles, expected, "latency {lat}");
        }
    }

    #[test]
    fn first_sample_lands_latency_half_cycles_after_data_clock() {
        for lat in 1..=4u8 {
            let mut master = QspiMaster::new(latency(lat));
            let mut device = ScriptedDevice::new(lat);
            master.begin_transaction();
            let samples = collect(&mut master, &mut device, 2);

            // CS at half-cycle 0, clock 0 rises at 2, clock 40 (first data
            // clock) rises at 82.
            assert_eq!(samples[0].0, 82 + u64::from(lat), "latency {lat}");
            assert_eq!(samples[1].0 - samples[0].0, 2);
            assert_eq!(
                Edge::of_half_cycle(samples[0].0),
                master.sample_phase().edge()
            );
        }
    }

    #[test]
    fn sampling_early_reads_stale_data() {
        let mut master = QspiMaster::new(latency(1));
        let mut device = ScriptedDevice::new(2);
        master.begin_transaction();
        let nibbles: Vec<u8> = collect(&mut master, &mut device, 4)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(nibbles, [0x0F, 0, 1, 2]);
    }

    #[test]
    fn clock_stops_when_credit_is_used_up() {
        let mut master = QspiMaster::new(latency(4));
        let mut device = ScriptedDevice::new(4);
        master.begin_transaction();

        // Four nibbles of room that nobody drains.
        let mut received = 0usize;
        for _ in 0..2_000 {
            if master.step(&mut device, 4 - received).is_some() {
                received += 1;
            }
        }
        assert_eq!(received, 4);
        assert_eq!(master.phase(), Phase::Data);
        assert_eq!(master.in_flight(), 0);
        assert!(!master.signals().sclk);
        assert!(!master.signals().cs_n);
    }

    #[test]
    fn end_of_stream_drains_then_deselects() {
        let mut master = QspiMaster::new(latency(4));
        let mut device = ScriptedDevice::new(4);
        master.begin_transaction();
        collect(&mut master, &mut device, 8);
        assert!(master.in_flight() > 0);

        master.end_transaction();
        let mut late = 0;
        let mut halves = 0;
        while !master.signals().cs_n {
            if master.step(&mut device, usize::MAX).is_some() {
                late += 1;
            }
            halves += 1;
            assert!(halves < 10, "CS never released");
        }
        assert_eq!(late, 0, "nibbles after the end of stream must be dropped");
        assert_eq!(master.phase(), Phase::Idle);
        assert_eq!(master.nibbles(), 8);
        assert!(!master.busy());

        // Ending twice, or with nothing running, is harmless.
        master.end_transaction();
        assert_eq!(master.phase(), Phase::Idle);
    }

    #[test]
    fn new_transaction_aborts_running_one_with_deselect_gap() {
        let mut master = QspiMaster::new(latency(2));
        let mut device = ScriptedDevice::new(2);
        master.begin_transaction();
        collect(&mut master, &mut device, 3);

        master.begin_transaction();
        assert_eq!(master.aborted(), 1);
        assert!(master.signals().cs_n);

        let mut high_halves = 0;
        for _ in 0..10 {
            master.step(&mut device, usize::MAX);
            if master.signals().cs_n {
                high_halves += 1;
            } else {
                break;
            }
        }
        assert!(high_halves >= 2);
        assert_eq!(master.transactions(), 2);

        let restarted: Vec<u8> = collect(&mut master, &mut device, 3)
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(restarted, [0, 1, 2]);
        assert_eq!(device.selects, 2);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut master = QspiMaster::new(latency(1));
        let mut device = ScriptedDevice::new(1);
        master.begin_transaction();
        collect(&mut master, &mut device, 2);
        master.reset(latency(3));
        assert_eq!(master.phase(), Phase::Idle);
        assert_eq!(master.signals(), BusSignals::IDLE);
        assert_eq!(master.latency().get(), 3);
        assert_eq!(master.transactions(), 0);
    }

    #[test]
    fn queries() {
        let master = QspiMaster::new(latency(2));
        assert_eq!(master.query("phase"), Some(Value::Str("idle")));
        assert_eq!(master.query("latency"), Some(Value::U8(2)));
        for path in master.query_paths() {
            assert!(master.query(path).is_some(), "{path}");
        }
    }
}
