//! Serial clock edges.

/// Which half of a serial clock period is being simulated.
///
/// A serial clock period is two half-cycles: the rising edge opens it, the
/// falling edge closes it. Devices sample on one edge and launch data on the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Edge for a half-cycle index counted from a rising edge.
    #[must_use]
    pub const fn of_half_cycle(half: u64) -> Self {
        if half & 1 == 0 { Self::Rising } else { Self::Falling }
    }
}
