//! # Shared configuration.
//!
//! Provides [`Config`] — buffer sizing for every combinator and the diagnostics bus.
//!
//! Config is used in three places:
//! 1. **Combinator creation**: `Merger::with_config(&cfg)`, `Splitter::builder(&cfg)`, `Broadcaster::with_config(&cfg)`
//! 2. **Channel creation**: `SafeChannel::new(cfg.capacity_clamped())`
//! 3. **Diagnostics**: `Diagnostics::builder(cfg)` sizes its bus from `bus_capacity`
//!
//! ## Sentinel values
//! - `capacity = 0` → smallest buffer tokio allows (1)
//! - `member_capacity = 0` → same clamping as `capacity`

/// Buffer sizing for channels, combinators and the diagnostics bus.
///
/// ## Field semantics
/// - `capacity`: buffer of source, aggregate and dispatch channels (min 1)
/// - `member_capacity`: buffer of each splitter/broadcaster member channel (min 1)
/// - `bus_capacity`: diagnostics ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the clamping accessors over raw fields.
#[derive(Clone, Debug)]
pub struct Config {
    /// Buffer size of merger sources, the merger aggregate and the splitter dispatch input.
    ///
    /// Small buffers keep backpressure tight: a stalled consumer stalls producers quickly.
    pub capacity: usize,

    /// Buffer size of each fan-out member.
    ///
    /// A full member stalls the whole fan-out, so this bounds how far a slow member may lag.
    pub member_capacity: usize,

    /// Capacity of the diagnostics bus ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the channel buffer size clamped to a minimum of 1.
    #[inline]
    pub fn capacity_clamped(&self) -> usize {
        self.capacity.max(1)
    }

    /// Returns the member buffer size clamped to a minimum of 1.
    #[inline]
    pub fn member_capacity_clamped(&self) -> usize {
        self.member_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `capacity = 0` (tightest buffering, clamped to 1)
    /// - `member_capacity = 1`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            capacity: 0,
            member_capacity: 1,
            bus_capacity: 1024,
        }
    }
}
