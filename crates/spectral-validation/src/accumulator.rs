//! Statistics accumulator and the counters it produces
//!
//! Every layout shares one slot arrangement so the host and device kernels
//! address counters by the same fixed indices. Slots that a layout does not
//! track simply stay at zero and are reported as `None`.

use crate::comparator::decode_error;
use crate::config::CounterLayout;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of physical counter slots
pub const SLOT_COUNT: usize = 7;

/// Size in bytes of the device-side counter buffer
pub const SLOT_BUFFER_SIZE: u64 = (SLOT_COUNT * std::mem::size_of::<u32>()) as u64;

/// Logical names of the counter slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CounterSlot {
    TotalPixels = 0,
    MatchedPixels = 1,
    AcceptablePixels = 2,
    WarningPixels = 3,
    ErrorPixels = 4,
    MaxErrorScaled = 5,
    OnePercentErrorPixels = 6,
}

impl CounterSlot {
    /// Physical index of the slot in the counter buffer
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Raw counters read back after a completed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatisticsCounters {
    pub total_pixels: u32,
    /// Near-exact matches, tracked by the extended layout only
    pub matched_pixels: Option<u32>,
    pub acceptable_pixels: u32,
    pub warning_pixels: u32,
    pub error_pixels: u32,
    /// Maximum error distance multiplied by [`crate::comparator::SCALE`]
    pub max_error_scaled: u32,
    /// Pixels beyond the 1% band, tracked by the extended layout only
    pub one_percent_error_pixels: Option<u32>,
}

impl StatisticsCounters {
    /// Interprets a slot array according to the counter layout
    pub fn from_slots(slots: &[u32; SLOT_COUNT], layout: CounterLayout) -> Self {
        let extended = |slot: CounterSlot| layout.tracks_extended().then(|| slots[slot.index()]);
        Self {
            total_pixels: slots[CounterSlot::TotalPixels.index()],
            matched_pixels: extended(CounterSlot::MatchedPixels),
            acceptable_pixels: slots[CounterSlot::AcceptablePixels.index()],
            warning_pixels: slots[CounterSlot::WarningPixels.index()],
            error_pixels: slots[CounterSlot::ErrorPixels.index()],
            max_error_scaled: slots[CounterSlot::MaxErrorScaled.index()],
            one_percent_error_pixels: extended(CounterSlot::OnePercentErrorPixels),
        }
    }

    /// Counter layout these counters were produced with
    pub fn layout(&self) -> CounterLayout {
        if self.matched_pixels.is_some() || self.one_percent_error_pixels.is_some() {
            CounterLayout::Extended
        } else {
            CounterLayout::Basic
        }
    }

    /// Decoded maximum error distance
    pub fn max_error(&self) -> f32 {
        decode_error(self.max_error_scaled)
    }
}

/// Host-side atomic counter block
///
/// Counters can only be written through a [`ClearedAccumulator`], which is
/// obtained by zeroing the block. Taking `&mut self` to clear means no second
/// run can start on the same block while a previous one still holds it.
#[derive(Debug, Default)]
pub struct Accumulator {
    slots: [AtomicU32; SLOT_COUNT],
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every slot and hands out write access for one run
    pub fn clear(&mut self) -> ClearedAccumulator<'_> {
        for slot in self.slots.iter_mut() {
            *slot.get_mut() = 0;
        }
        ClearedAccumulator { slots: &self.slots }
    }
}

/// Write access to a freshly zeroed [`Accumulator`]
///
/// Shared between all parallel invocations of a run; updates are commutative
/// so visitation order has no effect on the final values.
#[derive(Debug)]
pub struct ClearedAccumulator<'a> {
    slots: &'a [AtomicU32; SLOT_COUNT],
}

impl ClearedAccumulator<'_> {
    /// Atomically adds `value` to a counter slot
    pub fn add(&self, slot: CounterSlot, value: u32) {
        self.slots[slot.index()].fetch_add(value, Ordering::Relaxed);
    }

    /// Atomically raises a counter slot to at least `value`
    pub fn max(&self, slot: CounterSlot, value: u32) {
        self.slots[slot.index()].fetch_max(value, Ordering::Relaxed);
    }

    /// Ends the run and reads the counters
    pub fn snapshot(self, layout: CounterLayout) -> StatisticsCounters {
        let slots = std::array::from_fn(|i| self.slots[i].load(Ordering::Acquire));
        StatisticsCounters::from_slots(&slots, layout)
    }
}
