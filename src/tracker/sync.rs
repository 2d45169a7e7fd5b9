use super::Region;
use crate::frame::Side;
use tracing::trace;

/// Region-entry memory for one side.
///
/// Only the two monitored regions carry a timestamp, so this is a fixed pair
/// of slots rather than a map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideMemory {
    current: Option<Region>,
    above_green: Option<f64>,
    below_red: Option<f64>,
}

impl SideMemory {
    /// Timestamp at which this side last entered `region`
    pub fn entered_at(&self, region: Region) -> Option<f64> {
        match region {
            Region::AboveGreen => self.above_green,
            Region::BelowRed => self.below_red,
            Region::Between => None,
        }
    }

    /// Region reported by the latest observation
    pub fn current(&self) -> Option<Region> {
        self.current
    }

    fn observe(&mut self, region: Region, timestamp: f64) {
        match region {
            Region::Between => {
                self.above_green = None;
                self.below_red = None;
            }
            Region::AboveGreen if self.current != Some(region) => {
                self.above_green = Some(timestamp);
            }
            Region::BelowRed if self.current != Some(region) => {
                self.below_red = Some(timestamp);
            }
            // Still inside the same region: keep the entry time
            _ => {}
        }
        self.current = Some(region);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Bilateral synchronization memory with a temporal tolerance
#[derive(Debug, Clone)]
pub struct SyncTracker {
    left: SideMemory,
    right: SideMemory,
    tolerance_seconds: f64,
}

impl SyncTracker {
    pub fn new(tolerance_seconds: f64) -> Self {
        Self {
            left: SideMemory::default(),
            right: SideMemory::default(),
            tolerance_seconds,
        }
    }

    /// Record the region `side` occupies at `timestamp`.
    ///
    /// Entering a monitored region stamps it, leaving the other region's stamp
    /// untouched. Reporting `Between` wipes both stamps for that side, so the
    /// side has to freshly re-enter a region before it counts again.
    pub fn observe(&mut self, side: Side, region: Region, timestamp: f64) {
        let memory = self.memory_mut(side);
        memory.observe(region, timestamp);
        trace!(
            "{} side in {} (above_green: {:?}, below_red: {:?})",
            side.label(),
            region.label(),
            memory.above_green,
            memory.below_red
        );
    }

    /// Both sides entered `region` and their entry times differ by at most the tolerance
    pub fn synchronized(&self, region: Region) -> bool {
        match (self.left.entered_at(region), self.right.entered_at(region)) {
            (Some(left), Some(right)) => (left - right).abs() <= self.tolerance_seconds,
            _ => false,
        }
    }

    pub fn memory(&self, side: Side) -> &SideMemory {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn tolerance_seconds(&self) -> f64 {
        self.tolerance_seconds
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn memory_mut(&mut self, side: Side) -> &mut SideMemory {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synchronized_within_tolerance() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.0);
        tracker.observe(Side::Right, Region::AboveGreen, 0.3);
        assert!(tracker.synchronized(Region::AboveGreen));
        assert!(!tracker.synchronized(Region::BelowRed));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::AboveGreen, 2.0);
        tracker.observe(Side::Right, Region::AboveGreen, 3.0);
        assert!(tracker.synchronized(Region::AboveGreen));
    }

    #[test]
    fn test_not_synchronized_beyond_tolerance() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.0);
        tracker.observe(Side::Right, Region::AboveGreen, 1.5);
        assert!(!tracker.synchronized(Region::AboveGreen));
    }

    #[test]
    fn test_synchronization_is_symmetric() {
        for (a, b) in [(0.0, 0.4), (0.0, 1.0), (0.0, 1.01), (5.0, 3.2)] {
            let mut forward = SyncTracker::new(1.0);
            forward.observe(Side::Left, Region::BelowRed, a);
            forward.observe(Side::Right, Region::BelowRed, b);

            let mut reverse = SyncTracker::new(1.0);
            reverse.observe(Side::Left, Region::BelowRed, b);
            reverse.observe(Side::Right, Region::BelowRed, a);

            assert_eq!(
                forward.synchronized(Region::BelowRed),
                reverse.synchronized(Region::BelowRed)
            );
        }
    }

    #[test]
    fn test_staying_in_region_keeps_entry_time() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.8);
        tracker.observe(Side::Left, Region::AboveGreen, 1.4);
        assert_eq!(
            tracker.memory(Side::Left).entered_at(Region::AboveGreen),
            Some(0.0)
        );
    }

    #[test]
    fn test_between_clears_both_regions_for_that_side() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::BelowRed, 0.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.5);
        tracker.observe(Side::Right, Region::AboveGreen, 0.5);
        assert!(tracker.synchronized(Region::AboveGreen));

        tracker.observe(Side::Left, Region::Between, 0.6);
        let left = tracker.memory(Side::Left);
        assert_eq!(left.entered_at(Region::AboveGreen), None);
        assert_eq!(left.entered_at(Region::BelowRed), None);
        assert!(!tracker.synchronized(Region::AboveGreen));

        // The right side is untouched
        assert_eq!(
            tracker.memory(Side::Right).entered_at(Region::AboveGreen),
            Some(0.5)
        );

        // A fresh entry restores synchronization
        tracker.observe(Side::Left, Region::AboveGreen, 0.9);
        assert!(tracker.synchronized(Region::AboveGreen));
    }

    #[test]
    fn test_direct_switch_keeps_other_region_stamp() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Right, Region::BelowRed, 0.0);
        tracker.observe(Side::Right, Region::AboveGreen, 0.2);
        let right = tracker.memory(Side::Right);
        assert_eq!(right.entered_at(Region::BelowRed), Some(0.0));
        assert_eq!(right.entered_at(Region::AboveGreen), Some(0.2));

        tracker.observe(Side::Right, Region::BelowRed, 3.0);
        assert_eq!(
            tracker.memory(Side::Right).entered_at(Region::BelowRed),
            Some(3.0)
        );
    }

    #[test]
    fn test_clear() {
        let mut tracker = SyncTracker::new(1.0);
        tracker.observe(Side::Left, Region::AboveGreen, 0.0);
        tracker.observe(Side::Right, Region::AboveGreen, 0.0);
        tracker.clear();
        assert!(!tracker.synchronized(Region::AboveGreen));
        assert_eq!(tracker.memory(Side::Left).current(), None);
    }
}
