//! Volume ramp policy.
//!
//! Growth is linear: every ramp tick adds a fixed `step_fraction * max`,
//! capped at `max`. After `escalate_after_secs` of unacknowledged ringing
//! the alarm escalates to the shared siren.

use serde::{Deserialize, Serialize};

/// Default fraction of the max volume added per ramp tick.
pub const DEFAULT_STEP_FRACTION: f32 = 0.1;

/// Default ringing time before escalation (5 minutes).
pub const DEFAULT_ESCALATE_AFTER_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRamp {
    pub step_fraction: f32,
    pub escalate_after_secs: u32,
}

impl Default for VolumeRamp {
    fn default() -> Self {
        Self {
            step_fraction: DEFAULT_STEP_FRACTION,
            escalate_after_secs: DEFAULT_ESCALATE_AFTER_SECS,
        }
    }
}

impl VolumeRamp {
    pub fn new(step_fraction: f32, escalate_after_secs: u32) -> Self {
        Self {
            step_fraction,
            escalate_after_secs,
        }
    }

    /// Fixed additive increment for a given max volume.
    pub fn step(&self, max: f32) -> f32 {
        self.step_fraction * max
    }

    /// `min(current + step, max)`.
    pub fn next_volume(&self, current: f32, max: f32) -> f32 {
        (current + self.step(max)).min(max)
    }

    pub fn should_escalate(&self, elapsed_secs: u32) -> bool {
        elapsed_secs >= self.escalate_after_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn step_is_additive_not_multiplicative() {
        let ramp = VolumeRamp::default();
        let a = ramp.next_volume(0.1, 1.0);
        let b = ramp.next_volume(a, 1.0);
        assert!((a - 0.2).abs() < 1e-6);
        assert!((b - 0.3).abs() < 1e-6);
    }

    #[test]
    fn step_scales_with_max() {
        let ramp = VolumeRamp::default();
        assert!((ramp.next_volume(1.0, 10.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn volume_saturates_at_max() {
        let ramp = VolumeRamp::default();
        assert_eq!(ramp.next_volume(0.95, 1.0), 1.0);
        assert_eq!(ramp.next_volume(1.0, 1.0), 1.0);
    }

    #[test]
    fn escalation_threshold_is_inclusive() {
        let ramp = VolumeRamp::default();
        assert!(!ramp.should_escalate(0));
        assert!(!ramp.should_escalate(299));
        assert!(ramp.should_escalate(300));
        assert!(ramp.should_escalate(301));
    }

    proptest! {
        #[test]
        fn ramp_is_monotone_and_bounded(max in 0.01f32..100.0, ticks in 0usize..400) {
            let ramp = VolumeRamp::default();
            let mut current = 0.0f32;
            for _ in 0..ticks {
                let next = ramp.next_volume(current, max);
                prop_assert!(next >= current);
                prop_assert!(next <= max);
                current = next;
            }
        }

        #[test]
        fn escalates_exactly_from_threshold(e in 0u32..100_000) {
            let ramp = VolumeRamp::default();
            prop_assert_eq!(ramp.should_escalate(e), e >= 300);
        }
    }
}
