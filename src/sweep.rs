//! Sweep planning: the ordered sequence of voltage setpoints for a run.
//!
//! A plan is built from one linear segment, or from two segments that meet
//! at a transition voltage (used to apply finer step density over part of
//! the range, e.g. fine steps through turn-on and coarse steps above it).
//! The shared transition point appears exactly once in the flattened
//! sequence. A plan may additionally carry a mirrored return pass that
//! revisits the same voltages in reverse order.

use crate::error::{AppResult, SweepError};

/// One linear ramp of evenly spaced voltages, inclusive of both ends.
/// Only constructible through [`SweepSegment::new`], which enforces the
/// minimum point count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSegment {
    start: f64,
    stop: f64,
    points: usize,
}

impl SweepSegment {
    /// Creates a segment. Fewer than two points has degenerate spacing and
    /// is rejected here, before any instrument communication.
    pub fn new(start: f64, stop: f64, points: usize) -> AppResult<Self> {
        if points < 2 {
            return Err(SweepError::Configuration(format!(
                "sweep segment needs at least 2 points, got {points}"
            )));
        }
        Ok(Self { start, stop, points })
    }

    /// Evenly spaced values from start to stop. The endpoints are exact;
    /// interior points are subject to floating-point representation.
    pub fn values(&self) -> Vec<f64> {
        let n = self.points;
        let step = (self.stop - self.start) / (n - 1) as f64;
        (0..n)
            .map(|i| {
                if i == n - 1 {
                    self.stop
                } else {
                    self.start + step * i as f64
                }
            })
            .collect()
    }
}

/// The full ordered voltage sequence for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    voltages: Vec<f64>,
    mirrored: bool,
}

impl SweepPlan {
    /// Single-segment plan from start to stop.
    pub fn single(start: f64, stop: f64, points: usize) -> AppResult<Self> {
        Ok(Self {
            voltages: SweepSegment::new(start, stop, points)?.values(),
            mirrored: false,
        })
    }

    /// Two-segment plan meeting at a transition voltage. The transition
    /// must lie strictly between start and stop, and appears exactly once
    /// in the combined sequence, which therefore has
    /// `points1 + points2 - 1` entries.
    pub fn two_segment(
        start: f64,
        transition: f64,
        points1: usize,
        stop: f64,
        points2: usize,
    ) -> AppResult<Self> {
        let lo = start.min(stop);
        let hi = start.max(stop);
        if transition <= lo || transition >= hi {
            return Err(SweepError::Configuration(format!(
                "transition voltage {transition} V must lie strictly between {start} V and {stop} V"
            )));
        }
        let mut voltages = SweepSegment::new(start, transition, points1)?.values();
        // The second segment starts on the transition point already emitted
        // by the first; skip it to keep the shared boundary value unique.
        voltages.extend(
            SweepSegment::new(transition, stop, points2)?
                .values()
                .into_iter()
                .skip(1),
        );
        Ok(Self {
            voltages,
            mirrored: false,
        })
    }

    /// Requests a mirrored return pass over the same voltage set.
    pub fn mirrored(mut self, enable: bool) -> Self {
        self.mirrored = enable;
        self
    }

    /// Forward-pass voltages in sweep order.
    pub fn forward(&self) -> &[f64] {
        &self.voltages
    }

    /// Return-pass voltages (the exact reverse of the forward sequence), or
    /// `None` when no mirrored pass was requested.
    pub fn backward(&self) -> Option<Vec<f64>> {
        if self.mirrored {
            Some(self.voltages.iter().rev().copied().collect())
        } else {
            None
        }
    }

    /// Number of setpoints in one pass.
    pub fn len(&self) -> usize {
        self.voltages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltages.is_empty()
    }

    /// Largest planned voltage, used for voltage-protection levels when
    /// parking the SMU after a sweep.
    pub fn max_voltage(&self) -> f64 {
        self.voltages.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rejects_degenerate_point_count() {
        assert!(SweepSegment::new(0.0, 5.0, 1).is_err());
        assert!(SweepSegment::new(0.0, 5.0, 0).is_err());
        assert!(SweepSegment::new(0.0, 5.0, 2).is_ok());
    }

    #[test]
    fn test_linspace_endpoints_and_spacing() {
        let plan = SweepPlan::single(0.0, 5.0, 21).unwrap();
        let v = plan.forward();
        assert_eq!(v.len(), 21);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[20], 5.0);
        for w in v.windows(2) {
            assert!((w[1] - w[0] - 0.25).abs() < 1e-12);
        }
        assert_eq!(v[1], 0.25);
        assert_eq!(v[2], 0.5);
    }

    #[test]
    fn test_descending_segment() {
        let plan = SweepPlan::single(5.0, 0.0, 6).unwrap();
        let v = plan.forward();
        assert_eq!(v[0], 5.0);
        assert_eq!(v[5], 0.0);
        assert!(v.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_two_segment_dedupes_transition() {
        let plan = SweepPlan::two_segment(-2.0, 2.5, 23, 7.0, 23).unwrap();
        let v = plan.forward();
        assert_eq!(v.len(), 45);
        assert_eq!(v[0], -2.0);
        assert_eq!(v[22], 2.5);
        assert_eq!(v[44], 7.0);
        let occurrences = v.iter().filter(|&&x| x == 2.5).count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn test_two_segment_rejects_outside_transition() {
        assert!(SweepPlan::two_segment(0.0, 6.0, 5, 5.0, 5).is_err());
        assert!(SweepPlan::two_segment(0.0, 0.0, 5, 5.0, 5).is_err());
        assert!(SweepPlan::two_segment(0.0, 5.0, 5, 5.0, 5).is_err());
    }

    #[test]
    fn test_mirrored_pass_is_exact_reverse() {
        let plan = SweepPlan::single(0.0, 2.0, 3).unwrap().mirrored(true);
        let back = plan.backward().unwrap();
        assert_eq!(back, vec![2.0, 1.0, 0.0]);
        let mut restored = back.clone();
        restored.reverse();
        assert_eq!(restored, plan.forward());
    }

    #[test]
    fn test_no_backward_without_mirror() {
        let plan = SweepPlan::single(0.0, 2.0, 3).unwrap();
        assert!(plan.backward().is_none());
    }

    #[test]
    fn test_max_voltage() {
        let plan = SweepPlan::two_segment(-2.0, 2.5, 5, 7.0, 5).unwrap();
        assert_eq!(plan.max_voltage(), 7.0);
    }
}
