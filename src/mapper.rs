//! Edge-triggered key press/release detection across frames.
//!
//! The mapper holds the previous frame's boolean press vector and compares it
//! against the occupancy computed from the current fingertip observations.
//! A key fires `on` exactly once when its state flips to pressed and `off`
//! exactly once when it flips back; holding a key emits nothing.

use crate::hand_tracking::FingertipObservation;
use crate::keyboard::VirtualKeyboard;

/// Press/release edges for one frame, indexed by chromatic key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEdges {
    /// Keys that transitioned to pressed this frame
    pub on: Vec<bool>,
    /// Keys that transitioned to released this frame
    pub off: Vec<bool>,
}

impl KeyEdges {
    fn silent(total_keys: usize) -> Self {
        Self {
            on: vec![false; total_keys],
            off: vec![false; total_keys],
        }
    }

    /// True iff no key changed state this frame
    #[must_use]
    pub fn is_silent(&self) -> bool {
        !self.on.iter().chain(self.off.iter()).any(|&edge| edge)
    }
}

/// Stateful press/release edge detector
#[derive(Debug, Default)]
pub struct KeyStateMapper {
    /// Previous frame's press vector; empty until the first non-silent frame
    previous: Vec<bool>,
}

impl KeyStateMapper {
    /// Create a mapper with no key pressed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all held keys
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Compute press/release edges for the current frame.
    ///
    /// Observations are hit-tested against the keyboard box, resolved to a
    /// key and marked pressed when the paired height exceeds
    /// `height_threshold` (the finger has crossed the press plane; height is
    /// the corrected camera distance, larger meaning lowered toward the
    /// keys). Keys resolving outside `[0, total_keys)` are dropped.
    /// Observations and heights are paired by position; several fingertips
    /// landing on one key coalesce, last write wins.
    ///
    /// When neither the current nor the previous vector holds a pressed key
    /// the comparison is skipped entirely and silent edges are returned.
    pub fn compute_edges(
        &mut self,
        keyboard: &VirtualKeyboard,
        observations: &[FingertipObservation],
        heights: &[f64],
        height_threshold: f64,
        total_keys: usize,
    ) -> KeyEdges {
        let mut current = vec![false; total_keys];

        for (observation, &height) in observations.iter().zip(heights) {
            if !keyboard.hit_test(observation.x, observation.y) {
                continue;
            }
            let key = keyboard.find_key(observation.x, observation.y);
            if key < total_keys && height > height_threshold {
                current[key] = true;
            }
        }

        let any_current = current.iter().any(|&pressed| pressed);
        let any_previous = self.previous.iter().any(|&pressed| pressed);

        if !any_current && !any_previous {
            return KeyEdges::silent(total_keys);
        }

        self.previous.resize(total_keys, false);

        let mut edges = KeyEdges::silent(total_keys);
        for key in 0..total_keys {
            let changed = self.previous[key] ^ current[key];
            edges.on[key] = changed && current[key];
            edges.off[key] = changed && self.previous[key];
        }

        self.previous = current;
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand_tracking::{Fingertip, FingertipObservation};
    use crate::keyboard::VirtualKeyboard;

    fn keyboard() -> VirtualKeyboard {
        VirtualKeyboard::new(640, 480, 22).unwrap()
    }

    fn observation(x: f64, y: f64) -> FingertipObservation {
        FingertipObservation {
            hand: 0,
            tip: Fingertip::Index,
            x,
            y,
        }
    }

    /// Canvas point in the lower zone of a given white key column
    fn white_key_point(kb: &VirtualKeyboard, column: usize) -> (f64, f64) {
        let (x0, _, _, y1) = kb.bounding_box();
        (x0 + kb.white_key_width() * (column as f64 + 0.5), y1 - 1.0)
    }

    #[test]
    fn test_single_key_press_and_release() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (x, y) = white_key_point(&kb, 3); // key index 5 (F)

        let pressed = mapper.compute_edges(&kb, &[observation(x, y)], &[70.0], 68.5, 37);
        assert!(pressed.on[5]);
        assert_eq!(pressed.on.iter().filter(|&&edge| edge).count(), 1);
        assert!(pressed.off.iter().all(|&edge| !edge));

        // Finger lifted above the press plane
        let released = mapper.compute_edges(&kb, &[observation(x, y)], &[60.0], 68.5, 37);
        assert!(released.off[5]);
        assert_eq!(released.off.iter().filter(|&&edge| edge).count(), 1);
        assert!(released.on.iter().all(|&edge| !edge));
    }

    #[test]
    fn test_held_key_fires_once() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (x, y) = white_key_point(&kb, 0);

        let first = mapper.compute_edges(&kb, &[observation(x, y)], &[75.0], 68.5, 37);
        assert!(first.on[0]);

        // Unchanged occupancy: no repeated firing while held
        let second = mapper.compute_edges(&kb, &[observation(x, y)], &[75.0], 68.5, 37);
        assert!(second.is_silent());
    }

    #[test]
    fn test_all_false_fast_path() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();

        let edges = mapper.compute_edges(&kb, &[], &[], 68.5, 37);
        assert!(edges.is_silent());
        assert_eq!(edges.on.len(), 37);
        assert_eq!(edges.off.len(), 37);
        // Fast path leaves the previous vector untouched
        assert!(mapper.previous.is_empty());
    }

    #[test]
    fn test_height_threshold_is_strict() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (x, y) = white_key_point(&kb, 1);

        let edges = mapper.compute_edges(&kb, &[observation(x, y)], &[68.5], 68.5, 37);
        assert!(edges.is_silent());
    }

    #[test]
    fn test_observation_outside_box_ignored() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();

        let edges = mapper.compute_edges(&kb, &[observation(5.0, 5.0)], &[99.0], 68.5, 37);
        assert!(edges.is_silent());
    }

    #[test]
    fn test_out_of_range_key_dropped() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();

        // Probe the stray black rectangle past the final white key
        let stray = kb
            .black_keys()
            .iter()
            .find(|key| key.index >= kb.total_keys())
            .copied()
            .unwrap();
        let (_, y0, _, _) = kb.bounding_box();
        let x = (stray.x0 + stray.x1) / 2.0;

        let edges = mapper.compute_edges(&kb, &[observation(x, y0 + 5.0)], &[99.0], 68.5, 37);
        assert!(edges.is_silent());
    }

    #[test]
    fn test_coalescing_last_write_wins() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (x, y) = white_key_point(&kb, 2); // key index 4 (E)

        // Two fingertips on the same key produce a single edge
        let edges = mapper.compute_edges(
            &kb,
            &[observation(x, y), observation(x + 1.0, y)],
            &[70.0, 71.0],
            68.5,
            37,
        );
        assert!(edges.on[4]);
        assert_eq!(edges.on.iter().filter(|&&edge| edge).count(), 1);
    }

    #[test]
    fn test_chord_transition() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (xa, ya) = white_key_point(&kb, 0); // key 0
        let (xb, yb) = white_key_point(&kb, 4); // key 7

        let chord = mapper.compute_edges(
            &kb,
            &[observation(xa, ya), observation(xb, yb)],
            &[70.0, 70.0],
            68.5,
            37,
        );
        assert!(chord.on[0] && chord.on[7]);

        // Release one, keep the other
        let shift = mapper.compute_edges(&kb, &[observation(xb, yb)], &[70.0], 68.5, 37);
        assert!(shift.off[0]);
        assert!(!shift.off[7]);
        assert!(shift.on.iter().all(|&edge| !edge));
    }

    #[test]
    fn test_reset_forgets_held_keys() {
        let kb = keyboard();
        let mut mapper = KeyStateMapper::new();
        let (x, y) = white_key_point(&kb, 0);

        mapper.compute_edges(&kb, &[observation(x, y)], &[70.0], 68.5, 37);
        mapper.reset();

        // Same occupancy fires again after reset
        let edges = mapper.compute_edges(&kb, &[observation(x, y)], &[70.0], 68.5, 37);
        assert!(edges.on[0]);
    }
}
