use std::collections::HashSet;
use std::time::Duration;

pub const DELAY_PER_PX: f64 = 0.4;

/// Bounding box of an artwork tile in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Rect {
    pub fn in_view(&self, viewport_height: f64) -> bool {
        self.top < viewport_height && self.bottom >= 0.0
    }
}

/// Tiles further right fade in later, so a row reveals left to right.
pub fn fade_delay(rect: &Rect, per_px: f64) -> Duration {
    let millis = (rect.left * per_px).max(0.0);
    Duration::from_micros((millis * 1000.0).round() as u64)
}

/// Remembers which tiles already faded in so scroll and resize events only
/// schedule the new ones.
#[derive(Debug)]
pub struct FadeTracker {
    per_px: f64,
    scheduled: HashSet<usize>,
}

impl FadeTracker {
    pub fn new(per_px: f64) -> Self {
        Self {
            per_px,
            scheduled: HashSet::new(),
        }
    }

    /// Tiles (by index) that just came into view, each with its delay.
    pub fn plan(&mut self, tiles: &[Rect], viewport_height: f64) -> Vec<(usize, Duration)> {
        tiles
            .iter()
            .enumerate()
            .filter(|(_, rect)| rect.in_view(viewport_height))
            .filter(|(index, _)| self.scheduled.insert(*index))
            .map(|(index, rect)| (index, fade_delay(rect, self.per_px)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(top: f64, left: f64) -> Rect {
        Rect {
            top,
            bottom: top + 300.0,
            left,
        }
    }

    #[test]
    fn only_visible_tiles_are_scheduled() {
        let mut tracker = FadeTracker::new(DELAY_PER_PX);
        let tiles = [tile(100.0, 0.0), tile(100.0, 500.0), tile(1200.0, 0.0), tile(-400.0, 0.0)];

        let plan = tracker.plan(&tiles, 900.0);

        assert_eq!(
            plan,
            vec![
                (0, Duration::ZERO),
                (1, Duration::from_millis(200)),
            ]
        );
    }

    #[test]
    fn tiles_fade_once() {
        let mut tracker = FadeTracker::new(DELAY_PER_PX);
        let tiles = [tile(100.0, 250.0)];

        assert_eq!(tracker.plan(&tiles, 900.0).len(), 1);
        assert!(tracker.plan(&tiles, 900.0).is_empty());
    }

    #[test]
    fn tile_touching_top_edge_counts_as_visible() {
        let rect = Rect {
            top: -300.0,
            bottom: 0.0,
            left: 0.0,
        };
        assert!(rect.in_view(900.0));
        assert!(!tile(900.0, 0.0).in_view(900.0));
    }
}
