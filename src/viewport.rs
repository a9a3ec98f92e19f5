use std::ops::Range;

/// Indices of list items that intersect the scrolled viewport, widened by
/// `overscan` items on both sides.
pub fn visible_range(
    scroll_top: f64,
    viewport_height: f64,
    item_height: f64,
    count: usize,
    overscan: usize,
) -> Range<usize> {
    if count == 0 {
        return 0..0;
    }
    if item_height <= 0.0 || !item_height.is_finite() {
        return 0..count;
    }
    let top = scroll_top.max(0.0);
    let bottom = top + viewport_height.max(0.0);

    let first = (top / item_height).floor() as usize;
    let last = ((bottom / item_height).ceil() as usize).max(first + 1);

    let start = first.saturating_sub(overscan).min(count);
    let end = last.saturating_add(overscan).min(count);
    start..end
}

/// Leading-edge throttle over caller-supplied timestamps.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: f64,
    last: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    /// Whether a call at `now_ms` may run. A permitted call starts a new interval.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    /// Milliseconds until the next call at `now_ms` would be permitted.
    pub fn remaining(&self, now_ms: f64) -> f64 {
        self.last
            .map(|last| (self.interval_ms - (now_ms - last)).max(0.0))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 100.0, 0..4)]
    #[case(35.0, 100.0, 0..5)]
    #[case(350.0, 70.0, 9..13)]
    #[case(10_000.0, 100.0, 50..50)]
    #[case(-20.0, 100.0, 0..4)]
    fn computes_visible_items(#[case] scroll_top: f64, #[case] height: f64, #[case] expected: Range<usize>) {
        assert_eq!(visible_range(scroll_top, height, 35.0, 50, 1), expected);
    }

    #[test]
    fn empty_list_and_unknown_item_height() {
        assert_eq!(visible_range(0.0, 100.0, 35.0, 0, 2), 0..0);
        assert_eq!(visible_range(0.0, 100.0, 0.0, 7, 2), 0..7);
        assert_eq!(visible_range(0.0, 100.0, f64::NAN, 7, 2), 0..7);
    }

    #[test]
    fn collapsed_viewport_still_yields_an_item() {
        assert_eq!(visible_range(70.0, 0.0, 35.0, 10, 0), 2..3);
    }

    #[test]
    fn throttle_admits_one_call_per_interval() {
        let mut throttle = Throttle::new(100.0);
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(50.0));
        assert_eq!(throttle.remaining(50.0), 50.0);
        assert!(throttle.ready(100.0));
        assert!(!throttle.ready(199.0));
        assert!(throttle.ready(250.0));
        assert_eq!(throttle.remaining(400.0), 0.0);
    }
}
