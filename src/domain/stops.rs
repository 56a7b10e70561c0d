//! ATR initial stop and EMA trailing stop for long positions.

#[derive(Debug, Clone, PartialEq)]
pub struct StopParams {
    pub atr_mult: f64,
    pub trail_use_ema: bool,
}

impl Default for StopParams {
    fn default() -> Self {
        StopParams {
            atr_mult: 2.0,
            trail_use_ema: true,
        }
    }
}

/// `close - mult * atr`, or `None` while ATR is undefined.
pub fn initial_stop(close: f64, atr: f64, mult: f64) -> Option<f64> {
    let stop = close - mult * atr;
    stop.is_finite().then_some(stop)
}

/// Stop levels carried by an open long position.
///
/// The trailing level only moves up; an undefined trail value leaves it
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopState {
    pub initial: Option<f64>,
    pub trailing: Option<f64>,
}

impl StopState {
    pub fn new(initial: Option<f64>) -> Self {
        Self {
            initial,
            trailing: None,
        }
    }

    pub fn ratchet(&mut self, trail_value: f64) {
        if trail_value.is_nan() {
            return;
        }
        self.trailing = Some(match self.trailing {
            Some(prev) => prev.max(trail_value),
            None => trail_value,
        });
    }

    /// The greater of the initial and trailing levels.
    pub fn effective(&self) -> Option<f64> {
        match (self.initial, self.trailing) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// True when the trailing level is the binding one.
    pub fn trailing_binds(&self) -> bool {
        match (self.initial, self.trailing) {
            (Some(a), Some(b)) => b > a,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    pub fn is_breached(&self, close: f64) -> bool {
        self.effective().is_some_and(|stop| close <= stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn initial_stop_from_atr() {
        assert_eq!(initial_stop(100.0, 3.0, 2.0), Some(94.0));
    }

    #[test]
    fn initial_stop_undefined_atr() {
        assert_eq!(initial_stop(100.0, f64::NAN, 2.0), None);
    }

    #[test]
    fn trailing_only_ratchets_up() {
        let mut s = StopState::new(Some(90.0));
        s.ratchet(92.0);
        s.ratchet(91.0);
        assert_eq!(s.trailing, Some(92.0));
        s.ratchet(f64::NAN);
        assert_eq!(s.trailing, Some(92.0));
    }

    #[test]
    fn effective_is_max_of_levels() {
        let mut s = StopState::new(Some(90.0));
        s.ratchet(85.0);
        assert_eq!(s.effective(), Some(90.0));
        assert!(!s.trailing_binds());
        s.ratchet(95.0);
        assert_eq!(s.effective(), Some(95.0));
        assert!(s.trailing_binds());
    }

    #[test]
    fn breach_is_inclusive() {
        let s = StopState::new(Some(90.0));
        assert!(s.is_breached(90.0));
        assert!(!s.is_breached(90.01));
    }

    #[test]
    fn no_levels_never_breach() {
        let s = StopState::new(None);
        assert!(!s.is_breached(0.0));
    }

    proptest! {
        #[test]
        fn trailing_is_monotonic(values in prop::collection::vec(1.0f64..500.0, 1..50)) {
            let mut s = StopState::new(None);
            let mut last = f64::NEG_INFINITY;
            for v in values {
                s.ratchet(v);
                let now = s.trailing.unwrap();
                prop_assert!(now >= last);
                last = now;
            }
        }
    }
}
