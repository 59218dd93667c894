//! Trailing-window sample standard deviation in O(1) per update.

use std::collections::VecDeque;

use rust_decimal::Decimal;

/// Fixed-size window over the most recent fixed-precision values.
///
/// Values are held as integer units of `10^-scale`, so the running sum and
/// sum of squares are exact and the variance only depends on the values
/// currently in the window.
#[derive(Debug, Clone)]
pub struct RollingStd {
    window: usize,
    scale: u32,
    units: VecDeque<i128>,
    sum: i128,
    sum_sq: i128,
}

impl RollingStd {
    pub fn new(window: usize, scale: u32) -> Self {
        Self {
            window,
            scale,
            units: VecDeque::with_capacity(window + 1),
            sum: 0,
            sum_sq: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.units.len() == self.window
    }

    /// Push a value, evicting the oldest once the window is full.
    ///
    /// Digits beyond `scale` are rounded away. Returns `None`, leaving the
    /// window untouched, if the running sums would overflow.
    pub fn push(&mut self, value: Decimal) -> Option<()> {
        let mut scaled = value;
        scaled.rescale(self.scale);
        if scaled.scale() != self.scale {
            return None;
        }
        let unit = scaled.mantissa();
        let square = unit.checked_mul(unit)?;

        let mut sum = self.sum.checked_add(unit)?;
        let mut sum_sq = self.sum_sq.checked_add(square)?;
        let evicted = self.units.len() >= self.window;
        if evicted {
            if let Some(&old) = self.units.front() {
                sum -= old;
                sum_sq -= old * old;
            }
        }

        if evicted {
            self.units.pop_front();
        }
        self.units.push_back(unit);
        self.sum = sum;
        self.sum_sq = sum_sq;
        Some(())
    }

    /// Sample standard deviation (denominator n-1) once the window is full.
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_full() || self.window < 2 {
            return None;
        }
        let n = self.units.len() as i128;
        // n * sum_sq - sum^2 = n * sum((x - mean)^2), never negative.
        let numerator = n.checked_mul(self.sum_sq)?.checked_sub(self.sum.checked_mul(self.sum)?)?;
        let unit = 10f64.powi(self.scale as i32);
        let variance = numerator as f64 / (n * (n - 1)) as f64 / (unit * unit);
        Some(variance.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_std(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    }

    fn micro(units: i64) -> Decimal {
        Decimal::new(units, 6)
    }

    fn assert_matches_rescan(units: &[i64], window: usize, tolerance: f64) {
        let values: Vec<f64> = units.iter().map(|&u| u as f64 / 1e6).collect();
        let mut rolling = RollingStd::new(window, 6);

        for (i, &u) in units.iter().enumerate() {
            rolling.push(micro(u)).unwrap();
            if i + 1 >= window {
                let expected = naive_std(&values[i + 1 - window..=i]);
                let got = rolling.std_dev().unwrap();
                let error = (got - expected).abs() / expected.max(f64::MIN_POSITIVE);
                assert!(error < tolerance, "index {}: {} vs {}", i, got, expected);
            } else {
                assert!(rolling.std_dev().is_none());
            }
        }
    }

    #[test]
    fn test_undefined_until_full() {
        let mut rolling = RollingStd::new(3, 0);
        rolling.push(Decimal::from(1)).unwrap();
        rolling.push(Decimal::from(2)).unwrap();
        assert_eq!(rolling.std_dev(), None);
        rolling.push(Decimal::from(3)).unwrap();
        assert!((rolling.std_dev().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matches_naive_rescan() {
        let units: Vec<i64> = (0..200)
            .map(|i| ((i as f64 * 0.37).sin() * 20_000.0) as i64 + 1_000 * (i % 7))
            .collect();
        assert_matches_rescan(&units, 30, 1e-12);
    }

    #[test]
    fn test_calm_window_after_volatile_stretch() {
        // +-9% for a long stretch, then +-0.01%.
        let units: Vec<i64> = (0..9000)
            .map(|i| {
                let size = if i < 4000 { 90_000 } else { 100 };
                if i % 2 == 0 { size } else { -size }
            })
            .collect();
        assert_matches_rescan(&units, 30, 1e-12);
    }

    #[test]
    fn test_result_ignores_history_outside_window() {
        let calm: Vec<i64> = (0..30).map(|i| if i % 3 == 0 { 150 } else { -70 }).collect();

        let mut fresh = RollingStd::new(30, 6);
        for &u in &calm {
            fresh.push(micro(u)).unwrap();
        }

        let mut seasoned = RollingStd::new(30, 6);
        for i in 0..5000 {
            seasoned.push(micro(if i % 2 == 0 { 400_000 } else { -350_000 })).unwrap();
        }
        for &u in &calm {
            seasoned.push(micro(u)).unwrap();
        }

        assert_eq!(fresh.std_dev(), seasoned.std_dev());
    }

    #[test]
    fn test_constant_window_is_zero() {
        let mut rolling = RollingStd::new(4, 2);
        for _ in 0..10 {
            rolling.push(Decimal::new(25, 2)).unwrap();
        }
        assert_eq!(rolling.std_dev(), Some(0.0));
    }

    #[test]
    fn test_overflow_leaves_window_untouched() {
        let mut rolling = RollingStd::new(2, 0);
        rolling.push(Decimal::from(1)).unwrap();
        assert_eq!(rolling.push(Decimal::MAX), None);
        assert_eq!(rolling.len(), 1);
    }
}
