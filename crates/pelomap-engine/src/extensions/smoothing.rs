// extensions/smoothing.rs
//
// Exponentially weighted moving average, used to estimate an entity's update
// cadence so its transition lasts about as long as the gap between samples.

/// EWMA over a notional window of `size` samples, seeded with `seed`.
#[derive(Debug, Clone, Copy)]
pub struct ExpWeightedAvg {
    keep: f64,
    take: f64,
    value: f64,
}

impl ExpWeightedAvg {
    pub fn new(size: f64, seed: f64) -> Self {
        let keep = (-1.0 / size).exp();
        Self {
            keep,
            take: 1.0 - keep,
            value: seed,
        }
    }

    /// Fold in a sample and return the new average.
    pub fn push(&mut self, sample: f64) -> f64 {
        self.value = self.value * self.keep + sample * self.take;
        self.value
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        self.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_seed() {
        let avg = ExpWeightedAvg::new(6.0, 1000.0);
        assert_eq!(avg.get(), 1000.0);
    }

    #[test]
    fn constant_input_converges() {
        let mut avg = ExpWeightedAvg::new(6.0, 1000.0);
        for _ in 0..200 {
            avg.push(200.0);
        }
        assert!((avg.get() - 200.0).abs() < 0.01);
    }

    #[test]
    fn single_sample_moves_partway() {
        let mut avg = ExpWeightedAvg::new(6.0, 1000.0);
        let v = avg.push(2000.0);
        let keep = (-1.0f64 / 6.0).exp();
        assert!((v - (1000.0 * keep + 2000.0 * (1.0 - keep))).abs() < 1e-9);
        assert!(v > 1000.0 && v < 2000.0);
    }
}
