/*! Streaming sample statistics.

Accumulates the count, mean, and variance of a sequence of observations in
a single pass, without buffering the sequence.  Degenerate inputs yield NaN
rather than panicking: an empty accumulator has no mean, and a singleton has
no variance.

```
# use onepass_stats::SampleStats;
let stats: SampleStats = vec![2.0_f64, 4., 6.].into_iter().collect();
assert_eq!(stats.mean, 4.);
assert_eq!(stats.var, 4.);
assert_eq!(stats.std_dev(), 2.);
```
*/

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct StatsBuilder {
    /// the number of observations seen so far
    count: usize,
    /// the running mean
    mean: f64,
    /// the sum of squared distances from the running mean
    m2: f64,
}

impl StatsBuilder {
    pub fn update(&mut self, x: f64) {
        // Welford's online algorithm
        self.count += 1;
        let delta1 = x - self.mean; // diff from the old mean
        self.mean += delta1 / self.count as f64;
        let delta2 = x - self.mean; // diff from the new mean
        self.m2 += delta1 * delta2;
    }

    pub fn count(self) -> usize {
        self.count
    }

    pub fn mean(self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample variance, with Bessel's correction.
    pub fn sample_var(self) -> f64 {
        if self.count <= 1 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn sample_std_dev(self) -> f64 {
        self.sample_var().sqrt()
    }
}

impl Extend<f64> for StatsBuilder {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            self.update(x);
        }
    }
}

/// Sample statistics of an observed sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleStats {
    /// The sample size
    pub count: usize,
    /// The sample mean
    pub mean: f64,
    /// The sample variance
    pub var: f64,
}

impl SampleStats {
    pub fn std_dev(self) -> f64 {
        self.var.sqrt()
    }
}

impl From<StatsBuilder> for SampleStats {
    fn from(x: StatsBuilder) -> SampleStats {
        SampleStats {
            count: x.count(),
            mean: x.mean(),
            var: x.sample_var(),
        }
    }
}

impl FromIterator<f64> for SampleStats {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> SampleStats {
        let mut bldr = StatsBuilder::default();
        bldr.extend(iter);
        bldr.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simple_sequences() {
        let stats = vec![1.0_f64, 2., 3.].into_iter().collect::<SampleStats>();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 2.);
        assert_eq!(stats.var, 1.);
        assert_eq!(stats.std_dev(), 1.);

        let stats = vec![0.0_f64, -2., 2.].into_iter().collect::<SampleStats>();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 0.);
        assert_eq!(stats.var, 4.);
        assert_eq!(stats.std_dev(), 2.);

        let stats = (0..=100).map(f64::from).collect::<SampleStats>();
        assert_eq!(stats.count, 101);
        assert_eq!(stats.mean, 50.);
        assert_eq!(stats.var, 858.5);
    }

    #[test]
    fn degenerate_inputs() {
        let empty = std::iter::empty().collect::<SampleStats>();
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());
        assert!(empty.var.is_nan());
        assert!(empty.std_dev().is_nan());

        let single = std::iter::once(7.5).collect::<SampleStats>();
        assert_eq!(single.count, 1);
        assert_eq!(single.mean, 7.5);
        assert!(single.var.is_nan());
    }

    #[test]
    fn matches_two_pass_computation() {
        let xs: Vec<f64> = (1..=50).map(|x| (x as f64).sin() * 10.0).collect();
        let stats = xs.iter().copied().collect::<SampleStats>();

        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
        assert_relative_eq!(stats.mean, mean, max_relative = 1e-12);
        assert_relative_eq!(stats.var, var, max_relative = 1e-12);
    }

    #[test]
    fn variance_is_squared_std_dev() {
        let stats = vec![3.0_f64, 1., 4., 1., 5., 9., 2., 6.]
            .into_iter()
            .collect::<SampleStats>();
        assert_relative_eq!(stats.std_dev() * stats.std_dev(), stats.var, max_relative = 1e-12);
    }
}
