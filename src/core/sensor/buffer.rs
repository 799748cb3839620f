use std::collections::VecDeque;

/// Fixed capacity rolling buffer of raw samples.
///
/// The buffer is always full: it is seeded at construction and every push
/// evicts the oldest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl SampleBuffer {
    /// Create a buffer whose capacity is the number of seed samples
    pub fn seeded<I>(seed: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let samples: VecDeque<f64> = seed.into_iter().collect();
        Self {
            capacity: samples.len(),
            samples,
        }
    }

    /// 16 samples spanning the 10 bit converter range: 0, 64, .., 960
    pub fn analog_default() -> Self {
        Self::seeded((0..1024).step_by(64).map(f64::from))
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Mean after dropping the lowest and highest quarter of the samples
    pub fn trimmed_mean(&self) -> f64 {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let trim = sorted.len() / 4;
        mean(&sorted[trim..sorted.len() - trim])
    }

    pub fn mean(&self) -> f64 {
        let all: Vec<f64> = self.samples.iter().copied().collect();
        mean(&all)
    }

    /// Population standard deviation of the whole buffer
    pub fn std_dev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_of_squares: f64 = self.samples.iter().map(|s| (s - mean).powi(2)).sum();
        (sum_of_squares / self.samples.len() as f64).sqrt()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
