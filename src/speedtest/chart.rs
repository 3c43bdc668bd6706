use super::rate::RateSample;
use std::collections::VecDeque;

pub const DEFAULT_CHART_CAPACITY: usize = 50;

/// Bounded history of rate samples for the live chart.
///
/// Oldest samples are evicted once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct RateChart {
    samples: VecDeque<RateSample>,
    capacity: usize,
}

impl Default for RateChart {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHART_CAPACITY)
    }
}

impl RateChart {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: RateSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(seconds, cumulative Mbps)` pairs, oldest first.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.time_s, s.cumulative_mbps))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> RateSample {
        RateSample {
            time_s: t,
            instant_mbps: t,
            cumulative_mbps: t,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut chart = RateChart::with_capacity(3);
        for t in 1..=5 {
            chart.push(sample(t as f64));
        }

        assert_eq!(chart.len(), 3);
        let times: Vec<f64> = chart.points().iter().map(|p| p.0).collect();
        assert_eq!(times, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn zero_capacity_keeps_one_sample() {
        let mut chart = RateChart::with_capacity(0);
        chart.push(sample(1.0));
        chart.push(sample(2.0));
        assert_eq!(chart.points(), vec![(2.0, 2.0)]);
    }

    #[test]
    fn default_capacity_matches_constant() {
        let mut chart = RateChart::default();
        for t in 0..(DEFAULT_CHART_CAPACITY + 10) {
            chart.push(sample(t as f64));
        }
        assert_eq!(chart.len(), DEFAULT_CHART_CAPACITY);

        chart.clear();
        assert!(chart.is_empty());
    }
}
