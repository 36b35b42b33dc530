//! Distance gating for delivered samples

use fieldtrack_core_interface::LocationSample;

/// Drops samples that are closer than `min_distance_m` to the last one delivered
///
/// A zero threshold disables filtering entirely, which is the time-based mode
/// tracking normally runs in.
#[derive(Debug, Clone)]
pub struct DistanceFilter {
    min_distance_m: f64,
    last_delivered: Option<LocationSample>,
}

impl DistanceFilter {
    pub fn new(min_distance_m: f64) -> Self {
        Self {
            min_distance_m,
            last_delivered: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.min_distance_m > 0.0
    }

    /// Keep only samples that moved far enough
    ///
    /// The batch is ordered most recent first, so it is walked oldest first
    /// and the result is restored to the same order.
    pub fn apply(&mut self, batch: Vec<LocationSample>) -> Vec<LocationSample> {
        if !self.is_enabled() {
            return batch;
        }

        let mut kept = Vec::with_capacity(batch.len());
        for sample in batch.into_iter().rev() {
            let far_enough = match &self.last_delivered {
                Some(last) => last.distance_to(&sample) >= self.min_distance_m,
                None => true,
            };

            if far_enough {
                self.last_delivered = Some(sample.clone());
                kept.push(sample);
            }
        }

        kept.reverse();
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_filter_passes_everything() {
        let mut filter = DistanceFilter::new(0.0);
        let batch = vec![
            LocationSample::new(12.9, 77.6, 5.0),
            LocationSample::new(12.9, 77.6, 5.0),
        ];

        assert!(!filter.is_enabled());
        assert_eq!(filter.apply(batch).len(), 2);
    }

    #[test]
    fn test_filter_drops_nearby_samples() {
        let mut filter = DistanceFilter::new(50.0);

        let first = filter.apply(vec![LocationSample::new(12.9, 77.6, 5.0)]);
        assert_eq!(first.len(), 1);

        // ~11 m north of the last delivered sample
        let near = filter.apply(vec![LocationSample::new(12.9001, 77.6, 5.0)]);
        assert!(near.is_empty());

        // ~111 m north
        let far = filter.apply(vec![LocationSample::new(12.901, 77.6, 5.0)]);
        assert_eq!(far.len(), 1);
    }

    #[test]
    fn test_filter_preserves_most_recent_first_order() {
        let mut filter = DistanceFilter::new(50.0);
        let batch = vec![
            LocationSample::new(12.902, 77.6, 5.0),
            LocationSample::new(12.901, 77.6, 5.0),
            LocationSample::new(12.900, 77.6, 5.0),
        ];

        let kept = filter.apply(batch);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].latitude, 12.902);
        assert_eq!(kept[2].latitude, 12.900);
    }
}
