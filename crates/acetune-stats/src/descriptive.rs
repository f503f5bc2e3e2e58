/// Descriptive statistics summarizing a batch of values.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Mean of the absolute values.
    pub mean_abs: f64,
    /// Largest absolute value.
    pub max_abs: f64,
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes statistics over `values`.
    ///
    /// Returns `None` if `values` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use acetune_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([2.0, -4.0, 4.0, 2.0]).unwrap();
    /// assert_eq!(stats.count, 4);
    /// assert_eq!(stats.min, -4.0);
    /// assert_eq!(stats.mean, 1.0);
    /// assert_eq!(stats.max_abs, 4.0);
    /// assert_eq!(stats.mean_abs, 3.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_abs = values.iter().map(|v| v.abs()).fold(0.0, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let mean_abs = values.iter().map(|v| v.abs()).sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count: values.len(),
            min,
            max,
            mean,
            mean_abs,
            max_abs,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert_eq!(DescriptiveStats::new([]), None);
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::new([-3.0]).unwrap();
        assert_eq!(stats.min, -3.0);
        assert_eq!(stats.max, -3.0);
        assert_eq!(stats.max_abs, 3.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_std_dev() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
    }
}
