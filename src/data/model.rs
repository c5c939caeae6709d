/// One parsed row of the results table: the angle label from the dump and the
/// intensities recorded at that angle, in sample order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Angle text exactly as it appeared in the dump (trimmed)
    pub angle: String,
    /// Echo intensity per sample (0-255)
    pub samples: Vec<u8>,
}

impl ScanRecord {
    /// Build a record from an angle label and its samples.
    pub fn new(angle: impl Into<String>, samples: Vec<u8>) -> Self {
        Self {
            angle: angle.into(),
            samples,
        }
    }

    /// Table row: angle first, then each intensity in decimal.
    pub fn to_row(&self) -> Vec<String> {
        std::iter::once(self.angle.clone())
            .chain(self.samples.iter().map(|s| s.to_string()))
            .collect()
    }

    /// Brightest sample and its index, if any.
    pub fn peak(&self) -> Option<(usize, u8)> {
        self.samples
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(i, v)| (v, std::cmp::Reverse(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_starts_with_angle() {
        let record = ScanRecord::new("150", vec![10, 27]);
        assert_eq!(record.to_row(), vec!["150", "10", "27"]);
    }

    #[test]
    fn empty_samples_row_is_angle_only() {
        assert_eq!(ScanRecord::new("7", vec![]).to_row(), vec!["7"]);
    }

    #[test]
    fn peak_prefers_first_maximum() {
        let record = ScanRecord::new("1", vec![3, 9, 9, 1]);
        assert_eq!(record.peak(), Some((1, 9)));
        assert_eq!(ScanRecord::new("1", vec![]).peak(), None);
    }
}
