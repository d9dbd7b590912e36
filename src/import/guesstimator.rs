//! Total record count guesstimation for line-delimited imports.
//!
//! The true record count of a CSV or JSONL file is unknowable without a
//! full scan, so progress display works from an estimate: sample the
//! average bytes per record over an initial window, then extrapolate
//! `file_size / avg`. The estimate is advisory only and never gates
//! completion.

/// Records observed before the first estimate is produced.
const WINDOW: u64 = 32;

/// Relative change required before a revised estimate is re-emitted.
const MATERIAL_CHANGE: f64 = 0.10;

/// Running estimator of total record count.
#[derive(Debug)]
pub struct SizeGuesstimator {
    file_size: u64,
    records: u64,
    bytes: u64,
    last_emitted: Option<u64>,
}

impl SizeGuesstimator {
    /// Create an estimator for a file of `file_size` bytes.
    pub fn new(file_size: u64) -> Self {
        Self {
            file_size,
            records: 0,
            bytes: 0,
            last_emitted: None,
        }
    }

    /// Record one parsed record of `record_bytes` bytes.
    ///
    /// Returns a revised total estimate when it first becomes available
    /// or when it has moved materially since the last emission.
    pub fn observe(&mut self, record_bytes: u64) -> Option<u64> {
        self.records += 1;
        self.bytes += record_bytes;

        if self.records < WINDOW || self.bytes == 0 {
            return None;
        }

        let avg = self.bytes as f64 / self.records as f64;
        let estimate = (self.file_size as f64 / avg).round() as u64;

        let material = match self.last_emitted {
            None => true,
            Some(last) if last == 0 => estimate > 0,
            Some(last) => {
                let delta = estimate.abs_diff(last) as f64 / last as f64;
                delta > MATERIAL_CHANGE
            }
        };

        if material {
            self.last_emitted = Some(estimate);
            Some(estimate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_estimate_before_window() {
        let mut g = SizeGuesstimator::new(10_000);
        for _ in 0..WINDOW - 1 {
            assert_eq!(g.observe(100), None);
        }
    }

    #[test]
    fn test_first_estimate_extrapolates_from_average() {
        let mut g = SizeGuesstimator::new(10_000);
        let mut estimate = None;
        for _ in 0..WINDOW {
            estimate = g.observe(100).or(estimate);
        }
        // 10_000 bytes / 100 bytes-per-record = 100 records
        assert_eq!(estimate, Some(100));
    }

    #[test]
    fn test_stable_average_does_not_reemit() {
        let mut g = SizeGuesstimator::new(10_000);
        for _ in 0..WINDOW {
            g.observe(100);
        }
        for _ in 0..100 {
            assert_eq!(g.observe(100), None);
        }
    }

    #[test]
    fn test_material_shift_reemits() {
        let mut g = SizeGuesstimator::new(100_000);
        for _ in 0..WINDOW {
            g.observe(100);
        }
        // Records suddenly much larger: the average climbs and the
        // estimate falls by well over the threshold
        let mut revised = None;
        for _ in 0..200 {
            revised = g.observe(1000).or(revised);
        }
        assert!(revised.is_some());
        assert!(revised.unwrap() < 1000);
    }
}
