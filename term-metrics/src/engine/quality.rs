//! Counters of an evaluation pass and the quality measure derived from them.

use serde::{Deserialize, Serialize};

/// What happened during one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    /// Rows handed to the evaluator
    pub visited: usize,
    /// Rows whose checks were evaluated
    pub evaluated: usize,
    /// Rows skipped because their bindings could not be built
    pub skipped_rows: usize,
    /// Check results excluded because they were errors or not boolean
    pub tuple_errors: usize,
    /// Rows judged dirty
    pub dirty_rows: usize,
}

impl PassStats {
    /// The quality measure for these counters.
    pub fn measure(&self) -> f64 {
        1.0 - determine_quality(self.dirty_rows, self.evaluated)
    }
}

/// Fraction of evaluated rows that are dirty.
///
/// A pass that evaluated no rows has no violations.
pub fn determine_quality(dirty_rows: usize, evaluated_rows: usize) -> f64 {
    if evaluated_rows == 0 {
        return 0.0;
    }
    (dirty_rows.min(evaluated_rows) as f64) / (evaluated_rows as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_quality() {
        assert_eq!(determine_quality(0, 0), 0.0);
        assert_eq!(determine_quality(0, 10), 0.0);
        assert_eq!(determine_quality(1, 4), 0.25);
        assert_eq!(determine_quality(4, 4), 1.0);
    }

    #[test]
    fn test_measure() {
        let stats = PassStats {
            visited: 5,
            evaluated: 4,
            skipped_rows: 1,
            tuple_errors: 0,
            dirty_rows: 1,
        };
        assert_eq!(stats.measure(), 0.75);
        assert_eq!(PassStats::default().measure(), 1.0);
    }
}
