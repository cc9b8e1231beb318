//! Size statistics for processed files

use serde::{Deserialize, Serialize};

use crate::types::FileOperationsResult;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Output size as a percentage of input size; 100 for an empty input
pub fn compute_reduction_ratio(input_size: u64, output_size: u64) -> f64 {
    if input_size == 0 {
        return 100.0;
    }
    round2(output_size as f64 / input_size as f64 * 100.0)
}

/// Percentage of input size saved; 0 for an empty input
pub fn compute_saved_space_ratio(input_size: u64, output_size: u64) -> f64 {
    round2(100.0 - compute_reduction_ratio(input_size, output_size))
}

/// Aggregate over a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files_completed: usize,
    pub files_converted: usize,
    pub errors: usize,
    pub warnings: usize,
    pub input_size: u64,
    pub output_size: u64,
    pub remaining_tokens: Option<i64>,
}

impl BatchSummary {
    pub fn record_completed(&mut self, result: &FileOperationsResult) {
        self.files_completed += 1;
        if result.converted_to_pdf {
            self.files_converted += 1;
        }
        self.input_size += result.input_size;
        self.output_size += result.output_size;
    }

    pub fn reduction_ratio(&self) -> f64 {
        compute_reduction_ratio(self.input_size, self.output_size)
    }

    pub fn saved_space_ratio(&self) -> f64 {
        compute_saved_space_ratio(self.input_size, self.output_size)
    }
}
