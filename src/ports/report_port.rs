//! Trade-list output port trait.

use std::path::Path;

use crate::domain::error::TradebookError;
use crate::domain::pipeline::ImportResult;

/// Port for writing the reconstructed trade list.
pub trait ReportPort {
    fn write(&self, result: &ImportResult, output_path: &Path) -> Result<(), TradebookError>;
}
