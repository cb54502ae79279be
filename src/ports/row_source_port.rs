//! Raw row access port trait.

use std::path::Path;

use crate::domain::error::TradebookError;
use crate::domain::stream::RawSheet;

/// Port for reading the raw sheets of one export file.
///
/// Implementations return cell values verbatim as strings; all field
/// interpretation happens downstream in the domain.
pub trait RowSourcePort {
    fn read_sheets(&self, path: &Path) -> Result<Vec<RawSheet>, TradebookError>;
}
