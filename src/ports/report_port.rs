//! Report generation port.

use crate::domain::error::AptError;
use crate::domain::report::AnalysisReport;

/// Port for writing analysis reports.
pub trait ReportPort {
    fn write(&self, report: &AnalysisReport, output_path: &str) -> Result<(), AptError>;
}
