//! Outputs of the analysis: typed errors, diagnostics, and per-function
//! result accessors.

pub mod diagnostic;
pub mod error;
pub mod results;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{AnalysisError, AnalysisResult};
pub use results::{AnalysisResults, BlockResult};
