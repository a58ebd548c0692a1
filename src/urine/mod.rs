//! Urine report analysis: field parsing, panel rules and the recommendation pass.

pub mod panels;
pub mod parser;
pub mod recommendations;

pub use panels::{analyze, Panel, PanelError};
pub use parser::parse_report_text;
pub use recommendations::analyze_urine_report;
