//! # Sheet Pipeline
//!
//! Loads one sheet of a spreadsheet into memory and derives views of it through a
//! fixed chain of stages: column projection, a single-condition row filter and a
//! single-column sort. The resulting view can be exported to Excel, CSV or
//! tab-separated text under a generated default name, and column selections can be
//! saved as named presets.
//!
//! ## Features
//!
//! - **Sources**: Excel 2007+ workbooks (`.xlsx`, `.xlsm`) and delimited text (`.csv`, `.tsv`, `.txt`)
//! - **Stages**: [`project`], [`filter`] and [`sort`] are pure functions from table to table
//! - **Sessions**: [`Session`] re-runs only the stages downstream of a change and keeps an undo history
//! - **Export**: [`write_table`] plus [`ExportNamer`] for short, filesystem-safe default names
//! - **Presets**: [`PresetStore`] keeps column selections as JSON files in the user config directory
//!
//! ## Example
//!
//! ```no_run
//! use sheet_pipeline::{ExportFormat, FilterCriterion, Operator, Session, SortSpec};
//!
//! # fn main() -> Result<(), sheet_pipeline::SheetPipelineError> {
//! let mut session = Session::default();
//! session.open("report.xlsx")?;
//! session.load_sheet("Sales")?;
//! session.select_columns(["region", "total"])?;
//! session.apply_filter(FilterCriterion::new("total", Operator::GreaterThan, "1000"))?;
//! session.apply_sort(SortSpec::descending("total"))?;
//! session.export("top.csv", ExportFormat::Csv)?;
//! # Ok(())
//! # }
//! ```
pub mod error;
pub mod export;
pub(crate) mod helpers;
pub mod pipeline;
pub mod preset;
pub mod spreadsheet;
pub mod table;

pub use error::ErrorKind;
pub use error::SheetPipelineError;
pub use export::write_table;
pub use export::ExportFormat;
pub use export::ExportNamer;
pub use export::NamingOptions;
pub use pipeline::PipelineState;
pub use pipeline::PresetReport;
pub use pipeline::Session;
pub use preset::ColumnConfig;
pub use preset::PresetStore;
pub use spreadsheet::open;
pub use spreadsheet::read_sheet;
pub use spreadsheet::ReadOptions;
pub use spreadsheet::SheetSource;
pub use table::filter::filter;
pub use table::filter::FilterCriterion;
pub use table::filter::Operator;
pub use table::projector::project;
pub use table::projector::ColumnSelection;
pub use table::sorter::sort;
pub use table::sorter::Direction;
pub use table::sorter::SortSpec;
pub use table::Table;
pub use table::Value;
