//! Table module: dynamic tables and their columns
//!
//! This module implements the table layer with the following features:
//! - Insertion-ordered named columns sharing one row index
//! - Scalar, ragged, compound and range-reference columns
//! - Atomic row appends with per-column defaults
//! - Persistence through any `ContainerIo`, with legacy reference columns
//!   promoted at read time

pub mod builder;
pub mod column;
pub mod io;
pub mod reference_column;
#[allow(clippy::module_inception)]
pub mod table;
pub mod value;

pub use builder::TableBuilder;
pub use column::{Column, ColumnData, RaggedColumn};
pub use io::{read_table, write_table};
pub use reference_column::{REFERENCE_FIELDS, ReferenceColumn};
pub use table::{DynamicTable, Row, TableSlice, TableState};
pub use value::{CellValue, ColumnDef, ValueType};
