//! Neurostore: versioned columnar tables for time-indexed recordings

// Global type definitions
pub mod types;

// Import various modules
pub mod container;
pub mod intervals;
pub mod reference;
pub mod schema;
pub mod table;
pub mod timeseries;

// Re-export table items for easier access
pub use table::{CellValue, ColumnDef, DynamicTable, ValueType, read_table, write_table};

// Re-export reference items for easier access
pub use reference::{ObjectReference, RangeReference, ReferenceResolver, ResolvedRange};

// Re-export container items for easier access
pub use container::{ContainerIo, FileContainer, MemoryContainer, OpenMode};

pub use intervals::{Interval, TimeIntervals};
pub use schema::{ColumnTypeResolver, CompatRules, TypeTag};
pub use timeseries::TimeSeries;
pub use types::{StoreConfig, StoreError, StoreResult};
