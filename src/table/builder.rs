//! TableBuilder for fluent table construction
//!
//! Collects the table name, description, type tag and column definitions,
//! then validates them all at `build`.

use crate::schema::TypeTag;
use crate::table::table::DynamicTable;
use crate::table::value::ColumnDef;
use crate::types::{StoreError, StoreResult};

/// Builder for constructing DynamicTable instances
///
/// # Example
/// ```
/// use neurostore::table::{ColumnDef, TableBuilder, ValueType};
///
/// let table = TableBuilder::new("epochs")
///     .description("experimental epochs")
///     .column("start_time", ColumnDef::scalar(ValueType::Float), "start")
///     .column("tags", ColumnDef::ragged(ValueType::Text), "labels")
///     .build()
///     .unwrap();
/// assert_eq!(table.column_names(), ["start_time", "tags"]);
/// ```
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    description: String,
    tag: Option<TypeTag>,
    columns: Vec<(String, ColumnDef, String)>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tag: None,
            columns: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the type tag of the table group (defaults to `DynamicTable`)
    pub fn tag(mut self, tag: TypeTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Add a single column; order of calls is column order
    pub fn column(
        mut self,
        name: impl Into<String>,
        definition: ColumnDef,
        description: impl Into<String>,
    ) -> Self {
        self.columns
            .push((name.into(), definition, description.into()));
        self
    }

    /// Build the table
    ///
    /// # Returns
    /// * `Err(StoreError::InvalidArgument)` if the name is empty
    /// * `Err(StoreError::DuplicateColumn)` if a column name repeats
    pub fn build(self) -> StoreResult<DynamicTable> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidArgument(
                "table name cannot be empty".to_string(),
            ));
        }
        let mut table = DynamicTable::new(self.name, self.description);
        if let Some(tag) = self.tag {
            table = table.with_tag(tag);
        }
        for (name, definition, description) in self.columns {
            table.add_column(name, definition, description)?;
        }
        Ok(table)
    }
}
