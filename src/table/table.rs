//! DynamicTable: ordered named columns sharing one row index

use crate::reference::{ReferenceResolver, ResolvedRange};
use crate::schema::TypeTag;
use crate::table::column::Column;
use crate::table::value::{CellValue, ColumnDef};
use crate::types::{RowIndex, StoreError, StoreResult};
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;
use std::fmt;

/// Name of the row identifier dataset, not usable as a column name
pub const ID_COLUMN: &str = "id";

/// Lifecycle state of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Accepting columns and rows
    Building,
    /// Written to a container; read-only
    Finalized,
    /// Read back from a container; read-only
    Loaded,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableState::Building => write!(f, "Building"),
            TableState::Finalized => write!(f, "Finalized"),
            TableState::Loaded => write!(f, "Loaded"),
        }
    }
}

/// A column as held by the table: usable, or failed at load
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnSlot {
    Ready(Column),
    /// Dataset could not be turned into a column; reported on access
    Faulted { reason: String },
}

impl ColumnSlot {
    fn ready(&self, name: &str) -> StoreResult<&Column> {
        match self {
            ColumnSlot::Ready(column) => Ok(column),
            ColumnSlot::Faulted { reason } => Err(StoreError::SchemaMismatch {
                column: name.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Table of named columns that all hold one cell per row
///
/// Columns keep their declaration order. Every column's length equals
/// `row_count()` between operations; a failed `add_row` or `add_column`
/// leaves the table untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicTable {
    name: String,
    description: String,
    tag: TypeTag,
    columns: LinkedHashMap<String, ColumnSlot>,
    ids: Vec<i64>,
    state: TableState,
}

impl DynamicTable {
    /// Create an empty table in the `Building` state
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tag: TypeTag::dynamic_table(),
            columns: LinkedHashMap::new(),
            ids: Vec::new(),
            state: TableState::Building,
        }
    }

    /// Use a more specific type tag for the table group
    pub fn with_tag(mut self, tag: TypeTag) -> Self {
        self.tag = tag;
        self
    }

    /// Table read back from a container
    pub(crate) fn loaded(
        name: String,
        description: String,
        tag: TypeTag,
        columns: LinkedHashMap<String, ColumnSlot>,
        ids: Vec<i64>,
    ) -> Self {
        Self {
            name,
            description,
            tag,
            columns,
            ids,
            state: TableState::Loaded,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row identifiers
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Column names in declaration order, including columns that failed to load
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Borrow a column
    ///
    /// # Returns
    /// * `Err(StoreError::UnknownColumn)` if no such column exists
    /// * `Err(StoreError::SchemaMismatch)` if its dataset failed to load
    pub fn column(&self, name: &str) -> StoreResult<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| StoreError::UnknownColumn(name.to_string()))?
            .ready(name)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (&String, &ColumnSlot)> {
        self.columns.iter()
    }

    fn check_building(&self) -> StoreResult<()> {
        match self.state {
            TableState::Building => Ok(()),
            _ => Err(StoreError::TableFinalized(self.name.clone())),
        }
    }

    /// Declare a new column
    ///
    /// # Arguments
    /// * `name` - Column name; must not be empty, `id` or contain `/`
    /// * `definition` - Value type, list-ness and optional default
    /// * `description` - Free text stored with the column
    ///
    /// On a table that already has rows the definition must carry a default,
    /// which fills the existing rows.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        definition: ColumnDef,
        description: impl Into<String>,
    ) -> StoreResult<()> {
        self.check_building()?;
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(StoreError::DuplicateColumn(name));
        }
        if name.is_empty() || name == ID_COLUMN || name.contains('/') {
            return Err(StoreError::InvalidArgument(format!(
                "'{}' is not a usable column name",
                name
            )));
        }

        let mut column = Column::new(name.clone(), definition, description);
        if !self.ids.is_empty() {
            let default = column.definition().default_value().cloned().ok_or_else(|| {
                StoreError::InvalidArgument(format!(
                    "column {} needs a default to be added to a table with {} rows",
                    name,
                    self.ids.len()
                ))
            })?;
            column.definition().check(&name, &default)?;
            for _ in 0..self.ids.len() {
                column.data_mut().push(default.clone())?;
            }
        }

        self.columns.insert(name, ColumnSlot::Ready(column));
        Ok(())
    }

    /// Undo an `add_column` made while building a row that then failed
    pub(crate) fn remove_new_column(&mut self, name: &str) {
        if self.state == TableState::Building {
            self.columns.remove(name);
        }
    }

    /// Append one row and return its index
    ///
    /// Columns without a value take their default. The whole row is checked
    /// before any column is written.
    pub fn add_row<I, S>(&mut self, values: I) -> StoreResult<RowIndex>
    where
        I: IntoIterator<Item = (S, CellValue)>,
        S: Into<String>,
    {
        self.check_building()?;

        let mut given: HashMap<String, CellValue> = HashMap::new();
        for (name, value) in values {
            let name = name.into();
            if !self.columns.contains_key(&name) {
                return Err(StoreError::UnknownColumn(name));
            }
            if given.insert(name.clone(), value).is_some() {
                return Err(StoreError::InvalidArgument(format!(
                    "column {} given twice",
                    name
                )));
            }
        }

        let mut row = Vec::with_capacity(self.columns.len());
        for (name, slot) in self.columns.iter() {
            let column = slot.ready(name)?;
            let value = match given.remove(name.as_str()) {
                Some(value) => value,
                None => column
                    .definition()
                    .default_value()
                    .cloned()
                    .ok_or_else(|| StoreError::MissingColumn(name.clone()))?,
            };
            column.definition().check(name, &value)?;
            row.push(value);
        }

        let index = self.ids.len();
        let mut result = Ok(());
        for ((_, slot), value) in self.columns.iter_mut().zip(row) {
            if let ColumnSlot::Ready(column) = slot {
                result = column.data_mut().push(value);
                if result.is_err() {
                    break;
                }
            }
        }
        if let Err(err) = result {
            for (_, slot) in self.columns.iter_mut() {
                if let ColumnSlot::Ready(column) = slot {
                    column.data_mut().truncate(index);
                }
            }
            return Err(err);
        }

        self.ids.push(index as i64);
        Ok(index)
    }

    /// Stop accepting mutations
    pub fn finalize(&mut self) {
        if self.state == TableState::Building {
            self.state = TableState::Finalized;
        }
    }

    fn check_range(&self, start: usize, stop: usize) -> StoreResult<()> {
        let len = self.ids.len();
        if stop > len {
            return Err(StoreError::IndexOutOfRange { index: stop, len });
        }
        if start > stop {
            return Err(StoreError::IndexOutOfRange { index: start, len });
        }
        Ok(())
    }

    /// One row, references left unresolved
    pub fn get_row(&self, index: RowIndex) -> StoreResult<Row> {
        let id = *self.ids.get(index).ok_or(StoreError::IndexOutOfRange {
            index,
            len: self.ids.len(),
        })?;
        let mut cells = LinkedHashMap::new();
        for (name, slot) in self.columns.iter() {
            cells.insert(name.clone(), slot.ready(name)?.get(index)?);
        }
        Ok(Row { index, id, cells })
    }

    /// Rows `[start, stop)`, references left unresolved
    pub fn slice(&self, start: RowIndex, stop: RowIndex) -> StoreResult<TableSlice> {
        self.check_range(start, stop)?;
        let mut columns = LinkedHashMap::new();
        for (name, slot) in self.columns.iter() {
            let column = slot.ready(name)?;
            let cells = (start..stop)
                .map(|row| column.get(row))
                .collect::<StoreResult<Vec<_>>>()?;
            columns.insert(name.clone(), cells);
        }
        Ok(TableSlice {
            start,
            ids: self.ids[start..stop].to_vec(),
            columns,
        })
    }

    /// Resolve every reference held by one cell of a reference column
    ///
    /// The outer error covers a bad column or row; each reference then
    /// resolves on its own so one dangling target does not hide the rest.
    pub fn resolve_references<R>(
        &self,
        row: RowIndex,
        column: &str,
        resolver: &R,
    ) -> StoreResult<Vec<StoreResult<ResolvedRange>>>
    where
        R: ReferenceResolver + ?Sized,
    {
        self.column(column)?.resolve_references(row, resolver)
    }
}

/// One table row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: RowIndex,
    id: i64,
    cells: LinkedHashMap<String, CellValue>,
}

impl Row {
    pub fn index(&self) -> RowIndex {
        self.index
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Cells in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A contiguous run of rows with every column of the table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSlice {
    start: RowIndex,
    ids: Vec<i64>,
    columns: LinkedHashMap<String, Vec<CellValue>>,
}

impl TableSlice {
    /// Table index of the first row
    pub fn start(&self) -> RowIndex {
        self.start
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    /// Cells of one column, in row order
    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.columns.get(name).map(|cells| cells.as_slice())
    }
}
