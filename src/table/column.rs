//! Column storage

use crate::container::{Dataset, Element, Field};
use crate::reference::{ReferenceResolver, ResolvedRange};
use crate::schema::{ColumnKind, ResolutionNote, TypeTag};
use crate::table::reference_column::ReferenceColumn;
use crate::table::value::{CellValue, ColumnDef, ValueType};
use crate::types::{ElementType, StoreError, StoreResult};
use std::ops::Range;

/// Cell storage of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Text(Vec<String>),
    /// Untyped compound records
    Record {
        fields: Vec<Field>,
        rows: Vec<Vec<Element>>,
    },
    Reference(ReferenceColumn),
    Ragged(RaggedColumn),
}

impl ColumnData {
    /// Empty storage for a column definition
    pub fn empty(def: &ColumnDef) -> Self {
        let flat = match def.value_type() {
            ValueType::Float => ColumnData::Float(Vec::new()),
            ValueType::Int => ColumnData::Int(Vec::new()),
            ValueType::UInt => ColumnData::UInt(Vec::new()),
            ValueType::Text => ColumnData::Text(Vec::new()),
            ValueType::Reference => ColumnData::Reference(ReferenceColumn::new()),
            ValueType::Record(types) => ColumnData::Record {
                fields: types
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| Field::new(format!("f{}", i), *ty))
                    .collect(),
                rows: Vec::new(),
            },
        };
        if def.is_ragged() {
            ColumnData::Ragged(RaggedColumn::new(flat))
        } else {
            flat
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::UInt(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Record { rows, .. } => rows.len(),
            ColumnData::Reference(r) => r.len(),
            ColumnData::Ragged(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value type of the cells (of the list items, for ragged columns)
    pub fn value_type(&self) -> ValueType {
        match self {
            ColumnData::Float(_) => ValueType::Float,
            ColumnData::Int(_) => ValueType::Int,
            ColumnData::UInt(_) => ValueType::UInt,
            ColumnData::Text(_) => ValueType::Text,
            ColumnData::Record { fields, .. } => {
                ValueType::Record(fields.iter().map(|f| f.ty).collect())
            }
            ColumnData::Reference(_) => ValueType::Reference,
            ColumnData::Ragged(r) => r.values().value_type(),
        }
    }

    pub fn is_ragged(&self) -> bool {
        matches!(self, ColumnData::Ragged(_))
    }

    /// Kind of the storage holding the cell values
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Reference(_) => ColumnKind::Reference,
            ColumnData::Ragged(r) => r.values().kind(),
            _ => ColumnKind::Generic,
        }
    }

    /// Tag this storage is written with
    pub fn type_tag(&self) -> TypeTag {
        match self.kind() {
            ColumnKind::Reference => TypeTag::reference_vector_data(),
            _ => TypeTag::vector_data(),
        }
    }

    /// Cell at `row`, or `None` past the end
    pub fn get(&self, row: usize) -> Option<CellValue> {
        match self {
            ColumnData::Float(v) => v.get(row).map(|x| CellValue::Float(*x)),
            ColumnData::Int(v) => v.get(row).map(|x| CellValue::Int(*x)),
            ColumnData::UInt(v) => v.get(row).map(|x| CellValue::UInt(*x)),
            ColumnData::Text(v) => v.get(row).map(|x| CellValue::Text(x.clone())),
            ColumnData::Record { rows, .. } => rows.get(row).map(|r| CellValue::Record(r.clone())),
            ColumnData::Reference(r) => r.get(row).ok().map(CellValue::Reference),
            ColumnData::Ragged(r) => r.get(row),
        }
    }

    /// Append a value that already passed `ColumnDef::check`
    pub(crate) fn push(&mut self, value: CellValue) -> StoreResult<()> {
        match (self, value) {
            (ColumnData::Float(v), CellValue::Float(x)) => v.push(x),
            (ColumnData::Int(v), CellValue::Int(x)) => v.push(x),
            (ColumnData::UInt(v), CellValue::UInt(x)) => v.push(x),
            (ColumnData::Text(v), CellValue::Text(x)) => v.push(x),
            (ColumnData::Record { fields, rows }, CellValue::Record(x)) if x.len() == fields.len() => {
                rows.push(x)
            }
            (ColumnData::Reference(r), CellValue::Reference(x)) => r.append(x),
            (ColumnData::Ragged(r), CellValue::List(items)) => r.push(items)?,
            (data, value) => {
                return Err(StoreError::InvalidArgument(format!(
                    "cannot store {:?} in a {} column",
                    value,
                    data.value_type()
                )));
            }
        }
        Ok(())
    }

    /// Drop rows past `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        match self {
            ColumnData::Float(v) => v.truncate(len),
            ColumnData::Int(v) => v.truncate(len),
            ColumnData::UInt(v) => v.truncate(len),
            ColumnData::Text(v) => v.truncate(len),
            ColumnData::Record { rows, .. } => rows.truncate(len),
            ColumnData::Reference(r) => r.truncate(len),
            ColumnData::Ragged(r) => r.truncate(len),
        }
    }

    /// Encode as a flat dataset; ragged columns also yield their offsets
    pub fn to_datasets(&self) -> (Dataset, Option<Dataset>) {
        let flat = |ty: ElementType, values: Vec<Element>| Dataset::scalar(ty, values);
        match self {
            ColumnData::Float(v) => (
                flat(ElementType::Float64, v.iter().map(|x| Element::Float(*x)).collect()),
                None,
            ),
            ColumnData::Int(v) => (
                flat(ElementType::Int64, v.iter().map(|x| Element::Int(*x)).collect()),
                None,
            ),
            ColumnData::UInt(v) => (
                flat(ElementType::UInt64, v.iter().map(|x| Element::UInt(*x)).collect()),
                None,
            ),
            ColumnData::Text(v) => (
                flat(ElementType::Text, v.iter().map(|x| Element::Text(x.clone())).collect()),
                None,
            ),
            ColumnData::Record { fields, rows } => (Dataset::new(fields.clone(), rows.clone()), None),
            ColumnData::Reference(r) => (r.to_dataset(), None),
            ColumnData::Ragged(r) => {
                let (values, _) = r.values().to_datasets();
                let offsets = flat(
                    ElementType::UInt64,
                    r.offsets().iter().map(|o| Element::UInt(*o)).collect(),
                );
                (values, Some(offsets))
            }
        }
    }
}

/// Multi-valued column: end offsets into a flat value column
///
/// Row `i` holds `values[offsets[i - 1]..offsets[i]]`, with an implicit 0
/// before the first row.
#[derive(Debug, Clone, PartialEq)]
pub struct RaggedColumn {
    offsets: Vec<u64>,
    values: Box<ColumnData>,
}

impl RaggedColumn {
    pub fn new(values: ColumnData) -> Self {
        Self {
            offsets: Vec::new(),
            values: Box::new(values),
        }
    }

    /// Assemble from persisted parts, validating the offsets
    pub fn from_parts(column: &str, offsets: Vec<u64>, values: ColumnData) -> StoreResult<Self> {
        let mismatch = |reason: String| StoreError::SchemaMismatch {
            column: column.to_string(),
            reason,
        };
        if values.is_ragged() {
            return Err(mismatch("nested ragged columns are not supported".to_string()));
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(mismatch("index offsets decrease".to_string()));
        }
        let end = offsets.last().copied().unwrap_or(0);
        if end != values.len() as u64 {
            return Err(mismatch(format!(
                "index ends at {} but the column holds {} values",
                end,
                values.len()
            )));
        }
        Ok(Self {
            offsets,
            values: Box::new(values),
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Flat value storage
    pub fn values(&self) -> &ColumnData {
        &self.values
    }

    /// Positions of a row's items in the flat value storage
    pub fn cell_range(&self, row: usize) -> Option<Range<usize>> {
        let end = *self.offsets.get(row)? as usize;
        let start = if row == 0 {
            0
        } else {
            self.offsets[row - 1] as usize
        };
        Some(start..end)
    }

    pub fn get(&self, row: usize) -> Option<CellValue> {
        let range = self.cell_range(row)?;
        range
            .map(|i| self.values.get(i))
            .collect::<Option<Vec<_>>>()
            .map(CellValue::List)
    }

    fn push(&mut self, items: Vec<CellValue>) -> StoreResult<()> {
        let before = self.values.len();
        for item in items {
            if let Err(err) = self.values.push(item) {
                self.values.truncate(before);
                return Err(err);
            }
        }
        self.offsets.push(self.values.len() as u64);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.offsets.truncate(len);
        let end = self.offsets.last().copied().unwrap_or(0) as usize;
        self.values.truncate(end);
    }
}

/// A named column of a table
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    description: String,
    definition: ColumnDef,
    tag: TypeTag,
    resolution: Option<ResolutionNote>,
    data: ColumnData,
}

impl Column {
    /// Create an empty column
    ///
    /// # Arguments
    /// * `name` - Column name, unique within its table
    /// * `definition` - Value type, list-ness and optional default
    /// * `description` - Free text stored with the column
    pub fn new(name: impl Into<String>, definition: ColumnDef, description: impl Into<String>) -> Self {
        let data = ColumnData::empty(&definition);
        Self {
            name: name.into(),
            description: description.into(),
            tag: data.type_tag(),
            definition,
            resolution: None,
            data,
        }
    }

    /// Column read back from a file
    pub(crate) fn loaded(
        name: String,
        description: String,
        tag: TypeTag,
        resolution: Option<ResolutionNote>,
        data: ColumnData,
    ) -> Self {
        let definition = if data.is_ragged() {
            ColumnDef::ragged(data.value_type())
        } else {
            ColumnDef::scalar(data.value_type())
        };
        Self {
            name,
            description,
            definition,
            tag,
            resolution,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn definition(&self) -> &ColumnDef {
        &self.definition
    }

    /// Tag as persisted; a promoted legacy column keeps its original tag here
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// How the column kind was resolved at read time, if not at face value
    pub fn resolution(&self) -> Option<&ResolutionNote> {
        self.resolution.as_ref()
    }

    /// Kind of the in-memory implementation
    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cell at `row`, unresolved
    pub fn get(&self, row: usize) -> StoreResult<CellValue> {
        self.data.get(row).ok_or(StoreError::IndexOutOfRange {
            index: row,
            len: self.data.len(),
        })
    }

    /// Flat reference storage, for scalar and ragged reference columns alike
    pub fn references(&self) -> Option<&ReferenceColumn> {
        match &self.data {
            ColumnData::Reference(r) => Some(r),
            ColumnData::Ragged(r) => match r.values() {
                ColumnData::Reference(inner) => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }

    /// Resolve every reference in one cell; one result per reference
    pub fn resolve_references<R>(&self, row: usize, resolver: &R) -> StoreResult<Vec<StoreResult<ResolvedRange>>>
    where
        R: ReferenceResolver + ?Sized,
    {
        let refs = self.references().ok_or_else(|| {
            StoreError::InvalidArgument(format!("column {} holds no references", self.name))
        })?;
        let positions = match &self.data {
            ColumnData::Ragged(r) => r.cell_range(row),
            _ => (row < refs.len()).then(|| row..row + 1),
        }
        .ok_or(StoreError::IndexOutOfRange {
            index: row,
            len: self.data.len(),
        })?;
        Ok(positions.map(|i| refs.resolve(i, resolver)).collect())
    }
}
