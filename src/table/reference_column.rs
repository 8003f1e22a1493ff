//! Reference column: one `RangeReference` per row
//!
//! Reading a cell never touches the referenced object. Resolution is a
//! separate call that takes the resolver explicitly, so table metadata can
//! be read without loading any target.

use crate::container::{Dataset, Element, Field};
use crate::reference::{RangeReference, ReferenceResolver, ResolvedRange};
use crate::types::{ElementType, StoreError, StoreResult};

/// Persisted record layout: `{idx_start: u64, count: u64, timeseries: object-ref}`
pub const REFERENCE_FIELDS: [(&str, ElementType); 3] = [
    ("idx_start", ElementType::UInt64),
    ("count", ElementType::UInt64),
    ("timeseries", ElementType::ObjectRef),
];

/// Column of range references
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceColumn {
    refs: Vec<RangeReference>,
}

impl ReferenceColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_refs(refs: Vec<RangeReference>) -> Self {
        Self { refs }
    }

    /// Add one row; nothing is resolved
    pub fn append(&mut self, range_ref: RangeReference) {
        self.refs.push(range_ref);
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RangeReference> {
        self.refs.iter()
    }

    /// Stored reference of a row, unresolved
    pub fn get(&self, row: usize) -> StoreResult<RangeReference> {
        self.refs
            .get(row)
            .cloned()
            .ok_or(StoreError::IndexOutOfRange {
                index: row,
                len: self.refs.len(),
            })
    }

    /// Rows `[start, stop)` in order, unresolved
    pub fn slice(&self, start: usize, stop: usize) -> StoreResult<&[RangeReference]> {
        if start > stop || stop > self.refs.len() {
            return Err(StoreError::IndexOutOfRange {
                index: stop.max(start),
                len: self.refs.len(),
            });
        }
        Ok(&self.refs[start..stop])
    }

    /// Resolve one row through `resolver`
    ///
    /// # Returns
    /// * `Err(StoreError::UnresolvedReference)` if the target cannot be found;
    ///   other rows stay resolvable
    /// * `Err(StoreError::RangeOutOfBounds)` if the range overruns the target
    pub fn resolve<R>(&self, row: usize, resolver: &R) -> StoreResult<ResolvedRange>
    where
        R: ReferenceResolver + ?Sized,
    {
        let reference = self.refs.get(row).ok_or(StoreError::IndexOutOfRange {
            index: row,
            len: self.refs.len(),
        })?;
        let handle = resolver.resolve_object(&reference.target)?;
        ResolvedRange::bind(reference, handle)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.refs.truncate(len);
    }

    /// Encode as fixed-width compound records
    pub fn to_dataset(&self) -> Dataset {
        let dtype = REFERENCE_FIELDS
            .iter()
            .map(|(name, ty)| Field::new(*name, *ty))
            .collect();
        let rows = self
            .refs
            .iter()
            .map(|r| {
                vec![
                    Element::UInt(r.start),
                    Element::UInt(r.count),
                    Element::ObjectRef(r.target.clone()),
                ]
            })
            .collect();
        Dataset::new(dtype, rows)
    }

    /// Decode compound records; field names are not checked, only the layout
    pub fn from_dataset(column: &str, dataset: &Dataset) -> StoreResult<Self> {
        let mismatch = |reason: String| StoreError::SchemaMismatch {
            column: column.to_string(),
            reason,
        };
        if dataset.dtype.len() != REFERENCE_FIELDS.len() {
            return Err(mismatch(format!(
                "reference records need {} fields, dataset has {}",
                REFERENCE_FIELDS.len(),
                dataset.dtype.len()
            )));
        }

        let mut refs = Vec::with_capacity(dataset.len());
        for (i, row) in dataset.rows.iter().enumerate() {
            match row.as_slice() {
                [start, count, Element::ObjectRef(target)] => {
                    let start = start
                        .as_u64()
                        .ok_or_else(|| mismatch(format!("row {}: invalid start {:?}", i, start)))?;
                    let count = count
                        .as_u64()
                        .ok_or_else(|| mismatch(format!("row {}: invalid count {:?}", i, count)))?;
                    refs.push(RangeReference::new(start, count, target.clone()));
                }
                _ => {
                    return Err(mismatch(format!(
                        "row {} is not a (start, count, object-ref) record",
                        i
                    )));
                }
            }
        }
        Ok(Self { refs })
    }
}
