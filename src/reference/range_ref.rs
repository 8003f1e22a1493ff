//! Range references into a target object's primary data

use crate::reference::ObjectReference;
use crate::timeseries::Handle;
use crate::types::{StoreError, StoreResult};
use std::sync::Arc;

/// A contiguous slice `[start, start + count)` of a referenced object's data
///
/// Equality is structural. Bounds are not checked here because the target
/// may not be loaded yet; `check_bounds` runs at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeReference {
    pub start: u64,
    pub count: u64,
    pub target: ObjectReference,
}

impl RangeReference {
    /// Create a new range reference
    ///
    /// # Arguments
    /// * `start` - First sample index in the target
    /// * `count` - Number of samples; zero is an empty range
    /// * `target` - Identity of the referenced object
    pub fn new(start: u64, count: u64, target: ObjectReference) -> Self {
        Self {
            start,
            count,
            target,
        }
    }

    /// Exclusive end of the range, saturating on overflow
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.count)
    }

    /// Verify the range fits into a target of `len` elements
    pub fn check_bounds(&self, len: u64) -> StoreResult<()> {
        match self.start.checked_add(self.count) {
            Some(end) if end <= len => Ok(()),
            _ => Err(StoreError::RangeOutOfBounds {
                start: self.start,
                count: self.count,
                len,
            }),
        }
    }
}

/// A range reference whose target was found in an open session
#[derive(Debug, Clone)]
pub struct ResolvedRange {
    pub start: u64,
    pub count: u64,
    pub handle: Handle,
}

impl ResolvedRange {
    /// Bind a reference to its handle, checking the range against the target length
    pub fn bind(reference: &RangeReference, handle: Handle) -> StoreResult<Self> {
        reference.check_bounds(handle.len() as u64)?;
        Ok(Self {
            start: reference.start,
            count: reference.count,
            handle,
        })
    }

    /// The referenced slice of the target's data
    pub fn data(&self) -> &[f64] {
        let start = self.start as usize;
        &self.handle.data()[start..start + self.count as usize]
    }

    /// Timestamps of the referenced samples
    pub fn timestamps(&self) -> Vec<f64> {
        let start = self.start as usize;
        self.handle
            .timestamps_in(start..start + self.count as usize)
    }

    /// Identity of the resolved target
    pub fn target(&self) -> &ObjectReference {
        self.handle.object_id()
    }

    /// Whether two resolved ranges point at the very same loaded object
    pub fn same_handle(&self, other: &ResolvedRange) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}
