//! Object identity and range references
//!
//! This module provides the value types used by reference columns:
//! - `ObjectReference`: stable identity of a persisted object
//! - `RangeReference`: (start, count, target) slice of a target's data
//! - `ResolvedRange`: a range whose target has been looked up in a session

pub mod object_ref;
pub mod range_ref;

pub use object_ref::ObjectReference;
pub use range_ref::{RangeReference, ResolvedRange};

use crate::timeseries::Handle;
use crate::types::{StoreError, StoreResult};

/// Looks up live handles for object references
///
/// Implemented by the container session's `ObjectRegistry`; plain closures
/// returning `Option<Handle>` work too, which keeps tests free of files.
pub trait ReferenceResolver {
    /// Resolve one target, failing with `UnresolvedReference` when it is unknown
    fn resolve_object(&self, target: &ObjectReference) -> StoreResult<Handle>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(&ObjectReference) -> Option<Handle>,
{
    fn resolve_object(&self, target: &ObjectReference) -> StoreResult<Handle> {
        self(target).ok_or_else(|| StoreError::UnresolvedReference(target.clone()))
    }
}
