//! Container interface definitions

use crate::container::error::ContainerResult;
use crate::container::node::{AttrValue, Dataset, Group};
use crate::reference::ObjectReference;
use crate::timeseries::Handle;
use crate::types::{FormatVersion, StoreResult};

/// Container interface trait
///
/// The hierarchical store that tables and time series are persisted into.
/// Paths are `/`-separated and absolute; `/` is the root group.
pub trait ContainerIo {
    /// Format version the file declares in its root attributes
    ///
    /// # Returns
    /// * `Ok(None)` if the file carries no version attribute
    fn format_version(&self) -> ContainerResult<Option<FormatVersion>>;

    /// Borrow the group at `path`
    fn group(&self, path: &str) -> ContainerResult<&Group>;

    /// Create the group at `path` and any missing parents
    fn create_group(&mut self, path: &str) -> ContainerResult<()>;

    /// Borrow the dataset at `path`
    ///
    /// # Returns
    /// * `Err(ContainerError::NotFound)` if there is no dataset at `path`
    fn read_dataset(&self, path: &str) -> ContainerResult<&Dataset>;

    /// Create or replace the dataset at `path`, creating missing parent groups
    fn write_dataset(&mut self, path: &str, dataset: Dataset) -> ContainerResult<()>;

    /// Read one attribute of the group or dataset at `path`
    fn attribute(&self, path: &str, key: &str) -> ContainerResult<Option<&AttrValue>>;

    /// Set one attribute of the group or dataset at `path`
    fn set_attribute(&mut self, path: &str, key: &str, value: AttrValue) -> ContainerResult<()>;

    /// Whether a group or dataset exists at `path`
    fn exists(&self, path: &str) -> ContainerResult<bool>;

    /// Resolve an object reference to a live handle
    ///
    /// Loads the target on first use; later calls return the same handle.
    fn resolve_object_reference(&self, target: &ObjectReference) -> StoreResult<Handle>;
}
