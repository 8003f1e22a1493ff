//! Persisted type tags

use crate::container::{AttrValue, Group};
use crate::types::{FormatVersion, NAMESPACE_ATTR, TYPE_NAME_ATTR};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace of the generic table building blocks
pub const HDMF_COMMON: &str = "hdmf-common";
/// Namespace of the domain types
pub const CORE: &str = "core";

pub const VECTOR_DATA: &str = "VectorData";
pub const VECTOR_INDEX: &str = "VectorIndex";
pub const ELEMENT_IDENTIFIERS: &str = "ElementIdentifiers";
pub const DYNAMIC_TABLE: &str = "DynamicTable";
pub const REFERENCE_VECTOR_DATA: &str = "TimeSeriesReferenceVectorData";
pub const TIME_INTERVALS: &str = "TimeIntervals";
pub const TIME_SERIES: &str = "TimeSeries";

/// Type descriptor stored with a dataset or group
///
/// `origin_version` is not stored per dataset; it is the file's format
/// version, attached when the tag is read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub name: String,
    pub namespace: String,
    pub origin_version: Option<FormatVersion>,
}

impl TypeTag {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            origin_version: None,
        }
    }

    pub fn vector_data() -> Self {
        Self::new(VECTOR_DATA, HDMF_COMMON)
    }

    pub fn vector_index() -> Self {
        Self::new(VECTOR_INDEX, HDMF_COMMON)
    }

    pub fn element_identifiers() -> Self {
        Self::new(ELEMENT_IDENTIFIERS, HDMF_COMMON)
    }

    pub fn dynamic_table() -> Self {
        Self::new(DYNAMIC_TABLE, HDMF_COMMON)
    }

    pub fn reference_vector_data() -> Self {
        Self::new(REFERENCE_VECTOR_DATA, CORE)
    }

    pub fn time_intervals() -> Self {
        Self::new(TIME_INTERVALS, CORE)
    }

    pub fn time_series() -> Self {
        Self::new(TIME_SERIES, CORE)
    }

    /// Same tag, recorded as read from a file of `version`
    pub fn with_origin(mut self, version: Option<FormatVersion>) -> Self {
        self.origin_version = version;
        self
    }

    /// Read the tag stored in an attribute map; `None` if it has no type name
    pub fn from_attrs(attrs: &BTreeMap<String, AttrValue>) -> Option<Self> {
        let name = attrs.get(TYPE_NAME_ATTR)?.as_str()?;
        let namespace = attrs
            .get(NAMESPACE_ATTR)
            .and_then(AttrValue::as_str)
            .unwrap_or_default();
        Some(Self::new(name, namespace))
    }

    /// Read the tag of a group
    pub fn of_group(group: &Group) -> Option<Self> {
        Self::from_attrs(&group.attrs)
    }

    /// Store the tag into an attribute map
    pub fn write_attrs(&self, attrs: &mut BTreeMap<String, AttrValue>) {
        attrs.insert(TYPE_NAME_ATTR.to_string(), AttrValue::Text(self.name.clone()));
        attrs.insert(
            NAMESPACE_ATTR.to_string(),
            AttrValue::Text(self.namespace.clone()),
        );
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}
