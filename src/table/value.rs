//! Cell values and column definitions

use crate::container::Element;
use crate::reference::RangeReference;
use crate::types::{ElementType, StoreError, StoreResult};
use std::fmt;

/// Value of one table cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Float(f64),
    Int(i64),
    UInt(u64),
    Text(String),
    /// Row of an untyped compound column, kept verbatim
    Record(Vec<Element>),
    /// Unresolved range reference
    Reference(RangeReference),
    /// Cell of a ragged column
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&RangeReference> {
        match self {
            CellValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[CellValue]> {
        match self {
            CellValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// List of text items, e.g. the tags of an interval
    pub fn text_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CellValue::List(items.into_iter().map(|s| CellValue::Text(s.into())).collect())
    }

    /// List of references
    pub fn reference_list(items: impl IntoIterator<Item = RangeReference>) -> Self {
        CellValue::List(items.into_iter().map(CellValue::Reference).collect())
    }

    fn type_name(&self) -> &'static str {
        match self {
            CellValue::Float(_) => "float",
            CellValue::Int(_) => "int",
            CellValue::UInt(_) => "uint",
            CellValue::Text(_) => "text",
            CellValue::Record(_) => "record",
            CellValue::Reference(_) => "reference",
            CellValue::List(_) => "list",
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<u64> for CellValue {
    fn from(v: u64) -> Self {
        CellValue::UInt(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<RangeReference> for CellValue {
    fn from(v: RangeReference) -> Self {
        CellValue::Reference(v)
    }
}

/// Element type of a column's cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Float,
    Int,
    UInt,
    Text,
    Reference,
    /// Compound records with these field types
    Record(Vec<ElementType>),
}

impl ValueType {
    /// Whether a single (non-list) value fits this type
    pub fn accepts(&self, value: &CellValue) -> bool {
        match (self, value) {
            (ValueType::Float, CellValue::Float(_))
            | (ValueType::Int, CellValue::Int(_))
            | (ValueType::UInt, CellValue::UInt(_))
            | (ValueType::Text, CellValue::Text(_))
            | (ValueType::Reference, CellValue::Reference(_)) => true,
            (ValueType::Record(fields), CellValue::Record(elements)) => {
                fields.len() == elements.len()
                    && fields
                        .iter()
                        .zip(elements)
                        .all(|(ty, e)| e.element_type() == *ty)
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Float => write!(f, "float"),
            ValueType::Int => write!(f, "int"),
            ValueType::UInt => write!(f, "uint"),
            ValueType::Text => write!(f, "text"),
            ValueType::Reference => write!(f, "reference"),
            ValueType::Record(fields) => write!(f, "record of {} fields", fields.len()),
        }
    }
}

/// Declared shape of a column: value type, raggedness and optional default
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    value_type: ValueType,
    ragged: bool,
    default: Option<CellValue>,
}

impl ColumnDef {
    /// One value per row
    pub fn scalar(value_type: ValueType) -> Self {
        Self {
            value_type,
            ragged: false,
            default: None,
        }
    }

    /// A list of values per row
    pub fn ragged(value_type: ValueType) -> Self {
        Self {
            value_type,
            ragged: true,
            default: None,
        }
    }

    /// Value used when a row omits this column
    pub fn with_default(mut self, default: CellValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_ragged(&self) -> bool {
        self.ragged
    }

    pub fn default_value(&self) -> Option<&CellValue> {
        self.default.as_ref()
    }

    /// Check that `value` fits this column
    pub fn check(&self, column: &str, value: &CellValue) -> StoreResult<()> {
        let fits = if self.ragged {
            match value {
                CellValue::List(items) => items.iter().all(|item| self.value_type.accepts(item)),
                _ => false,
            }
        } else {
            self.value_type.accepts(value)
        };
        if fits {
            Ok(())
        } else {
            Err(StoreError::InvalidValue {
                column: column.to_string(),
                reason: format!(
                    "expected {}{}, got {}",
                    if self.ragged { "list of " } else { "" },
                    self.value_type,
                    value.type_name()
                ),
            })
        }
    }
}
