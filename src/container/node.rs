//! In-memory tree of a container file: groups, datasets and attributes

use crate::reference::ObjectReference;
use crate::types::ElementType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Float encoding that survives JSON: finite values stay numbers, while
/// NaN and the infinities are written as the strings `NaN`, `inf`, `-inf`.
mod float_repr {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INF } else { NEG_INF })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl Visitor<'_> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a number or one of \"{}\", \"{}\", \"{}\"", NAN, INF, NEG_INF)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

/// Attribute value attached to a group or dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    TextList(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::TextList(items) => Some(items),
            _ => None,
        }
    }
}

/// One element of a dataset record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Int(i64),
    UInt(u64),
    Float(#[serde(with = "float_repr")] f64),
    Text(String),
    ObjectRef(ObjectReference),
}

impl Element {
    /// Element type tag of this value
    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Int(_) => ElementType::Int64,
            Element::UInt(_) => ElementType::UInt64,
            Element::Float(_) => ElementType::Float64,
            Element::Text(_) => ElementType::Text,
            Element::ObjectRef(_) => ElementType::ObjectRef,
        }
    }

    /// Read a non-negative integer from either integer flavour
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Element::UInt(v) => Some(*v),
            Element::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }
}

/// Named, typed field of a dataset's record layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: ElementType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ElementType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A dataset of `rows.len()` records, each laid out per `dtype`
///
/// A one-field dtype is a plain 1-D array; more fields form a compound record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    pub dtype: Vec<Field>,
    pub rows: Vec<Vec<Element>>,
}

impl Dataset {
    /// Field name used for single-field datasets
    pub const VALUE_FIELD: &'static str = "value";

    pub fn new(dtype: Vec<Field>, rows: Vec<Vec<Element>>) -> Self {
        Self {
            attrs: BTreeMap::new(),
            dtype,
            rows,
        }
    }

    /// Single-field dataset of one element type
    pub fn scalar(ty: ElementType, values: Vec<Element>) -> Self {
        Self::new(
            vec![Field::new(Self::VALUE_FIELD, ty)],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    pub fn from_floats(values: &[f64]) -> Self {
        Self::scalar(
            ElementType::Float64,
            values.iter().map(|v| Element::Float(*v)).collect(),
        )
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    /// Element types of the record layout, in field order
    pub fn field_types(&self) -> Vec<ElementType> {
        self.dtype.iter().map(|f| f.ty).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row that does not match the declared layout, with the reason
    pub fn find_malformed_row(&self) -> Option<(usize, String)> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.dtype.len() {
                return Some((
                    i,
                    format!("{} elements for {} fields", row.len(), self.dtype.len()),
                ));
            }
            for (element, field) in row.iter().zip(&self.dtype) {
                if element.element_type() != field.ty {
                    return Some((
                        i,
                        format!(
                            "field {} holds {} instead of {}",
                            field.name,
                            element.element_type(),
                            field.ty
                        ),
                    ));
                }
            }
        }
        None
    }
}

/// A group: attributes plus named child groups and datasets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    #[serde(default)]
    pub datasets: BTreeMap<String, Dataset>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descendant group at a `/`-separated path relative to this one
    pub fn find(&self, path: &str) -> Option<&Group> {
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(self, |group, name| group.groups.get(name))
    }

    /// Visit every group below this one with its absolute path
    pub fn walk<'a>(&'a self, prefix: &str, visit: &mut dyn FnMut(&str, &'a Group)) {
        for (name, child) in &self.groups {
            let path = format!("{}/{}", prefix, name);
            visit(&path, child);
            child.walk(&path, visit);
        }
    }
}
