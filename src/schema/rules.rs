//! Column kinds and the versioned compatibility rule set

use crate::container::Dataset;
use crate::schema::type_tag::{
    ELEMENT_IDENTIFIERS, REFERENCE_VECTOR_DATA, VECTOR_DATA, VECTOR_INDEX,
};
use crate::types::{CURRENT_FORMAT_VERSION, ElementType, FormatVersion, REFERENCE_COLUMN_INTRODUCED};
use std::fmt;

/// In-memory column implementation chosen for a persisted dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Untyped column: scalars or verbatim compound records
    Generic,
    /// Offsets of a ragged column
    Index,
    /// Range references into time series
    Reference,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Generic => write!(f, "generic"),
            ColumnKind::Index => write!(f, "index"),
            ColumnKind::Reference => write!(f, "reference"),
        }
    }
}

/// Layout facts about a dataset, enough to pick a column kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeHint {
    /// Dataset name, for error reporting
    pub dataset: String,
    pub rows: usize,
    pub fields: Vec<ElementType>,
}

impl ShapeHint {
    pub fn new(dataset: impl Into<String>, rows: usize, fields: Vec<ElementType>) -> Self {
        Self {
            dataset: dataset.into(),
            rows,
            fields,
        }
    }

    pub fn of_dataset(name: &str, dataset: &Dataset) -> Self {
        Self::new(name, dataset.len(), dataset.field_types())
    }
}

/// Outcome of checking a shape against a layout pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutMatch {
    Exact,
    /// Close enough to be suspicious, not close enough to act on
    Partial(String),
    Mismatch(String),
}

/// Structural pattern a dataset must have for a column kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPattern {
    /// `(N, 3)` records `[int, int, object-ref]`
    ReferenceTriple,
    /// `(N,)` non-negative integers
    Offsets,
}

impl LayoutPattern {
    pub fn check(&self, shape: &ShapeHint) -> LayoutMatch {
        let fields = &shape.fields;
        match self {
            LayoutPattern::ReferenceTriple => {
                if fields.len() == 3
                    && fields[0].is_integer()
                    && fields[1].is_integer()
                    && fields[2] == ElementType::ObjectRef
                {
                    LayoutMatch::Exact
                } else if fields.len() == 3 && fields[2] == ElementType::ObjectRef {
                    LayoutMatch::Partial(format!(
                        "third field is an object reference but leading fields are {} and {}",
                        fields[0], fields[1]
                    ))
                } else {
                    LayoutMatch::Mismatch(format!(
                        "expected [int, int, object-ref] records, found {}",
                        describe(fields)
                    ))
                }
            }
            LayoutPattern::Offsets => {
                if fields.len() == 1 && fields[0].is_integer() {
                    LayoutMatch::Exact
                } else {
                    LayoutMatch::Mismatch(format!(
                        "expected one integer field, found {}",
                        describe(fields)
                    ))
                }
            }
        }
    }
}

fn describe(fields: &[ElementType]) -> String {
    let names: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    format!("{} field(s) [{}]", fields.len(), names.join(", "))
}

/// A type name the reader knows natively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownType {
    pub name: String,
    pub kind: ColumnKind,
    /// Layout the dataset must have; `None` accepts anything
    pub layout: Option<LayoutPattern>,
}

/// Reinterpret a generic legacy tag as a specialised kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatRule {
    /// Tag name written by older format versions
    pub legacy_name: String,
    pub promoted: ColumnKind,
    /// First version that writes the specialised tag; older files get promoted
    pub introduced_in: FormatVersion,
    pub pattern: LayoutPattern,
}

/// Immutable set of known types and legacy promotion rules
///
/// Built once and handed to the resolver; `rules_version` is the newest
/// format version the set knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatRules {
    rules_version: FormatVersion,
    known: Vec<KnownType>,
    rules: Vec<CompatRule>,
}

impl CompatRules {
    pub fn new(rules_version: FormatVersion, known: Vec<KnownType>, rules: Vec<CompatRule>) -> Self {
        Self {
            rules_version,
            known,
            rules,
        }
    }

    /// Types and rules of the current format version
    pub fn standard() -> Self {
        let known = |name: &str, kind, layout| KnownType {
            name: name.to_string(),
            kind,
            layout,
        };
        Self::new(
            CURRENT_FORMAT_VERSION,
            vec![
                known(VECTOR_DATA, ColumnKind::Generic, None),
                known(ELEMENT_IDENTIFIERS, ColumnKind::Generic, None),
                known(VECTOR_INDEX, ColumnKind::Index, Some(LayoutPattern::Offsets)),
                known(
                    REFERENCE_VECTOR_DATA,
                    ColumnKind::Reference,
                    Some(LayoutPattern::ReferenceTriple),
                ),
            ],
            vec![CompatRule {
                legacy_name: VECTOR_DATA.to_string(),
                promoted: ColumnKind::Reference,
                introduced_in: REFERENCE_COLUMN_INTRODUCED,
                pattern: LayoutPattern::ReferenceTriple,
            }],
        )
    }

    pub fn rules_version(&self) -> FormatVersion {
        self.rules_version
    }

    pub fn known_type(&self, name: &str) -> Option<&KnownType> {
        self.known.iter().find(|k| k.name == name)
    }

    /// Promotion rules that apply to a tag name, in declaration order
    pub fn rules_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CompatRule> + 'a {
        self.rules.iter().filter(move |r| r.legacy_name == name)
    }
}

impl Default for CompatRules {
    fn default() -> Self {
        Self::standard()
    }
}
