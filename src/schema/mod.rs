//! Schema module: persisted type tags and read-time column type resolution

pub mod resolver;
pub mod rules;
pub mod type_tag;

pub use resolver::{ColumnTypeResolver, Resolution, ResolutionNote};
pub use rules::{ColumnKind, CompatRule, CompatRules, KnownType, LayoutMatch, LayoutPattern, ShapeHint};
pub use type_tag::TypeTag;
