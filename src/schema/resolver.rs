//! Read-time column type resolution
//!
//! `ColumnTypeResolver::resolve` is a pure function of (tag, file version,
//! shape) over an immutable rule set. It never touches the file: a legacy
//! tag is reinterpreted in memory only, so re-reading a file is idempotent.

use crate::schema::rules::{ColumnKind, CompatRules, LayoutMatch, ShapeHint};
use crate::schema::type_tag::TypeTag;
use crate::types::{FormatVersion, StoreError, StoreResult};

/// Why a resolution differs from reading the tag at face value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionNote {
    /// A legacy tag was promoted to a specialised kind
    Promoted {
        from: String,
        file_version: FormatVersion,
    },
    /// The dataset resembles a specialised kind but was left generic
    Ambiguous(String),
}

/// Chosen column kind plus how it was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: ColumnKind,
    pub note: Option<ResolutionNote>,
}

impl Resolution {
    fn direct(kind: ColumnKind) -> Self {
        Self { kind, note: None }
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self.note, Some(ResolutionNote::Promoted { .. }))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.note, Some(ResolutionNote::Ambiguous(_)))
    }
}

/// Picks the column implementation for a persisted dataset
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeResolver {
    rules: CompatRules,
}

impl ColumnTypeResolver {
    pub fn new(rules: CompatRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CompatRules {
        &self.rules
    }

    /// Resolve the column kind of one dataset
    ///
    /// # Arguments
    /// * `tag` - Type tag read from the dataset's attributes
    /// * `file_version` - Format version of the file, `None` when unversioned
    /// * `shape` - Element layout of the dataset
    ///
    /// # Returns
    /// * `Err(StoreError::SchemaMismatch)` if the tag names a specialised kind
    ///   whose layout the dataset does not have
    /// * otherwise a kind; unknown tags and failed legacy detection give `Generic`
    pub fn resolve(
        &self,
        tag: &TypeTag,
        file_version: Option<FormatVersion>,
        shape: &ShapeHint,
    ) -> StoreResult<Resolution> {
        if let Some(known) = self.rules.known_type(&tag.name) {
            if let Some(layout) = known.layout {
                match layout.check(shape) {
                    LayoutMatch::Exact => {}
                    LayoutMatch::Partial(reason) | LayoutMatch::Mismatch(reason) => {
                        return Err(StoreError::SchemaMismatch {
                            column: shape.dataset.clone(),
                            reason: format!("declared {}: {}", tag.name, reason),
                        });
                    }
                }
            }
            if known.kind != ColumnKind::Generic {
                return Ok(Resolution::direct(known.kind));
            }
        } else {
            log::debug!(
                "unknown type {} on {} (file {}, rules {}), reading as generic",
                tag,
                shape.dataset,
                display_version(file_version),
                self.rules.rules_version()
            );
        }

        for rule in self.rules.rules_for(&tag.name) {
            match rule.pattern.check(shape) {
                LayoutMatch::Mismatch(_) => continue,
                LayoutMatch::Partial(reason) => {
                    return Ok(self.ambiguous(
                        shape,
                        format!("{} looks like a {} column: {}", tag.name, rule.promoted, reason),
                    ));
                }
                LayoutMatch::Exact => match file_version {
                    Some(version) if version < rule.introduced_in => {
                        log::debug!(
                            "promoting {} column {} to {} (file version {})",
                            tag.name,
                            shape.dataset,
                            rule.promoted,
                            version
                        );
                        return Ok(Resolution {
                            kind: rule.promoted,
                            note: Some(ResolutionNote::Promoted {
                                from: tag.name.clone(),
                                file_version: version,
                            }),
                        });
                    }
                    Some(version) => {
                        return Ok(self.ambiguous(
                            shape,
                            format!(
                                "{} has the {} layout but file version {} is not older than {}",
                                tag.name, rule.promoted, version, rule.introduced_in
                            ),
                        ));
                    }
                    None => {
                        return Ok(self.ambiguous(
                            shape,
                            format!(
                                "{} has the {} layout but the file declares no format version",
                                tag.name, rule.promoted
                            ),
                        ));
                    }
                },
            }
        }

        Ok(Resolution::direct(ColumnKind::Generic))
    }

    fn ambiguous(&self, shape: &ShapeHint, reason: String) -> Resolution {
        log::warn!("column {}: {}; reading as generic", shape.dataset, reason);
        Resolution {
            kind: ColumnKind::Generic,
            note: Some(ResolutionNote::Ambiguous(reason)),
        }
    }
}

fn display_version(version: Option<FormatVersion>) -> String {
    version.map_or_else(|| "unversioned".to_string(), |v| v.to_string())
}
