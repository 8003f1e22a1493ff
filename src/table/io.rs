//! Reading and writing tables through a container
//!
//! Layout of a table group:
//! - attrs: type tag, `description`, `colnames` (column order)
//! - `id`: row identifiers
//! - one dataset per column, tagged with its kind
//! - `<column>_index`: end offsets of a ragged column

use crate::container::{AttrValue, ContainerError, ContainerIo, Dataset, Element, Group};
use crate::schema::{ColumnKind, ColumnTypeResolver, ShapeHint, TypeTag};
use crate::table::column::{Column, ColumnData, RaggedColumn};
use crate::table::reference_column::ReferenceColumn;
use crate::table::table::{ColumnSlot, DynamicTable, ID_COLUMN};
use crate::types::{ElementType, FormatVersion, NAMESPACE_ATTR, StoreError, StoreResult, TYPE_NAME_ATTR};
use linked_hash_map::LinkedHashMap;

pub const DESCRIPTION_ATTR: &str = "description";
pub const COLNAMES_ATTR: &str = "colnames";
/// Attribute of an index dataset naming the column it indexes
pub const TARGET_ATTR: &str = "target";
pub const INDEX_SUFFIX: &str = "_index";

fn tagged(mut dataset: Dataset, tag: &TypeTag, description: &str) -> Dataset {
    tag.write_attrs(&mut dataset.attrs);
    dataset.with_attr(DESCRIPTION_ATTR, AttrValue::Text(description.to_string()))
}

/// Persist `table` as the group at `path`
///
/// A table that is still being built is finalized first. Columns are
/// written with the tag of their in-memory kind, so a promoted legacy
/// column is written back in the current encoding.
pub fn write_table<C: ContainerIo + ?Sized>(
    container: &mut C,
    path: &str,
    table: &mut DynamicTable,
) -> StoreResult<()> {
    table.finalize();

    // Collect first so a faulted column aborts before anything is written
    let mut datasets = Vec::new();
    for (name, slot) in table.slots() {
        let column = match slot {
            ColumnSlot::Ready(column) => column,
            ColumnSlot::Faulted { reason } => {
                return Err(StoreError::SchemaMismatch {
                    column: name.clone(),
                    reason: reason.clone(),
                });
            }
        };
        let (values, index) = column.data().to_datasets();
        datasets.push((
            name.clone(),
            tagged(values, &column.data().type_tag(), column.description()),
        ));
        if let Some(index) = index {
            let index = tagged(
                index,
                &TypeTag::vector_index(),
                &format!("index for column {}", name),
            )
            .with_attr(TARGET_ATTR, AttrValue::Text(name.clone()));
            datasets.push((format!("{}{}", name, INDEX_SUFFIX), index));
        }
    }

    container.create_group(path)?;
    let tag = table.tag();
    container.set_attribute(path, TYPE_NAME_ATTR, AttrValue::Text(tag.name.clone()))?;
    container.set_attribute(path, NAMESPACE_ATTR, AttrValue::Text(tag.namespace.clone()))?;
    container.set_attribute(
        path,
        DESCRIPTION_ATTR,
        AttrValue::Text(table.description().to_string()),
    )?;
    container.set_attribute(
        path,
        COLNAMES_ATTR,
        AttrValue::TextList(table.column_names().iter().map(|s| s.to_string()).collect()),
    )?;

    let ids = Dataset::scalar(
        ElementType::Int64,
        table.ids().iter().map(|id| Element::Int(*id)).collect(),
    );
    container.write_dataset(
        &format!("{}/{}", path, ID_COLUMN),
        tagged(ids, &TypeTag::element_identifiers(), "row identifiers"),
    )?;
    for (name, dataset) in datasets {
        container.write_dataset(&format!("{}/{}", path, name), dataset)?;
    }

    log::debug!(
        "wrote table {} to {} ({} rows, {} columns)",
        table.name(),
        path,
        table.row_count(),
        table.column_count()
    );
    Ok(())
}

/// Load the table stored at `path`
///
/// The container is only read. A column whose dataset cannot be
/// interpreted is kept as a fault and reported when it is accessed; the
/// other columns stay usable.
pub fn read_table<C: ContainerIo + ?Sized>(
    container: &C,
    path: &str,
    resolver: &ColumnTypeResolver,
) -> StoreResult<DynamicTable> {
    let version = match container.format_version() {
        Ok(version) => version,
        Err(ContainerError::ParseError(reason)) => {
            log::warn!("unreadable format version ({}), reading {} as unversioned", reason, path);
            None
        }
        Err(err) => return Err(err.into()),
    };
    let group = container.group(path)?;
    let name = path
        .rsplit('/')
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string();
    let tag = TypeTag::of_group(group)
        .unwrap_or_else(TypeTag::dynamic_table)
        .with_origin(version);
    let description = group
        .attrs
        .get(DESCRIPTION_ATTR)
        .and_then(AttrValue::as_str)
        .unwrap_or_default()
        .to_string();

    let ids = read_ids(group)?;
    let mut columns = LinkedHashMap::new();
    for column in column_names(group) {
        let slot = match read_column(group, &column, version, resolver, ids.len()) {
            Ok(column) => ColumnSlot::Ready(column),
            Err(StoreError::SchemaMismatch { reason, .. }) => {
                log::warn!("column {} of {} could not be loaded: {}", column, path, reason);
                ColumnSlot::Faulted { reason }
            }
            Err(err) => return Err(err),
        };
        columns.insert(column, slot);
    }

    Ok(DynamicTable::loaded(name, description, tag, columns, ids))
}

/// Column names in stored order; without `colnames`, every non-index dataset
fn column_names(group: &Group) -> Vec<String> {
    if let Some(names) = group.attrs.get(COLNAMES_ATTR).and_then(AttrValue::as_text_list) {
        return names.to_vec();
    }
    let indexed = |name: &str| {
        name.strip_suffix(INDEX_SUFFIX)
            .is_some_and(|target| group.datasets.contains_key(target))
    };
    group
        .datasets
        .keys()
        .filter(|name| name.as_str() != ID_COLUMN && !indexed(name.as_str()))
        .cloned()
        .collect()
}

fn read_ids(group: &Group) -> StoreResult<Vec<i64>> {
    let Some(dataset) = group.datasets.get(ID_COLUMN) else {
        return Ok(Vec::new());
    };
    dataset
        .rows
        .iter()
        .map(|row| match row.as_slice() {
            [Element::Int(id)] => Ok(*id),
            [Element::UInt(id)] => i64::try_from(*id)
                .map_err(|_| StoreError::ParseError(format!("row id {} out of range", id))),
            _ => Err(StoreError::ParseError("malformed row id".to_string())),
        })
        .collect()
}

fn read_column(
    group: &Group,
    name: &str,
    version: Option<FormatVersion>,
    resolver: &ColumnTypeResolver,
    rows: usize,
) -> StoreResult<Column> {
    let mismatch = |reason: String| StoreError::SchemaMismatch {
        column: name.to_string(),
        reason,
    };
    let dataset = group
        .datasets
        .get(name)
        .ok_or_else(|| mismatch("dataset is missing".to_string()))?;
    if let Some((row, reason)) = dataset.find_malformed_row() {
        return Err(mismatch(format!("row {}: {}", row, reason)));
    }

    let tag = TypeTag::from_attrs(&dataset.attrs)
        .unwrap_or_else(TypeTag::vector_data)
        .with_origin(version);
    let description = dataset
        .attrs
        .get(DESCRIPTION_ATTR)
        .and_then(AttrValue::as_str)
        .unwrap_or_default()
        .to_string();

    let resolution = resolver.resolve(&tag, version, &ShapeHint::of_dataset(name, dataset))?;
    let values = match resolution.kind {
        ColumnKind::Reference => ColumnData::Reference(ReferenceColumn::from_dataset(name, dataset)?),
        ColumnKind::Generic => generic_data(name, dataset)?,
        ColumnKind::Index => {
            return Err(mismatch(format!("{} is an index, not a column", tag.name)));
        }
    };

    let index_name = format!("{}{}", name, INDEX_SUFFIX);
    let data = match group.datasets.get(&index_name) {
        Some(index) => {
            let index_tag = TypeTag::from_attrs(&index.attrs)
                .unwrap_or_else(TypeTag::vector_index)
                .with_origin(version);
            let index_kind = resolver
                .resolve(&index_tag, version, &ShapeHint::of_dataset(&index_name, index))?
                .kind;
            if index_kind != ColumnKind::Index {
                return Err(mismatch(format!(
                    "{} is tagged {} instead of an index",
                    index_name, index_tag.name
                )));
            }
            ColumnData::Ragged(RaggedColumn::from_parts(name, offsets(name, index)?, values)?)
        }
        None => values,
    };

    if data.len() != rows {
        return Err(mismatch(format!("{} rows, table has {}", data.len(), rows)));
    }
    Ok(Column::loaded(
        name.to_string(),
        description,
        tag,
        resolution.note,
        data,
    ))
}

fn offsets(column: &str, index: &Dataset) -> StoreResult<Vec<u64>> {
    index
        .rows
        .iter()
        .map(|row| {
            row.first()
                .and_then(Element::as_u64)
                .ok_or_else(|| StoreError::SchemaMismatch {
                    column: column.to_string(),
                    reason: "index holds a negative or non-integer offset".to_string(),
                })
        })
        .collect()
}

/// Untyped columns: plain arrays by element type, compound datasets verbatim
fn generic_data(column: &str, dataset: &Dataset) -> StoreResult<ColumnData> {
    let values = || dataset.rows.iter().filter_map(|row| row.first());
    let data = match dataset.field_types().as_slice() {
        [ElementType::Float64] => ColumnData::Float(
            values()
                .filter_map(|e| match e {
                    Element::Float(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        [ElementType::Int64] => ColumnData::Int(
            values()
                .filter_map(|e| match e {
                    Element::Int(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
        [ElementType::UInt64] => ColumnData::UInt(values().filter_map(Element::as_u64).collect()),
        [ElementType::Text] => ColumnData::Text(
            values()
                .filter_map(|e| match e {
                    Element::Text(v) => Some(v.clone()),
                    _ => None,
                })
                .collect(),
        ),
        [] => {
            return Err(StoreError::SchemaMismatch {
                column: column.to_string(),
                reason: "dataset declares no fields".to_string(),
            });
        }
        _ => ColumnData::Record {
            fields: dataset.dtype.clone(),
            rows: dataset.rows.clone(),
        },
    };
    Ok(data)
}
