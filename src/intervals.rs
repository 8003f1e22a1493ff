//! Epoch table: time intervals with tags and time series ranges
//!
//! Every interval has a start and stop time. The `tags` and `timeseries`
//! columns are added the first time an interval uses them; the ranges of
//! the `timeseries` column are computed from the interval bounds.

use crate::container::ContainerIo;
use crate::reference::RangeReference;
use crate::schema::{ColumnTypeResolver, TypeTag};
use crate::table::{CellValue, ColumnDef, DynamicTable, ValueType, read_table, write_table};
use crate::timeseries::TimeSeries;
use crate::types::{RowIndex, StoreError, StoreResult};

pub const START_TIME: &str = "start_time";
pub const STOP_TIME: &str = "stop_time";
pub const TAGS: &str = "tags";
pub const TIMESERIES: &str = "timeseries";

/// One interval to append
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    start_time: f64,
    stop_time: f64,
    tags: Vec<String>,
    timeseries: Vec<RangeReference>,
    values: Vec<(String, CellValue)>,
}

impl Interval {
    pub fn new(start_time: f64, stop_time: f64) -> Self {
        Self {
            start_time,
            stop_time,
            tags: Vec::new(),
            timeseries: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Reference the samples of `series` that fall inside this interval
    pub fn timeseries(mut self, series: &TimeSeries) -> Self {
        let (start, count) = series.index_range(self.start_time, self.stop_time);
        self.timeseries
            .push(RangeReference::new(start, count, series.object_id().clone()));
        self
    }

    /// Value for a custom column
    pub fn value(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    pub fn references(&self) -> &[RangeReference] {
        &self.timeseries
    }
}

/// Table of time intervals
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIntervals {
    table: DynamicTable,
}

impl TimeIntervals {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> StoreResult<Self> {
        let mut table = DynamicTable::new(name, description).with_tag(TypeTag::time_intervals());
        table.add_column(
            START_TIME,
            ColumnDef::scalar(ValueType::Float),
            "Start time of epoch, in seconds",
        )?;
        table.add_column(
            STOP_TIME,
            ColumnDef::scalar(ValueType::Float),
            "Stop time of epoch, in seconds",
        )?;
        Ok(Self { table })
    }

    /// Wrap a table that has the interval bounds columns
    pub fn from_table(table: DynamicTable) -> StoreResult<Self> {
        for required in [START_TIME, STOP_TIME] {
            let column = table.column(required).map_err(|err| match err {
                StoreError::UnknownColumn(_) => StoreError::SchemaMismatch {
                    column: required.to_string(),
                    reason: format!("table {} has no {} column", table.name(), required),
                },
                other => other,
            })?;
            if column.data().value_type() != ValueType::Float || column.data().is_ragged() {
                return Err(StoreError::SchemaMismatch {
                    column: required.to_string(),
                    reason: "interval bounds must be float scalars".to_string(),
                });
            }
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    pub fn into_table(self) -> DynamicTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Declare a custom column
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        definition: ColumnDef,
        description: impl Into<String>,
    ) -> StoreResult<()> {
        self.table.add_column(name, definition, description)
    }

    /// Append an interval and return its row index
    pub fn add_interval(&mut self, interval: Interval) -> StoreResult<RowIndex> {
        if interval.start_time.is_nan()
            || interval.stop_time.is_nan()
            || interval.stop_time < interval.start_time
        {
            return Err(StoreError::InvalidArgument(format!(
                "interval stops at {} before it starts at {}",
                interval.stop_time, interval.start_time
            )));
        }

        let mut values = vec![
            (START_TIME.to_string(), CellValue::Float(interval.start_time)),
            (STOP_TIME.to_string(), CellValue::Float(interval.stop_time)),
        ];
        let mut added = Vec::new();
        if !interval.tags.is_empty() {
            self.ensure_list_column(TAGS, ValueType::Text, "user-defined tags", &mut added)?;
            values.push((TAGS.to_string(), CellValue::text_list(interval.tags)));
        }
        if !interval.timeseries.is_empty() {
            self.ensure_list_column(
                TIMESERIES,
                ValueType::Reference,
                "index into a TimeSeries object",
                &mut added,
            )?;
            values.push((
                TIMESERIES.to_string(),
                CellValue::reference_list(interval.timeseries),
            ));
        }
        values.extend(interval.values);

        self.table.add_row(values).inspect_err(|_| {
            for name in added {
                self.table.remove_new_column(name);
            }
        })
    }

    fn ensure_list_column(
        &mut self,
        name: &'static str,
        value_type: ValueType,
        description: &str,
        added: &mut Vec<&'static str>,
    ) -> StoreResult<()> {
        if self.table.has_column(name) {
            return Ok(());
        }
        self.table.add_column(
            name,
            ColumnDef::ragged(value_type).with_default(CellValue::List(Vec::new())),
            description,
        )?;
        added.push(name);
        Ok(())
    }

    /// Persist as the group at `path`
    pub fn write<C: ContainerIo + ?Sized>(&mut self, container: &mut C, path: &str) -> StoreResult<()> {
        write_table(container, path, &mut self.table)
    }

    /// Load the intervals stored at `path`
    pub fn read<C: ContainerIo + ?Sized>(
        container: &C,
        path: &str,
        resolver: &ColumnTypeResolver,
    ) -> StoreResult<Self> {
        Self::from_table(read_table(container, path, resolver)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{AttrValue, MemoryContainer};
    use crate::schema::ColumnKind;
    use crate::types::{FormatVersion, TYPE_NAME_ATTR};

    const EPOCHS: &str = "/intervals/epochs";

    fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        let step = (stop - start) / (n - 1) as f64;
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn series() -> (TimeSeries, TimeSeries) {
        let a = TimeSeries::with_timestamps(
            "a",
            "flubs",
            (0..11).map(|i| i as f64).collect(),
            (0..11).map(|i| i as f64 / 10.0).collect(),
        )
        .unwrap();
        let b = TimeSeries::with_timestamps(
            "b",
            "flubs",
            (0..13).map(|i| i as f64).collect(),
            linspace(0.1, 2.0, 13),
        )
        .unwrap();
        (a, b)
    }

    fn epochs(a: &TimeSeries, b: &TimeSeries) -> TimeIntervals {
        let mut epochs = TimeIntervals::new("epochs", "experimental epochs").unwrap();
        epochs
            .add_column("temperature", ColumnDef::scalar(ValueType::Float), "average temperature (C)")
            .unwrap();
        epochs
            .add_interval(
                Interval::new(0.0, 0.5)
                    .tags(["ambient"])
                    .timeseries(a)
                    .timeseries(b)
                    .value("temperature", 26.4),
            )
            .unwrap();
        epochs
            .add_interval(
                Interval::new(1.3, 4.1)
                    .tags(["ambient", "hot"])
                    .timeseries(a)
                    .value("temperature", 30.1),
            )
            .unwrap();
        epochs
    }

    #[test]
    fn test_column_order() {
        let (a, b) = series();
        let epochs = epochs(&a, &b);
        assert_eq!(
            epochs.table().column_names(),
            ["start_time", "stop_time", "temperature", "tags", "timeseries"]
        );
        assert_eq!(epochs.table().tag(), &TypeTag::time_intervals());
        assert_eq!(epochs.len(), 2);
    }

    #[test]
    fn test_ranges_follow_interval_bounds() {
        let (a, b) = series();
        let interval = Interval::new(0.0, 0.5).timeseries(&a).timeseries(&b);
        assert_eq!(
            interval.references(),
            &[
                RangeReference::new(0, 5, a.object_id().clone()),
                RangeReference::new(0, 3, b.object_id().clone()),
            ]
        );

        let late = Interval::new(1.3, 4.1).timeseries(&a);
        assert_eq!(late.references()[0], RangeReference::new(11, 0, a.object_id().clone()));
    }

    #[test]
    fn test_missing_custom_value_fails_atomically() {
        let (a, b) = series();
        let mut epochs = epochs(&a, &b);
        let result = epochs.add_interval(Interval::new(5.0, 6.0).tags(["x"]));
        assert!(matches!(result, Err(StoreError::MissingColumn(name)) if name == "temperature"));
        assert_eq!(epochs.len(), 2);
        for name in epochs.table().column_names() {
            assert_eq!(epochs.table().column(name).unwrap().len(), 2, "column {}", name);
        }

        let result = epochs.add_interval(
            Interval::new(5.0, 6.0)
                .value("temperature", 20.0)
                .value("humidity", 0.4),
        );
        assert!(matches!(result, Err(StoreError::UnknownColumn(name)) if name == "humidity"));
        assert_eq!(epochs.len(), 2);
        assert_eq!(epochs.table().ids().len(), 2);
        for name in epochs.table().column_names() {
            assert_eq!(epochs.table().column(name).unwrap().len(), 2, "column {}", name);
        }
    }

    #[test]
    fn test_failed_interval_does_not_leave_new_columns() {
        let (a, _) = series();
        let mut epochs = TimeIntervals::new("epochs", "").unwrap();
        epochs
            .add_column("temperature", ColumnDef::scalar(ValueType::Float), "")
            .unwrap();
        let result = epochs.add_interval(Interval::new(0.0, 1.0).tags(["x"]).timeseries(&a));
        assert!(result.is_err());
        assert_eq!(
            epochs.table().column_names(),
            ["start_time", "stop_time", "temperature"]
        );
    }

    #[test]
    fn test_rejects_reversed_interval() {
        let mut epochs = TimeIntervals::new("epochs", "").unwrap();
        assert!(matches!(
            epochs.add_interval(Interval::new(2.0, 1.0)),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(epochs.add_interval(Interval::new(f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn test_late_columns_backfill_earlier_rows() {
        let (a, _) = series();
        let mut epochs = TimeIntervals::new("epochs", "").unwrap();
        epochs.add_interval(Interval::new(0.0, 1.0)).unwrap();
        epochs
            .add_interval(Interval::new(0.0, 0.2).timeseries(&a))
            .unwrap();

        let first = epochs.table().get_row(0).unwrap();
        assert_eq!(first.get(TIMESERIES), Some(&CellValue::List(vec![])));
        let second = epochs.table().get_row(1).unwrap();
        assert_eq!(
            second.get(TIMESERIES),
            Some(&CellValue::reference_list([RangeReference::new(
                0,
                2,
                a.object_id().clone()
            )]))
        );
        assert!(!epochs.table().has_column(TAGS));
    }

    #[test]
    fn test_write_and_read() {
        let (a, b) = series();
        let mut container = MemoryContainer::new();
        a.write(&mut container, "/acquisition/a").unwrap();
        b.write(&mut container, "/acquisition/b").unwrap();
        let mut epochs = epochs(&a, &b);
        epochs.write(&mut container, EPOCHS).unwrap();

        let loaded = TimeIntervals::read(&container, EPOCHS, &ColumnTypeResolver::default()).unwrap();
        assert_eq!(loaded.table().column_names(), epochs.table().column_names());
        assert_eq!(loaded.table().tag().name, "TimeIntervals");

        let row = loaded.table().get_row(1).unwrap();
        assert_eq!(row.get("temperature"), Some(&CellValue::Float(30.1)));
        assert_eq!(row.get(TAGS), Some(&CellValue::text_list(["ambient", "hot"])));

        let results = loaded
            .table()
            .resolve_references(0, TIMESERIES, &container)
            .unwrap();
        let names: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().handle.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_read_legacy_epochs() {
        let (a, b) = series();
        let mut container = MemoryContainer::with_version(FormatVersion::new(2, 3, 0));
        a.write(&mut container, "/acquisition/a").unwrap();
        b.write(&mut container, "/acquisition/b").unwrap();
        epochs(&a, &b).write(&mut container, EPOCHS).unwrap();
        container
            .set_attribute(
                &format!("{}/{}", EPOCHS, TIMESERIES),
                TYPE_NAME_ATTR,
                AttrValue::Text("VectorData".to_string()),
            )
            .unwrap();

        let loaded = TimeIntervals::read(&container, EPOCHS, &ColumnTypeResolver::default()).unwrap();
        let column = loaded.table().column(TIMESERIES).unwrap();
        assert_eq!(column.kind(), ColumnKind::Reference);
        assert_eq!(
            column.get(0).unwrap(),
            CellValue::reference_list([
                RangeReference::new(0, 5, a.object_id().clone()),
                RangeReference::new(0, 3, b.object_id().clone()),
            ])
        );
    }

    #[test]
    fn test_from_table_requires_bounds() {
        let table = DynamicTable::new("plain", "");
        assert!(matches!(
            TimeIntervals::from_table(table),
            Err(StoreError::SchemaMismatch { column, .. }) if column == START_TIME
        ));
    }
}
