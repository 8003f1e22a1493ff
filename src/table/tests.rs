// Table module tests

#[cfg(test)]
mod table_tests {
    use crate::container::{
        AttrValue, ContainerIo, Dataset, Element, Field, FileContainer, MemoryContainer, OpenMode,
    };
    use crate::reference::{ObjectReference, RangeReference};
    use crate::schema::{ColumnKind, ColumnTypeResolver, ResolutionNote, TypeTag};
    use crate::table::{
        CellValue, ColumnDef, DynamicTable, TableBuilder, TableState, ValueType, read_table,
        write_table,
    };
    use crate::timeseries::TimeSeries;
    use crate::types::{
        ElementType, FormatVersion, NAMESPACE_ATTR, StoreConfig, StoreError, TYPE_NAME_ATTR,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    const TABLE: &str = "/intervals/epochs";

    fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        let step = (stop - start) / (n - 1) as f64;
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn series_a() -> TimeSeries {
        TimeSeries::with_timestamps(
            "a",
            "flubs",
            (0..11).map(|i| i as f64).collect(),
            (0..11).map(|i| i as f64 / 10.0).collect(),
        )
        .unwrap()
    }

    fn series_b() -> TimeSeries {
        TimeSeries::with_timestamps(
            "b",
            "flubs",
            (0..13).map(|i| i as f64).collect(),
            linspace(0.1, 2.0, 13),
        )
        .unwrap()
    }

    fn epoch_table() -> DynamicTable {
        TableBuilder::new("epochs")
            .description("experimental epochs")
            .column("start_time", ColumnDef::scalar(ValueType::Float), "start")
            .column("stop_time", ColumnDef::scalar(ValueType::Float), "stop")
            .column(
                "tags",
                ColumnDef::ragged(ValueType::Text).with_default(CellValue::List(vec![])),
                "labels",
            )
            .column(
                "timeseries",
                ColumnDef::ragged(ValueType::Reference).with_default(CellValue::List(vec![])),
                "referenced data",
            )
            .build()
            .unwrap()
    }

    /// A, B and a one-row table referencing (0,5,A) and (0,3,B)
    fn populate<C: ContainerIo + ?Sized>(container: &mut C) -> (ObjectReference, ObjectReference) {
        let a = series_a();
        let b = series_b();
        a.write(container, "/acquisition/a").unwrap();
        b.write(container, "/acquisition/b").unwrap();

        let mut table = epoch_table();
        table
            .add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(0.5)),
                ("tags", CellValue::text_list(["foo"])),
                (
                    "timeseries",
                    CellValue::reference_list([
                        RangeReference::new(0, 5, a.object_id().clone()),
                        RangeReference::new(0, 3, b.object_id().clone()),
                    ]),
                ),
            ])
            .unwrap();
        write_table(container, TABLE, &mut table).unwrap();
        assert_eq!(table.state(), TableState::Finalized);
        (a.object_id().clone(), b.object_id().clone())
    }

    fn write_file(dir: &TempDir, version: FormatVersion) -> (std::path::PathBuf, ObjectReference, ObjectReference) {
        let path = dir.path().join("session.ntbl");
        let config = StoreConfig {
            format_version: version,
            ..StoreConfig::default()
        };
        let mut file = FileContainer::create(&path, config).unwrap();
        let (a, b) = populate(&mut file);
        file.close().unwrap();
        (path, a, b)
    }

    /// Rewrite the reference column's tag the way pre-2.5 writers stored it
    fn make_legacy(path: &std::path::Path) {
        let mut file = FileContainer::open(path, OpenMode::Append, StoreConfig::default()).unwrap();
        let column = format!("{}/timeseries", TABLE);
        file.set_attribute(&column, TYPE_NAME_ATTR, AttrValue::Text("VectorData".to_string()))
            .unwrap();
        file.set_attribute(&column, NAMESPACE_ATTR, AttrValue::Text("hdmf-common".to_string()))
            .unwrap();
        file.close().unwrap();
    }

    #[test]
    fn test_add_column_and_row() {
        let mut table = DynamicTable::new("trials", "");
        table
            .add_column("start_time", ColumnDef::scalar(ValueType::Float), "")
            .unwrap();
        table
            .add_column("label", ColumnDef::scalar(ValueType::Text), "")
            .unwrap();

        let index = table
            .add_row([
                ("start_time", CellValue::Float(1.5)),
                ("label", CellValue::from("go")),
            ])
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(table.row_count(), 1);

        let row = table.get_row(0).unwrap();
        assert_eq!(row.id(), 0);
        assert_eq!(row.get("start_time"), Some(&CellValue::Float(1.5)));
        assert_eq!(row.get("label").and_then(CellValue::as_str), Some("go"));
        let names: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["start_time", "label"]);
    }

    #[test]
    fn test_column_errors() {
        let mut table = epoch_table();
        assert!(matches!(
            table.add_column("tags", ColumnDef::scalar(ValueType::Text), ""),
            Err(StoreError::DuplicateColumn(name)) if name == "tags"
        ));
        assert!(matches!(
            table.add_column("id", ColumnDef::scalar(ValueType::Int), ""),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            table.add_row([("start_time", CellValue::Float(0.0))]),
            Err(StoreError::MissingColumn(name)) if name == "stop_time"
        ));
        assert_eq!(table.row_count(), 0);
        for name in table.column_names() {
            assert_eq!(table.column(name).unwrap().len(), 0, "column {}", name);
        }
        assert!(matches!(
            table.add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(1.0)),
                ("bogus", CellValue::Int(1)),
            ]),
            Err(StoreError::UnknownColumn(name)) if name == "bogus"
        ));
        assert_eq!(table.row_count(), 0);
        assert!(table.ids().is_empty());
        for name in table.column_names() {
            assert_eq!(table.column(name).unwrap().len(), 0, "column {}", name);
        }
    }

    #[test]
    fn test_failed_add_row_leaves_table_unchanged() {
        let mut table = epoch_table();
        table
            .add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(1.0)),
            ])
            .unwrap();

        let bad_tags = CellValue::List(vec![CellValue::from("ok"), CellValue::Float(2.0)]);
        let result = table.add_row([
            ("start_time", CellValue::Float(1.0)),
            ("stop_time", CellValue::Float(2.0)),
            ("tags", bad_tags),
        ]);
        assert!(matches!(result, Err(StoreError::InvalidValue { column, .. }) if column == "tags"));

        assert_eq!(table.row_count(), 1);
        for name in table.column_names() {
            assert_eq!(table.column(name).unwrap().len(), 1, "column {}", name);
        }
    }

    #[test]
    fn test_add_column_to_populated_table_needs_default() {
        let mut table = epoch_table();
        for i in 0..3 {
            table
                .add_row([
                    ("start_time", CellValue::Float(i as f64)),
                    ("stop_time", CellValue::Float(i as f64 + 1.0)),
                ])
                .unwrap();
        }
        assert!(
            table
                .add_column("temperature", ColumnDef::scalar(ValueType::Float), "")
                .is_err()
        );
        table
            .add_column(
                "temperature",
                ColumnDef::scalar(ValueType::Float).with_default(CellValue::Float(f64::NAN)),
                "",
            )
            .unwrap();
        assert_eq!(table.column("temperature").unwrap().len(), 3);
        assert_eq!(
            table.column_names(),
            ["start_time", "stop_time", "tags", "timeseries", "temperature"]
        );
    }

    #[test]
    fn test_slice() {
        let mut table = epoch_table();
        for i in 0..5 {
            table
                .add_row([
                    ("start_time", CellValue::Float(i as f64)),
                    ("stop_time", CellValue::Float(i as f64 + 0.5)),
                    ("tags", CellValue::text_list(vec![format!("t{}", i)])),
                ])
                .unwrap();
        }
        let slice = table.slice(1, 3).unwrap();
        assert_eq!(slice.len(), 2);
        assert_eq!(slice.start(), 1);
        assert_eq!(slice.ids(), &[1, 2]);
        assert_eq!(slice.column_names(), table.column_names());
        assert_eq!(
            slice.column("start_time").unwrap(),
            &[CellValue::Float(1.0), CellValue::Float(2.0)]
        );
        assert_eq!(slice.column("tags").unwrap()[1], CellValue::text_list(["t2"]));

        assert!(table.slice(0, 0).unwrap().is_empty());
        assert!(matches!(
            table.slice(3, 6),
            Err(StoreError::IndexOutOfRange { index: 6, len: 5 })
        ));
        assert!(table.slice(4, 2).is_err());
        assert!(table.get_row(5).is_err());
    }

    #[test]
    fn test_finalized_table_rejects_mutation() {
        let mut container = MemoryContainer::new();
        let mut table = epoch_table();
        write_table(&mut container, TABLE, &mut table).unwrap();

        assert!(matches!(
            table.add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(1.0)),
            ]),
            Err(StoreError::TableFinalized(_))
        ));
        assert!(matches!(
            table.add_column("x", ColumnDef::scalar(ValueType::Int), ""),
            Err(StoreError::TableFinalized(_))
        ));

        let mut loaded = read_table(&container, TABLE, &ColumnTypeResolver::default()).unwrap();
        assert_eq!(loaded.state(), TableState::Loaded);
        assert!(matches!(
            loaded.add_column("x", ColumnDef::scalar(ValueType::Int), ""),
            Err(StoreError::TableFinalized(_))
        ));
    }

    #[test]
    fn test_round_trip_current_version() {
        let dir = TempDir::new().unwrap();
        let (path, a, b) = write_file(&dir, FormatVersion::new(2, 5, 0));

        let file = FileContainer::open(&path, OpenMode::Read, StoreConfig::default()).unwrap();
        let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();
        assert_eq!(table.name(), "epochs");
        assert_eq!(table.description(), "experimental epochs");
        assert_eq!(
            table.column_names(),
            ["start_time", "stop_time", "tags", "timeseries"]
        );

        let column = table.column("timeseries").unwrap();
        assert_eq!(column.kind(), ColumnKind::Reference);
        assert_eq!(column.tag().name, "TimeSeriesReferenceVectorData");
        assert_eq!(column.resolution(), None);
        assert_eq!(column.tag().origin_version, Some(FormatVersion::new(2, 5, 0)));

        let row = table.get_row(0).unwrap();
        assert_eq!(row.get("tags"), Some(&CellValue::text_list(["foo"])));
        assert_eq!(
            row.get("timeseries"),
            Some(&CellValue::reference_list([
                RangeReference::new(0, 5, a),
                RangeReference::new(0, 3, b),
            ]))
        );
    }

    #[test]
    fn test_non_finite_cells_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.ntbl");
        let mut table = TableBuilder::new("epochs")
            .column("start_time", ColumnDef::scalar(ValueType::Float), "start")
            .column("stop_time", ColumnDef::scalar(ValueType::Float), "stop")
            .column("temperature", ColumnDef::scalar(ValueType::Float), "")
            .build()
            .unwrap();
        table
            .add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(f64::INFINITY)),
                ("temperature", CellValue::Float(f64::NAN)),
            ])
            .unwrap();

        let mut file = FileContainer::create(&path, StoreConfig::default()).unwrap();
        write_table(&mut file, TABLE, &mut table).unwrap();
        file.close().unwrap();

        let file = FileContainer::open(&path, OpenMode::Read, StoreConfig::default()).unwrap();
        let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();
        let row = table.get_row(0).unwrap();
        assert_eq!(row.get("stop_time"), Some(&CellValue::Float(f64::INFINITY)));
        let temperature = row.get("temperature").and_then(CellValue::as_f64).unwrap();
        assert!(temperature.is_nan());
    }

    #[test]
    fn test_scenario_slice_then_resolve() {
        let dir = TempDir::new().unwrap();
        let (path, a, b) = write_file(&dir, FormatVersion::new(2, 5, 0));

        let file = FileContainer::open(&path, OpenMode::Read, StoreConfig::default()).unwrap();
        let registry = file.registry();
        let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();

        let slice = table.slice(0, 1).unwrap();
        let cell = &slice.column("timeseries").unwrap()[0];
        let refs: Vec<&RangeReference> = cell
            .as_list()
            .unwrap()
            .iter()
            .filter_map(CellValue::as_reference)
            .collect();
        assert_eq!(refs.len(), 2);
        assert_eq!((refs[0].start, refs[0].count), (0, 5));
        assert_eq!((refs[1].start, refs[1].count), (0, 3));
        // reading rows resolved nothing
        assert_eq!(registry.load_count(), 0);

        let resolved = table.resolve_references(0, "timeseries", &file).unwrap();
        let resolved: Vec<_> = resolved.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(resolved[0].target(), &a);
        assert_eq!(resolved[0].handle.name(), "a");
        assert_eq!(resolved[0].handle.len(), 11);
        assert_eq!(resolved[1].target(), &b);
        assert_eq!(resolved[1].handle.len(), 13);
        assert_eq!(resolved[0].timestamps(), vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(registry.load_count(), 2);

        // a second resolution hands out the same handles
        let again = table.resolve_references(0, "timeseries", &file).unwrap();
        let again = again.into_iter().next().unwrap().unwrap();
        assert!(Arc::ptr_eq(&again.handle, &resolved[0].handle));
        assert_eq!(registry.load_count(), 2);
    }

    #[test]
    fn test_legacy_column_is_promoted() {
        let dir = TempDir::new().unwrap();
        let (path, a, b) = write_file(&dir, FormatVersion::new(2, 3, 0));
        make_legacy(&path);

        let file = FileContainer::open(&path, OpenMode::Read, StoreConfig::default()).unwrap();
        let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();

        let column = table.column("timeseries").unwrap();
        assert_eq!(column.kind(), ColumnKind::Reference);
        // the persisted tag is reported as stored
        assert_eq!(column.tag().name, "VectorData");
        assert_eq!(
            column.resolution(),
            Some(&ResolutionNote::Promoted {
                from: "VectorData".to_string(),
                file_version: FormatVersion::new(2, 3, 0),
            })
        );

        let resolved = table.resolve_references(0, "timeseries", &file).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].as_ref().unwrap().target(), &a);
        assert_eq!(resolved[1].as_ref().unwrap().target(), &b);
        assert_eq!(resolved[1].as_ref().unwrap().data(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_reading_legacy_file_does_not_modify_it() {
        let dir = TempDir::new().unwrap();
        let (path, _, _) = write_file(&dir, FormatVersion::new(2, 3, 0));
        make_legacy(&path);
        let before = std::fs::read(&path).unwrap();

        for mode in [OpenMode::Read, OpenMode::Append] {
            let mut file = FileContainer::open(&path, mode, StoreConfig::default()).unwrap();
            let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();
            assert_eq!(table.column("timeseries").unwrap().kind(), ColumnKind::Reference);
            file.close().unwrap();
        }

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_legacy_layout_in_current_file_stays_generic() {
        let mut container = MemoryContainer::new();
        populate(&mut container);
        let column = format!("{}/timeseries", TABLE);
        container
            .set_attribute(&column, TYPE_NAME_ATTR, AttrValue::Text("VectorData".to_string()))
            .unwrap();

        let table = read_table(&container, TABLE, &ColumnTypeResolver::default()).unwrap();
        let column = table.column("timeseries").unwrap();
        assert_eq!(column.kind(), ColumnKind::Generic);
        assert!(matches!(column.resolution(), Some(ResolutionNote::Ambiguous(_))));
        assert_eq!(column.len(), 1);
        match column.get(0).unwrap() {
            CellValue::List(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], CellValue::Record(_)));
            }
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_rewriting_promoted_table_uses_current_tag() {
        let mut legacy = MemoryContainer::with_version(FormatVersion::new(2, 3, 0));
        populate(&mut legacy);
        legacy
            .set_attribute(
                &format!("{}/timeseries", TABLE),
                TYPE_NAME_ATTR,
                AttrValue::Text("VectorData".to_string()),
            )
            .unwrap();
        let mut table = read_table(&legacy, TABLE, &ColumnTypeResolver::default()).unwrap();

        let mut current = MemoryContainer::new();
        write_table(&mut current, TABLE, &mut table).unwrap();
        assert_eq!(
            current
                .attribute(&format!("{}/timeseries", TABLE), TYPE_NAME_ATTR)
                .unwrap()
                .and_then(AttrValue::as_str),
            Some("TimeSeriesReferenceVectorData")
        );
        let reread = read_table(&current, TABLE, &ColumnTypeResolver::default()).unwrap();
        assert_eq!(reread.get_row(0).unwrap(), table.get_row(0).unwrap());
    }

    #[test]
    fn test_faulted_column_does_not_hide_others() {
        let mut container = MemoryContainer::new();
        populate(&mut container);
        let broken = Dataset::new(
            vec![
                Field::new("idx_start", ElementType::UInt64),
                Field::new("count", ElementType::UInt64),
            ],
            vec![vec![Element::UInt(0), Element::UInt(5)]],
        )
        .with_attr(TYPE_NAME_ATTR, AttrValue::Text("TimeSeriesReferenceVectorData".to_string()));
        container
            .write_dataset(&format!("{}/timeseries", TABLE), broken)
            .unwrap();

        let table = read_table(&container, TABLE, &ColumnTypeResolver::default()).unwrap();
        assert_eq!(table.column_count(), 4);
        assert!(matches!(
            table.column("timeseries"),
            Err(StoreError::SchemaMismatch { column, .. }) if column == "timeseries"
        ));
        assert!(matches!(table.get_row(0), Err(StoreError::SchemaMismatch { .. })));
        assert_eq!(
            table.column("start_time").unwrap().get(0).unwrap(),
            CellValue::Float(0.0)
        );
        assert_eq!(
            table.column("tags").unwrap().get(0).unwrap(),
            CellValue::text_list(["foo"])
        );
    }

    #[test]
    fn test_unresolved_reference_is_per_reference() {
        let mut container = MemoryContainer::new();
        let a = series_a();
        a.write(&mut container, "/acquisition/a").unwrap();
        let ghost = ObjectReference::generate();

        let mut table = epoch_table();
        table
            .add_row([
                ("start_time", CellValue::Float(0.0)),
                ("stop_time", CellValue::Float(1.0)),
                (
                    "timeseries",
                    CellValue::reference_list([
                        RangeReference::new(0, 1, ghost.clone()),
                        RangeReference::new(0, 5, a.object_id().clone()),
                    ]),
                ),
            ])
            .unwrap();
        write_table(&mut container, TABLE, &mut table).unwrap();

        let table = read_table(&container, TABLE, &ColumnTypeResolver::default()).unwrap();
        let results = table
            .resolve_references(0, "timeseries", &container)
            .unwrap();
        assert!(matches!(&results[0], Err(StoreError::UnresolvedReference(id)) if *id == ghost));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_resolve_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let (path, _, _) = write_file(&dir, FormatVersion::new(2, 5, 0));

        let mut file = FileContainer::open(&path, OpenMode::Read, StoreConfig::default()).unwrap();
        let table = read_table(&file, TABLE, &ColumnTypeResolver::default()).unwrap();
        file.close().unwrap();

        // unresolved cells stay readable
        assert!(table.get_row(0).is_ok());
        let results = table.resolve_references(0, "timeseries", &file).unwrap();
        assert!(
            results
                .iter()
                .all(|r| matches!(r, Err(StoreError::ContainerClosed)))
        );
        assert!(matches!(
            read_table(&file, TABLE, &ColumnTypeResolver::default()),
            Err(StoreError::ContainerClosed)
        ));
    }

    #[test]
    fn test_unversioned_file_reads_generic() {
        let mut container = MemoryContainer::from_root(Default::default());
        populate(&mut container);
        container
            .set_attribute(
                &format!("{}/timeseries", TABLE),
                TYPE_NAME_ATTR,
                AttrValue::Text("VectorData".to_string()),
            )
            .unwrap();
        assert_eq!(container.format_version().unwrap(), None);

        let table = read_table(&container, TABLE, &ColumnTypeResolver::default()).unwrap();
        let column = table.column("timeseries").unwrap();
        assert_eq!(column.kind(), ColumnKind::Generic);
        assert!(column.resolution().is_some_and(|n| matches!(n, ResolutionNote::Ambiguous(_))));
        assert_eq!(table.tag(), &TypeTag::dynamic_table());
    }
}
