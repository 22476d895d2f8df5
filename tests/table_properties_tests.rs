#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tablekit::export::DirectoryTarget;
    use tablekit::{
        ColumnDescriptor, DataSource, EnhancedTable, ExportFormat, ExportScope, SortDirection,
        TableOptions, ValueType,
    };
    use tempfile::TempDir;

    fn society_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "ID").with_type(ValueType::Number),
            ColumnDescriptor::new("name", "Society Name"),
            ColumnDescriptor::new("city", "City"),
            ColumnDescriptor::new("units", "Units").with_type(ValueType::Number),
            ColumnDescriptor::new("notes", "Notes"),
            ColumnDescriptor::actions("Actions"),
        ]
    }

    fn societies() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Palm Tower", "city": "Pune", "units": 120, "notes": null}),
            json!({"id": 2, "name": "Lake View", "city": "Mumbai", "units": 8, "notes": "near Tower road"}),
            json!({"id": 3, "name": "Green Acres", "city": "Pune", "units": 45, "notes": ""}),
            json!({"id": 4, "name": "Silver Tower", "city": "Delhi", "units": 300, "notes": null}),
            json!({"id": 5, "name": "Lake View", "city": "Nashik", "units": 8, "notes": "duplicate name"}),
            json!({"id": 6, "name": "Orchid Tower", "city": "Pune", "units": 12, "notes": null}),
            json!({"id": 7, "name": "Hill Crest", "city": "Tower City", "units": 60, "notes": null}),
            json!({"id": 8, "name": "Sun Tower", "city": "Mumbai", "units": 75, "notes": null}),
            json!({"id": 9, "name": "Green Acres", "city": "Thane", "units": 45, "notes": "Tower B"}),
            json!({"id": 10, "name": "Maple Court", "city": "Pune", "units": 30, "notes": null}),
        ]
    }

    fn numbered(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"id": i, "name": format!("Row {}", i)}))
            .collect()
    }

    fn ids(table: &EnhancedTable<Value>) -> Vec<i64> {
        table
            .working_set()
            .rows()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    fn page_ids(table: &EnhancedTable<Value>) -> Vec<i64> {
        table
            .page_view()
            .rows()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_search_is_identity() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(societies()),
            TableOptions::default(),
        )
        .unwrap();
        let original = ids(&table);
        assert_eq!(original, (1..=10).collect::<Vec<_>>());

        table.set_search("").await;
        assert_eq!(ids(&table), original);

        table.set_search("pune").await;
        assert_eq!(ids(&table), vec![1, 3, 6, 10]);
        table.set_search("").await;
        assert_eq!(ids(&table), original);
    }

    #[test]
    fn test_sort_cycle_restores_input_order() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(societies()),
            TableOptions::default(),
        )
        .unwrap();
        let original = ids(&table);

        table.toggle_sort("name");
        assert_eq!(table.state().sort().direction, SortDirection::Ascending);
        // Equal names keep their input order
        assert_eq!(ids(&table), vec![3, 9, 7, 2, 5, 10, 6, 1, 4, 8]);

        table.toggle_sort("name");
        assert_eq!(table.state().sort().direction, SortDirection::Descending);
        assert_eq!(ids(&table), vec![8, 4, 1, 6, 10, 2, 5, 7, 3, 9]);

        table.toggle_sort("name");
        assert_eq!(table.state().sort().direction, SortDirection::None);
        assert_eq!(ids(&table), original);
    }

    #[test]
    fn test_numeric_column_sorts_by_value() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(societies()),
            TableOptions::default(),
        )
        .unwrap();
        table.set_sort("units", SortDirection::Ascending);
        assert_eq!(ids(&table), vec![2, 5, 6, 10, 3, 9, 7, 8, 1, 4]);
    }

    #[tokio::test]
    async fn test_pages_concatenate_to_working_set() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(numbered(23)),
            TableOptions::default().with_per_page(5),
        )
        .unwrap();
        table.set_sort("id", SortDirection::Descending);

        let state = table.pagination();
        assert_eq!(state.total_count, 23);
        assert_eq!(state.total_pages, 5);

        let mut seen = Vec::new();
        for page in 1..=state.total_pages {
            table.go_to_page(page).await;
            seen.extend(page_ids(&table));
        }
        assert_eq!(seen, ids(&table));
        assert_eq!(seen.len(), 23);

        // Past the end clamps to the last page
        table.go_to_page(99).await;
        assert_eq!(table.pagination().current_page, 5);
        assert_eq!(page_ids(&table), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_per_page_change_resets_to_first_page() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(numbered(25)),
            TableOptions::default().with_per_page(10),
        )
        .unwrap();

        assert_eq!(page_ids(&table), (1..=10).collect::<Vec<_>>());
        assert_eq!(table.pagination().total_pages, 3);

        table.go_to_page(3).await;
        assert_eq!(page_ids(&table), (21..=25).collect::<Vec<_>>());

        table.set_per_page(25).await;
        let state = table.pagination();
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, 1);
        assert!(!state.has_next_page);
        assert_eq!(page_ids(&table), (1..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_sort_on_non_sortable_column_is_noop() {
        let columns = vec![
            ColumnDescriptor::new("id", "ID"),
            ColumnDescriptor::new("name", "Name").with_sortable(false),
        ];
        let table = EnhancedTable::new(
            columns,
            DataSource::Client(numbered(3)),
            TableOptions::default(),
        )
        .unwrap();

        let before = table.state().clone();
        assert!(!table.toggle_sort("name"));
        assert_eq!(table.state(), before);
        assert_eq!(ids(&table), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_export_matches_what_is_shown() {
        let dir = TempDir::new().unwrap();
        let options = TableOptions::default().with_export(
            "societies",
            ExportFormat::Csv,
            Arc::new(DirectoryTarget::new(dir.path())),
        );
        let table =
            EnhancedTable::new(society_columns(), DataSource::Client(societies()), options)
                .unwrap();

        assert!(table.hide_column("city"));
        assert!(table.hide_column("notes"));
        assert!(table.move_column("units", "name"));
        table.set_search("tower").await;
        assert_eq!(ids(&table), vec![1, 4, 6, 8]);

        let summary = table.export(ExportScope::Visible).await.unwrap();
        assert_eq!(summary.row_count, 4);

        let mut reader = csv::Reader::from_path(&summary.path).unwrap();
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(headers, vec!["ID", "Units", "Society Name"]);

        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], vec!["1", "120", "Palm Tower"]);
        assert_eq!(records[3], vec!["8", "75", "Sun Tower"]);
    }

    #[tokio::test]
    async fn test_json_export_uses_rendered_values() {
        let dir = TempDir::new().unwrap();
        let options = TableOptions::default()
            .with_render_cell(|row: &Value, key: &str| {
                (key == "units").then(|| format!("{} flats", row["units"]))
            })
            .with_export(
                "societies.json",
                ExportFormat::Json,
                Arc::new(DirectoryTarget::new(dir.path())),
            );
        let table =
            EnhancedTable::new(society_columns(), DataSource::Client(societies()), options)
                .unwrap();
        table.set_search("maple").await;

        let summary = table.export(ExportScope::Visible).await.unwrap();
        let exported: Value =
            serde_json::from_str(&std::fs::read_to_string(&summary.path).unwrap()).unwrap();
        assert_eq!(
            exported,
            json!([{
                "ID": "10",
                "Society Name": "Maple Court",
                "City": "Pune",
                "Units": "30 flats",
                "Notes": ""
            }])
        );
    }

    #[tokio::test]
    async fn test_hidden_columns_do_not_match_search() {
        let table = EnhancedTable::new(
            society_columns(),
            DataSource::Client(societies()),
            TableOptions::default(),
        )
        .unwrap();

        table.set_search("tower").await;
        assert_eq!(ids(&table), vec![1, 2, 4, 6, 7, 8, 9]);

        table.hide_column("notes");
        table.hide_column("city");
        assert_eq!(ids(&table), vec![1, 4, 6, 8]);
        assert_eq!(table.pagination().total_count, 4);
    }
}
