// ResultStore tests: lazy creation, append order, rounding, load validation, torn reads

mod common;

use common::{record, round2, ts};
use speedlog::result_store::{HEADER, ResultStore, StorageError};
use tempfile::TempDir;

#[tokio::test]
async fn append_creates_file_with_header_lazily() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("results.csv");
    let store = ResultStore::new(&path);
    assert!(!path.exists());

    store.append(&record(ts(1, 10, 0), 93.456, "Taipei")).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(HEADER.join(",").as_str()));
    assert_eq!(
        lines.next(),
        Some("2024-03-01 10:00:00,93.46,46.73,10.00,Taipei,Taiwan,N/A")
    );
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn appends_keep_insertion_order_and_never_rewrite_prior_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    let store = ResultStore::new(&path);

    store.append(&record(ts(1, 10, 0), 10.0, "A")).await.unwrap();
    let after_first = std::fs::read_to_string(&path).unwrap();
    store.append(&record(ts(1, 10, 20), 20.0, "B")).await.unwrap();
    store.append(&record(ts(1, 10, 40), 30.0, "A")).await.unwrap();
    let after_third = std::fs::read_to_string(&path).unwrap();

    assert!(after_third.starts_with(&after_first));
    let dataset = store.load_all().unwrap();
    let downloads: Vec<f64> = dataset.records.iter().map(|r| r.download_mbps).collect();
    assert_eq!(downloads, vec![10.0, 20.0, 30.0]);
    assert_eq!(dataset.dropped_rows, 0);
    assert!(!dir.path().join("results.csv.tmp").exists());
}

#[tokio::test]
async fn loaded_values_are_rounded_to_two_decimals() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path().join("results.csv"));
    let original = record(ts(2, 8, 0), 123.4512, "Osaka");
    store.append(&original).await.unwrap();

    let loaded = &store.load_all().unwrap().records[0];
    assert_eq!(loaded.timestamp, original.timestamp);
    assert_eq!(loaded.download_mbps, round2(original.download_mbps));
    assert_eq!(loaded.upload_mbps, round2(original.upload_mbps));
    assert_eq!(loaded.ping_ms, 10.0);
    assert_eq!(loaded.server_name.as_deref(), Some("Osaka"));
    assert_eq!(loaded.server_sponsor, None);
}

#[test]
fn load_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path().join("absent.csv"));
    assert!(matches!(store.load_all(), Err(StorageError::NotFound(_))));
}

#[test]
fn load_all_rows_invalid_is_empty_dataset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    std::fs::write(
        &path,
        "timestamp,download_mbps,upload_mbps,ping_ms,server_name,server_country,server_sponsor\n\
         not-a-date,1,1,1,A,B,C\n",
    )
    .unwrap();
    let err = ResultStore::new(&path).load_all().unwrap_err();
    assert!(matches!(err, StorageError::EmptyDataset { dropped: 1, .. }));

    std::fs::write(&path, format!("{}\n", HEADER.join(","))).unwrap();
    let err = ResultStore::new(&path).load_all().unwrap_err();
    assert!(matches!(err, StorageError::EmptyDataset { dropped: 0, .. }));
}

#[test]
fn load_skips_malformed_rows_and_counts_them() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    std::fs::write(
        &path,
        "timestamp,download_mbps,upload_mbps,ping_ms,server_name,server_country,server_sponsor\n\
         2024-03-01 10:00:00,10.00,5.00,9.00,A,TW,N/A\n\
         garbage,20.00,5.00,9.00,A,TW,N/A\n\
         2024-03-01 10:40:00,oops,5.00,9.00,A,TW,N/A\n\
         2024-03-01 11:00:00,30.00,5.00\n\
         2024-03-01 11:20:00,40.00,5.00,9.00,B,TW,Sponsor\n",
    )
    .unwrap();
    let dataset = ResultStore::new(&path).load_all().unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.dropped_rows, 3);
    assert_eq!(dataset.records[1].server_sponsor.as_deref(), Some("Sponsor"));
}

#[test]
fn load_tolerates_bom_missing_optional_columns_and_extra_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.csv");
    let mut content = b"\xEF\xBB\xBF".to_vec();
    content.extend_from_slice(
        b"timestamp,download_mbps,upload_mbps,ping_ms,server_name\r\n\
          2024-03-01 10:00:00,10.5,5.25,9.75,Taipei\r\n",
    );
    std::fs::write(&path, content).unwrap();
    let dataset = ResultStore::new(&path).load_all().unwrap();
    assert_eq!(dataset.len(), 1);
    let r = &dataset.records[0];
    assert_eq!(r.download_mbps, 10.5);
    assert_eq!(r.server_name.as_deref(), Some("Taipei"));
    assert_eq!(r.server_country, None);

    let newer = dir.path().join("newer.csv");
    std::fs::write(
        &newer,
        "timestamp,download_mbps,upload_mbps,ping_ms,server_name,server_country,server_sponsor,isp\n\
         2024-03-01 10:00:00,1,2,3,A,B,C,ExampleNet\n",
    )
    .unwrap();
    let dataset = ResultStore::new(&newer).load_all().unwrap();
    assert_eq!(dataset.records[0].server_sponsor.as_deref(), Some("C"));
}

#[test]
fn load_without_required_column_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    std::fs::write(&path, "timestamp,download_mbps\n2024-03-01 10:00:00,1\n").unwrap();
    let err = ResultStore::new(&path).load_all().unwrap_err();
    assert!(matches!(
        err,
        StorageError::Schema {
            column: "upload_mbps",
            ..
        }
    ));
}

#[tokio::test]
async fn load_all_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path().join("results.csv"));
    for (i, v) in [11.0, 22.0, 33.0].into_iter().enumerate() {
        store
            .append(&record(ts(3, 9, i as u32), v, "A"))
            .await
            .unwrap();
    }
    assert_eq!(store.load_all().unwrap(), store.load_all().unwrap());
}

#[test]
fn append_into_file_without_trailing_newline_starts_new_row() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    std::fs::write(
        &path,
        format!("{}\n2024-03-01 10:00:00,1,1,1,A,B,C", HEADER.join(",")),
    )
    .unwrap();
    let store = ResultStore::new(&path);
    store
        .append_blocking(&record(ts(1, 11, 0), 2.0, "A"))
        .unwrap();
    let dataset = store.load_all().unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.dropped_rows, 0);
}

#[test]
fn append_to_unwritable_location_is_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let store = ResultStore::new(blocker.join("results.csv"));
    let err = store
        .append_blocking(&record(ts(1, 10, 0), 1.0, "A"))
        .unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
}

#[test]
fn concurrent_loads_never_observe_torn_rows() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path().join("results.csv"));
    store
        .append_blocking(&record(ts(1, 0, 0), 1.0, "A"))
        .unwrap();

    let writer = {
        let store = store.clone();
        std::thread::spawn(move || {
            for i in 1..200u32 {
                let server = "a server name long enough to make rows span more bytes";
                store
                    .append_blocking(&record(ts(1, i / 60, i % 60), i as f64 + 0.123, server))
                    .unwrap();
            }
        })
    };

    let mut last_len = 0;
    while !writer.is_finished() {
        let dataset = store.load_all().unwrap();
        assert_eq!(dataset.dropped_rows, 0);
        assert!(dataset.len() >= last_len);
        last_len = dataset.len();
    }
    writer.join().unwrap();
    assert_eq!(store.load_all().unwrap().len(), 200);
}

#[test]
fn append_refuses_file_with_different_column_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    let original = "timestamp,ping_ms,download_mbps,upload_mbps\n2024-03-01 10:00:00,10.00,40.00,10.00\n";
    std::fs::write(&path, original).unwrap();

    let store = ResultStore::new(&path);
    let err = store
        .append_blocking(&record(ts(1, 10, 20), 80.0, "A"))
        .unwrap_err();
    assert!(matches!(err, StorageError::HeaderMismatch { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

    // Still readable by name even though appends are refused.
    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.records[0].download_mbps, 40.0);
    assert_eq!(loaded.records[0].ping_ms, 10.0);
}

#[test]
fn append_refuses_legacy_file_missing_optional_columns() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.csv");
    std::fs::write(
        &path,
        "timestamp,download_mbps,upload_mbps,ping_ms,server_name\n2024-03-01 10:00:00,1,2,3,A\n",
    )
    .unwrap();
    let err = ResultStore::new(&path)
        .append_blocking(&record(ts(1, 11, 0), 5.0, "A"))
        .unwrap_err();
    assert!(matches!(err, StorageError::HeaderMismatch { .. }));
    assert_eq!(ResultStore::new(&path).load_all().unwrap().len(), 1);
}

#[test]
fn append_accepts_standard_header_behind_bom() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.csv");
    let mut content = b"\xEF\xBB\xBF".to_vec();
    content.extend_from_slice(format!("{}\n2024-03-01 10:00:00,1,2,3,A,B,C\n", HEADER.join(",")).as_bytes());
    std::fs::write(&path, content).unwrap();

    let store = ResultStore::new(&path);
    store
        .append_blocking(&record(ts(1, 11, 0), 5.0, "A"))
        .unwrap();
    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.records[1].download_mbps, 5.0);
}
