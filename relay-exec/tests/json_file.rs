use std::io::Write;

use relay_exec::connectors::JsonFileSource;
use relay_exec::{Source, SourceError};
use tempfile::NamedTempFile;

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn reads_json_array_in_pages() {
    let file = file_with(r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}, {"id": 3, "name": "c"}]"#);
    let source = JsonFileSource::new(file.path());

    let first = source.get_data(&[], 0, 2, None).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].get_str("name").as_deref(), Some("a"));

    let second = source.get_data(&[], 2, 2, None).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get_str("id").as_deref(), Some("3"));

    assert!(source.get_data(&[], 4, 2, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn reads_ndjson_and_projects_fields() {
    let file = file_with("{\"id\": 1, \"name\": \"a\", \"extra\": true}\n\n{\"id\": 2, \"name\": \"b\"}\n");
    let source = JsonFileSource::new(file.path());

    let records = source
        .get_data(&["name".to_string()], 0, 10, None)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    let fields: Vec<_> = records[0].fields().collect();
    assert_eq!(fields, vec!["name"]);
}

#[tokio::test]
async fn malformed_line_is_located() {
    let file = file_with("{\"id\": 1}\n{not json}\n");
    let source = JsonFileSource::new(file.path());

    match source.get_data(&[], 0, 10, None).await {
        Err(SourceError::Malformed { location, .. }) => assert!(location.ends_with(":2"), "{location}"),
        other => panic!("expected a malformed record error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_object_items_are_rejected() {
    let file = file_with("[1, 2]");
    let source = JsonFileSource::new(file.path());
    let err = source.get_data(&[], 0, 10, None).await.unwrap_err();
    assert!(matches!(err, SourceError::Malformed { ref location, .. } if location.ends_with("[0]")));
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonFileSource::new(dir.path().join("absent.json"));
    let err = source.get_data(&[], 0, 10, None).await.unwrap_err();
    assert!(matches!(err, SourceError::Io { .. }));
}

#[test]
fn unconfigured_path_fails_validation() {
    let source = JsonFileSource::default();
    let v = source.validate();
    assert!(!v.is_valid);
    assert_eq!(v.messages, vec!["path is required".to_string()]);
}
