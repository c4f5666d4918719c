//! Tests for error types

use crystal_props::Error;

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("attempts must be at least 1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("attempts must be at least 1"));
}

#[test]
fn test_unknown_property_error() {
    let error = Error::UnknownProperty("q".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Unknown property tag"));
    assert!(error_str.ends_with('q'));
}

#[test]
fn test_source_error() {
    let error = Error::Source("measurements.json missing".to_string());
    assert!(format!("{error}").starts_with("Source error"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_empty_table_error() {
    let error_str = format!("{}", Error::EmptyTable);
    assert!(error_str.contains("Training table is empty"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Json(_)));
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_error_debug() {
    let debug_str = format!("{:?}", Error::EmptyTable);
    assert!(debug_str.contains("EmptyTable"));
}

#[test]
fn test_result_type_alias() {
    #[allow(clippy::unnecessary_wraps)]
    fn returns_result() -> crystal_props::Result<i32> {
        Ok(42)
    }

    let result = returns_result();
    assert!(result.is_ok());
    assert_eq!(result.unwrap(), 42);
}
