//! Tests for dump assembly and output

use std::fs;

use graphdump_core::types::BacktraceFrame;
use graphdump_core::{DumpConfig, DumpError, Dumper, HeapImage, ProviderError};
use regex::Regex;
use serde_json::json;

fn image() -> HeapImage
{
    HeapImage::from_value(json!({
        "types": {
            "int": { "kind": "int" },
            "Node": { "kind": "struct", "fields": [
                { "name": "id", "type": "int" },
                { "name": "next", "type": "Node *" }
            ] }
        },
        "symbols": {
            "root": { "address": "0x1000", "type": "Node" },
            "nil": { "address": "0x500", "type": "Node *" },
            "count": { "address": "0x600", "type": "int" }
        },
        "objects": {
            "0x500": "0x0",
            "0x600": 12,
            "0x1000": { "id": 1, "next": "0x2000" },
            "0x2000": { "id": 2, "next": "0x0" }
        },
        "frames": [
            { "function": "_ZN6server7handler4poll17h0123456789abcdefE", "line": 42 },
            { "function": "main", "line": 7 },
            { "line": 0 },
            { "function": "never_reached", "line": 1 }
        ]
    }))
    .unwrap()
}

#[test]
fn test_dump_shape()
{
    let image = image();
    let result = Dumper::new(&image, DumpConfig::default()).dump("root").unwrap();

    assert_eq!(result.expr, "root");
    assert_eq!(result.type_name, "Node");
    assert_eq!(
        result.backtrace,
        vec![
            BacktraceFrame {
                function: "server::handler::poll".to_string(),
                line: 42
            },
            BacktraceFrame {
                function: "main".to_string(),
                line: 7
            },
        ]
    );

    let timestamp = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6}$").unwrap();
    assert!(timestamp.is_match(&result.timestamp), "{}", result.timestamp);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["value"]["next"]["value"]["id"]["value"], "2");
    // Null pointer to an aggregate cannot be followed.
    assert_eq!(json["value"]["next"]["value"]["next"]["value"], serde_json::Value::Null);
}

#[test]
fn test_scalar_root()
{
    let image = image();
    let result = Dumper::new(&image, DumpConfig::default()).dump("count").unwrap();
    assert_eq!(result.value.as_text().as_deref(), Some("12"));
    assert_eq!(result.depth(), 0);
}

#[test]
fn test_file_name()
{
    let image = image();
    let result = Dumper::new(&image, DumpConfig::default()).dump(" root.next->id ").unwrap();

    assert_eq!(result.expr, "root.next->id");
    let pattern = Regex::new(r"^root\.next\.id_\d{14}\.json$").unwrap();
    assert!(pattern.is_match(&result.file_name()), "{}", result.file_name());
    assert!(result.file_name().contains(&result.started_at().format("%Y%m%d%H%M%S").to_string()));
}

#[test]
fn test_write_json_layout()
{
    let image = image();
    let result = Dumper::new(&image, DumpConfig::default()).dump("root").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(result.file_name());
    result.write_json(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n    \"timestamp\": "));
    let positions: Vec<usize> = ["\"timestamp\"", "\"backtrace\"", "\"expr\"", "\"type\"", "\"value\""]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{positions:?}");

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, serde_json::to_value(&result).unwrap());

    // Only the artifact itself; no temporary left behind.
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn test_unresolvable_root_is_fatal_and_writes_nothing()
{
    let image = image();
    let dir = tempfile::tempdir().unwrap();
    let config = DumpConfig::default().with_diagnostics_path(dir.path().join("error.log"));
    let dumper = Dumper::new(&image, config);

    let err = dumper.dump("missing").unwrap_err();
    match err {
        DumpError::RootResolution { expr, source } => {
            assert_eq!(expr, "missing");
            assert!(matches!(source, ProviderError::Evaluation(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = dumper.dump("nil").unwrap_err();
    assert!(matches!(
        err,
        DumpError::RootResolution {
            source: ProviderError::MemoryRead(_),
            ..
        }
    ));

    assert!(matches!(dumper.dump("   "), Err(DumpError::InvalidExpression(_))));

    let artifacts = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count();
    assert_eq!(artifacts, 0);
    // The diagnostic log was still opened and closed for each attempt.
    let log = fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert!(log.contains("=== dump of `missing` started"));
    assert!(log.contains("=== dump of `nil` started"));
}
