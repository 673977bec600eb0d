//! Tests for error handling

use std::error::Error;

use graphdump_core::error::{DumpError, ProviderError, Result};

#[test]
fn test_provider_error_unreadable()
{
    let error = ProviderError::unreadable("0x10");
    assert_eq!(error.to_string(), "Cannot access memory at address 0x10");
    assert!(error.is_read_failure());
}

#[test]
fn test_provider_error_read_failure_classes()
{
    assert!(ProviderError::Evaluation("No symbol \"x\" in current context.".to_string()).is_read_failure());
    assert!(!ProviderError::UnsupportedAccessor("size".to_string()).is_read_failure());
    assert!(!ProviderError::Internal("boom".to_string()).is_read_failure());
}

#[test]
fn test_provider_error_display()
{
    let error = ProviderError::Internal("unknown type `T`".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Internal introspection error"));
    assert!(message.contains("unknown type `T`"));
}

#[test]
fn test_root_resolution_carries_source()
{
    let error = DumpError::RootResolution {
        expr: "thd->lex".to_string(),
        source: ProviderError::unreadable("0x0"),
    };
    let message = format!("{}", error);
    assert!(message.contains("thd->lex"));
    assert!(message.contains("Cannot access memory at address 0x0"));

    let source = error.source().unwrap();
    assert_eq!(source.to_string(), "Cannot access memory at address 0x0");
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: DumpError = io.into();
    assert!(matches!(error, DumpError::Io(_)));
    assert!(error.to_string().contains("missing"));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: Result<()> = Ok(());
    let _error_result: Result<()> = Err(DumpError::InvalidExpression("empty".to_string()));
}
