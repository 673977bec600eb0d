//! Symbol demangling for backtrace function names.
//!
//! Providers hand back whatever name the frame's function carries. That is
//! usually already a print name, but raw linkage names do show up (stripped
//! debug info, JIT frames). Rust names (`_R` or `_ZN` prefixed) are
//! demangled with `rustc_demangle`; everything else, Itanium C++ linkage
//! names included, is kept verbatim.

use std::fmt;

use rustc_demangle::try_demangle;

/// A function name with demangling metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
}

impl SymbolName
{
    /// Demangle `raw` if it is a Rust linkage name.
    ///
    /// ```rust
    /// use graphdump_core::demangle::SymbolName;
    ///
    /// let symbol = SymbolName::parse("_ZN4core3fmt5write17h0123456789abcdefE");
    /// assert_eq!(symbol.display_name(), "core::fmt::write");
    ///
    /// let symbol = SymbolName::parse("main");
    /// assert_eq!(symbol.display_name(), "main");
    /// ```
    pub fn parse(raw: impl Into<String>) -> Self
    {
        let raw = raw.into();
        // `{:#}` drops the trailing hash segment.
        let demangled = try_demangle(&raw).ok().map(|d| format!("{d:#}"));
        Self { raw, demangled }
    }

    /// Name as the provider reported it.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    /// Preferred presentation (demangled, falling back to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    /// Whether `raw` was a Rust linkage name.
    pub fn is_demangled(&self) -> bool
    {
        self.demangled.is_some()
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rust_legacy_name_is_demangled()
    {
        let symbol = SymbolName::parse("_ZN6server7handler4poll17h0123456789abcdefE");
        assert!(symbol.is_demangled());
        assert_eq!(symbol.display_name(), "server::handler::poll");
        assert_eq!(symbol.raw(), "_ZN6server7handler4poll17h0123456789abcdefE");
    }

    #[test]
    fn test_cpp_names_are_kept_raw()
    {
        let symbol = SymbolName::parse("_Z8mysql_parseP3THDPcj");
        assert!(!symbol.is_demangled());
        assert_eq!(symbol.display_name(), "_Z8mysql_parseP3THDPcj");
    }

    #[test]
    fn test_print_names_with_namespaces()
    {
        let symbol = SymbolName::parse("Query_cache::send_result_to_client");
        assert!(!symbol.is_demangled());
        assert_eq!(symbol.raw(), symbol.display_name());
    }

    #[test]
    fn test_plain_c_name()
    {
        let symbol = SymbolName::parse("handle_connection");
        assert_eq!(symbol.to_string(), "handle_connection");
    }
}
