//! Memory address type.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

static HEX_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[0-9a-f]+").expect("hex literal pattern is valid"));

/// Strongly typed memory address
///
/// This wrapper around `u64` provides type safety when working with memory
/// addresses. It prevents accidentally mixing addresses with other `u64` values
/// (like sizes, counts, or offsets).
///
/// Addresses are the first half of a node's identity: the visited table keys
/// every serialized node by `(Address, declared type)`.
///
/// ## Example
///
/// ```rust
/// use graphdump_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!(addr.value(), 0x1000);
/// assert_eq!(addr.to_string(), "0x1000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use graphdump_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None); // Overflow
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Pull the first hexadecimal literal out of a debugger's textual rendering
    ///
    /// Debuggers print addresses with decoration around them, for example
    /// `(struct node *) 0x601040 <head>`. Only the first `0x...` literal is
    /// used; text without one yields `None`.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use graphdump_core::types::Address;
    ///
    /// assert_eq!(Address::extract("(Node *) 0x601040 <head>"), Some(Address::new(0x601040)));
    /// assert_eq!(Address::extract("<synthetic pointer>"), None);
    /// ```
    pub fn extract(text: &str) -> Option<Self>
    {
        let literal = HEX_LITERAL.find(text)?;
        u64::from_str_radix(&literal.as_str()[2..], 16).ok().map(Address)
    }

    /// Remove every hexadecimal literal (and the whitespace around it) from `text`
    ///
    /// Used to make pointer renderings stable across runs.
    ///
    /// ```rust
    /// use graphdump_core::types::Address;
    ///
    /// assert_eq!(Address::strip_all("0x4006f4 \"hello\""), "\"hello\"");
    /// ```
    pub fn strip_all(text: &str) -> String
    {
        static SURROUNDED_HEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\s*0x[0-9a-f]+\s*").expect("hex literal pattern is valid"));
        SURROUNDED_HEX.replace_all(text, "").into_owned()
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Address
{
    type Err = String;

    /// Parse `0x`-prefixed hexadecimal or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u64>()
        };
        parsed.map(Address).map_err(|err| format!("invalid address `{s}`: {err}"))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_extract_takes_first_literal()
    {
        assert_eq!(Address::extract("0x10 then 0x20"), Some(Address::new(0x10)));
    }

    #[test]
    fn test_extract_ignores_uppercase_digits()
    {
        // Debuggers print lowercase hex; uppercase is not an address rendering.
        assert_eq!(Address::extract("0xABC"), None);
    }

    #[test]
    fn test_strip_all_removes_surrounding_whitespace()
    {
        assert_eq!(Address::strip_all("(int *) 0x601040 <counter>"), "(int *)<counter>");
        assert_eq!(Address::strip_all("no address here"), "no address here");
    }

    #[test]
    fn test_from_str()
    {
        assert_eq!("0x1000".parse::<Address>(), Ok(Address::new(0x1000)));
        assert_eq!("4096".parse::<Address>(), Ok(Address::new(4096)));
        assert!("0xzz".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }
}
