//! Access expression parser.
//!
//! Grammar (whitespace allowed between tokens):
//!
//! ```text
//! expr   := '*'* ident (('.' | '->') ident)*
//! ident  := [A-Za-z_$] [A-Za-z0-9_$:]*
//! ```
//!
//! As in C, a leading `*` applies to the whole member chain: `*a->b` is
//! `*(a->b)`.

use crate::error::{ProviderError, ProviderResult};

/// How a member is reached from the value before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step
{
    Dot,
    Arrow,
}

/// A parsed access expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPath
{
    pub derefs: usize,
    pub root: String,
    pub members: Vec<(Step, String)>,
}

impl AccessPath
{
    /// Parse `text`.
    ///
    /// ## Errors
    ///
    /// Returns `ProviderError::Evaluation` describing the first syntax error.
    pub fn parse(text: &str) -> ProviderResult<Self>
    {
        let mut cursor = Cursor::new(text);

        let mut derefs = 0;
        while cursor.eat("*") {
            derefs += 1;
        }
        let root = cursor.ident()?;

        let mut members = Vec::new();
        loop {
            let step = if cursor.eat("->") {
                Step::Arrow
            } else if cursor.eat(".") {
                Step::Dot
            } else {
                break;
            };
            members.push((step, cursor.ident()?));
        }

        cursor.skip_whitespace();
        if let Some(rest) = cursor.rest() {
            return Err(ProviderError::Evaluation(format!("A syntax error in expression, near `{rest}'.")));
        }

        Ok(Self { derefs, root, members })
    }
}

struct Cursor<'a>
{
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a>
{
    fn new(text: &'a str) -> Self
    {
        Self { text, pos: 0 }
    }

    fn skip_whitespace(&mut self)
    {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool
    {
        self.skip_whitespace();
        if self.text[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> ProviderResult<String>
    {
        self.skip_whitespace();
        let rest = &self.text[self.pos..];
        let mut chars = rest.char_indices();

        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
            _ => {
                let near = if rest.is_empty() { "end of expression" } else { rest };
                return Err(ProviderError::Evaluation(format!("A syntax error in expression, near `{near}'.")));
            }
        }

        let end = chars
            .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == ':'))
            .map_or(rest.len(), |(index, _)| index);
        self.pos += end;
        Ok(rest[..end].to_string())
    }

    fn rest(&self) -> Option<&'a str>
    {
        let rest = &self.text[self.pos..];
        (!rest.is_empty()).then_some(rest)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_member_chain()
    {
        let path = AccessPath::parse("root.cache->table . name").unwrap();
        assert_eq!(path.derefs, 0);
        assert_eq!(path.root, "root");
        assert_eq!(
            path.members,
            vec![
                (Step::Dot, "cache".to_string()),
                (Step::Arrow, "table".to_string()),
                (Step::Dot, "name".to_string())
            ]
        );
    }

    #[test]
    fn test_leading_derefs_and_qualified_names()
    {
        let path = AccessPath::parse("**ns::global_ptr").unwrap();
        assert_eq!(path.derefs, 2);
        assert_eq!(path.root, "ns::global_ptr");
        assert!(path.members.is_empty());
    }

    #[test]
    fn test_syntax_errors()
    {
        for text in ["", "root.", "root->", "1abc", "root + 1", "root..x"] {
            let err = AccessPath::parse(text).unwrap_err();
            assert!(matches!(err, ProviderError::Evaluation(_)), "{text}: {err}");
        }
    }
}
