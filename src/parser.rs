// src/parser.rs
use serde_json::Value;
use crate::errors::Error;

#[derive(Debug)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::InvalidSyntax(msg) => Error::Template(msg),
        }
    }
}

/// Character cursor shared by the template scanner and the tag parsers.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Dotted variable path such as `user.address.city` or `items.0`.
    pub fn parse_var_path(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parts = vec![self.parse_identifier()?];
        while self.consume_char('.') {
            parts.push(self.parse_identifier()?);
        }
        Ok(parts)
    }

    pub fn parse_number_literal(&mut self) -> Result<Value, ParseError> {
        let start = self.i;
        if self.peek_char() == Some('-') {
            self.i += 1;
        }
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            self.i += 1;
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.i += 1;
                } else {
                    break;
                }
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() || s == "-" {
            return Err(ParseError::InvalidSyntax("number expected".into()));
        }
        if s.contains('.') {
            let f: f64 = s
                .parse()
                .map_err(|_| ParseError::InvalidSyntax("bad float".into()))?;
            Ok(Value::from(f))
        } else {
            let i: i64 = s
                .parse()
                .map_err(|_| ParseError::InvalidSyntax("bad int".into()))?;
            Ok(Value::from(i))
        }
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
    }

    /// Consume and return everything before the next `lit`, leaving the cursor
    /// on `lit`. Returns `None` (cursor untouched) when `lit` never appears.
    pub fn take_until(&mut self, lit: &str) -> Option<&'a str> {
        let rest = &self.s[self.i..];
        let off = rest.find(lit)?;
        self.i += off;
        Some(&rest[..off])
    }

    /// Byte distance from the cursor to the next `lit`, if any.
    pub fn offset_of(&self, lit: &str) -> Option<usize> {
        self.s[self.i..].find(lit)
    }

    /// Consume the remainder of the input.
    pub fn take_rest(&mut self) -> &'a str {
        let rest = &self.s[self.i..];
        self.i = self.s.len();
        rest
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!("expected '{}'", c)))
        }
    }

    pub fn expect_str(&mut self, lit: &str) -> Result<(), ParseError> {
        if self.consume_str(lit) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!("expected '{lit}'")))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn var_path_splits_on_dots() {
        let mut p = Parser::new("user.address.city }}");
        assert_eq!(p.parse_var_path().unwrap(), vec!["user", "address", "city"]);
        p.skip_ws();
        assert!(p.peek_str("}}"));
    }

    #[test]
    fn take_until_leaves_cursor_on_delimiter() {
        let mut p = Parser::new("hello {{ x }}");
        assert_eq!(p.take_until("{{"), Some("hello "));
        assert!(p.consume_str("{{"));
        assert_eq!(p.take_until("%}"), None);
        assert_eq!(p.take_rest(), " x }}");
        assert!(p.eof());
    }

    #[test]
    fn quoted_string_escapes() {
        let mut p = Parser::new(r#""a\"b\n""#);
        assert_eq!(p.parse_quoted_string().unwrap(), "a\"b\n");
    }
}
