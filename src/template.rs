//! A deliberately small template language, enough to drive a render context
//! through real reads and writes.
//!
//! Supported syntax:
//! - `{{ name }}` and `{{ user.address.city }}` print a variable
//! - `{% set key = "literal" %}`, `{% set key = 12 %}` or `{% set key = other.path %}`
//!   write into the context
//! - `{# comment #}` is dropped

use serde_json::Value;
use tracing::trace;
use crate::context::RenderContext;
use crate::errors::Result;
use crate::parser::{ParseError, Parser};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Var(Vec<String>),
    Set { key: String, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut p = Parser::new(source);
        let mut nodes = Vec::new();
        while !p.eof() {
            let text = match next_open(&p) {
                Some(open) => p.take_until(open).unwrap_or_default(),
                None => p.take_rest(),
            };
            if !text.is_empty() {
                nodes.push(Node::Text(text.to_string()));
            }
            if p.consume_str("{{") {
                p.skip_ws();
                let path = p.parse_var_path()?;
                p.skip_ws();
                p.expect_str("}}")?;
                nodes.push(Node::Var(path));
            } else if p.consume_str("{%") {
                nodes.push(parse_tag(&mut p)?);
            } else if p.consume_str("{#") {
                if p.take_until("#}").is_none() {
                    return Err(ParseError::InvalidSyntax("unterminated comment".into()).into());
                }
                p.expect_str("#}")?;
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against any context; every lookup and write goes through `ctx`.
    pub fn render(&self, ctx: &mut dyn RenderContext) -> Result<String> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Var(path) => {
                    if let Some(v) = resolve(ctx, path) {
                        display(&v, &mut out);
                    }
                }
                Node::Set { key, value } => {
                    let v = match value {
                        Expr::Literal(v) => v.clone(),
                        Expr::Var(path) => resolve(ctx, path).unwrap_or(Value::Null),
                    };
                    trace!(key = %key, "template set");
                    ctx.set(key, v)?;
                }
            }
        }
        Ok(out)
    }
}

// Whichever opening delimiter comes first in the unread input.
fn next_open(p: &Parser) -> Option<&'static str> {
    ["{{", "{%", "{#"]
        .into_iter()
        .filter_map(|open| p.offset_of(open).map(|off| (off, open)))
        .min_by_key(|(off, _)| *off)
        .map(|(_, open)| open)
}

fn parse_tag(p: &mut Parser) -> Result<Node> {
    p.skip_ws();
    let name = p.parse_identifier()?;
    if name != "set" {
        return Err(ParseError::InvalidSyntax(format!("unknown tag `{name}`")).into());
    }
    p.skip_ws();
    let key = p.parse_identifier()?;
    p.skip_ws();
    p.expect('=')?;
    p.skip_ws();
    let value = parse_expr(p)?;
    p.skip_ws();
    p.expect_str("%}")?;
    Ok(Node::Set { key, value })
}

fn parse_expr(p: &mut Parser) -> Result<Expr> {
    let expr = match p.peek_char() {
        Some('"') | Some('\'') => Expr::Literal(Value::String(p.parse_quoted_string()?)),
        Some(c) if c == '-' || c.is_ascii_digit() => Expr::Literal(p.parse_number_literal()?),
        _ => {
            let path = p.parse_var_path()?;
            match (path.len(), path[0].as_str()) {
                (1, "true") => Expr::Literal(Value::Bool(true)),
                (1, "false") => Expr::Literal(Value::Bool(false)),
                (1, "null") => Expr::Literal(Value::Null),
                _ => Expr::Var(path),
            }
        }
    };
    Ok(expr)
}

// Only the head of a dotted path is a context read; the rest walks the value.
fn resolve(ctx: &mut dyn RenderContext, path: &[String]) -> Option<Value> {
    let (head, rest) = path.split_first()?;
    let mut cur = ctx.get(head)?;
    for part in rest {
        cur = match cur {
            Value::Object(m) => m.get(part)?,
            Value::Array(a) => a.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur.clone())
}

fn display(v: &Value, out: &mut String) {
    match v {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}
