use std::fmt;
use crate::errors::Result;
use crate::tracking::Renderer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into() }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Request: {} '{}'>", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/html; charset=utf-8".into())],
            body: body.into(),
        }
    }
}

/// The next link in the handler chain.
///
/// Handlers render templates through the [`Renderer`] they are given, which is
/// how a tracking session observes the context without the handler knowing
/// whether tracking is on.
pub trait Handler {
    fn handle(&self, request: &Request, renderer: &mut Renderer<'_>) -> Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Renderer<'_>) -> Result<Response>,
{
    fn handle(&self, request: &Request, renderer: &mut Renderer<'_>) -> Result<Response> {
        self(request, renderer)
    }
}
