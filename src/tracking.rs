//! Per-request tracking of which context keys were written and which were read.
//!
//! A [`Session`] owns the bookkeeping for one request. Each render done through
//! a tracking [`Renderer`] wraps its context in a [`TrackingContext`] proxy, so
//! nothing shared is patched and independent requests can be tracked at the
//! same time.

use std::collections::BTreeSet;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use crate::config::Settings;
use crate::context::RenderContext;
use crate::errors::Result;
use crate::request::Request;
use crate::template::Template;
use crate::warning::{UnusedContextWarning, WarningSink};

/// Keys the framework injects into most contexts; never reported.
pub const IGNORE_DEFAULTS: &[&str] = &[
    "block",                  // overriding a block without calling block.super
    "csrf_token",
    "DEFAULT_MESSAGE_LEVELS", // messages framework
    "False",
    "forloop",
    "is_paginated",           // list views that skip pagination
    "None",
    "page_obj",
    "paginator",
    "perms",                  // login_required templates
    "root_urlconf",           // 404 pages
    "settings",
    "site",                   // login page
    "site_name",
    "True",
    "view",                   // password reset page
];

#[derive(Debug, Clone, Default)]
pub struct Session {
    all_keys: BTreeSet<String>,
    used_keys: BTreeSet<String>,
}

impl Session {
    /// New session with `used_keys` seeded from [`IGNORE_DEFAULTS`] and `extra_ignore`.
    pub fn new<I, S>(extra_ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let used_keys = IGNORE_DEFAULTS
            .iter()
            .map(|k| k.to_string())
            .chain(extra_ignore.into_iter().map(|k| k.as_ref().to_string()))
            .collect();
        Self { all_keys: BTreeSet::new(), used_keys }
    }

    pub fn record_write<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_keys.extend(keys.into_iter().map(Into::into));
    }

    pub fn record_read(&mut self, key: &str) {
        self.used_keys.insert(key.to_owned());
    }

    pub fn all_keys(&self) -> &BTreeSet<String> {
        &self.all_keys
    }

    pub fn used_keys(&self) -> &BTreeSet<String> {
        &self.used_keys
    }

    /// `all_keys - used_keys`.
    pub fn unused(&self) -> BTreeSet<String> {
        self.all_keys.difference(&self.used_keys).cloned().collect()
    }

    pub fn report(&self, request: &Request) -> Option<UnusedContextWarning> {
        let keys = self.unused();
        if keys.is_empty() {
            return None;
        }
        Some(UnusedContextWarning { request: request.to_string(), keys })
    }
}

/// Proxy over a render context that records reads and writes into a session.
///
/// Reads and writes are forwarded unchanged. After every write the whole
/// context is flattened and all visible keys count as written, whatever their
/// value; a snapshot is also taken when the proxy is created so keys present
/// before the render are included.
pub struct TrackingContext<'a, C: RenderContext + ?Sized> {
    inner: &'a mut C,
    session: &'a mut Session,
}

impl<'a, C: RenderContext + ?Sized> TrackingContext<'a, C> {
    pub fn new(inner: &'a mut C, session: &'a mut Session) -> Result<Self> {
        let mut proxy = Self { inner, session };
        proxy.observe()?;
        Ok(proxy)
    }

    fn observe(&mut self) -> Result<()> {
        match self.inner.flatten() {
            Ok(flat) => {
                self.session.record_write(flat.into_iter().map(|(k, _)| k));
                Ok(())
            }
            Err(e) => {
                // Usually a tag pushed a whole context where a mapping belongs.
                error!(error = %e, "context could not be flattened");
                Err(e)
            }
        }
    }
}

impl<'a, C: RenderContext + ?Sized> RenderContext for TrackingContext<'a, C> {
    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.inner.set(key, value)?;
        self.observe()
    }

    fn get(&mut self, key: &str) -> Option<&Value> {
        self.session.record_read(key);
        self.inner.get(key)
    }

    fn flatten(&self) -> Result<Map<String, Value>> {
        self.inner.flatten()
    }
}

/// Renders templates for a handler, observing them when a session is attached.
pub struct Renderer<'s> {
    session: Option<&'s mut Session>,
}

impl Renderer<'static> {
    /// Renders without any tracking.
    pub fn passthrough() -> Self {
        Self { session: None }
    }
}

impl<'s> Renderer<'s> {
    pub fn tracking(session: &'s mut Session) -> Self {
        Self { session: Some(session) }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    pub fn render(&mut self, template: &Template, ctx: &mut dyn RenderContext) -> Result<String> {
        match self.session.as_deref_mut() {
            Some(session) => {
                let mut proxy = TrackingContext::new(ctx, session)?;
                template.render(&mut proxy)
            }
            None => template.render(ctx),
        }
    }

    /// Parse and render in one step.
    pub fn render_str(&mut self, source: &str, ctx: &mut dyn RenderContext) -> Result<String> {
        let template = Template::parse(source)?;
        self.render(&template, ctx)
    }
}

/// Run `operation` inside a tracking session for `request` and report the
/// keys it left unread.
///
/// Excluded paths run untracked. When `operation` fails its error is returned
/// and nothing is reported. Otherwise, if any key was written but never read,
/// one warning goes to `sink` and one line is logged.
pub fn warn_unused_context<T, F>(
    request: &Request,
    settings: &Settings,
    sink: &dyn WarningSink,
    operation: F,
) -> Result<T>
where
    F: FnOnce(&mut Renderer<'_>) -> Result<T>,
{
    if settings.is_excluded(&request.path) {
        debug!(path = %request.path, "path excluded from context tracking");
        return operation(&mut Renderer::passthrough());
    }

    let mut session = Session::new(&settings.ignore);
    let out = operation(&mut Renderer::tracking(&mut session))?;

    if let Some(warning) = session.report(request) {
        warn!(target: "unused_context", "{warning}");
        sink.warn(&warning);
    }
    Ok(out)
}
