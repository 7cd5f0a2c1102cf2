use std::sync::Arc;
use tracing::trace;
use crate::config::Settings;
use crate::errors::Result;
use crate::request::{Handler, Request, Response};
use crate::tracking::{warn_unused_context, Renderer};
use crate::warning::{StreamSink, WarningSink};

/// Logs a warning for every request whose templates left context keys unread.
///
/// Tracking only happens when `DEBUG` or `UNUSED_CONTEXT_ALWAYS` is set; in
/// every other case the handler is called directly. The response is returned
/// as the handler produced it either way.
///
/// Each warning is logged under the `unused_context` target and also handed to
/// a [`WarningSink`], which writes `UserWarning: ...` lines to stderr unless
/// replaced with [`with_sink`](Self::with_sink).
pub struct UnusedContextMiddleware<H> {
    handler: H,
    settings: Settings,
    sink: Arc<dyn WarningSink>,
}

impl<H: Handler> UnusedContextMiddleware<H> {
    pub fn new(handler: H, settings: Settings) -> Self {
        Self { handler, settings, sink: Arc::new(StreamSink::stderr()) }
    }

    /// Deliver runtime warnings to `sink` instead of stderr. Pass a
    /// [`NullSink`](crate::warning::NullSink) to keep only the log line.
    pub fn with_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn call(&self, request: &Request) -> Result<Response> {
        if !self.settings.should_track() {
            trace!(path = %request.path, "context tracking disabled");
            return self.handler.handle(request, &mut Renderer::passthrough());
        }
        warn_unused_context(request, &self.settings, self.sink.as_ref(), |renderer| {
            self.handler.handle(request, renderer)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::errors::Error;
    use crate::warning::WarningRecorder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    type View = fn(&Request, &mut Renderer<'_>) -> Result<Response>;

    fn unused_view(_req: &Request, r: &mut Renderer<'_>) -> Result<Response> {
        let mut ctx = Context::from_value(json!({"name": "example_name"}));
        Ok(Response::ok(r.render_str("static", &mut ctx)?))
    }

    fn mw(settings: Settings) -> (UnusedContextMiddleware<View>, Arc<WarningRecorder>) {
        let rec = Arc::new(WarningRecorder::new());
        let view: View = unused_view;
        (UnusedContextMiddleware::new(view, settings).with_sink(rec.clone()), rec)
    }

    #[test]
    fn disabled_by_default() {
        let (m, rec) = mw(Settings::default());
        let resp = m.call(&Request::get("/")).unwrap();
        assert_eq!(resp, Response::ok("static"));
        assert!(rec.is_empty());
    }

    #[test]
    fn debug_turns_tracking_on() {
        let (m, rec) = mw(Settings { debug: true, ..Settings::default() });
        let resp = m.call(&Request::get("/")).unwrap();
        assert_eq!(resp, Response::ok("static"));
        assert_eq!(rec.len(), 1);
    }

    fn failing_view(_req: &Request, r: &mut Renderer<'_>) -> Result<Response> {
        let mut ctx = Context::from_value(json!({"name": "example_name"}));
        r.render_str("static", &mut ctx)?;
        Err(Error::Handler("upstream unavailable".into()))
    }

    #[test]
    fn handler_error_propagates_without_warning() {
        let rec = Arc::new(WarningRecorder::new());
        let view: View = failing_view;
        let m = UnusedContextMiddleware::new(view, Settings { debug: true, ..Settings::default() })
            .with_sink(rec.clone());
        let err = m.call(&Request::get("/")).unwrap_err();
        assert!(matches!(err, Error::Handler(ref msg) if msg == "upstream unavailable"));
        assert!(rec.is_empty());
    }

    #[test]
    fn custom_exclude_prefix() {
        let (m, rec) = mw(Settings {
            debug: true,
            exclude: vec!["/internal".into()],
            ..Settings::default()
        });
        m.call(&Request::get("/internal/health")).unwrap();
        assert!(rec.is_empty());
        m.call(&Request::get("/admin/")).unwrap();
        assert_eq!(rec.len(), 1);
    }
}
