pub mod errors;
pub mod config;
pub mod context;
pub mod template;
pub mod request;
pub mod tracking;   // session + proxy; the part that actually observes the render
pub mod middleware;
pub mod warning;
mod parser;

pub use config::Settings;
pub use context::{Context, RenderContext};
pub use errors::{Error, Result};
pub use middleware::UnusedContextMiddleware;
pub use request::{Handler, Request, Response};
pub use template::Template;
pub use tracking::{warn_unused_context, Renderer, Session, TrackingContext, IGNORE_DEFAULTS};
pub use warning::{NullSink, StreamSink, UnusedContextWarning, WarningRecorder, WarningSink};
