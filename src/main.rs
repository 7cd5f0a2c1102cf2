use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use serde_json::{Map, Value};
use tracing::error;
use unused_context::{
    Context, Error, Handler, Renderer, Request, Response, Settings, Template,
    UnusedContextMiddleware,
};

/// Render one template through the unused-context middleware and print it.
/// Warnings about unread context keys go to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Template file to render
    #[arg(long)]
    template: PathBuf,
    /// Context as a JSON object
    #[arg(long, default_value = "{}")]
    context: String,
    /// Request path the render is attributed to
    #[arg(long, default_value = "/")]
    path: String,
    #[arg(long, default_value = "GET")]
    method: String,
    /// JSON settings file (DEBUG, UNUSED_CONTEXT_ALWAYS, UNUSED_CONTEXT_IGNORE, ...)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Force DEBUG on
    #[arg(long)]
    debug: bool,
    /// Track even without DEBUG
    #[arg(long)]
    always: bool,
    /// Extra key to never report (repeatable)
    #[arg(long = "ignore")]
    ignore: Vec<String>,
}

/// Loads its template on every request, the way a view would.
struct RenderFile {
    template: PathBuf,
    context: Map<String, Value>,
}

impl Handler for RenderFile {
    fn handle(&self, _request: &Request, renderer: &mut Renderer<'_>) -> unused_context::Result<Response> {
        let source = std::fs::read_to_string(&self.template)
            .map_err(|e| Error::Handler(format!("{}: {e}", self.template.display())))?;
        let template = Template::parse(&source)?;
        let mut ctx = Context::from_map(self.context.clone());
        Ok(Response::ok(renderer.render(&template, &mut ctx)?))
    }
}

/// `--context` must be a JSON object; anything else could never be a scope layer.
fn parse_context(raw: &str) -> unused_context::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Config(format!("--context must be a JSON object, got {other}"))),
    }
}

fn run(args: Args) -> unused_context::Result<String> {
    let mut settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    settings.debug |= args.debug;
    settings.always |= args.always;
    settings.ignore.extend(args.ignore);

    let handler = RenderFile {
        template: args.template,
        context: parse_context(&args.context)?,
    };

    let middleware = UnusedContextMiddleware::new(handler, settings);
    let response = middleware.call(&Request::new(args.method, args.path))?;
    Ok(response.body)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
