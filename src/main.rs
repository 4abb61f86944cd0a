use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod dispatch;
mod error;
mod family;
mod render;
mod runner;
mod spec;
mod telemetry;

use dispatch::{Dispatcher, Invocation, SingleShotParams};
use family::DryRunFactory;
use runner::ThreadSleep;
use telemetry::LogFormat;

pub type Result<T> = anyhow::Result<T>;

const SINGLE_SHOT_FLAGS: [&str; 8] = [
    "spec",
    "schema",
    "no_schema",
    "json",
    "request",
    "enumerate",
    "sleep",
    "subscribe",
];

#[derive(Parser, Debug)]
#[command(name = "ynl-dispatch")]
#[command(
    about = "Issue do/dump/subscribe operations against a messaging family spec",
    long_about = "Issue do/dump/subscribe operations against a messaging family spec.\n\n\
                  The bundled family is a dry run: each call is checked against the spec \
                  and the request that would be sent is printed."
)]
struct Cli {
    /// Family specification file.
    #[arg(long, required_unless_present = "config")]
    spec: Option<PathBuf>,

    /// Schema to validate the spec against (wins over --no-schema).
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Skip schema validation.
    #[arg(long)]
    no_schema: bool,

    /// Attribute payload as a JSON object.
    #[arg(long)]
    json: Option<String>,

    /// Request/response operation to issue.
    #[arg(long = "do", value_name = "OP")]
    request: Option<String>,

    /// Enumeration operation to issue.
    #[arg(long = "dump", value_name = "OP")]
    enumerate: Option<String>,

    /// Seconds to wait after subscribing, before issuing operations.
    #[arg(long, value_name = "SECONDS")]
    sleep: Option<u64>,

    /// Notification group to subscribe to.
    #[arg(long, value_name = "GROUP")]
    subscribe: Option<String>,

    /// Batch configuration file; runs every entry it names.
    #[arg(long, conflicts_with_all = SINGLE_SHOT_FLAGS)]
    config: Option<PathBuf>,

    /// Log filter expression (falls back to RUST_LOG, then "warn").
    #[arg(long, value_name = "EXPR")]
    log_filter: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Cli {
    fn invocation(self) -> Result<Invocation> {
        if let Some(path) = self.config {
            return Ok(Invocation::Batch(path));
        }
        let spec = self
            .spec
            .ok_or_else(|| anyhow::anyhow!("--spec is required without --config"))?;
        Ok(Invocation::SingleShot(SingleShotParams {
            spec,
            schema: self.schema,
            no_schema: self.no_schema,
            json: self.json,
            request: self.request,
            enumerate: self.enumerate,
            sleep: self.sleep,
            subscribe: self.subscribe,
        }))
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Messages already embed their causes.
            let _ = writeln!(std::io::stderr(), "error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = std::env::var("RUST_LOG").ok();
    let filter = telemetry::resolve_filter(cli.log_filter.as_deref(), env_filter.as_deref());
    telemetry::initialise(&filter, cli.log_format)?;

    let invocation = cli.invocation()?;

    let factory = DryRunFactory;
    let pause = ThreadSleep;
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();

    Dispatcher::new(&factory, &pause, &mut stdout, &mut stderr).dispatch(invocation)
}
