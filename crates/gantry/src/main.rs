//! Gantry CLI
//!
//! Usage:
//!   gantry call <manifest> <Resource.method> [-p key=value]... [--fixtures <file>] [--callback]
//!   gantry routes <manifest>

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gantry::fixture::load_fixtures;
use gantry::routes::describe_routes;
use gantry::{Callback, Client, FixtureRegistry, Manifest, Params, Promise, ReqwestTransport};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(author, version, about = "Call manifest-described HTTP APIs, live or from fixtures")]
struct Args {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Perform one call and print its result
    Call {
        /// Manifest file (YAML or JSON)
        manifest: PathBuf,

        /// Method to call, as Resource.method
        target: String,

        /// Call parameter; values are parsed as JSON when possible
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Answer from this fixture file instead of the network
        #[arg(short, long, env = "GANTRY_FIXTURES")]
        fixtures: Option<PathBuf>,

        /// Deliver the result through done/fail handlers
        #[arg(long)]
        callback: bool,
    },

    /// List resources, methods and the rules that apply to them
    Routes {
        /// Manifest file (YAML or JSON)
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let outcome = match args.command {
        Command::Call {
            manifest,
            target,
            params,
            fixtures,
            callback,
        } => run_call(manifest, &target, &params, fixtures, callback).await,
        Command::Routes { manifest } => run_routes(manifest),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{RED}error:{RESET} {e:#}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gantry=debug" } else { "gantry=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_target(target: &str) -> anyhow::Result<(&str, &str)> {
    match target.split_once('.') {
        Some((resource, method)) if !resource.is_empty() && !method.is_empty() => {
            Ok((resource, method))
        }
        _ => bail!("target must look like Resource.method, got '{target}'"),
    }
}

fn parse_params(raw: &[String]) -> anyhow::Result<Params> {
    let mut params = Params::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("parameter must look like key=value, got '{pair}'"))?;
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(params)
}

/// Returns whether the call succeeded.
async fn run_call(
    manifest_path: PathBuf,
    target: &str,
    raw_params: &[String],
    fixtures: Option<PathBuf>,
    callback: bool,
) -> anyhow::Result<bool> {
    let manifest = Manifest::from_file(&manifest_path)?;
    let (resource, method) = parse_target(target)?;
    let params = Value::Object(parse_params(raw_params)?);

    let mut builder = Client::builder(manifest);
    match fixtures {
        Some(path) => {
            let registry = FixtureRegistry::new();
            load_fixtures(&path, &registry)?;
            builder = builder.fixtures(registry);
        }
        None => builder = builder.transport(ReqwestTransport::new()),
    }

    info!("Calling {}.{}", resource, method);

    if callback {
        let client: Client<Callback> = builder.build();
        let printed = Arc::new(Mutex::new(Vec::new()));
        let (on_done, on_fail) = (Arc::clone(&printed), Arc::clone(&printed));

        let succeeded = client
            .call(resource, method, params)?
            .done(move |success| {
                on_done
                    .lock()
                    .push(format_success(&success.data, success.stats.status));
            })
            .fail(move |request, err| {
                on_fail.lock().push(format_failure(request.status, err));
            })
            .await
            .is_ok();

        for line in printed.lock().iter() {
            println!("{line}");
        }
        Ok(succeeded)
    } else {
        let client: Client<Promise> = builder.build();
        match client.call(resource, method, params)?.await {
            Ok(success) => {
                println!("{}", format_success(&success.data, success.stats.status));
                Ok(true)
            }
            Err(failure) => {
                let body = failure.err.first().cloned().unwrap_or(Value::Null);
                println!("{}", format_failure(failure.request.status, &body));
                Ok(false)
            }
        }
    }
}

fn format_success(data: &Value, status: u16) -> String {
    let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!("{GREEN}{BOLD}✓ {status}{RESET}\n{body}")
}

fn format_failure(status: u16, body: &Value) -> String {
    let body = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    format!("{RED}{BOLD}✗ {status}{RESET}\n{body}")
}

fn run_routes(manifest_path: PathBuf) -> anyhow::Result<bool> {
    let manifest = Manifest::from_file(&manifest_path)?;

    println!("{BOLD}{CYAN}{}{RESET}", manifest.host());
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");

    for route in describe_routes(&manifest) {
        let rules = if route.rules.is_empty() {
            String::new()
        } else {
            let indices: Vec<String> = route.rules.iter().map(|i| format!("#{i}")).collect();
            format!(" {DIM}rules {}{RESET}", indices.join(","))
        };
        println!(
            "{BOLD}{}.{}{RESET} {:<7} {}{}",
            route.resource, route.method, route.verb, route.url, rules
        );
    }

    Ok(true)
}
