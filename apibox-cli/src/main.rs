//! API Box CLI - inspect and exercise gateway route configuration

use anyhow::{Context, Result};
use apibox_core::logging::{init_tracing_with_filter, LogFormat};
use apibox_core::{
    authorize, load_main_config, ApiBoxError, AuthorizationEngine, Dispatch, MainConfig,
    RemoteConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;
use std::process;
use std::time::Instant;
use tracing::debug;

/// Exit code for a denied route
const EXIT_DENIED: i32 = 1;
/// Exit code for an unknown remote
const EXIT_NOT_FOUND: i32 = 2;

#[derive(Parser)]
#[command(name = "apibox")]
#[command(about = "API Box - route authorization for API gateways")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a path may be forwarded to a remote
    Check {
        /// Configuration file path
        #[arg(short, long)]
        config: String,

        /// Remote name
        #[arg(short, long)]
        remote: String,

        /// Request path, e.g. users/123/profile
        path: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show where an allowed request would be sent upstream
    Resolve {
        /// Configuration file path
        #[arg(short, long)]
        config: String,

        /// Remote name
        #[arg(short, long)]
        remote: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path
        path: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: String,
    },

    /// List restrictions, whitelists and route tables
    Routes {
        /// Configuration file path
        #[arg(short, long)]
        config: String,

        /// Only show this remote
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Run an authorization throughput benchmark
    Benchmark {
        /// Configuration file path
        #[arg(short, long)]
        config: String,

        /// Number of requests to generate
        #[arg(short, long, default_value = "10000")]
        requests: usize,

        /// Number of parallel threads
        #[arg(short, long, default_value = "8")]
        threads: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        init_tracing_with_filter(LogFormat::Pretty, "apibox=debug");
    }

    match cli.command {
        Commands::Check {
            config,
            remote,
            path,
            format,
        } => check_command(&config, &remote, &path, format),
        Commands::Resolve {
            config,
            remote,
            method,
            path,
        } => resolve_command(&config, &remote, &method, &path),
        Commands::Validate { file } => validate_command(&file),
        Commands::Routes { config, remote } => routes_command(&config, remote.as_deref()),
        Commands::Benchmark {
            config,
            requests,
            threads,
        } => benchmark_command(&config, requests, threads),
    }
}

fn load(path: &str) -> Result<MainConfig> {
    debug!("Loading configuration from {}", path);
    load_main_config(path).with_context(|| format!("Failed to load configuration: {}", path))
}

fn not_found(remote: &str) -> ! {
    eprintln!("{} Remote '{}' not found", "✗".red(), remote);
    process::exit(EXIT_NOT_FOUND);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckOutput<'a> {
    remote: &'a str,
    path: &'a str,
    allowed: bool,
    decision: apibox_core::Decision,
    matched_pattern: Option<&'a str>,
    reason: &'a str,
}

fn check_command(config_path: &str, remote: &str, path: &str, format: OutputFormat) -> Result<()> {
    let config = load(config_path)?;

    let result = match authorize(path, &config, remote) {
        Ok(result) => result,
        Err(ApiBoxError::RemoteNotFound(_)) => not_found(remote),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => {
            let output = CheckOutput {
                remote,
                path: &result.path,
                allowed: result.is_allowed(),
                decision: result.decision,
                matched_pattern: result.matched_pattern.as_deref(),
                reason: &result.explanation,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let status = if result.is_allowed() {
                "ALLOWED".green()
            } else {
                "DENIED".red()
            };

            println!("{} Route Check", "═".blue().bold());
            println!("{} Status: {}", "▸".blue(), status);
            println!("{} Remote: {}", "▸".blue(), remote);
            println!("{} Path: {}", "▸".blue(), result.path);
            println!("{} Decision: {:?}", "▸".blue(), result.decision);
            if let Some(pattern) = &result.matched_pattern {
                println!("{} Matched: {}", "▸".blue(), pattern);
            }
            println!("{} Explanation: {}", "▸".blue(), result.explanation);
            println!(
                "{} Evaluation time: {:.3}ms",
                "▸".blue(),
                result.evaluation_time_ns as f64 / 1_000_000.0
            );
        }
    }

    if !result.is_allowed() {
        process::exit(EXIT_DENIED);
    }
    Ok(())
}

fn resolve_command(config_path: &str, remote: &str, method: &str, path: &str) -> Result<()> {
    let engine = AuthorizationEngine::new(load(config_path)?);

    let dispatch = match engine.resolve(path, remote, method) {
        Ok(dispatch) => dispatch,
        Err(ApiBoxError::RemoteNotFound(_)) => not_found(remote),
        Err(e) => return Err(e.into()),
    };

    match dispatch {
        Dispatch::Denied(result) => {
            println!("{} {} {} is not allowed", "✗".red(), method, result.path);
            println!("  {}", result.explanation);
            process::exit(EXIT_DENIED);
        }
        Dispatch::Forward(route) => {
            println!("{} Dispatch Plan", "═".blue().bold());
            println!("{} Remote: {}", "▸".blue(), route.remote);
            println!(
                "{} Route: {}",
                "▸".blue(),
                route.route.as_deref().unwrap_or("(passthrough)")
            );
            println!("{} Method: {}", "▸".blue(), route.method);
            println!("{} Upstream path: {}", "▸".blue(), route.upstream_path);
            if let Some(url) = &route.upstream_url {
                println!("{} Upstream URL: {}", "▸".blue(), url);
            }
            for (name, value) in &route.captures.named {
                println!("  {} = {}", name, value);
            }
        }
    }
    Ok(())
}

fn validate_command(file: &str) -> Result<()> {
    println!("{} Validating {}...", "→".blue(), file);

    match load_main_config(file) {
        Ok(config) => {
            println!("{} Configuration is valid!", "✓".green());
            if let Some(name) = &config.name {
                println!("  Name: {}", name);
            }
            println!("  Global restrictions: {}", config.restricted_routes.len());
            println!("  Remotes: {}", config.remotes.len());
            for remote in config.remotes.values() {
                println!("    {} {}", "▸".blue(), summarize(remote));
            }
        }
        Err(e) => {
            println!("{} Configuration is invalid:", "✗".red());
            println!("  {}", e);
            process::exit(1);
        }
    }

    Ok(())
}

fn summarize(remote: &RemoteConfig) -> String {
    let mode = if remote.is_whitelisted() {
        "whitelist"
    } else {
        "default-allow"
    };
    format!(
        "{} ({}, {} restrictions, {} routes)",
        remote.name,
        mode,
        remote.restricted_routes.len(),
        remote.routes.len()
    )
}

fn routes_command(config_path: &str, only: Option<&str>) -> Result<()> {
    let config = load(config_path)?;

    let remotes: Vec<&RemoteConfig> = match only {
        Some(name) => match config.remote(name) {
            Ok(remote) => vec![remote],
            Err(_) => not_found(name),
        },
        None => config.remotes.values().collect(),
    };

    if !config.restricted_routes.is_empty() {
        println!("{} Global restrictions", "═".blue().bold());
        for pattern in &config.restricted_routes {
            println!("  {} {}", "✗".red(), pattern);
        }
    }

    for remote in remotes {
        println!("\n{} {}", "═".blue().bold(), remote.name.bold());
        if let Some(url) = &remote.url {
            println!("{} URL: {}", "▸".blue(), url);
        }
        if let Some(description) = &remote.description {
            println!("{} {}", "▸".blue(), description);
        }
        for pattern in &remote.restricted_routes {
            println!("  {} {}", "✗".red(), pattern);
        }
        if let Some(whitelist) = remote.whitelist() {
            for pattern in whitelist {
                println!("  {} {}", "✓".green(), pattern);
            }
        }
        for route in remote.routes.routes() {
            if route.is_remapped() {
                println!(
                    "  {} {} {} → {}",
                    "→".blue(),
                    route.method,
                    route.pattern,
                    route.upstream
                );
            } else {
                println!("  {} {} {}", "→".blue(), route.method, route.pattern);
            }
        }
    }

    Ok(())
}

/// Sample paths exercised against every remote
const BENCH_PATHS: &[&str] = &[
    "users",
    "users/123",
    "users/123/profile",
    "users/123/delete",
    "users/123/settings",
    "admin/dashboard",
    "posts/456/comments",
    "health",
];

fn benchmark_command(config_path: &str, requests: usize, threads: usize) -> Result<()> {
    use rayon::prelude::*;

    let config = load(config_path)?;
    let remotes: Vec<String> = config.remote_names().map(str::to_string).collect();
    if remotes.is_empty() {
        anyhow::bail!("Configuration defines no remotes");
    }

    println!("{} Running benchmark...", "→".blue());
    println!("  Requests: {}", requests);
    println!("  Threads: {}", threads);
    println!("  Remotes: {}", remotes.len());

    let engine = AuthorizationEngine::new(config);
    let work: Vec<(&str, &str)> = (0..requests)
        .map(|i| {
            (
                BENCH_PATHS[i % BENCH_PATHS.len()],
                remotes[i % remotes.len()].as_str(),
            )
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .context("Failed to build thread pool")?;

    let start = Instant::now();
    let allowed = pool.install(|| {
        work.par_iter()
            .filter(|(path, remote)| engine.is_allowed(path, remote).unwrap_or(false))
            .count()
    });
    let duration = start.elapsed();

    let metrics = engine.metrics().snapshot();
    let throughput = requests as f64 / duration.as_secs_f64();

    println!("\n{} Benchmark Results", "═".blue().bold());
    println!("{} Total requests: {}", "▸".blue(), requests);
    println!("{} Allowed: {}", "▸".blue(), allowed);
    println!("{} Denied: {}", "▸".blue(), requests - allowed);
    println!(
        "{} Denied by: global {}, remote {}, whitelist {}",
        "▸".blue(),
        metrics.deny_global,
        metrics.deny_remote,
        metrics.deny_not_whitelisted
    );
    println!("{} Duration: {:.3}s", "▸".blue(), duration.as_secs_f64());
    println!("{} Throughput: {:.0} req/sec", "▸".blue(), throughput);
    println!(
        "{} Avg latency: {:.3}µs",
        "▸".blue(),
        duration.as_secs_f64() * 1_000_000.0 / requests.max(1) as f64
    );

    Ok(())
}
