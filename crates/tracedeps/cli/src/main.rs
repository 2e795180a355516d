// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! tracedeps CLI Tool
//!
//! Command-line interface for resolving build dependencies from a trace dump.

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracedeps_common::{TraceDump, TraceIndex};
use tracedeps_core::{
    CancellationToken, CommandExclusion, DependencyReport, DependencyResolver, ExclusionConfig, ResolveError,
    ResolveOptions, resolve_each, resolve_each_with_config,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "tracedeps")]
#[command(about = "tracedeps - Build trace dependency resolver")]
#[command(version = "0.1.0")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the files and processes the given outputs depend on
    Deps(DepsArgs),
    /// Print summary counts of a trace dump
    Info {
        /// Trace dump (JSON)
        trace: PathBuf,
    },
}

#[derive(Args)]
struct DepsArgs {
    /// Trace dump (JSON)
    trace: PathBuf,
    /// Output paths to resolve
    #[arg(required = true)]
    roots: Vec<String>,
    /// Do not expand through other linked modules
    #[arg(long)]
    direct: bool,
    /// Attribute wrapped processes to their wrapper
    #[arg(long)]
    wrap_deps: bool,
    /// Do not follow pipes between writers
    #[arg(long)]
    no_pipes: bool,
    /// Invert path and command pattern matching
    #[arg(long)]
    negate_pattern: bool,
    /// Build the per-file dependency graph
    #[arg(long)]
    dep_graph: bool,
    /// Validate arguments without traversing
    #[arg(long)]
    dry_run: bool,
    /// Abort after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
    /// Never report or traverse this path
    #[arg(long = "exclude-file", value_name = "PATH")]
    exclude_files: Vec<String>,
    /// Exclude dependency paths matching this glob
    #[arg(long = "exclude-pattern", value_name = "GLOB")]
    exclude_patterns: Vec<String>,
    /// Exclude writers whose command line matches this glob
    #[arg(long = "exclude-command", value_name = "GLOB")]
    exclude_commands: Vec<String>,
    /// Exclude writers by precomputed command pattern index
    #[arg(long = "exclude-command-index", value_name = "N")]
    exclude_command_indices: Vec<usize>,
    /// Linked module path; replaces the trace's own module list
    #[arg(long = "module", value_name = "PATH")]
    modules: Vec<String>,
    /// Per-root exclusion config (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Resolve every root independently
    #[arg(long)]
    per_root: bool,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl DepsArgs {
    fn options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::new()
            .with_direct_only(self.direct)
            .with_wrap_deps(self.wrap_deps)
            .with_pipes(!self.no_pipes)
            .with_negate_pattern(self.negate_pattern)
            .with_dep_graph(self.dep_graph)
            .with_dry_run(self.dry_run);
        if let Some(secs) = self.timeout {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options.exclude_files = self.exclude_files.clone();
        options.exclude_patterns = self.exclude_patterns.clone();
        options.exclude_commands = if !self.exclude_command_indices.is_empty() {
            CommandExclusion::Precomputed(self.exclude_command_indices.clone())
        } else if !self.exclude_commands.is_empty() {
            CommandExclusion::Patterns(self.exclude_commands.clone())
        } else {
            CommandExclusion::None
        };
        if !self.modules.is_empty() {
            options = options.with_modules(self.modules.iter().cloned());
        }
        options
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let result = match cli.command {
        Commands::Deps(args) => handle_deps(&args, &token),
        Commands::Info { trace } => handle_info(&trace),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        let cancelled = e.downcast_ref::<ResolveError>().is_some_and(ResolveError::is_cancelled);
        process::exit(if cancelled { EXIT_INTERRUPTED } else { EXIT_FAILURE });
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_index(path: &Path) -> anyhow::Result<TraceIndex> {
    let dump = TraceDump::from_path(path).with_context(|| format!("Failed to load trace {}", path.display()))?;
    let index = dump.into_index()?;
    let stats = index.stats();
    info!("Loaded trace {} ({} executions, {} files)", path.display(), stats.executions, stats.files);
    Ok(index)
}

fn handle_deps(args: &DepsArgs, token: &CancellationToken) -> anyhow::Result<()> {
    let index = load_index(&args.trace)?;
    let base = args.options();
    let config = args.config.as_deref().map(ExclusionConfig::from_path).transpose()?;

    if args.per_root {
        let results = match &config {
            Some(config) => resolve_each_with_config(&index, &args.roots, &base, config, Some(token)),
            None => resolve_each(&index, &args.roots, &base, Some(token)),
        };
        let mut reports = Vec::with_capacity(results.len());
        for (root, result) in args.roots.iter().zip(results) {
            let result = result.with_context(|| format!("Failed to resolve {root}"))?;
            reports.push((root.as_str(), result.to_report(&index)?));
        }
        if args.json {
            let json: Vec<_> = reports
                .iter()
                .map(|(root, report)| serde_json::json!({ "root": root, "report": report }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            for (root, report) in &reports {
                println!("== {root}");
                print_report(report);
            }
        }
        return Ok(());
    }

    let options = match &config {
        Some(config) => args.roots.iter().try_fold(base, |options, root| config.options_for(root, &options))?,
        None => base,
    };
    let result = DependencyResolver::new(&index)
        .with_cancellation(token.clone())
        .resolve(&args.roots, &options)?;
    let report = result.to_report(&index)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &DependencyReport) {
    for file in &report.dependency_files {
        println!("{file}");
    }
    let pids: Vec<String> = report.writing_pids.iter().map(|pid| pid.to_string()).collect();
    println!("writing processes: {}", pids.join(" "));

    if let Some(graph) = &report.graph {
        for (file, entry) in graph {
            println!("{file}:");
            for producer in &entry.producers {
                let command = producer.commands.first().map(String::as_str).unwrap_or("<none>");
                println!("  [{}] $ {}", producer.pid, command);
                for read in &producer.reads {
                    println!("    {read}");
                }
            }
            if !entry.intermediates.is_empty() {
                println!("  intermediates: {}", entry.intermediates.join(" "));
            }
        }
    }
}

fn handle_info(path: &Path) -> anyhow::Result<()> {
    let index = load_index(path)?;
    let stats = index.stats();
    println!("Executions:       {}", stats.executions);
    println!("Processes:        {}", stats.processes);
    println!("Files:            {}", stats.files);
    println!("Written files:    {}", stats.written_files);
    println!("Opens:            {}", stats.opens);
    println!("Linked modules:   {}", stats.modules);
    println!("Pipe edges:       {}", stats.pipe_edges);
    println!("Command patterns: {}", stats.command_patterns);
    println!("Strings:          {}", stats.strings);
    Ok(())
}
