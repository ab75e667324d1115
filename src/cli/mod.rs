//! `splicer` command line driver
//!
//! Expands every host file into `<out-dir>/<path>`: the rewritten host file
//! keeps its name, the foreign unit sits next to it with an `.rs` extension.
//! Files are independent units and are expanded in parallel.

use crate::codegen::host::{Haskell, HostSyntax};
use crate::codegen::symbol::unit_tag;
use crate::core::context::TypeContext;
use crate::emit::FlushError;
use crate::errors::ExpandError;
use crate::frontend::config::{Config, ConfigError, CONFIG_FILE};
use crate::infrastructure::logging::LogFormat;
use crate::session::bridge::HostScope;
use crate::session::rewrite::expand_source;
use crate::session::unit::{CompilationUnit, UnitOptions, UnitSummary};
use crate::toolchain::{artifact_dir, LinkSpec, RustcInvocation, ToolchainError};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "splicer")]
#[command(about = "Expand inline Rust quasi-quotes into FFI boundary code", long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Write JSON logs to a daily file in DIR instead of stderr
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Config file (defaults to the nearest splicer.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Expand host files, glob patterns or directories
    Expand {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,

        /// Output directory (overrides [output].dir)
        #[arg(short, long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Compile each foreign unit with rustc
        #[arg(long)]
        compile: bool,

        /// Write a JSON manifest of every call site
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Print cargo link directives after compiling
        #[arg(long)]
        print_link: bool,
    },

    /// Write a default splicer.toml
    Init {
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the type correspondences of the configured context
    Types,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("invalid glob pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("{} has the `.rs` extension of generated foreign units", .0.display())]
    ForeignExtension(PathBuf),

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("{} already exists (use --force to overwrite)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Outcome of one host file.
#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub source: PathBuf,
    pub host_output: PathBuf,
    #[serde(flatten)]
    pub summary: UnitSummary,
    pub duration_ms: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct Manifest {
    pub units: Vec<UnitReport>,
    pub cargo_directives: Vec<String>,
    pub linker_flags: Vec<String>,
}

pub enum FileOutcome {
    Expanded(UnitReport, Option<LinkSpec>),
    Failed(Vec<ExpandError>),
}

pub struct Cli {
    args: Args,
}

impl Cli {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    /// Run the selected command and return the process exit code.
    pub fn run(&self) -> Result<i32, CliError> {
        let config = self.load_config()?;

        match &self.args.command {
            Command::Expand { paths, out_dir, compile, manifest, print_link } => {
                let mut config = config;
                if let Some(dir) = out_dir {
                    config.output.dir = dir.clone();
                }
                config.toolchain.compile |= *compile;
                if manifest.is_some() {
                    config.output.manifest = manifest.clone();
                }
                self.expand(&config, paths, *print_link)
            }
            Command::Init { dir, force } => {
                let path = dir.join(CONFIG_FILE);
                if path.exists() && !force {
                    return Err(CliError::AlreadyExists(path));
                }
                fs::write(&path, Config::generate_default())
                    .map_err(|source| CliError::Write { path: path.clone(), source })?;
                println!("Wrote {}", path.display());
                Ok(0)
            }
            Command::Types => {
                let context = config.type_context()?;
                print!("{}", describe_context(&context));
                Ok(0)
            }
        }
    }

    fn load_config(&self) -> Result<Config, CliError> {
        match &self.args.config {
            Some(path) => Ok(Config::load(path)?),
            None => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                let (config, found) = Config::discover(&cwd)?;
                debug!(config = ?found, "configuration loaded");
                Ok(config)
            }
        }
    }

    fn expand(&self, config: &Config, patterns: &[String], print_link: bool) -> Result<i32, CliError> {
        let files = collect_files(config, patterns)?;
        let context = Arc::new(config.type_context()?);
        info!(files = files.len(), out_dir = %config.output.dir.display(), "expanding");

        let outcomes: Vec<Result<FileOutcome, CliError>> = files
            .par_iter()
            .map(|file| expand_file(config, &context, &Haskell, file))
            .collect();

        let mut manifest = Manifest::default();
        let mut link = LinkSpec::default();
        let mut errors = Vec::new();

        for outcome in outcomes {
            match outcome? {
                FileOutcome::Expanded(report, spec) => {
                    if let Some(spec) = spec {
                        link = link.merge(spec);
                    }
                    manifest.units.push(report);
                }
                FileOutcome::Failed(file_errors) => errors.extend(file_errors),
            }
        }

        manifest.cargo_directives = link.cargo_directives();
        manifest.linker_flags = link.linker_flags();

        if let Some(path) = &config.output.manifest {
            let json = serde_json::to_string_pretty(&manifest)?;
            fs::write(path, json).map_err(|source| CliError::Write { path: path.clone(), source })?;
        }

        if print_link {
            for line in &manifest.cargo_directives {
                println!("{}", line);
            }
        }

        print_summary(&manifest, &errors);
        Ok(if errors.is_empty() { 0 } else { 1 })
    }
}

/// Expand, flush and optionally compile one host file.
pub fn expand_file(
    config: &Config,
    context: &Arc<TypeContext>,
    syntax: &dyn HostSyntax,
    file: &Path,
) -> Result<FileOutcome, CliError> {
    if file.extension().is_some_and(|ext| ext == "rs") {
        return Err(CliError::ForeignExtension(file.to_path_buf()));
    }

    let start = Instant::now();
    let source = fs::read_to_string(file).map_err(|source| CliError::Read {
        path: file.to_path_buf(),
        source,
    })?;

    let name = file.display().to_string();
    let mut unit = CompilationUnit::with_context(name.clone(), UnitOptions::from(config), context.clone());

    let rewritten = match expand_source(&mut unit, &source, syntax, HostScope::Open) {
        Ok(text) => text,
        Err(errors) => {
            error!(unit = %name, errors = errors.len(), "unit failed");
            return Ok(FileOutcome::Failed(errors));
        }
    };

    let host_output = config.output.dir.join(relative_output(file));
    let foreign_output = host_output.with_extension("rs");
    let summary = unit.finish(&foreign_output)?;

    if let Some(parent) = host_output.parent() {
        fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&host_output, rewritten).map_err(|source| CliError::Write {
        path: host_output.clone(),
        source,
    })?;

    let link = match (&summary.foreign, config.toolchain.compile) {
        (Some(flushed), true) => {
            let stem = file.file_stem().map(|s| s.to_string_lossy().to_lowercase()).unwrap_or_default();
            let invocation = RustcInvocation::from_config(
                &config.toolchain,
                config.unit.edition,
                &flushed.path,
                artifact_dir(&config.output.dir),
            )
            .with_crate_name(&format!("{}_{}", stem, unit_tag(&name)));
            Some(invocation.run()?)
        }
        _ => None,
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    debug!(unit = %name, duration_ms, "unit expanded");

    Ok(FileOutcome::Expanded(
        UnitReport {
            source: file.to_path_buf(),
            host_output,
            summary,
            duration_ms,
        },
        link,
    ))
}

/// Drop root, prefix and `..` components so outputs stay under the out dir.
fn relative_output(file: &Path) -> PathBuf {
    file.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

fn collect_files(config: &Config, patterns: &[String]) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            let nested = format!("{}/**/*", pattern.trim_end_matches('/'));
            for candidate in glob_paths(&nested)? {
                let relative = candidate.strip_prefix(path).unwrap_or(&candidate);
                if candidate.is_file() && config.should_expand(relative)? {
                    files.push(candidate);
                }
            }
        } else if pattern.contains(['*', '?', '[']) {
            files.extend(glob_paths(pattern)?.into_iter().filter(|p| p.is_file()));
        } else {
            return Err(CliError::PathNotFound(path.to_path_buf()));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn glob_paths(pattern: &str) -> Result<Vec<PathBuf>, CliError> {
    let entries = glob::glob(pattern).map_err(|e| CliError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(e) => eprintln!("Error accessing path: {}", e),
        }
    }
    Ok(paths)
}

pub fn describe_context(context: &TypeContext) -> String {
    let mut out = String::new();
    for correspondence in context.correspondences() {
        out.push_str(&format!("{:<28} {}\n", correspondence.foreign.as_str(), correspondence.host));
    }
    for rule in context.rules() {
        out.push_str(&format!("rule: {:?}\n", rule));
    }
    out
}

fn print_summary(manifest: &Manifest, errors: &[ExpandError]) {
    let functions: usize = manifest
        .units
        .iter()
        .map(|u| u.summary.call_sites.len())
        .sum();

    if errors.is_empty() {
        println!(
            "\x1b[32m✓ Expanded {} file{}, {} snippet{}\x1b[0m",
            manifest.units.len(),
            if manifest.units.len() == 1 { "" } else { "s" },
            functions,
            if functions == 1 { "" } else { "s" }
        );
    } else {
        for error in errors {
            eprintln!("\x1b[31m{}\x1b[0m", error);
        }
        eprintln!();
        eprintln!(
            "\x1b[31mFound {} error{}\x1b[0m",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        );
    }
}
