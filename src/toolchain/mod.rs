//! Foreign toolchain invocation
//!
//! Builds the `rustc` command line for a flushed unit and the linker
//! directives the host build needs to pick up the resulting library.

use crate::codegen::foreign::Edition;
use crate::codegen::symbol::sanitize_identifier;
use crate::frontend::config::ToolchainConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to run {program}: {source}")]
    Spawn { program: String, source: std::io::Error },

    #[error("failed to create {}: {source}", .path.display())]
    OutDir { path: PathBuf, source: std::io::Error },

    #[error("rustc failed on {} ({status}):\n{stderr}", .source_file.display())]
    Failed { source_file: PathBuf, status: String, stderr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustcInvocation {
    rustc: PathBuf,
    source: PathBuf,
    out_dir: PathBuf,
    crate_name: String,
    crate_type: String,
    edition: Edition,
    opt_level: String,
    externs: Vec<(String, PathBuf)>,
}

impl RustcInvocation {
    /// Invocation with defaults: `staticlib`, `-C opt-level=2`, crate named
    /// after the source file stem.
    pub fn new(source: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            rustc: PathBuf::from("rustc"),
            crate_name: sanitize_identifier(&stem),
            source,
            out_dir: out_dir.into(),
            crate_type: "staticlib".to_string(),
            edition: Edition::default(),
            opt_level: "2".to_string(),
            externs: Vec::new(),
        }
    }

    pub fn from_config(
        config: &ToolchainConfig,
        edition: Edition,
        source: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut invocation = Self::new(source, out_dir)
            .with_rustc(&config.rustc)
            .with_crate_type(&config.crate_type)
            .with_opt_level(&config.opt_level)
            .with_edition(edition);
        for (name, path) in &config.externs {
            invocation = invocation.with_extern(name, path);
        }
        invocation
    }

    pub fn with_rustc(mut self, rustc: impl Into<PathBuf>) -> Self {
        self.rustc = rustc.into();
        self
    }

    pub fn with_crate_name(mut self, name: &str) -> Self {
        self.crate_name = sanitize_identifier(name);
        self
    }

    pub fn with_crate_type(mut self, crate_type: impl Into<String>) -> Self {
        self.crate_type = crate_type.into();
        self
    }

    pub fn with_edition(mut self, edition: Edition) -> Self {
        self.edition = edition;
        self
    }

    pub fn with_opt_level(mut self, level: impl Into<String>) -> Self {
        self.opt_level = level.into();
        self
    }

    pub fn with_extern(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.externs.push((name.into(), path.into()));
        self
    }

    pub fn crate_name(&self) -> &str {
        &self.crate_name
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--crate-name".into(),
            self.crate_name.clone().into(),
            "--crate-type".into(),
            self.crate_type.clone().into(),
            "--edition".into(),
            self.edition.as_str().into(),
            "-C".into(),
            format!("opt-level={}", self.opt_level).into(),
            "--out-dir".into(),
            self.out_dir.clone().into(),
        ];

        if self.crate_type == "staticlib" {
            args.push("--print".into());
            args.push("native-static-libs".into());
        }

        for (name, path) in &self.externs {
            let mut entry = OsString::from(format!("{}=", name));
            entry.push(path);
            args.push("--extern".into());
            args.push(entry);
        }

        args.push(self.source.clone().into());
        args
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.rustc);
        command.args(self.args());
        command
    }

    /// Path of the library rustc will produce.
    pub fn artifact(&self) -> PathBuf {
        let file = match self.crate_type.as_str() {
            "staticlib" if cfg!(windows) => format!("{}.lib", self.crate_name),
            "staticlib" => format!("lib{}.a", self.crate_name),
            "cdylib" | "dylib" if cfg!(windows) => format!("{}.dll", self.crate_name),
            "cdylib" | "dylib" if cfg!(target_os = "macos") => format!("lib{}.dylib", self.crate_name),
            "cdylib" | "dylib" => format!("lib{}.so", self.crate_name),
            "bin" => format!("{}{}", self.crate_name, std::env::consts::EXE_SUFFIX),
            _ => format!("lib{}.rlib", self.crate_name),
        };
        self.out_dir.join(file)
    }

    pub fn link_spec(&self) -> LinkSpec {
        let kind = if self.crate_type == "staticlib" { LinkKind::Static } else { LinkKind::Dylib };
        LinkSpec {
            search_dirs: vec![self.out_dir.clone()],
            libs: vec![(kind, self.crate_name.clone())],
            native: Vec::new(),
        }
    }

    /// Run rustc and return the link directives for its output.
    pub fn run(&self) -> Result<LinkSpec, ToolchainError> {
        info!(source = %self.source.display(), crate_name = %self.crate_name, "compiling foreign unit");
        std::fs::create_dir_all(&self.out_dir).map_err(|source| ToolchainError::OutDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let output = self.command().output().map_err(|source| ToolchainError::Spawn {
            program: self.rustc.display().to_string(),
            source,
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolchainError::Failed {
                source_file: self.source.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        let mut spec = self.link_spec();
        spec.native = parse_native_static_libs(&stderr);
        debug!(artifact = %self.artifact().display(), native = ?spec.native, "foreign unit compiled");
        Ok(spec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Static,
    Dylib,
}

impl LinkKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dylib => "dylib",
        }
    }
}

/// Libraries and search paths the host link step needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSpec {
    pub search_dirs: Vec<PathBuf>,
    pub libs: Vec<(LinkKind, String)>,
    /// System libraries a Rust static library depends on, as `-l` flags.
    pub native: Vec<String>,
}

impl LinkSpec {
    pub fn merge(mut self, other: LinkSpec) -> Self {
        for dir in other.search_dirs {
            if !self.search_dirs.contains(&dir) {
                self.search_dirs.push(dir);
            }
        }
        self.libs.extend(other.libs);
        for flag in other.native {
            if !self.native.contains(&flag) {
                self.native.push(flag);
            }
        }
        self
    }

    /// `cargo:` lines for a host build script.
    pub fn cargo_directives(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .search_dirs
            .iter()
            .map(|dir| format!("cargo:rustc-link-search=native={}", dir.display()))
            .collect();
        lines.extend(
            self.libs
                .iter()
                .map(|(kind, name)| format!("cargo:rustc-link-lib={}={}", kind.as_str(), name)),
        );
        lines.extend(
            self.native
                .iter()
                .filter_map(|flag| flag.strip_prefix("-l"))
                .map(|name| format!("cargo:rustc-link-lib={}", name)),
        );
        lines
    }

    /// Plain `-L`/`-l` flags for a host linker.
    pub fn linker_flags(&self) -> Vec<String> {
        let mut flags: Vec<String> = self.search_dirs.iter().map(|dir| format!("-L{}", dir.display())).collect();
        flags.extend(self.libs.iter().map(|(_, name)| format!("-l{}", name)));
        flags.extend(self.native.iter().cloned());
        flags
    }
}

/// Extract the flags from rustc's `note: native-static-libs: ...` line.
pub fn parse_native_static_libs(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .find_map(|line| line.split_once("native-static-libs:").map(|(_, libs)| libs))
        .map(|libs| libs.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn artifact_dir(out_dir: &Path) -> PathBuf {
    out_dir.join("lib")
}
