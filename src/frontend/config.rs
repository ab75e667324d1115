use crate::codegen::foreign::Edition;
use crate::core::context::{builtin, merge, TypeContext, BUILTIN_CONTEXTS};
use crate::core::types::{ForeignType, HostType};
use crate::errors::find_similar_names;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "splicer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },

    #[error("unknown type context `{name}`{}", did_you_mean(.suggestions))]
    UnknownContext { name: String, suggestions: Vec<String> },

    #[error("invalid foreign type `{key}` in [types.mappings]: {reason}")]
    InvalidMapping { key: String, reason: String },

    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

fn did_you_mean(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean `{}`?)", suggestions.join("`, `"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub unit: UnitConfig,

    #[serde(default)]
    pub types: TypesConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_prefix")]
    pub symbol_prefix: String,

    #[serde(default)]
    pub edition: Edition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypesConfig {
    /// Built-in contexts merged left to right.
    #[serde(default = "default_contexts")]
    pub contexts: Vec<String>,

    /// Foreign type spelling to host type, merged after `contexts`.
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,

    /// Extra `extern crate` lines written at the top of every foreign file.
    #[serde(default)]
    pub extern_crates: Vec<String>,

    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "default_rustc")]
    pub rustc: PathBuf,

    #[serde(default = "default_opt_level")]
    pub opt_level: String,

    #[serde(default = "default_crate_type")]
    pub crate_type: String,

    #[serde(default)]
    pub compile: bool,

    /// `--extern name=path` entries passed to rustc.
    #[serde(default)]
    pub externs: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            symbol_prefix: default_prefix(),
            edition: Edition::default(),
        }
    }
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            contexts: default_contexts(),
            mappings: BTreeMap::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            extern_crates: Vec::new(),
            manifest: None,
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            rustc: default_rustc(),
            opt_level: default_opt_level(),
            crate_type: default_crate_type(),
            compile: false,
            externs: BTreeMap::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: vec!["**/dist-newstyle/**".to_string(), "**/.stack-work/**".to_string()],
        }
    }
}

fn default_prefix() -> String { "inline_rust".to_string() }
fn default_contexts() -> Vec<String> { vec!["prelude".to_string()] }
fn default_out_dir() -> PathBuf { PathBuf::from("splicer-out") }
fn default_rustc() -> PathBuf { PathBuf::from("rustc") }
fn default_opt_level() -> String { "2".to_string() }
fn default_crate_type() -> String { "staticlib".to_string() }
fn default_include() -> Vec<String> { vec!["**/*.hs".to_string()] }

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find `splicer.toml` in `start` or its parents; defaults when none exists.
    pub fn discover(start: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.is_file() {
                let config = Self::load(&config_path)?;
                return Ok((config, Some(config_path)));
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        Ok((Self::default(), None))
    }

    /// Build the unit context: built-ins in order, then user mappings on top.
    pub fn type_context(&self) -> Result<TypeContext, ConfigError> {
        let known: Vec<String> = BUILTIN_CONTEXTS.iter().map(|s| s.to_string()).collect();
        let mut context = TypeContext::new();

        for name in &self.types.contexts {
            let next = builtin(name).ok_or_else(|| ConfigError::UnknownContext {
                name: name.clone(),
                suggestions: find_similar_names(name, &known, 3),
            })?;
            context = merge(&context, &next);
        }

        let mut user = Vec::with_capacity(self.types.mappings.len());
        for (key, host) in &self.types.mappings {
            let foreign = ForeignType::parse(key).map_err(|e| ConfigError::InvalidMapping {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            user.push((foreign, HostType::new(host.as_str())));
        }

        Ok(merge(&context, &TypeContext::from_entries(user)))
    }

    /// Whether `path` passes the include/exclude patterns.
    pub fn should_expand(&self, path: &Path) -> Result<bool, ConfigError> {
        for pattern in &self.paths.exclude {
            if compile_pattern(pattern)?.matches_path(path) {
                return Ok(false);
            }
        }

        if self.paths.include.is_empty() {
            return Ok(true);
        }

        for pattern in &self.paths.include {
            if compile_pattern(pattern)?.matches_path(path) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn compile_pattern(pattern: &str) -> Result<glob::Pattern, ConfigError> {
    glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.unit.symbol_prefix, "inline_rust");
        assert_eq!(config.types.contexts, vec!["prelude"]);
        assert_eq!(config.toolchain.crate_type, "staticlib");
        assert!(!config.toolchain.compile);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[unit]
symbol_prefix = "hs_rust"
edition = "2024"

[types]
contexts = ["basic", "libc"]

[types.mappings]
"Vec<u8>" = "Ptr Word8"
"f32" = "CFloat"

[toolchain]
compile = true
opt_level = "3"

[toolchain.externs]
serde = "target/libserde.rlib"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.unit.symbol_prefix, "hs_rust");
        assert_eq!(config.unit.edition, Edition::E2024);
        assert_eq!(config.types.contexts, vec!["basic", "libc"]);
        assert!(config.toolchain.compile);
        assert_eq!(config.toolchain.externs["serde"], PathBuf::from("target/libserde.rlib"));
        assert_eq!(config.output.dir, PathBuf::from("splicer-out"));
    }

    #[test]
    fn test_type_context_user_mappings_override_builtins() {
        let config = Config::parse(
            r#"
[types]
contexts = ["basic"]
[types.mappings]
f32 = "CFloat"
"Vec < u8 >" = "Ptr Word8"
"#,
        )
        .unwrap();

        let ctx = config.type_context().unwrap();
        assert_eq!(ctx.lookup(&ForeignType::parse("f32").unwrap()).unwrap().as_str(), "CFloat");
        assert_eq!(ctx.lookup(&ForeignType::parse("Vec<u8>").unwrap()).unwrap().as_str(), "Ptr Word8");
        assert_eq!(ctx.lookup(&ForeignType::parse("i32").unwrap()).unwrap().as_str(), "Int32");
    }

    #[test]
    fn test_unknown_context_suggests() {
        let config = Config::parse("[types]\ncontexts = [\"prelud\"]\n").unwrap();
        match config.type_context() {
            Err(ConfigError::UnknownContext { name, suggestions }) => {
                assert_eq!(name, "prelud");
                assert_eq!(suggestions, vec!["prelude"]);
            }
            other => panic!("expected unknown context, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_mapping_key() {
        let config = Config::parse("[types.mappings]\n\"1 +\" = \"Int\"\n").unwrap();
        assert!(matches!(config.type_context(), Err(ConfigError::InvalidMapping { .. })));
    }

    #[test]
    fn test_should_expand() {
        let config = Config::default();
        assert!(config.should_expand(Path::new("src/Main.hs")).unwrap());
        assert!(!config.should_expand(Path::new("src/main.rs")).unwrap());
        assert!(!config.should_expand(Path::new("pkg/dist-newstyle/build/Gen.hs")).unwrap());
    }

    #[test]
    fn test_discover_walks_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[unit]\nsymbol_prefix = \"found\"\n").unwrap();

        let (config, path) = Config::discover(&nested).unwrap();
        assert_eq!(config.unit.symbol_prefix, "found");
        assert_eq!(path.unwrap(), dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = Config::default();
        config.types.mappings.insert("f32".to_string(), "Float".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.types.mappings["f32"], "Float");
    }

    #[test]
    fn test_generate_default_parses() {
        let text = Config::generate_default();
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.unit.symbol_prefix, "inline_rust");
    }
}
