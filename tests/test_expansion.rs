use clap::Parser;
use splicer::cli::{Args, Cli};
use splicer::{
    expand_source, merge, singleton, CompilationUnit, Config, ErrorKind, ForeignType, Haskell,
    HostScope, TypePosition, UnitOptions,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const MAIN_HS: &str = r#"module Main where

import Data.Int
import Foreign.Ptr

-- [rust| i32 { this is a comment } |]
main :: IO ()
main = do
  let x = 41
  y <- [rustIO| i32 { 1i32 + $(x: i32) } |]
  let z = [rustUnsafe| f64 { $(y: i32) as f64 * 0.5 } |]
  print (y, z)
"#;

#[test]
fn test_singleton_lookup() {
    let ctx = singleton("i32", "Int32");
    let i32_key = ForeignType::parse("i32").unwrap();
    let f64_key = ForeignType::parse("f64").unwrap();

    assert_eq!(ctx.lookup(&i32_key).unwrap().as_str(), "Int32");
    assert!(ctx.lookup(&f64_key).is_none());

    let merged = merge(&ctx, &singleton("f64", "Double"));
    assert_eq!(merged.lookup(&f64_key).unwrap().as_str(), "Double");
    assert_eq!(merged.lookup(&i32_key).unwrap().as_str(), "Int32");
}

#[test]
fn test_full_unit_expansion() {
    let dir = TempDir::new().unwrap();
    let mut unit = CompilationUnit::new("Main.hs", UnitOptions::default());

    let host = expand_source(&mut unit, MAIN_HS, &Haskell, HostScope::Open).unwrap();
    let sites = unit.call_sites().to_vec();
    assert_eq!(sites.len(), 2);

    assert!(host.contains(&format!("y <- ({} x)", sites[0].symbol)));
    assert!(host.contains(&format!("let z = ({} y)", sites[1].symbol)));
    assert!(host.contains("-- [rust| i32 { this is a comment } |]"));
    assert!(host.contains(&format!(
        "foreign import ccall unsafe \"{0}\" {0} :: Int32 -> Double",
        sites[1].symbol
    )));

    let foreign_path = dir.path().join("Main.rs");
    let summary = unit.finish(&foreign_path).unwrap();
    let flushed = summary.foreign.unwrap();
    assert_eq!(flushed.functions, 2);

    let foreign = fs::read_to_string(&foreign_path).unwrap();
    let first = foreign.find(&sites[0].symbol).unwrap();
    let second = foreign.find(&sites[1].symbol).unwrap();
    assert!(first < second);
    assert!(foreign.contains("(x : i32) -> i32 { 1i32 + x }"));
    assert!(foreign.contains("(y : i32) -> f64 { y as f64 * 0.5 }"));

    let parsed = syn::parse_file(&foreign).unwrap();
    assert_eq!(parsed.items.len(), 2);
}

#[test]
fn test_identical_snippets_flush_twice() {
    let dir = TempDir::new().unwrap();
    let source = "a = [rust| i32 { 7 } |]\nb = [rust| i32 { 7 } |]\n";
    let mut unit = CompilationUnit::new("Twice.hs", UnitOptions::default());
    expand_source(&mut unit, source, &Haskell, HostScope::Open).unwrap();

    let (a, b) = (unit.call_sites()[0].symbol.clone(), unit.call_sites()[1].symbol.clone());
    assert_ne!(a, b);

    let path = dir.path().join("Twice.rs");
    unit.finish(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains(&format!("fn {} ()", a)));
    assert!(text.contains(&format!("fn {} ()", b)));
}

#[test]
fn test_unmapped_return_type_fails_unit() {
    let ctx = Arc::new(singleton("i32", "Int32"));
    let mut unit = CompilationUnit::with_context("F32.hs", UnitOptions::default(), ctx);
    let source = "x = [rust| f32 { $(n: i32) as f32 } |]\n";

    let errors = expand_source(&mut unit, source, &Haskell, HostScope::Open).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].kind,
        ErrorKind::UnmappedType { ty: "f32".to_string(), position: TypePosition::Return }
    );
    assert_eq!(errors[0].location.line, 1);
    assert!(errors[0].to_string().starts_with("F32.hs:1:"));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("F32.rs");
    assert!(unit.finish(&path).unwrap().foreign.is_none());
    assert!(!path.exists());
}

#[test]
fn test_fixed_scope_rejects_unknown_names() {
    let mut unit = CompilationUnit::new("Scope.hs", UnitOptions::default());
    let source = "f count = [rust| i32 { $(cuont: i32) } |]\n";
    let errors = expand_source(&mut unit, source, &Haskell, HostScope::fixed(["count"])).unwrap_err();

    assert!(matches!(errors[0].kind, ErrorKind::UnresolvedIdentifier { .. }));
    assert_eq!(errors[0].suggestions, vec!["Did you mean 'count'?"]);
}

#[test]
fn test_config_driven_unit() {
    let config = Config::parse(
        r#"
[unit]
symbol_prefix = "demo"

[types]
contexts = ["basic", "libc"]
[types.mappings]
"Vec<u8>" = "Ptr Word8"
"#,
    )
    .unwrap();

    let ctx = Arc::new(config.type_context().unwrap());
    let mut unit = CompilationUnit::with_context("Cfg.hs", UnitOptions::from(&config), ctx);
    let source = "n = [rust| c_int { $(k: c_int) } |]\n";
    let host = expand_source(&mut unit, source, &Haskell, HostScope::Open).unwrap();

    let site = &unit.call_sites()[0];
    assert!(site.symbol.starts_with("demo_"));
    assert!(host.contains(":: CInt -> CInt"));
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("splicer.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_expand_writes_outputs_and_manifest() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("Main.hs"), MAIN_HS).unwrap();
    fs::write(src.join("Plain.hs"), "main = pure ()\n").unwrap();

    let out = dir.path().join("out");
    let manifest = dir.path().join("manifest.json");
    let config = write_config(dir.path(), "");

    let args = Args::parse_from([
        "splicer".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "expand".to_string(),
        src.display().to_string(),
        "--out-dir".to_string(),
        out.display().to_string(),
        "--manifest".to_string(),
        manifest.display().to_string(),
    ]);
    assert_eq!(Cli::new(args).run().unwrap(), 0);

    let rel = src.strip_prefix("/").unwrap_or(&src).to_path_buf();
    let host_out = out.join(&rel).join("Main.hs");
    let foreign_out = out.join(&rel).join("Main.rs");
    assert!(fs::read_to_string(&host_out).unwrap().contains("foreign import ccall"));
    assert!(fs::read_to_string(&foreign_out).unwrap().contains("extern \"C\""));

    // no quotes, no foreign file
    assert!(out.join(&rel).join("Plain.hs").exists());
    assert!(!out.join(&rel).join("Plain.rs").exists());

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    let units = json["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);
    let main = units.iter().find(|u| u["unit"].as_str().unwrap().ends_with("Main.hs")).unwrap();
    assert_eq!(main["call_sites"].as_array().unwrap().len(), 2);
    assert_eq!(main["call_sites"][0]["declaration"]["safety"], "safe");
    assert_eq!(main["call_sites"][0]["entry"]["purity"], "effectful");
}

#[test]
fn test_cli_expand_reports_errors() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("Bad.hs");
    fs::write(&file, "x = [rust| f32 { 1.0 } |]\n").unwrap();
    let config = write_config(dir.path(), "[types]\ncontexts = [\"libc\"]\n");
    let out = dir.path().join("out");

    let args = Args::parse_from([
        "splicer".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "expand".to_string(),
        file.display().to_string(),
        "--out-dir".to_string(),
        out.display().to_string(),
    ]);
    assert_eq!(Cli::new(args).run().unwrap(), 1);
    assert!(!out.exists());
}

#[test]
fn test_cli_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let run = |force: bool| {
        let mut argv = vec!["splicer".to_string(), "init".to_string(), dir.path().display().to_string()];
        if force {
            argv.push("--force".to_string());
        }
        Cli::new(Args::parse_from(argv)).run()
    };

    assert_eq!(run(false).unwrap(), 0);
    let written = Config::load(&dir.path().join("splicer.toml")).unwrap();
    assert_eq!(written.unit.symbol_prefix, "inline_rust");

    assert!(run(false).is_err());
    assert_eq!(run(true).unwrap(), 0);
}
