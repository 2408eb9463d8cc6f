use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const TAG: &str = "[Sync Version]";

/// Copy the `version` of one JSON manifest into another.
#[derive(Debug, Parser)]
#[command(name = "sync-version")]
struct Args {
    /// Manifest whose version is authoritative (e.g. package.json).
    src: PathBuf,
    /// Manifest to update (e.g. manifest.json).
    dst: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    AlreadyCurrent(String),
    Updated { version: String, json: String },
}

fn sync(src_label: &str, src: &str, dst: &str) -> Result<Outcome> {
    let src: Value = serde_json::from_str(src).with_context(|| format!("{src_label} is not valid JSON"))?;
    let mut dst: Value = serde_json::from_str(dst).context("destination is not valid JSON")?;

    let version = src
        .get("version")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{src_label} does not contain a version"))?
        .to_string();

    if dst.get("version").and_then(Value::as_str) == Some(version.as_str()) {
        return Ok(Outcome::AlreadyCurrent(version));
    }

    let object = dst
        .as_object_mut()
        .ok_or_else(|| anyhow!("destination is not a JSON object"))?;
    object.insert("version".to_string(), Value::String(version.clone()));

    let mut json = serde_json::to_string_pretty(&dst)?;
    json.push('\n');
    Ok(Outcome::Updated { version, json })
}

fn run(args: &Args) -> Result<()> {
    let src = fs::read_to_string(&args.src)
        .with_context(|| format!("reading {}", args.src.display()))?;
    let dst = fs::read_to_string(&args.dst)
        .with_context(|| format!("reading {}", args.dst.display()))?;

    match sync(&args.src.display().to_string(), &src, &dst)? {
        Outcome::AlreadyCurrent(version) => {
            println!("{TAG} dst version is already {version}");
        }
        Outcome::Updated { version, json } => {
            fs::write(&args.dst, json).with_context(|| format!("writing {}", args.dst.display()))?;
            println!("{TAG} Updated dst version -> {version}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{TAG} Failed to update dst version: {err:#}");
            ExitCode::FAILURE
        }
    }
}
