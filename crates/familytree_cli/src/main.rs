//! CLI entry point: member JSON in, laid-out tree JSON out.
//!
//! # Responsibility
//! - Exercise `familytree_core` tree building without FFI runtime setup.
//! - Keep output deterministic for quick local sanity checks.

use clap::Parser;
use familytree_core::{build_layout, LayoutConfig, Member};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "familytree_cli",
    version,
    about = "Build and lay out a family tree from a JSON member list"
)]
struct Args {
    /// JSON array of member records
    members: PathBuf,

    /// Viewport width
    #[arg(default_value_t = 1280.0, value_parser = positive_dimension)]
    width: f64,

    /// Viewport height
    #[arg(default_value_t = 720.0, value_parser = positive_dimension)]
    height: f64,

    /// Layout config JSON; defaults apply to omitted fields
    layout: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let config = match args.layout.as_deref() {
        Some(path) => load_layout_config(path)?,
        None => LayoutConfig::default(),
    };

    let members: Vec<Member> = serde_json::from_str(&read_file(&args.members)?).map_err(|err| {
        format!(
            "invalid members file `{}`: {err}",
            args.members.display()
        )
    })?;
    let tree = build_layout(&members, args.width, args.height, &config);
    serde_json::to_string_pretty(&tree).map_err(|err| format!("serialize tree: {err}"))
}

fn load_layout_config(path: &Path) -> Result<LayoutConfig, String> {
    let config: LayoutConfig = serde_json::from_str(&read_file(path)?)
        .map_err(|err| format!("invalid layout config `{}`: {err}", path.display()))?;
    config
        .validate()
        .map_err(|err| format!("invalid layout config `{}`: {err}", path.display()))?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|err| format!("read `{}`: {err}", path.display()))
}

fn positive_dimension(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(format!("expected a positive number, got `{raw}`")),
    }
}
