use clap::Parser;
use std::path::PathBuf;
use std::process;

use packtree::io_utils::{archive_cli_error, io_cli_error};
use packtree::{produce_archive, read_path_list};

/// Build a filtered .tar.gz archive from include/exclude path lists.
#[derive(Parser)]
#[command(name = "packtree", version)]
struct Args {
    /// File listing the roots to archive, one path per line
    #[arg(long)]
    includes: PathBuf,
    /// File listing the roots to prune, one path per line
    #[arg(long)]
    excludes: Option<PathBuf>,
    /// Destination archive path
    #[arg(long, default_value = "/tmp/archive.tar.gz")]
    output: PathBuf,
    /// Print a machine-readable summary instead of the bare digest
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let includes = read_path_list(&args.includes)
        .map_err(|e| io_cli_error("reading include list", &args.includes, e))?;
    let excludes = match &args.excludes {
        Some(path) => {
            read_path_list(path).map_err(|e| io_cli_error("reading exclude list", path, e))?
        }
        None => Vec::new(),
    };
    let digest = produce_archive(&includes, &excludes, &args.output)
        .map_err(|e| archive_cli_error("archiving failed", e))?;
    if args.json {
        let summary = serde_json::json!({
            "output": args.output.display().to_string(),
            "sha256": digest,
            "include_roots": includes.len(),
            "exclude_roots": excludes.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{digest}");
    }
    Ok(())
}
