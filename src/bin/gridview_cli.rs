//! CLI tool for gridview - renders a grid snapshot and outputs JSON
//!
//! Usage:
//!   gridview_cli <snapshot.json>              # Output the render pass to stdout
//!   gridview_cli <snapshot.json> -o out.json  # Output the render pass to a file
//!
//! Set `RUST_LOG=gridview=debug` to trace window recomputes and rebuilds.

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use gridview::Snapshot;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridview=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: gridview_cli <snapshot.json> [-o output.json]");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = if args.len() > 3 && args[2] == "-o" {
        Some(&args[3])
    } else {
        None
    };

    let data = match fs::read_to_string(input_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    let snapshot = match Snapshot::from_json(&data) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error parsing snapshot: {}", e);
            std::process::exit(1);
        }
    };

    let (pass, diagnostics) = match snapshot.render() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error rendering: {}", e);
            std::process::exit(1);
        }
    };
    for d in &diagnostics {
        eprintln!("{:?} [{}]: {}", d.severity, d.key, d.message);
    }

    let json = match serde_json::to_string_pretty(&pass) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Written: {}", path);
        }
        None => {
            io::stdout().write_all(json.as_bytes()).unwrap();
            println!();
        }
    }
}
