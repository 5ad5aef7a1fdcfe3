// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Game catalog statistics CLI
//!
//! Usage:
//!   catalog-stats --catalog games.csv --output results
//!   catalog-stats --catalog steam.db

use anyhow::{Context, Result};
use clap::Parser;
use review_eval::catalog::{export_bands_csv, Catalog};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog-stats")]
#[command(about = "Describe critic scores against Steam user reviews")]
#[command(version)]
struct Args {
    /// Game catalog: a CSV export, or a SQLite database (.db, .sqlite, .sqlite3)
    #[arg(short, long)]
    catalog: PathBuf,

    /// Field delimiter of a CSV catalog
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Output directory for the band summary and text dump
    #[arg(short, long, default_value = "results")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !args.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character");
    }

    let is_database = args
        .catalog
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "db" | "sqlite" | "sqlite3"));
    let catalog = if is_database {
        Catalog::from_sqlite(&args.catalog)?
    } else {
        Catalog::load(&args.catalog, args.delimiter as u8)?
    };
    let report = catalog.report();

    println!("{}", report.format());

    std::fs::create_dir_all(&args.output).with_context(|| format!("Failed to create {}", args.output.display()))?;
    let csv_path = args.output.join("metacritic_bands.csv");
    export_bands_csv(&report.bands, &csv_path)?;
    let txt_path = args.output.join("catalog_stats.txt");
    report.write_text(&txt_path)?;

    println!("Band summary exported: {}", csv_path.display());
    println!("Text statistics exported: {}", txt_path.display());
    Ok(())
}
