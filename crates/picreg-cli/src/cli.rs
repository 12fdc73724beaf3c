use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use picreg_fs::{
    archive_copy, atomic_write_text, desktop_dir, ARCHIVE_DIR_NAME, EXPORT_FILE_NAME,
};
use picreg_model::{render_csv, ExportOptions, GridStore, LineEnding, WaferNumber};
use picreg_tracker::{
    tracking_url, ShopOrder, ShopOrderLookup, SqliteTracker, DEFAULT_TRACKING_BASE_URL,
};
use serde::Serialize;

use crate::{batch, prompt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LineEndingArg {
    /// The host platform's native terminator.
    Platform,
    Lf,
    Crlf,
}

impl LineEndingArg {
    fn to_line_ending(self) -> LineEnding {
        match self {
            LineEndingArg::Platform => LineEnding::platform(),
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Crlf => LineEnding::CrLf,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "picreg",
    about = "Key in PIC registration triples, validate them, and export the upload CSV."
)]
pub struct Args {
    /// Batch input CSV (`code,chip[,grn]` per record, header optional).
    /// Skips interactive row entry.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Wafer number for this run. Prompted interactively when omitted.
    #[arg(long)]
    wafer: Option<String>,

    /// Destination of the export (default: `<desktop>/upload.csv`).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Archive directory (default: `<desktop>/PIC registration`).
    #[arg(long, value_name = "PATH")]
    archive_dir: Option<PathBuf>,

    /// Skip the timestamped archive copy.
    #[arg(long)]
    no_archive: bool,

    /// SQLite snapshot of the tracking database for the shop-order lookup.
    /// Without it the export proceeds on the "UNKNOWN" naming path.
    #[arg(long, value_name = "PATH")]
    tracker_db: Option<PathBuf>,

    /// Base URL of the tracking station pages.
    #[arg(long, default_value = DEFAULT_TRACKING_BASE_URL, value_name = "URL")]
    tracking_url: String,

    /// Do not open the tracking page in a browser.
    #[arg(long)]
    no_browser: bool,

    /// Record terminator of the export.
    #[arg(long, value_enum, default_value_t = LineEndingArg::Platform)]
    line_ending: LineEndingArg,

    /// Output format of the run summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    wafer: &'a str,
    rows: usize,
    export: String,
    shop_order: Option<&'a ShopOrder>,
    tracking_page: Option<&'a str>,
    archive: Option<String>,
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

/// Parse CLI arguments. Exists so tests and wrapper binaries can feed
/// [`run_with_args`] without depending on `clap` themselves.
pub fn parse_args<I, T>(args: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Args::parse_from(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    // Walking away from the wafer prompt is a deliberate termination, not a
    // failure.
    let Some(wafer) = resolve_wafer(&args)? else {
        eprintln!("cancelled: no wafer number entered");
        return Ok(());
    };
    let grid = resolve_grid(&args)?;

    let report = grid.validate_complete();
    if !report.is_complete() {
        for cell in &report.missing {
            eprintln!("missing value: {cell}");
        }
        bail!("{} cell(s) still need a value", report.missing.len());
    }

    let text = render_csv(
        &grid,
        &wafer,
        ExportOptions {
            line_ending: args.line_ending.to_line_ending(),
        },
    )?;

    let export_path = match args.out.clone() {
        Some(path) => path,
        None => desktop_dir()
            .context("could not resolve the desktop directory; pass --out")?
            .join(EXPORT_FILE_NAME),
    };
    atomic_write_text(&export_path, &text)
        .with_context(|| format!("write {}", export_path.display()))?;

    // The lookup keys on row 0's OSA code; the grid is non-empty by now.
    // An unreachable backend is "no shop order", not a failure: the export
    // is already on disk and the archive still happens, UNKNOWN-named.
    let order = match &args.tracker_db {
        Some(db) => match SqliteTracker::open_path(db) {
            Ok(tracker) => tracker.find_order(&grid.rows()[0].code),
            Err(err) => {
                eprintln!("could not open tracking snapshot {}: {err}", db.display());
                None
            }
        },
        None => None,
    };

    let tracking_page = order.as_ref().map(|o| tracking_url(&args.tracking_url, o.id));
    if let Some(url) = tracking_page.as_deref() {
        if !args.no_browser {
            // A browser that will not start should not cost us the archive.
            if let Err(err) = open::that(url) {
                eprintln!("could not open {url}: {err}");
            }
        }
    }

    let archive = if args.no_archive {
        None
    } else {
        let archive_dir = match args.archive_dir.clone() {
            Some(dir) => dir,
            None => desktop_dir()
                .context("could not resolve the desktop directory; pass --archive-dir")?
                .join(ARCHIVE_DIR_NAME),
        };
        let copied = archive_copy(
            &export_path,
            &archive_dir,
            order.as_ref().map(|o| o.name.as_str()),
            Local::now().naive_local(),
        )
        .with_context(|| {
            format!(
                "archive {} into {}",
                export_path.display(),
                archive_dir.display()
            )
        })?;
        Some(copied)
    };

    print_summary(
        args.format,
        &wafer,
        &grid,
        &export_path,
        order.as_ref(),
        tracking_page.as_deref(),
        archive.as_deref(),
    )
}

fn resolve_wafer(args: &Args) -> Result<Option<WaferNumber>> {
    if let Some(raw) = &args.wafer {
        let wafer = raw
            .parse()
            .with_context(|| format!("invalid --wafer '{raw}'"))?;
        return Ok(Some(wafer));
    }
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();
    Ok(prompt::prompt_wafer(&mut input, &mut output)?)
}

fn resolve_grid(args: &Args) -> Result<GridStore> {
    let grid = match &args.input {
        Some(path) => batch::load_grid(path)?,
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stderr();
            let mut grid = GridStore::new();
            prompt::enter_rows(&mut input, &mut output, &mut grid)?;
            grid
        }
    };
    if grid.is_empty() {
        bail!("no registration data entered");
    }
    Ok(grid)
}

fn print_summary(
    format: OutputFormat,
    wafer: &WaferNumber,
    grid: &GridStore,
    export_path: &Path,
    order: Option<&ShopOrder>,
    tracking_page: Option<&str>,
    archive: Option<&Path>,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!(
                "Exported {} row(s) for wafer {} to {}",
                grid.row_count(),
                wafer,
                export_path.display()
            );
            match order {
                Some(order) => println!("Shop order: {} (id {})", order.name, order.id),
                None => println!("Shop order: UNKNOWN"),
            }
            if let Some(url) = tracking_page {
                println!("Tracking page: {url}");
            }
            if let Some(path) = archive {
                println!("Archived as {}", path.display());
            }
        }
        OutputFormat::Json => {
            let summary = JsonSummary {
                wafer: wafer.as_str(),
                rows: grid.row_count(),
                export: export_path.display().to_string(),
                shop_order: order,
                tracking_page,
                archive: archive.map(|p| p.display().to_string()),
            };
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer(&mut handle, &summary)?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}
