mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use labelbatch_core::{
    Item, LabelFont, RenderRequest, RenderSettings, Renderer, Symbology, export_csv, export_text,
    export_validation_results, ingest, validate, validate_batch,
};
use labelbatch_print_client::{
    BatchPrintOptions, BatchWorker, DirectorySink, Orchestrator, Phase, PrintSink, RunResult,
};
use labelbatch_profile::{LabelLayout, Profile, load_profile_from_str};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::render::{CheckedRow, Format, print_json, print_summary, render_invalid_rows};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "labelbatch",
    version,
    about = "Validate, render, export, and print barcode label batches"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check every item of a batch file and report the ones that cannot be
    /// encoded. Exits 1 if any item is invalid.
    Validate {
        file: PathBuf,
        /// Symbology for rows that do not name one.
        #[arg(long, default_value = "Code128")]
        symbology: Symbology,
    },

    /// Render one barcode to a PNG file.
    Render {
        data: String,
        #[arg(long, default_value = "Code128")]
        symbology: Symbology,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
        /// Narrowest bar or cell, in pixels at 96 DPI.
        #[arg(long, default_value_t = 2)]
        module_width: u32,
        /// Bar height, in pixels at 96 DPI.
        #[arg(long, default_value_t = 100)]
        height: u32,
        #[arg(long, default_value_t = 96)]
        dpi: u32,
        /// Omit the human-readable label under linear barcodes.
        #[arg(long)]
        no_text: bool,
        /// TrueType font for the label. Defaults to a system font.
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Re-export a batch file.
    Export {
        file: PathBuf,
        #[arg(long, default_value = "Code128")]
        symbology: Symbology,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Write to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Leave out the CSV header row.
        #[arg(long)]
        no_header: bool,
    },

    /// List the printers a sink offers.
    Printers {
        #[command(flatten)]
        sink: SinkArgs,
    },

    /// Print a batch file. Exits 1 unless every selected item printed.
    Print {
        file: PathBuf,
        #[command(flatten)]
        sink: SinkArgs,
        /// Label profile JSON (dpi, label size, render defaults).
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Label size preset, overriding the profile (e.g. "2x1 inch").
        #[arg(long)]
        label: Option<String>,
        /// Printer name passed to the sink.
        #[arg(long, default_value = "")]
        printer: String,
        /// First item to print (0-based, inclusive).
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Last item to print (0-based, inclusive). Defaults to the last item.
        #[arg(long)]
        end: Option<usize>,
        /// Record failures and keep printing.
        #[arg(long)]
        continue_on_error: bool,
        /// TrueType font for labels. Defaults to a system font.
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

/// Where pages go.
#[derive(Args, Debug)]
struct SinkArgs {
    #[command(flatten)]
    target: SinkTarget,

    /// Printer resolution for `--tcp`, in dots per inch.
    #[cfg(feature = "tcp")]
    #[arg(long, default_value_t = 203)]
    printer_dpi: u32,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SinkTarget {
    /// Write pages as PNG files under this directory.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Send pages as ZPL to a network printer (`host[:port]`, port 9100).
    #[cfg(feature = "tcp")]
    #[arg(long)]
    tcp: Option<String>,
}

/// Export formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// Comma-separated items with a header row.
    Csv,
    /// One data value per line.
    Text,
    /// Validation report.
    Validation,
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Validate { file, symbology } => cmd_validate(&file, symbology, format)?,
        Cmd::Render {
            data,
            symbology,
            out,
            module_width,
            height,
            dpi,
            no_text,
            font,
        } => {
            let settings = RenderSettings {
                module_width,
                barcode_height: height,
                show_text: !no_text,
            };
            let request = RenderRequest::with_settings(data, symbology, settings, dpi);
            cmd_render(&request, &out, font.as_deref(), format)?;
        }
        Cmd::Export {
            file,
            symbology,
            format: export_format,
            out,
            no_header,
        } => cmd_export(&file, symbology, export_format, out.as_deref(), no_header, format)?,
        Cmd::Printers { sink } => cmd_printers(&sink, format)?,
        Cmd::Print {
            file,
            sink,
            profile,
            label,
            printer,
            start,
            end,
            continue_on_error,
            font,
        } => {
            let profile = load_profile(profile.as_deref())?;
            let mut options = BatchPrintOptions::from_profile(&profile)
                .with_range(start, end.unwrap_or(usize::MAX))
                .with_printer(printer);
            options.continue_on_error = continue_on_error;
            if let Some(name) = label {
                options.label = LabelLayout::preset(&name).with_context(|| {
                    let known: Vec<String> =
                        LabelLayout::presets().into_iter().map(|l| l.name).collect();
                    format!("unknown label preset '{name}' (known: {})", known.join(", "))
                })?;
            }
            let items = ingest::load_file(&file, profile.defaults.symbology)?;
            cmd_print(items, &sink, options, font.as_deref(), format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_validate(file: &Path, symbology: Symbology, format: Format) -> Result<()> {
    let (text, rows) = ingest::load_file_rows(file, symbology)?;
    let checked: Vec<CheckedRow> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| CheckedRow::new(i, row, validate(&row.item.data, row.item.symbology)))
        .collect();
    let ok = checked.iter().all(|r| r.is_valid);

    match format {
        Format::Json => print_json(&serde_json::json!({
            "ok": ok,
            "total": checked.len(),
            "valid": checked.iter().filter(|r| r.is_valid).count(),
            "rows": checked,
        }))?,
        Format::Pretty => {
            render_invalid_rows(&text, &file.display().to_string(), &checked);
            print_summary(&checked);
            if ok {
                eprintln!("batch ok");
            }
        }
    }

    if !ok {
        process::exit(1);
    }
    Ok(())
}

fn cmd_render(request: &RenderRequest, out: &Path, font: Option<&Path>, format: Format) -> Result<()> {
    let renderer = Renderer::new(resolve_font(font)?);
    let raster = renderer
        .render(request)
        .with_context(|| format!("failed to render '{}' as {}", request.data, request.symbology))?;
    raster
        .to_rgba()
        .save(out)
        .with_context(|| format!("failed to write '{}'", out.display()))?;

    match format {
        Format::Json => print_json(&serde_json::json!({
            "out": out,
            "width": raster.width(),
            "height": raster.height(),
            "dpi": [request.dpi_x, request.dpi_y],
        }))?,
        Format::Pretty => eprintln!(
            "wrote {} ({}x{} px)",
            out.display(),
            raster.width(),
            raster.height()
        ),
    }
    Ok(())
}

fn cmd_export(
    file: &Path,
    symbology: Symbology,
    export_format: ExportFormat,
    out: Option<&Path>,
    no_header: bool,
    format: Format,
) -> Result<()> {
    let items = ingest::load_file(file, symbology)?;
    let text = match export_format {
        ExportFormat::Csv => export_csv(&items, !no_header),
        ExportFormat::Text => export_text(&items),
        ExportFormat::Validation => export_validation_results(&validate_batch(&items)),
    };

    let Some(out) = out else {
        print!("{text}");
        return Ok(());
    };
    fs::write(out, &text).with_context(|| format!("failed to write '{}'", out.display()))?;
    match format {
        Format::Json => print_json(&serde_json::json!({
            "status": "exported",
            "file": out,
            "items": items.len(),
        }))?,
        Format::Pretty => eprintln!("exported {} items to {}", items.len(), out.display()),
    }
    Ok(())
}

fn cmd_printers(sink: &SinkArgs, format: Format) -> Result<()> {
    let names = match sink_kind(sink)? {
        SinkKind::Dir(dir) => DirectorySink::new(dir).list_printers(),
        #[cfg(feature = "tcp")]
        SinkKind::Tcp(addr, dpi) => labelbatch_print_client::ZplTcpSink::new(addr, dpi).list_printers(),
    }
    .context("failed to list printers")?;

    match format {
        Format::Json => print_json(&names)?,
        Format::Pretty => {
            if names.is_empty() {
                eprintln!("no printers found");
            }
            for name in &names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn cmd_print(
    items: Vec<Item>,
    sink: &SinkArgs,
    options: BatchPrintOptions,
    font: Option<&Path>,
    format: Format,
) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::new(Renderer::new(resolve_font(font)?)));
    info!(items = items.len(), "starting print run");

    let result = match sink_kind(sink)? {
        SinkKind::Dir(dir) => run_worker(orchestrator, DirectorySink::new(dir), items, options, format)?,
        #[cfg(feature = "tcp")]
        SinkKind::Tcp(addr, dpi) => run_worker(
            orchestrator,
            labelbatch_print_client::ZplTcpSink::new(addr, dpi),
            items,
            options,
            format,
        )?,
    };

    match format {
        Format::Json => print_json(&result)?,
        Format::Pretty => print_run_summary(&result),
    }
    if !result.is_success() {
        process::exit(1);
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

enum SinkKind<'a> {
    Dir(&'a Path),
    #[cfg(feature = "tcp")]
    Tcp(&'a str, u32),
}

fn sink_kind(sink: &SinkArgs) -> Result<SinkKind<'_>> {
    if let Some(dir) = &sink.target.dir {
        return Ok(SinkKind::Dir(dir));
    }
    #[cfg(feature = "tcp")]
    if let Some(addr) = &sink.target.tcp {
        return Ok(SinkKind::Tcp(addr, sink.printer_dpi));
    }
    bail!("no print sink selected")
}

/// Run the batch on a worker thread, echoing progress in pretty mode.
fn run_worker<S>(
    orchestrator: Arc<Orchestrator<Renderer>>,
    sink: S,
    items: Vec<Item>,
    options: BatchPrintOptions,
    format: Format,
) -> Result<RunResult>
where
    S: PrintSink + Send + 'static,
{
    let worker = BatchWorker::spawn(orchestrator, sink, items, options)?;
    for p in worker.progress() {
        if format == Format::Pretty && p.current_item > 0 {
            let phase = match p.phase {
                Phase::PreRendering => "render",
                Phase::Printing => "print",
            };
            eprintln!(
                "[{phase} {}/{} {:>3.0}%] {}",
                p.current_item,
                p.total_items,
                p.percentage(),
                p.current_data
            );
        }
    }
    Ok(worker.join()?)
}

fn print_run_summary(result: &RunResult) {
    use ariadne::{Color, Fmt};

    for f in &result.failures {
        eprintln!(
            "{} item {} ({}): {}",
            "failed".fg(Color::Red),
            f.index,
            f.data,
            f.message
        );
    }
    if let Some(e) = &result.document_error {
        eprintln!("{} {e}", "document error:".fg(Color::Red));
    }
    eprintln!(
        "{:?}: {} items, {} pages, {} failed",
        result.outcome,
        result.printed_count,
        result.pages_printed,
        result.failures.len()
    );
}

fn resolve_font(path: Option<&Path>) -> Result<LabelFont> {
    match path {
        Some(p) => Ok(LabelFont::load(p)?),
        None => Ok(LabelFont::discover()),
    }
}

fn load_profile(path: Option<&Path>) -> Result<Profile> {
    let Some(path) = path else {
        return Ok(Profile::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile '{}'", path.display()))?;
    load_profile_from_str(&text).with_context(|| format!("invalid profile '{}'", path.display()))
}
