//! pagecut – command-line paged PDF export for a captured HTML document.
//!
//! Usage:
//!   pagecut <snapshot.json> [raster.png] [-o output.pdf] [--landscape]
//!           [--title "My Notes"] [--scale 2] [--config export.json]
//!           [--breaks] [--plan] [--image output.jpg]
//!
//! If the raster is omitted, the snapshot's embedded `raster` data URI is
//! used. If `-o` is omitted the PDF is written next to the snapshot with the
//! same stem (e.g. `notes.json` → `notes.pdf`).

use std::{env, fs, path::PathBuf, process};

use pagecut::error::{ExportError, Result};
use pagecut::page_plan::build_page_plan;
use pagecut::pipeline::{embedded_raster, paginate, ExportOutcome, Exporter, ImageFormat, LogNotifier};
use pagecut::raster::{Capture, RasterSource};
use pagecut::style::Color;
use pagecut::{ExportConfig, LayoutSnapshot, PageOrientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pdf,
    Breaks,
    Plan,
}

struct Args {
    snapshot: PathBuf,
    raster: Option<PathBuf>,
    output: Option<PathBuf>,
    image: Option<PathBuf>,
    config: Option<PathBuf>,
    title: Option<String>,
    scale: Option<f32>,
    landscape: bool,
    mode: Mode,
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().collect();
    let args = parse_args(&argv);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> Args {
    let prog = argv.first().map(String::as_str).unwrap_or("pagecut");
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut args = Args {
        snapshot: PathBuf::new(),
        raster: None,
        output: None,
        image: None,
        config: None,
        title: None,
        scale: None,
        landscape: false,
        mode: Mode::Pdf,
    };

    let mut iter = argv.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--landscape" | "-l" => args.landscape = true,
            "--breaks" => args.mode = Mode::Breaks,
            "--plan" => args.mode = Mode::Plan,
            "--title" | "-t" => args.title = Some(value(prog, arg, iter.next())),
            "--output" | "-o" => args.output = Some(PathBuf::from(value(prog, arg, iter.next()))),
            "--image" | "-i" => args.image = Some(PathBuf::from(value(prog, arg, iter.next()))),
            "--config" | "-c" => args.config = Some(PathBuf::from(value(prog, arg, iter.next()))),
            "--scale" | "-s" => {
                let raw = value(prog, arg, iter.next());
                match raw.parse::<f32>() {
                    Ok(v) => args.scale = Some(v),
                    Err(_) => {
                        eprintln!("Invalid scale: {raw}");
                        process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                print_usage(prog);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(prog);
                process::exit(1);
            }
            path => {
                if positional.len() >= 2 {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(prog);
                    process::exit(1);
                }
                positional.push(PathBuf::from(path));
            }
        }
    }

    let mut positional = positional.into_iter();
    match positional.next() {
        Some(p) => args.snapshot = p,
        None => {
            eprintln!("Error: no snapshot file specified.");
            print_usage(prog);
            process::exit(1);
        }
    }
    args.raster = positional.next();
    args
}

fn value(prog: &str, flag: &str, next: Option<&String>) -> String {
    match next {
        Some(v) => v.clone(),
        None => {
            eprintln!("Flag {flag} expects a value");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn load_config(args: &Args) -> Result<ExportConfig> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::from_json(&fs::read_to_string(path)?)?,
        None => ExportConfig::default(),
    };
    if let Some(title) = &args.title {
        config.title = title.clone();
    } else if args.config.is_none() {
        // Default title: stem of the snapshot filename.
        if let Some(stem) = args.snapshot.file_stem().and_then(|s| s.to_str()) {
            config.title = stem.to_string();
        }
    }
    if args.landscape {
        config.orientation = PageOrientation::Landscape;
    }
    if let Some(scale) = args.scale {
        config.capture_scale = scale;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let snapshot_json = fs::read_to_string(&args.snapshot).map_err(|e| {
        ExportError::Snapshot(format!("cannot read '{}': {e}", args.snapshot.display()))
    })?;
    let snapshot = LayoutSnapshot::from_json(&snapshot_json)?;
    let config = load_config(args)?;

    let source = match &args.raster {
        Some(path) => RasterSource::Path(path.clone()),
        None => embedded_raster(&snapshot).ok_or_else(|| {
            ExportError::Capture("no raster given and none embedded in the snapshot".into())
        })?,
    };

    if args.mode != Mode::Pdf {
        let raster = source.capture(&snapshot.root)?.scaled(config.capture_scale);
        let size = raster.size();
        if size.is_empty() || snapshot.root.rect.width() <= 0.0 {
            eprintln!("Nothing to export");
            return Ok(());
        }
        let breaks = paginate(&config, &snapshot.root, size);
        if args.mode == Mode::Breaks {
            for b in &breaks {
                println!("{b}");
            }
        } else {
            let background = Color::page_background(snapshot.background_color.as_deref());
            println!("{}", build_page_plan(&config, size, &breaks, background).to_json());
        }
        return Ok(());
    }

    let exporter = Exporter::new(config);

    if let Some(image_path) = &args.image {
        let export = exporter.export_image(
            &snapshot,
            &source,
            ImageFormat::from_path(image_path),
            &LogNotifier,
        )?;
        let written = export.save(image_path)?;
        eprintln!("Wrote '{}' ({} bytes)", written.display(), export.bytes.len());
        return Ok(());
    }

    let output = args.output.clone().unwrap_or_else(|| {
        let mut o = args.snapshot.clone();
        o.set_extension("pdf");
        o
    });

    match exporter.export_pdf(&snapshot, &source, &LogNotifier)? {
        ExportOutcome::Exported(export) => {
            let written = export.save(&output)?;
            let pages = export.page_count();
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                written.display(),
                export.bytes.len(),
                pages,
                if pages == 1 { "" } else { "s" }
            );
        }
        ExportOutcome::Skipped(reason) => {
            eprintln!("Nothing written ({reason:?})");
        }
    }
    Ok(())
}

fn print_usage(prog: &str) {
    eprintln!("pagecut – paged PDF export for captured HTML");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <snapshot.json> [raster.png] [-o output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <snapshot.json>  Layout snapshot (element tree with bounding rects)");
    eprintln!("  [raster.png]     Captured raster; defaults to the snapshot's embedded data URI");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --output, -o     Output PDF path or directory (default: snapshot stem + .pdf)");
    eprintln!("  --title, -t      Document title in PDF metadata (default: snapshot filename stem)");
    eprintln!("  --landscape, -l  Use landscape page orientation");
    eprintln!("  --scale, -s      Capture scale multiplier applied to the raster (default 1)");
    eprintln!("  --config, -c     JSON export config; flags override its values");
    eprintln!("  --breaks         Print break offsets only");
    eprintln!("  --plan           Print the page plan as JSON only");
    eprintln!("  --image, -i      Export the whole capture as one JPEG/PNG instead of a PDF");
    eprintln!("  --help           Print this message");
}
