use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hybrid_cutout::{
    default_output_path, load_annotation, save_png, AnnotationCanvas, CompositeStats, Rect,
    Session, SessionConfig, ToolConfig,
};

#[derive(Parser)]
#[command(
    name = "hybrid-cutout",
    about = "Erase (red) and restore (green) image regions marked on a display proxy",
    version,
    after_help = "Marks are given in proxy coordinates. Export the proxy with --proxy-out, \
                  draw on it elsewhere, and pass the drawing back with --annotation.\n\n\
                  Restore marks always win over erase marks."
)]
struct Cli {
    /// Input image file
    input: PathBuf,

    /// Output PNG (default: {name}_cutout.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum proxy width in pixels
    #[arg(long, default_value_t = hybrid_cutout::geometry::DEFAULT_MAX_DISPLAY_WIDTH)]
    max_width: u32,

    /// Write the display proxy to this PNG and report its geometry
    #[arg(long)]
    proxy_out: Option<PathBuf>,

    /// Proxy-sized RGBA annotation image (red = erase, green = restore)
    #[arg(short, long)]
    annotation: Option<PathBuf>,

    /// Erase rectangle in proxy pixels, as X,Y,W,H (repeatable)
    #[arg(long = "erase-rect", value_name = "X,Y,W,H")]
    erase_rects: Vec<Rect>,

    /// Restore brush stroke in proxy pixels, as "X,Y;X,Y;..." (repeatable)
    #[arg(long = "restore-stroke", value_name = "POINTS", value_parser = parse_stroke)]
    restore_strokes: Vec<Stroke>,

    /// Restore brush width in proxy pixels (1-50)
    #[arg(short, long, default_value_t = hybrid_cutout::annotate::DEFAULT_RESTORE_WIDTH)]
    brush_width: u32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone)]
struct Stroke(Vec<(f32, f32)>);

fn parse_stroke(s: &str) -> Result<Stroke, String> {
    let points = s
        .split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let (x, y) = p
                .split_once(',')
                .ok_or_else(|| format!("invalid point '{p}': expected X,Y"))?;
            let x = x.trim().parse::<f32>().map_err(|e| format!("invalid x in '{p}': {e}"))?;
            let y = y.trim().parse::<f32>().map_err(|e| format!("invalid y in '{p}': {e}"))?;
            if !x.is_finite() || !y.is_finite() {
                return Err(format!("invalid point '{p}': coordinates must be finite"));
            }
            Ok((x, y))
        })
        .collect::<Result<Vec<_>, String>>()?;
    if points.is_empty() {
        return Err("stroke needs at least one point".to_string());
    }
    Ok(Stroke(points))
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

enum Outcome {
    ProxyOnly,
    NothingToComposite,
    Saved(PathBuf, CompositeStats),
}

fn build_annotation(cli: &Cli, session: &Session) -> hybrid_cutout::Result<AnnotationCanvas> {
    let mut canvas = match &cli.annotation {
        Some(path) => {
            let buffer = load_annotation(path)?;
            hybrid_cutout::Error::check_dimensions(
                session.geometry().proxy.as_tuple(),
                buffer.dimensions(),
            )?;
            AnnotationCanvas::from_buffer(buffer)?
        }
        None => session.annotation_canvas(),
    };

    let erase = ToolConfig::erase();
    for rect in &cli.erase_rects {
        debug!(?rect, "drawing erase rectangle");
        canvas.draw_rect(&erase, *rect);
    }

    let restore = ToolConfig::restore(cli.brush_width);
    for stroke in &cli.restore_strokes {
        debug!(points = stroke.0.len(), "drawing restore stroke");
        canvas.draw_stroke(&restore, &stroke.0);
    }

    Ok(canvas)
}

fn run(cli: &Cli) -> hybrid_cutout::Result<Outcome> {
    let config = SessionConfig::default().with_max_display_width(cli.max_width);
    let session = Session::open(&cli.input, &config)?;

    if let Some(proxy_out) = &cli.proxy_out {
        save_png(session.proxy(), proxy_out)?;
        if !cli.quiet {
            let g = session.geometry();
            eprintln!(
                "[PROXY] {} ({}x{} -> {}x{}, scale {:.3})",
                proxy_out.display(),
                g.original.width,
                g.original.height,
                g.proxy.width,
                g.proxy.height,
                g.scale_factor
            );
        }
    }

    let has_input_marks =
        cli.annotation.is_some() || !cli.erase_rects.is_empty() || !cli.restore_strokes.is_empty();
    if !has_input_marks {
        return Ok(if cli.proxy_out.is_some() {
            Outcome::ProxyOnly
        } else {
            Outcome::NothingToComposite
        });
    }

    let canvas = build_annotation(cli, &session)?;
    let Some((cutout, stats)) = session.render_with_stats(Some(canvas.buffer()))? else {
        return Ok(Outcome::NothingToComposite);
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    save_png(&cutout, &output)?;
    Ok(Outcome::Saved(output, stats))
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }

    match run(&cli) {
        Ok(Outcome::ProxyOnly) => {}
        Ok(Outcome::NothingToComposite) => {
            eprintln!(
                "[SKIP] {}: no erase or restore marks; draw on the proxy first \
                 (--annotation, --erase-rect or --restore-stroke)",
                display_name(&cli.input)
            );
        }
        Ok(Outcome::Saved(output, stats)) => {
            if !cli.quiet {
                eprintln!(
                    "[OK] {} -> {} (erased {}, restored {}, untouched {})",
                    display_name(&cli.input),
                    output.display(),
                    stats.erased,
                    stats.restored,
                    stats.untouched
                );
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", display_name(&cli.input));
            process::exit(1);
        }
    }
}
