use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sldview_app::{
    MemoryQueryStore, QueryStore, TrackedView, ViewStateStore, ViewerSettings, decode_views,
};
use sldview_core::{DiagramId, DiagramKind};
use sldview_layout::{DiagramGeometry, SizeInputs, reconcile};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect diagram view state and pane sizing")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode the `views` parameter of a query string and replay it
    Views {
        #[arg(long)]
        query: String,
    },
    /// Compute the geometry of a pane
    Size {
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Natural size of the drawn diagram, as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        preferred: (f64, f64),

        /// Room offered by the viewport, as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        viewport: (f64, f64),

        /// Number of panes shown side by side
        #[arg(long, default_value_t = 1)]
        display_count: usize,

        #[arg(long)]
        fullscreen: bool,

        /// Settings file; defaults are used when absent
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    VoltageLevel,
    Substation,
}

impl From<KindArg> for DiagramKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::VoltageLevel => DiagramKind::VoltageLevel,
            KindArg::Substation => DiagramKind::Substation,
        }
    }
}

fn parse_dimensions(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid dimension '{part}': {e}"))
    };
    Ok((parse(width)?, parse(height)?))
}

#[derive(Debug, Serialize)]
struct ViewsReport {
    tracked: Vec<TrackedView>,
    visible: Vec<DiagramId>,
    /// Query string as the store rewrites it.
    query: String,
}

fn views_report(query: &str) -> Result<ViewsReport> {
    let entries = decode_views(query).context("Failed to decode views")?;
    debug!(entries = entries.len(), "Decoded views");

    let store_query = MemoryQueryStore::new(query);
    let store = ViewStateStore::restore(Box::new(store_query.clone()));
    let snapshot = store.snapshot();
    Ok(ViewsReport {
        tracked: snapshot.views().to_vec(),
        visible: snapshot.visible().into_iter().map(|v| v.id.clone()).collect(),
        query: store_query.query(),
    })
}

fn size_inputs(
    settings: &ViewerSettings,
    kind: DiagramKind,
    preferred: (f64, f64),
    viewport: (f64, f64),
    display_count: usize,
    fullscreen: bool,
) -> SizeInputs {
    SizeInputs {
        kind,
        available_width: Some(viewport.0),
        available_height: Some(viewport.1),
        preferred_width: Some(preferred.0),
        preferred_height: Some(preferred.1),
        chrome: settings.chrome,
        max_width: settings.max_width,
        max_height: settings.max_height,
        display_count: Some(display_count),
        fullscreen,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Views { query } => print_json(&views_report(&query)?),
        Command::Size {
            kind,
            preferred,
            viewport,
            display_count,
            fullscreen,
            settings,
        } => {
            let settings = match settings {
                Some(path) => ViewerSettings::load(&path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?,
                None => ViewerSettings::default(),
            };
            if display_count == 0 {
                bail!("--display-count must be at least 1");
            }
            let inputs = size_inputs(
                &settings,
                kind.into(),
                preferred,
                viewport,
                display_count,
                fullscreen,
            );
            let geometry: Option<DiagramGeometry> = reconcile(&inputs);
            if geometry.is_none() {
                warn!("Inputs do not leave room for the diagram");
            }
            print_json(&geometry)
        }
    }
}
