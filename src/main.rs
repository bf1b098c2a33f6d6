use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sdl2::keyboard::Keycode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use zonefence::display::{Display, InputEvent, PixelBuffer, RenderTarget};
use zonefence::feed::RegionFeed;
use zonefence::geocode::lookup_place;
use zonefence::regions::{import_regions, ZoneRegistry};
use zonefence::store::{JsonFileStore, RegionStore};
use zonefence::{normalize_location, MapEditor, MapView, Settings};

#[derive(Parser, Debug)]
#[command(name = "zonefence", version, about = "Delivery zone geofencing and map zone editor")]
struct Args {
    /// Settings file (JSON); missing file means defaults
    #[arg(long, default_value = "zonefence.json")]
    config: PathBuf,

    /// Region definitions file
    #[arg(long, default_value = "regions.json")]
    regions: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive map editor (default)
    Edit {
        #[arg(long, short = 'w')]
        width: Option<u32>,
        #[arg(long, short = 'H')]
        height: Option<u32>,
        /// Window size as WxH, e.g. 1920x1080
        #[arg(long, short = 'r', value_parser = parse_resolution)]
        resolution: Option<(u32, u32)>,
        /// Disable VSync for an uncapped frame rate
        #[arg(long)]
        no_vsync: bool,
    },
    /// Classify a location against the stored regions
    Classify {
        #[arg(allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Read the location from a JSON customer record instead
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        record: Option<PathBuf>,
        /// Gazetteer file used to name the location
        #[arg(long)]
        gazetteer: Option<PathBuf>,
    },
    /// Validate a region batch and store it
    Import {
        file: PathBuf,
        /// Add to the stored regions instead of replacing them
        #[arg(long)]
        merge: bool,
    },
    /// Write the stored regions in the import format
    Export {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w = w.parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.parse::<u32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}

fn main() -> anyhow::Result<()> {
    zonefence::init_logging()?;
    let args = Args::parse();

    let settings = Settings::load_or_default(&args.config)
        .with_context(|| format!("reading settings from {}", args.config.display()))?;
    let store = JsonFileStore::new(&args.regions);

    match args.command.unwrap_or(Command::Edit {
        width: None,
        height: None,
        resolution: None,
        no_vsync: false,
    }) {
        Command::Edit {
            width,
            height,
            resolution,
            no_vsync,
        } => {
            let (mut w, mut h) = resolution.unwrap_or((settings.canvas_width, settings.canvas_height));
            w = width.unwrap_or(w);
            h = height.unwrap_or(h);
            run_editor(settings, &store, w, h, !no_vsync)
        }
        Command::Classify {
            lat,
            lng,
            record,
            gazetteer,
        } => run_classify(&settings, &store, lat, lng, record.as_deref(), gazetteer.as_deref()),
        Command::Import { file, merge } => run_import(&store, &file, merge),
        Command::Export { output } => {
            let regions = store.load_regions()?;
            let json = zonefence::regions::export_regions(&regions)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), count = regions.len(), "regions exported");
                }
                None => println!("{}", json),
            }
            Ok(())
        }
    }
}

fn run_classify(
    settings: &Settings,
    store: &JsonFileStore,
    lat: Option<f64>,
    lng: Option<f64>,
    record: Option<&Path>,
    gazetteer: Option<&Path>,
) -> anyhow::Result<()> {
    let point = match (record, lat, lng) {
        (Some(path), _, _) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&json)?;
            normalize_location(&value)?
        }
        (None, Some(lat), Some(lng)) => zonefence::GeoPoint::new(lat, lng),
        _ => bail!("give LAT LNG or --record FILE"),
    };

    let registry = ZoneRegistry::from_regions(store.load_regions()?)?;
    let classification = registry.classify(point.lat, point.lng, &settings.classify)?;

    let place = gazetteer.and_then(|path| lookup_place(path, point));

    let output = serde_json::json!({
        "location": point,
        "place": place,
        "classification": classification,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_import(store: &JsonFileStore, file: &Path, merge: bool) -> anyhow::Result<()> {
    let json = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let incoming = import_regions(&json)?;

    let mut registry = if merge {
        ZoneRegistry::from_regions(store.load_regions()?)?
    } else {
        ZoneRegistry::new()
    };
    registry.extend(incoming)?;
    store.save_regions(registry.regions())?;
    println!("{} regions stored in {}", registry.len(), store.path().display());
    Ok(())
}

fn run_editor(settings: Settings, store: &JsonFileStore, width: u32, height: u32, vsync: bool) -> anyhow::Result<()> {
    let registry = ZoneRegistry::from_regions(store.load_regions()?)?;
    let view = MapView::new(settings.center, settings.zoom, width, height);
    let mut editor = MapEditor::new(registry, view, settings.editor.clone());

    let feed = if settings.feed.enabled {
        match RegionFeed::subscribe(&settings.feed) {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!("Continuing without region feed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let (mut display, texture_creator) =
        Display::with_options("zonefence", width, height, vsync).map_err(anyhow::Error::msg)?;
    let mut target = RenderTarget::with_size(&texture_creator, width, height).map_err(anyhow::Error::msg)?;
    let mut buffer = PixelBuffer::with_size(width, height);

    println!("=== zonefence ===");
    println!("Regions: {} ({})", editor.registry().len(), store.path().display());
    println!("Resolution: {}x{}", width, height);
    println!("Controls:");
    println!("  Left click        - Select region / add point while drawing");
    println!("  Click + drag      - Move a vertex of the selected region");
    println!("  Close polygon     - Click near first vertex, or Enter");
    println!("  Right click       - Cancel drawing / deselect");
    println!("  Middle drag       - Pan");
    println!("  Wheel             - Zoom");
    println!("  D                 - Draw new region");
    println!("  Backspace         - Remove last drawn point");
    println!("  Esc               - Cancel drawing / deselect");
    println!("  H / V             - Hide selected / show all");
    println!("  A                 - Toggle selected active");
    println!("  F                 - Focus selected");
    println!("  Delete            - Delete selected region");
    println!("  S / L             - Save / reload regions");
    println!("  Q                 - Quit");

    'main: loop {
        for event in display.poll_events() {
            match &event {
                InputEvent::Quit | InputEvent::KeyDown(Keycode::Q) => break 'main,
                InputEvent::KeyDown(Keycode::S) => {
                    match store.save_regions(editor.registry().regions()) {
                        Ok(()) => {
                            editor.mark_saved();
                            if let Some(feed) = &feed {
                                if let Err(e) = feed.publish(editor.registry().regions()) {
                                    warn!("Saved locally, publish failed: {}", e);
                                }
                            }
                        }
                        Err(e) => error!("Failed to save: {}", e),
                    }
                    continue;
                }
                InputEvent::KeyDown(Keycode::L) => {
                    match store.load_regions().and_then(|regions| editor.replace_regions(regions)) {
                        Ok(()) => info!("Regions reloaded from {}", store.path().display()),
                        Err(e) => error!("Failed to reload: {}", e),
                    }
                    continue;
                }
                _ => {}
            }
            editor.handle_event(&event);
        }

        if let Some(regions) = feed.as_ref().and_then(RegionFeed::poll) {
            if editor.is_dirty() {
                warn!("Remote region change ignored, unsaved local edits");
            } else if let Err(e) = editor.replace_regions(regions) {
                warn!("Remote region snapshot rejected: {}", e);
            } else {
                info!(count = editor.registry().len(), "regions updated from feed");
            }
        }

        editor.render(&mut buffer);
        display.set_title(&editor.status_line());
        display.present(&mut target, &buffer).map_err(anyhow::Error::msg)?;
    }

    if editor.is_dirty() {
        warn!("Quitting with unsaved region changes");
    }
    Ok(())
}
