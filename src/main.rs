#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Headless editor driver: walks a document's parts from a directory of
/// JSON part records, logging what every panel would draw.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding `<part id>.json` records
    records_dir: PathBuf,

    /// Part to start from
    #[arg(long, default_value_t = 1)]
    start: u64,

    /// Zoom applied on every part; above 1 also pulls the full resolution image
    #[arg(long, default_value_t = 2.0)]
    zoom: f32,

    /// Directory the image URIs are resolved against
    #[arg(long)]
    media_root: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use pagesync::config::EditorConfig;
    use pagesync::constants::panels;
    use pagesync::context::EditorContext;
    use pagesync::model::PageId;
    use pagesync::native::{FilePageSource, FileStore, LogLocation, LogSurface, walk_document};
    use pagesync::shell::EditorShell;
    use pagesync::visibility::{KeyValueStore, MemoryStore, PanelVisibilityStore};

    let args = Args::parse();

    let config_path = args.config.clone().or_else(EditorConfig::default_path);
    let loaded = config_path.as_deref().map(EditorConfig::load_or_init);
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => EditorConfig::new(),
    };
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    if let Some(Err(e)) = loaded {
        log::warn!("Using default settings, {:?} unusable: {}", config_path, e);
    }

    if !args.zoom.is_finite() {
        eprintln!("--zoom must be a finite number, got {}", args.zoom);
        std::process::exit(2);
    }

    let backend: Box<dyn KeyValueStore> = match FileStore::default_path().map(FileStore::open) {
        Some(Ok(store)) => Box::new(store),
        Some(Err(e)) => {
            log::warn!("Panel store unavailable, using memory: {}", e);
            Box::new(MemoryStore::new())
        }
        None => Box::new(MemoryStore::new()),
    };
    let visibility = PanelVisibilityStore::with_expiry_days(backend, config.visibility_expiry_days);
    if visibility.get(panels::SOURCE).is_none() {
        if let Err(e) = visibility.set(panels::SOURCE, true) {
            log::warn!("Could not persist panel flag: {}", e);
        }
    }

    let href = format!("/document/{}/part/{}/edit/", config.document_id, args.start);
    let mut context = EditorContext::new(config, visibility, Box::new(LogLocation::new(href)));
    if let Err(e) = context.add_standard_panels(|name| LogSurface::pair(name, (1200.0, 800.0))) {
        eprintln!("Editor setup failed: {}", e);
        std::process::exit(1);
    }

    let mut source = FilePageSource::new(args.records_dir);
    if let Some(root) = args.media_root {
        source = source.with_media_root(root);
    }
    let shell = EditorShell::new(context, source);
    match pollster::block_on(walk_document(&shell, PageId(args.start), args.zoom)) {
        Ok(visited) => log::info!("Visited {} parts", visited.len()),
        Err(e) => {
            eprintln!("Application error: {}", e);
            std::process::exit(1);
        }
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
