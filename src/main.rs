mod browse;
mod catalog;
mod cli;
mod config;
mod favorites;
mod model;
mod player;
mod render;
mod session;
mod storage;
mod transcript;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flix", about = "Browse movies, keep favourites, watch previews")]
pub struct Args {
    #[arg(short, long, help = "Run one command (e.g. '/page movies') and exit")]
    pub command: Option<String>,

    #[arg(long, env = "TMDB_API_KEY", help = "Catalog API key (overrides config)")]
    pub api_key: Option<String>,

    #[arg(long, env = "TMDB_BASE_URL", help = "Catalog API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Directory for the persisted session and favourites")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, help = "Activity transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Skip the simulated sign-in delay")]
    pub no_delay: bool,

    #[arg(long, help = "Debug output (print settings and navigation)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config, using defaults: {}", e);
            config::Config::default()
        })
    };

    // CLI flags override config files
    if let Some(api_key) = &args.api_key {
        cfg.catalog.api_key = Some(api_key.clone());
    }
    if let Some(base_url) = &args.base_url {
        cfg.catalog.base_url = base_url.clone();
    }
    if let Some(dir) = &args.state_dir {
        cfg.storage.dir = Some(dir.clone());
    }
    if args.no_delay {
        cfg.session.simulated_delay_ms = 0;
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} errors)",
            errors.len()
        ));
    }

    let state_dir = cfg.storage.resolve_dir();
    if args.debug {
        eprintln!("[DEBUG] Catalog: {}", cfg.catalog.base_url);
        eprintln!("[DEBUG] State dir: {}", state_dir.display());
        eprintln!("[DEBUG] Sign-in delay: {}ms", cfg.session.simulated_delay_ms);
    }

    let transcripts_dir = args
        .transcripts_dir
        .clone()
        .unwrap_or_else(|| state_dir.join("sessions"));
    std::fs::create_dir_all(&transcripts_dir)?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let transcript_path = transcripts_dir.join(format!("{}.jsonl", session_id));
    let transcript = transcript::Transcript::new(&transcript_path, &session_id)?;

    let store = storage::FileStore::new(&state_dir);
    let session = session::SessionStore::open(store.clone(), cfg.session.clone());
    let favorites = favorites::FavoritesStore::open(store);

    let client: Arc<dyn catalog::Catalog> = Arc::new(catalog::Client::new(&cfg.catalog));
    let navigator = browse::Navigator::new(client);
    let player = player::Player::new(cfg.player.clone());

    let ctx = cli::Context {
        session_id,
        state_dir,
        debug: args.debug,
        transcript: RefCell::new(transcript),
        session: RefCell::new(session),
        favorites: RefCell::new(favorites),
        navigator: RefCell::new(navigator),
        player,
        images: catalog::ImageUrls::new(&cfg.catalog),
        visible: RefCell::new(Vec::new()),
        config: cfg,
    };

    if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
