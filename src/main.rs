use anyhow::{Context, Result};
use attack_map::app::App;
use attack_map::config::{FeedConfig, MapConfig, Speed};
use attack_map::data::{TopologySource, WorldLoader};
use attack_map::feed::ThreatFeed;
use attack_map::logging::{init_logging, LogFormat};
use attack_map::{ui, MapPanel};
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Animated cyber attack map in the terminal
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "ATTACK_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// World topology URL (TopoJSON)
    #[arg(long)]
    topology_url: Option<String>,

    /// Local world topology file, used instead of the URL
    #[arg(long)]
    topology_file: Option<PathBuf>,

    /// Seed for a reproducible simulation
    #[arg(long)]
    seed: Option<u64>,

    /// Generator period in milliseconds
    #[arg(long)]
    tick_ms: Option<f64>,

    /// Start without ambient alert markers
    #[arg(long)]
    no_ambient: bool,

    /// Start at fast speed
    #[arg(long)]
    fast: bool,

    /// Region filter (USA, CHINA, RUSSIA, EUROPE, ASIA); repeatable
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Backend base URL for the threat feed
    #[arg(long, env = "ATTACK_MAP_FEED_URL")]
    feed_url: Option<String>,

    #[arg(long, default_value = "attack-map.log")]
    log_file: PathBuf,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> Result<MapConfig> {
        let mut config = match &self.config {
            Some(path) => MapConfig::from_file(path)?,
            None => MapConfig::default(),
        };

        if let Some(url) = self.topology_url {
            config.topology_url = url;
        }
        if let Some(path) = self.topology_file {
            config.topology_path = Some(path);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval_ms = ms;
        }
        if self.no_ambient {
            config.show_ambient_pulses = false;
        }
        if self.fast {
            config.speed = Speed::Fast;
        }
        if !self.regions.is_empty() {
            config.region_filter = self.regions.into_iter().map(|r| r.to_uppercase()).collect();
        }
        if let Some(base_url) = self.feed_url {
            let feed = config.feed.get_or_insert_with(FeedConfig::default);
            feed.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file, args.log_format)?;
    let config = args.into_config().context("invalid configuration")?;

    let source = match &config.topology_path {
        Some(path) => TopologySource::File(path.clone()),
        None => TopologySource::Url(config.topology_url.clone()),
    };
    info!(%source, seed = ?config.seed, "starting attack map");

    let loader = WorldLoader::spawn(source);
    let feed = config.feed.clone().map(ThreatFeed::spawn);
    let panel = MapPanel::new(config, loader);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, panel, feed);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, panel: MapPanel, feed: Option<ThreatFeed>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(panel, feed, size.width, size.height);
    let started = Instant::now();

    loop {
        app.update(started.elapsed().as_secs_f64() * 1000.0);
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.panel.teardown();
    Ok(())
}
