use clap::{Arg, Command};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tasktrack::{
    auth::LocalIdentity,
    clock::SystemClock,
    config::{self, Config},
    error::Error,
    store::DocumentStore,
    tracker::Tracker,
    ui,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let matches = Command::new("tasktrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Personal task tracker with days-spent bookkeeping")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to the config file [default: .tasktrack/config.json]"),
        )
        .subcommand(
            Command::new("init")
                .about("Create a config file and data directory")
                .arg(
                    Arg::new("dir")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value(config::DEFAULT_DIR)
                        .help("Directory to initialize"),
                ),
        )
        .subcommand(Command::new("run").about("Open the task tracker (default)"))
        .get_matches();

    match matches.subcommand() {
        Some(("init", sub_matches)) => {
            let dir = sub_matches
                .get_one::<PathBuf>("dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(config::DEFAULT_DIR));
            if Config::init(&dir)? {
                println!("Task tracker initialized in {}", dir.display());
            } else {
                println!("Task tracker already initialized in {}", dir.display());
            }
            Ok(())
        }
        _ => {
            let path = matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(default_config_path);
            let config = Config::load(&path)?;
            run_tui(&config)
        }
    }
}

fn default_config_path() -> PathBuf {
    Path::new(config::DEFAULT_DIR).join(config::CONFIG_FILE)
}

/// Logs go to a file since the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<(), Error> {
    let log_path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    // `Config::load` has already folded TASKTRACK_LOG into `log_filter`.
    let filter = EnvFilter::try_new(&config.log_filter)?;

    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()?;
    Ok(())
}

fn run_tui(config: &Config) -> Result<(), Error> {
    config.ensure_data_dir()?;
    init_logging(config)?;
    info!(data_dir = %config.data_dir.display(), "Starting");

    let store = DocumentStore::open(config.tasks_path())?;
    let identity = LocalIdentity::open(config.accounts_path())?;
    let mut tracker = Tracker::new(Box::new(store), Box::new(identity), Box::new(SystemClock));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut tracker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!("UI loop failed: {err}");
    }
    info!("Stopped");
    result.map_err(Error::from)
}
