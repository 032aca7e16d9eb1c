//! Native driver: annotate a session from the terminal.
//!
//! Labels and segment files live under a data directory (see
//! [`FileLabelService`]); commands are read line by line from stdin.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::io::{self, BufRead, Write};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use clap::Parser;
    use orthoviewer::config::{AppConfig, LogLevel};
    use orthoviewer::geometry::Size;
    use orthoviewer::native::{Driver, DriverCommand, parse_line};
    use orthoviewer::sync::FileLabelService;
    use orthoviewer::{Annotator, SessionMeta};

    #[derive(Parser, Debug)]
    #[command(name = "orthoviewer-native", about = "Label superpixel regions of an orthophoto")]
    struct Args {
        /// Directory holding `labels/` and `segments/`
        #[arg(long, default_value = ".")]
        data: PathBuf,

        /// Session (image id) to open at startup
        #[arg(long)]
        session: Option<String>,

        /// Import a segments JSON file into the data directory and open it
        #[arg(long, conflicts_with = "session")]
        segments: Option<PathBuf>,

        /// Config file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Viewport width in pixels
        #[arg(long, default_value_t = 1280.0)]
        width: f32,

        /// Viewport height in pixels
        #[arg(long, default_value_t = 800.0)]
        height: f32,

        /// User recorded with each label
        #[arg(long)]
        user: Option<String>,

        /// Log level (RUST_LOG takes precedence)
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Print the effective configuration as JSON and exit
        #[arg(long)]
        print_config: bool,
    }

    fn load_config(args: &Args) -> AppConfig {
        let mut config = match &args.config {
            Some(path) => match AppConfig::load_from_path(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to load config {}: {}", path.display(), e);
                    AppConfig::default()
                }
            },
            None => AppConfig::load_from_default_path().unwrap_or_default(),
        };
        if let Some(user) = &args.user {
            config.server.user = user.clone();
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }
        config
    }

    fn import_segments(service: &FileLabelService, path: &Path) -> Result<String, String> {
        let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let meta = SessionMeta::from_json(&json).map_err(|e| format!("{}: {}", path.display(), e))?;
        service.write_session(&meta).map_err(|e| e.to_string())?;
        log::info!("Imported {} regions for '{}'", meta.polygons.len(), meta.image_id);
        Ok(meta.image_id)
    }

    pub fn run() -> Result<(), String> {
        let args = Args::parse();
        let config = load_config(&args);
        if args.print_config {
            let json = config.to_json().map_err(|e| e.to_string())?;
            println!("{}", json);
            return Ok(());
        }

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(config.log_level.as_filter_str()),
        )
        .init();
        log::info!("Starting {} (data dir {})", config.app_name, args.data.display());

        let service = FileLabelService::new(&args.data);
        let initial = match &args.segments {
            Some(path) => Some(import_segments(&service, path)?),
            None => args.session.clone(),
        };

        let mut annotator = Annotator::new(&config, Rc::new(service));
        annotator.set_container(Size::new(args.width, args.height));
        let mut driver = Driver::new(annotator, &args.data);

        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Some(id) = initial {
            for command in [DriverCommand::Open(id), DriverCommand::Counts] {
                if let Some(text) = driver.execute(command) {
                    let _ = writeln!(out, "{}", text);
                }
            }
        } else {
            let _ = writeln!(out, "No session open. Use 'open <id>' or 'help'.");
        }

        for line in io::stdin().lock().lines() {
            let line = line.map_err(|e| e.to_string())?;
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("{} (try 'help')", e);
                    continue;
                }
            };
            match driver.execute(command) {
                Some(text) if !text.is_empty() => {
                    let _ = writeln!(out, "{}", text);
                }
                Some(_) => {}
                None => break,
            }
            let _ = out.flush();
        }

        driver.shutdown();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
