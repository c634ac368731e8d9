use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use symbol_detect::camera;
use symbol_detect::cli::{self, Args, Command, ConfigAction, ControlCommand};
use symbol_detect::config::Config;
use symbol_detect::inference::InferenceClient;
use symbol_detect::pipeline::DetectionPipeline;
use symbol_detect::presentation::{AudioPlayer, CommandPlayer, MutePlayer, Presenter, TerminalSink};

/// Load .env file without overriding variables that are already set.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Load the config file and apply environment, then CLI overrides.
///
/// An explicit `--config` must exist and parse. A broken default config
/// falls back to the built-in defaults with a warning.
fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match args.config.as_deref() {
        Some(path) => Config::load(Some(path)).map_err(|e| e.to_string())?,
        None => Config::load(None).unwrap_or_else(|e| {
            log::warn!("Failed to load config file: {}. Using default settings.", e);
            Config::default()
        }),
    };
    config.apply_env();
    args.apply_to(&mut config);
    Ok(config)
}

async fn run_detector(config: Config, autostart: bool) -> Result<(), String> {
    let backend = camera::backend_for(config.camera.backend).map_err(|e| e.to_string())?;
    let client = InferenceClient::with_timeouts(
        &config.inference.base_url,
        config.request_timeout(),
        config.connect_timeout(),
    )
    .map_err(|e| e.to_string())?;

    let player: Arc<dyn AudioPlayer> = if config.presentation.audio {
        Arc::new(CommandPlayer::new(config.presentation.player.clone()))
    } else {
        Arc::new(MutePlayer)
    };
    let sink = Arc::new(TerminalSink::new(config.terminal_options(), player));
    let presenter = Arc::new(Presenter::new(sink, config.presenter_config()));

    println!(
        "Posting frames every {} ms to {}",
        config.sampler_config().interval.as_millis(),
        client.predict_url()
    );
    println!("{}", cli::HELP);

    let mut pipeline = DetectionPipeline::new(
        backend,
        config.camera_settings(),
        config.sampler_config(),
        Arc::new(client),
        presenter,
    );

    if autostart {
        // Failures are logged by the pipeline; the loop still accepts `start`.
        let _ = pipeline.start().await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Failed to read commands from stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ControlCommand>() {
                    Ok(ControlCommand::Start) => {
                        let _ = pipeline.start().await;
                    }
                    Ok(ControlCommand::Stop) => pipeline.stop().await,
                    Ok(ControlCommand::Status) => println!("{}", pipeline.status()),
                    Ok(ControlCommand::Help) => println!("{}", cli::HELP),
                    Ok(ControlCommand::Quit) => break,
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    pipeline.stop().await;
    Ok(())
}

fn run(config: Config, autostart: bool) -> Result<(), String> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;
    let result = rt.block_on(run_detector(config, autostart));
    // The stdin reader sits in a blocking read; don't wait for it.
    rt.shutdown_timeout(Duration::from_millis(100));
    result
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();
    let command = args.command();

    // `config init` creates the file, so it must not require one to exist
    let config = if command == (Command::Config { action: ConfigAction::Init }) {
        Config::default()
    } else {
        load_config(&args).unwrap_or_else(|e| exit_with(e))
    };

    let result = match command {
        Command::Run => run(config, args.autostart),
        Command::ListCameras => cli::list_cameras(config.camera.backend).map_err(|e| e.to_string()),
        Command::Config { action } => cli::handle_config_action(action, args.config.as_deref(), &config)
            .map_err(|e| e.to_string()),
    };

    if let Err(e) = result {
        exit_with(e);
    }
}
