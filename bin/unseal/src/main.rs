mod cli;
mod cmd;
mod config;

use std::process::exit;

use gumdrop::Options;
use log::{debug, error};

use cli::{Args, Command};

#[tokio::main]
async fn main() {
    let args = Args::parse_args_default_or_exit();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Logger setup failed: {}", e);
        exit(1)
    }

    let cmd = match args.cmd {
        Some(cmd) => cmd,
        None => {
            eprintln!("{}", Args::usage());
            if let Some(cmds) = Args::command_list() {
                eprintln!("\nAvailable commands:\n{}", cmds);
            }
            exit(2)
        }
    };

    debug!("Loading config from {:?}...", args.config_file);
    // split only needs output settings, so it runs without a config file
    let loaded = match cmd {
        Command::Split(_) => config::load_or_default(&args.config_file),
        _ => config::load(&args.config_file),
    };
    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load failed: {}", e);
            exit(1)
        }
    };

    if let Err(e) = std::fs::create_dir_all(&cfg.output_dir) {
        error!("Cannot create output directory {:?}: {}", cfg.output_dir, e);
        exit(1)
    }

    let result = match cmd {
        Command::File(opts) => cmd::decode_file(&cfg, opts).await,
        Command::Bucket(opts) => cmd::decode_bucket(&cfg, opts).await,
        Command::Split(opts) => cmd::split_file(&cfg, opts).await,
    };

    if result.is_err() {
        exit(1)
    }
}
