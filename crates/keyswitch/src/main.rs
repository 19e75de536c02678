//! Binary entrypoint for the keyswitch macOS app.
use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use config::{PreferencesStore, load_from_path, resolve_preferences_path};
use eframe::NativeOptions;
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
use objc2_foundation::MainThreadMarker;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error};

/// eframe app: engine, tap and timers.
mod app;
/// Engine OS traits over `mac-apps`.
mod backend;
/// Display geometry helpers.
mod display;
mod nswindow;
mod overlay;
/// Permission help window.
mod permissions;

use crate::app::KeyswitchApp;

#[derive(Parser, Debug)]
#[command(name = "keyswitch", about = "Hold a chord, press a key, switch apps", version)]
/// Command-line interface for the `keyswitch` binary.
struct Cli {
    /// Optional subcommand.
    #[command(subcommand)]
    command: Option<Command>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,

    /// Optional path to the preferences file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Load and validate the preferences then exit.
    Check {
        /// Preferences file to check (defaults to ~/.keyswitch/preferences.ron)
        path: Option<PathBuf>,

        /// Dump the parsed preferences as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
}

/// `keyswitch check`: exit status 1 on any problem.
fn check(path: &Path, dump: bool) -> ! {
    let prefs = match load_from_path(path).and_then(|p| p.validate().map(|()| p)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.pretty());
            process::exit(1);
        }
    };
    if dump {
        match serde_json::to_string_pretty(&prefs) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize preferences: {e}");
                process::exit(1);
            }
        }
    } else {
        println!("OK");
    }
    process::exit(0);
}

/// Small runtime for the timer tasks.
fn timer_runtime() -> Runtime {
    match Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("keyswitch-timers")
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "timer_runtime_failed");
            process::exit(1);
        }
    }
}

fn main() -> eframe::Result<()> {
    let cli = Cli::parse();
    let spec = logging::init(&cli.log);
    debug!(%spec, "logging_initialized");

    if let Some(Command::Check { path, dump }) = &cli.command {
        let explicit = path.as_deref().or(cli.config.as_deref());
        check(&resolve_preferences_path(explicit), *dump);
    }

    let prefs_path = resolve_preferences_path(cli.config.as_deref());
    let store = match PreferencesStore::open(&prefs_path) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e.pretty());
            process::exit(1);
        }
    };
    let rt = timer_runtime();

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_visible(false)
            .with_transparent(true),
        ..Default::default()
    };

    eframe::run_native(
        "keyswitch",
        options,
        Box::new(move |cc| {
            cc.egui_ctx
                .send_viewport_cmd(egui::ViewportCommand::Visible(false));
            if let Some(mtm) = MainThreadMarker::new() {
                let app = NSApplication::sharedApplication(mtm);
                app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
            }
            Ok(Box::new(KeyswitchApp::new(&cc.egui_ctx, store, rt)))
        }),
    )
}
