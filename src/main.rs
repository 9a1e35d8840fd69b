mod app;
mod audio;
mod config;
mod event_loop;
mod keyer;
mod logging;
mod messages;
mod morse;
mod paddle;
mod radio;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, unbounded, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use app::KeyerApp;
use audio::{AudioEngine, Sidetone, SidetoneOscillator, SilentSidetone};
use config::{AppSettings, Args};
use event_loop::EventLoop;
use keyer::Keyer;
use logging::UiLogger;
use messages::{ExitReason, UiEvent};
use paddle::PaddleReader;
use radio::{RadioClient, RadioLink, Session};

/// Set by the SIGINT handler, polled by the shutdown watcher.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn install_sigint_handler(shutdown: Sender<()>) -> Result<()> {
    unsafe {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe
        let handler = handle_sigint as *const () as libc::sighandler_t;
        if libc::signal(libc::SIGINT, handler) == libc::SIG_ERR {
            return Err(anyhow!("failed to install SIGINT handler"));
        }
    }
    std::thread::Builder::new()
        .name("shutdown-watcher".into())
        .spawn(move || loop {
            if INTERRUPTED.swap(false, Ordering::SeqCst) {
                log::info!("interrupted");
                let _ = shutdown.send(());
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        })
        .context("failed to start shutdown watcher")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration
    let config_path = args.config.clone().unwrap_or_else(AppSettings::config_path);
    let loaded = AppSettings::load_with_notice(&config_path);
    let mut settings = loaded.settings;
    args.apply(&mut settings);

    // Logging; in a window, log lines also go to the log pane
    let (ui_tx, ui_rx) = unbounded();
    let inner = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .build();
    UiLogger::new(inner, (!args.headless).then(|| ui_tx.clone()))
        .init()
        .context("installing the logger")?;
    if let Some(path) = &loaded.loaded_from {
        log::info!("loaded settings from {}", path.display());
    }
    if let Some(e) = &loaded.error {
        log::warn!("{e}");
    }
    if let Some(notice) = &loaded.notice {
        log::warn!("{notice}");
    }
    if args.save_config {
        settings
            .save(&config_path)
            .with_context(|| format!("saving settings to {}", config_path.display()))?;
    }

    // Radio
    let (mut client, radio_rx) = RadioClient::connect(&settings.radio.address)
        .context("connecting to the radio")?;
    let session = Session::bind(
        &mut client,
        &radio_rx,
        &settings.radio.station,
        Duration::from_secs(settings.radio.bind_timeout_secs),
    )
    .with_context(|| format!("binding to station {:?}", settings.radio.station))?;
    log::info!("bound to client {}", session.client_handle);

    // Sidetone; the keyer works without it
    let (_audio, sidetone): (Option<AudioEngine>, Arc<dyn Sidetone>) =
        match AudioEngine::start(&settings.audio, |rate| Arc::new(SidetoneOscillator::new(rate))) {
            Ok((engine, oscillator)) => {
                log::info!("sidetone at {} Hz sample rate", engine.sample_rate());
                (Some(engine), oscillator as Arc<dyn Sidetone>)
            }
            Err(e) => {
                log::warn!("sidetone disabled: {e}");
                (None, Arc::new(SilentSidetone) as Arc<dyn Sidetone>)
            }
        };

    // Paddles
    let (_paddle, paddle_rx) = PaddleReader::open(Path::new(&settings.keyer.device))
        .context("opening the keyer device")?;

    // Event loop
    let keyer = Keyer::new(
        settings.keyer.clone(),
        sidetone,
        Box::new(RadioLink::spawn(client, session).context("starting the radio writer")?),
    );
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let (cmd_tx, cmd_rx) = unbounded();
    install_sigint_handler(shutdown_tx.clone())?;

    let event_loop = EventLoop::new(keyer, shutdown_rx, radio_rx, cmd_rx, paddle_rx, ui_tx);
    let loop_thread = std::thread::Builder::new()
        .name("event-loop".into())
        .spawn(move || event_loop.run())
        .context("failed to start event loop")?;

    if args.headless {
        // Keep the command channel open; dropping it would read as quit
        let _cmd_tx = cmd_tx;
        let mut decoded = String::new();
        for event in ui_rx.iter() {
            match event {
                UiEvent::Status(status) if status.decoded != decoded => {
                    log::info!("decoded: {}", status.decoded);
                    decoded = status.decoded;
                }
                UiEvent::Status(_) | UiEvent::Log(_) => {}
                UiEvent::Stopped(_) => break,
            }
        }
    } else {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([560.0, 440.0])
                .with_min_inner_size([400.0, 320.0]),
            ..Default::default()
        };
        let app = KeyerApp::new(settings, loaded.notice, cmd_tx, ui_rx);
        let result = eframe::run_native("CW Keyer", options, Box::new(|_cc| Ok(Box::new(app))));
        // Window may have closed without a quit reaching the loop
        let _ = shutdown_tx.try_send(());
        result.map_err(|e| anyhow!("window failed: {e}"))?;
    }

    let reason = loop_thread
        .join()
        .map_err(|_| anyhow!("event loop panicked"))?;
    match reason {
        ExitReason::Quit | ExitReason::Shutdown => Ok(()),
        ExitReason::PaddleClosed => Err(anyhow!("paddle device went away")),
        ExitReason::RadioClosed => Err(anyhow!("radio connection closed")),
    }
}
