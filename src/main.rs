//! lwm
//!
//! A small stacking window manager for X11: framed windows with a title bar,
//! a status bar per monitor, a window switcher and a hidden-window menu.

mod config;
mod shared;
mod shell;
mod wm;
mod x11_async;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::sys::signal;
use tokio::signal::unix::SignalKind;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;

use config::Config;
use wm::WindowManager;
use wm::events::{self, WmEvent};
use x11_async::X11EventStream;

/// Status bars refresh at this rate
const TICK: Duration = Duration::from_secs(1);

fn usage() -> ! {
    eprintln!("usage: lwm [-c|--config <path>]");
    std::process::exit(2);
}

/// `-c/--config <path>` is the only option
fn parse_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => usage(),
            },
            "-h" | "--help" => usage(),
            other => {
                eprintln!("lwm: unknown argument {:?}", other);
                usage();
            }
        }
    }
    config
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lwm=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = parse_args();

    match run(config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("lwm: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    info!("Starting lwm");

    // Children are never waited on
    // SAFETY: installs SIG_IGN, no handler code runs
    let ignored = unsafe { signal::signal(signal::Signal::SIGCHLD, signal::SigHandler::SigIgn) };
    ignored.context("Failed to ignore SIGCHLD")?;

    let config = Config::load(config_path.as_deref());

    let (conn, screen_num) = x11rb::connect(None).context("Cannot open display")?;
    let conn = Arc::new(conn);

    let mut wm = WindowManager::new(conn.clone(), screen_num, config)?;
    let stream = X11EventStream::new(conn)?;

    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(SignalKind::interrupt())?;

    let mut tick = tokio::time::interval(TICK);
    tick.tick().await; // first tick fires immediately

    let mut buffer: Vec<Event> = Vec::new();

    while wm.is_running() {
        if let Err(e) = stream.flush() {
            info!("X11 connection lost: {}", e);
            break;
        }

        // Replies read during dispatch may have queued events without the
        // socket becoming readable again
        if let Err(e) = stream.drain_into(&mut buffer) {
            info!("X11 connection lost: {}", e);
            break;
        }

        if !buffer.is_empty() {
            dispatch(&mut wm, std::mem::take(&mut buffer));
            continue;
        }

        tokio::select! {
            () = stream.wait_readable() => {
                if let Err(e) = stream.drain_into(&mut buffer) {
                    info!("X11 connection lost: {}", e);
                    break;
                }
            }
            _ = tick.tick() => {
                if let Err(e) = wm.tick() {
                    debug!("Bar refresh failed: {:#}", e);
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    wm.shutdown();
    info!("lwm exited");
    Ok(())
}

/// Narrow, coalesce, then handle one drained batch in order
fn dispatch(wm: &mut WindowManager, batch: Vec<Event>) {
    let wm_events: Vec<WmEvent> = batch
        .into_iter()
        .filter_map(|event| match event {
            Event::Error(err) => {
                trace!("X11 error: {:?}", err);
                None
            }
            other => WmEvent::from_x11(other),
        })
        .collect();

    for event in events::coalesce_motion(wm_events, WmEvent::is_motion) {
        let name = event.name();
        if let Err(e) = wm.handle_event(event) {
            debug!("{} handler failed: {:#}", name, e);
        }
        if !wm.is_running() {
            break;
        }
    }
}
