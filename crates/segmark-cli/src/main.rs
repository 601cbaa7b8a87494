//! Segmark - headless host for the segmentation timeline
//!
//! Opens a session manifest and reads editing commands from stdin, one per
//! line. Every status event is printed to stdout as a JSON line; logs go to
//! stderr (set RUST_LOG=debug for verbose output).
//!
//! ```text
//! segmark session.json
//! ```

mod command;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use command::Command;
use segmark_core::config::{default_config_path, load_config, EditorConfig};
use segmark_core::pages::HeadlessSurfaces;
use segmark_core::playback::{NullOutput, PlaybackDriver, PlaybackRequest};
use segmark_core::{EditorResult, Session, StatusEvent};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let manifest = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: segmark <manifest.json>")?;

    let config_path = default_config_path();
    let config: EditorConfig = load_config(&config_path);
    let export_dir = std::env::current_dir().context("Failed to resolve working directory")?;

    log::info!("segmark starting up with {:?}", manifest);
    let mut session = Session::open(
        &manifest,
        config,
        Box::new(HeadlessSurfaces::new()),
        Box::new(NullOutput::new()),
    )?;
    print_status(&session);

    let period = Duration::from_millis(session.config().audio.cursor_period_ms);
    let (mut driver, mut events) = PlaybackDriver::new(session.decode_service(), period);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Some(request) = run(&mut session, command, &export_dir) {
                            fetch(&driver, &session, request);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => print_event(&StatusEvent::error(e)),
                }
            }
            Some(event) = events.recv() => {
                if let Ok(Some(request)) = session.on_engine_event(event, Instant::now()) {
                    fetch(&driver, &session, request);
                }
            }
        }

        if session.is_playing() {
            driver.start_ticker();
        } else {
            driver.stop_ticker();
        }
        print_status(&session);
    }

    log::info!("segmark shutting down");
    Ok(())
}

/// Apply a command; returns a playback fetch to start
fn run(session: &mut Session, command: Command, export_dir: &Path) -> Option<PlaybackRequest> {
    let now = Instant::now();
    match command {
        Command::Select(interval) => {
            session.select(interval);
        }
        Command::Clear => session.clear_selection(),
        Command::PointerDown { page, x, extend } => {
            session.pointer_down(page, x, extend);
        }
        Command::PointerMove { page, x } => {
            session.pointer_move(page, x);
        }
        Command::PointerUp {
            target,
            page,
            x,
            extend,
        } => {
            session.pointer_up(&target, page, x, extend);
        }
        Command::DoubleClick { target, page, x } => {
            session.double_click(&target, page, x);
        }
        Command::Words { track, first, last } => {
            reported(session.select_words(&track, first, last));
        }
        Command::Mark => {
            reported(session.mark_selection());
        }
        Command::Unmark => {
            reported(session.unmark_selection());
        }
        Command::SnapZero => {
            reported(session.snap_zero_crossing());
        }
        Command::SnapGlottal => {
            reported(session.snap_glottal());
        }
        Command::Export { looped, dir } => {
            let dir = dir.unwrap_or_else(|| export_dir.to_path_buf());
            reported(if looped {
                session.export_loop(&dir)
            } else {
                session.export_selection(1, &dir)
            });
        }
        Command::Play { looped } => return session.toggle_play(looped, now).ok().flatten(),
        Command::Stop => session.stop(now),
        Command::ShrinkPage => {
            session.shrink_page();
        }
        Command::GrowPage => {
            session.grow_page();
        }
        Command::Gain { up } => {
            session.adjust_gain(up);
        }
        Command::Save(path) => {
            if let Err(e) = session.save_spans(&path) {
                log::error!("Failed to save spans: {:#}", e);
                print_event(&StatusEvent::error(format!("{:#}", e)));
            }
        }
        Command::Quit => {}
    }
    None
}

/// Session commands publish their own failures on the status bus
fn reported<T>(result: EditorResult<T>) {
    if let Err(e) = result {
        log::debug!("Command failed, status already published: {}", e);
    }
}

fn fetch(driver: &PlaybackDriver, session: &Session, request: PlaybackRequest) {
    let cached = session.cached_buffers(&request);
    driver.fetch(request, cached);
}

fn print_status(session: &Session) {
    for event in session.status().drain() {
        print_event(&event);
    }
}

fn print_event(event: &StatusEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Failed to serialize status: {}", e),
    }
}
