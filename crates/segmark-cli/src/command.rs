//! Line-oriented command parsing
//!
//! One command per line. Key names from the editor keyboard map are accepted
//! as aliases (`enter`, `backspace`, `z`, `Z`, `s`, `S`, `space`, ...).

use std::path::PathBuf;

use segmark_core::selection::ClickTarget;
use segmark_core::Interval;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(Interval),
    Clear,
    PointerDown { page: usize, x: f64, extend: bool },
    PointerMove { page: usize, x: f64 },
    PointerUp { target: ClickTarget, page: usize, x: f64, extend: bool },
    DoubleClick { target: ClickTarget, page: usize, x: f64 },
    Words { track: String, first: usize, last: usize },
    Mark,
    Unmark,
    SnapZero,
    SnapGlottal,
    Export { looped: bool, dir: Option<PathBuf> },
    Play { looped: bool },
    Stop,
    ShrinkPage,
    GrowPage,
    Gain { up: bool },
    Save(PathBuf),
    Quit,
}

/// Parse one input line; `Ok(None)` for blank lines
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let shift = rest.iter().any(|w| *w == "shift");
    let args: Vec<&str> = rest.iter().copied().filter(|w| *w != "shift").collect();

    let command = match head {
        "select" => {
            let (a, b) = (number(&args, 0)?, number(&args, 1)?);
            Command::Select(Interval::spanning(a, b))
        }
        "clear" | "escape" => Command::Clear,
        "down" => Command::PointerDown {
            page: number(&args, 0)?,
            x: number(&args, 1)?,
            extend: shift,
        },
        "move" => Command::PointerMove {
            page: number(&args, 0)?,
            x: number(&args, 1)?,
        },
        "up" => Command::PointerUp {
            page: number(&args, 0)?,
            x: number(&args, 1)?,
            target: target(args.get(2).copied())?,
            extend: shift,
        },
        "dblclick" => Command::DoubleClick {
            page: number(&args, 0)?,
            x: number(&args, 1)?,
            target: target(args.get(2).copied())?,
        },
        "words" | "w" => Command::Words {
            track: args.first().ok_or("words needs a track name")?.to_string(),
            first: number(&args, 1)?,
            last: number(&args, 2)?,
        },
        "mark" | "enter" => Command::Mark,
        "unmark" | "backspace" => Command::Unmark,
        "z" if !shift => Command::SnapZero,
        "zero" => Command::SnapZero,
        "Z" | "z" | "glottal" => Command::SnapGlottal,
        "s" | "export" => Command::Export {
            looped: shift,
            dir: args.first().map(PathBuf::from),
        },
        "S" => Command::Export {
            looped: true,
            dir: args.first().map(PathBuf::from),
        },
        "play" | "space" => Command::Play { looped: shift },
        "loop" => Command::Play { looped: true },
        "stop" => Command::Stop,
        "+" => Command::ShrinkPage,
        "-" => Command::GrowPage,
        "gain+" => Command::Gain { up: true },
        "gain-" => Command::Gain { up: false },
        "save" => Command::Save(PathBuf::from(args.first().ok_or("save needs a path")?)),
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {}", other)),
    };
    Ok(Some(command))
}

fn number<T: std::str::FromStr>(args: &[&str], index: usize) -> Result<T, String> {
    let raw = args
        .get(index)
        .ok_or_else(|| format!("Missing argument {}", index + 1))?;
    raw.parse().map_err(|_| format!("Not a number: {}", raw))
}

fn target(raw: Option<&str>) -> Result<ClickTarget, String> {
    match raw {
        None | Some("waveform") => Ok(ClickTarget::Waveform),
        Some("pitch") => Ok(ClickTarget::Pitch),
        Some(other) => other
            .strip_prefix("track:")
            .map(|name| ClickTarget::Track(name.to_string()))
            .ok_or_else(|| format!("Unknown click target: {}", other)),
    }
}
