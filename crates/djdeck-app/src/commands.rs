//! Line-oriented control surface.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use djdeck_audio::{list_output_devices, OutputDevice, Session};
use djdeck_core::{Deck, SourceLocator};

pub const HELP: &str = "\
commands:
  load <deck> <path|url>       load a file or URL into a deck
  unload <deck>                release the deck's track
  play <deck> | stop <deck>    start or stop a deck
  gain <deck> <0-1>            deck gain
  speed <deck> <ratio>         playback speed (> 0)
  seek <deck> <seconds>        absolute seek
  pos <deck> <0-1>             relative seek
  reverb <deck> on|off         toggle the deck reverb
  wet|room|damp <deck> <0-1>   reverb wet/dry, room size, damping
  add <path|url>...            add files or URLs to the playlist
  delete <row>                 remove a playlist row
  queue <row> <deck>           queue a row on a deck
  next <deck>                  load the deck's next queued track
  pick <row> <deck>            load a row straight into a deck
  search [text]                filter the playlist
  list | status                show the playlist or the decks
  output                       start the audio device
  devices                      list output devices
  help | quit";

/// Reverb parameters settable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverbParam {
    WetDry,
    RoomSize,
    Damping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(Deck, SourceLocator),
    Unload(Deck),
    Play(Deck),
    Stop(Deck),
    Gain(Deck, f32),
    Speed(Deck, f64),
    Seek(Deck, f64),
    Position(Deck, f64),
    Reverb(Deck, bool),
    ReverbParam(Deck, ReverbParam, f32),
    Add(Vec<SourceLocator>),
    Delete(usize),
    Queue(usize, Deck),
    Next(Deck),
    Pick(usize, Deck),
    Search(String),
    List,
    Status,
    Output,
    Devices,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let args: Vec<&str> = words.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "load" => {
                let deck = deck_arg(&args, 0)?;
                let rest = args.get(1..).unwrap_or_default().join(" ");
                if rest.is_empty() {
                    bail!("usage: load <deck> <path|url>");
                }
                Self::Load(deck, SourceLocator::parse(&rest))
            }
            "unload" => Self::Unload(deck_arg(&args, 0)?),
            "play" | "start" => Self::Play(deck_arg(&args, 0)?),
            "stop" => Self::Stop(deck_arg(&args, 0)?),
            "gain" | "vol" => Self::Gain(deck_arg(&args, 0)?, num_arg(&args, 1)?),
            "speed" => Self::Speed(deck_arg(&args, 0)?, num_arg(&args, 1)?),
            "seek" => Self::Seek(deck_arg(&args, 0)?, num_arg(&args, 1)?),
            "pos" => Self::Position(deck_arg(&args, 0)?, num_arg(&args, 1)?),
            "reverb" => {
                let deck = deck_arg(&args, 0)?;
                let on = match args.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
                    Some("on" | "1" | "true") => true,
                    Some("off" | "0" | "false") => false,
                    _ => bail!("usage: reverb <deck> on|off"),
                };
                Self::Reverb(deck, on)
            }
            "wet" => Self::ReverbParam(deck_arg(&args, 0)?, ReverbParam::WetDry, num_arg(&args, 1)?),
            "room" => Self::ReverbParam(deck_arg(&args, 0)?, ReverbParam::RoomSize, num_arg(&args, 1)?),
            "damp" => Self::ReverbParam(deck_arg(&args, 0)?, ReverbParam::Damping, num_arg(&args, 1)?),
            "add" => {
                if args.is_empty() {
                    bail!("usage: add <path|url>...");
                }
                Self::Add(args.iter().map(|a| SourceLocator::parse(a)).collect())
            }
            "delete" | "rm" => Self::Delete(num_arg(&args, 0)?),
            "queue" => Self::Queue(num_arg(&args, 0)?, deck_arg(&args, 1)?),
            "next" => Self::Next(deck_arg(&args, 0)?),
            "pick" => Self::Pick(num_arg(&args, 0)?, deck_arg(&args, 1)?),
            "search" => Self::Search(args.join(" ")),
            "list" | "ls" => Self::List,
            "status" => Self::Status,
            "output" => Self::Output,
            "devices" => Self::Devices,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(command)
    }
}

fn deck_arg(args: &[&str], index: usize) -> Result<Deck> {
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("missing deck (left|right)"))?;
    Ok(raw.parse::<Deck>()?)
}

fn num_arg<T: FromStr>(args: &[&str], index: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("missing argument {}", index + 1))?;
    raw.parse()
        .with_context(|| format!("invalid number '{raw}'"))
}

/// Apply a command to the session and return what to print.
pub fn execute(session: &mut Session, command: Command) -> Result<String> {
    let mut out = String::new();
    match command {
        Command::Load(deck, locator) => {
            session.deck(deck).load_track(&locator)?;
            writeln!(out, "{deck}: loaded {locator}")?;
        }
        Command::Unload(deck) => session.deck(deck).unload(),
        Command::Play(deck) => {
            let player = session.deck(deck);
            player.start();
            if !player.is_playing() {
                writeln!(out, "{deck}: nothing loaded")?;
            }
        }
        Command::Stop(deck) => session.deck(deck).stop(),
        Command::Gain(deck, gain) => session.deck(deck).set_gain(gain),
        Command::Speed(deck, ratio) => session.deck(deck).set_speed(ratio)?,
        Command::Seek(deck, seconds) => session.deck(deck).set_position(seconds),
        Command::Position(deck, fraction) => session.deck(deck).set_position_relative(fraction),
        Command::Reverb(deck, on) => session.deck(deck).set_reverb_active(on),
        Command::ReverbParam(deck, param, value) => {
            let player = session.deck(deck);
            match param {
                ReverbParam::WetDry => player.set_reverb_wet_dry(value),
                ReverbParam::RoomSize => player.set_reverb_room_size(value),
                ReverbParam::Damping => player.set_reverb_damping(value),
            }
        }
        Command::Add(locators) => {
            let mut added = 0;
            let mut files = Vec::new();
            for locator in locators {
                match locator {
                    SourceLocator::File(path) => files.push(path),
                    remote @ SourceLocator::Remote(_) => {
                        let title = remote.display_name();
                        session.add_entry(remote, title);
                        added += 1;
                    }
                }
            }
            added += session.add_files(files);
            writeln!(out, "added {added} entries")?;
        }
        Command::Delete(row) => {
            let removed = session.delete_entry(row)?;
            writeln!(out, "deleted {}", removed.title)?;
        }
        Command::Queue(row, deck) => session.enqueue(row, deck)?,
        Command::Next(deck) => match session.play_next(deck)? {
            Some(track) => writeln!(out, "{deck}: loaded {}", track.title)?,
            None => writeln!(out, "{deck}: queue is empty")?,
        },
        Command::Pick(row, deck) => {
            let track = session.load_entry(row, deck)?;
            writeln!(out, "{deck}: loaded {}", track.title)?;
        }
        Command::Search(text) => write_rows(&mut out, session, &text)?,
        Command::List => write_rows(&mut out, session, "")?,
        Command::Status => {
            for deck in Deck::ALL {
                let player = session.deck(deck);
                let title = player
                    .loaded_track()
                    .map_or_else(|| "-".to_string(), |t| t.title);
                writeln!(
                    out,
                    "{deck}: {title} [{}] {:.1}/{:.1}s ({:.0}%) gain {:.2} speed {:.2} reverb {}",
                    if player.is_playing() { "playing" } else { "stopped" },
                    player.position_secs(),
                    player.length_secs(),
                    player.position_relative() * 100.0,
                    player.gain(),
                    player.speed(),
                    if player.is_reverb_active() { "on" } else { "off" },
                )?;
            }
        }
        Command::Output => {
            session.start_output()?;
            let config = session.config();
            writeln!(out, "output running at {} Hz", config.sample_rate)?;
        }
        Command::Devices => write_devices(&mut out, &list_output_devices()?)?,
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => {}
    }
    Ok(out)
}

fn write_devices(out: &mut String, devices: &[OutputDevice]) -> Result<()> {
    if devices.is_empty() {
        writeln!(out, "(no output devices)")?;
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        writeln!(out, "{marker} {}", device.name)?;
    }
    Ok(())
}

/// Playlist rows matching `search`, with their queue flags.
fn write_rows(out: &mut String, session: &Session, search: &str) -> Result<()> {
    let playlist = session.playlist();
    let rows = playlist.filter(search);
    if rows.is_empty() {
        writeln!(out, "(no entries)")?;
    }
    for index in rows {
        let Some(entry) = playlist.entry(index) else {
            continue;
        };
        let queued: Vec<String> = Deck::ALL
            .into_iter()
            .filter(|&deck| playlist.is_queued(index, deck))
            .map(|deck| deck.to_string())
            .collect();
        writeln!(
            out,
            "{index:>3}  {}  {}{}",
            entry.title,
            entry.locator,
            if queued.is_empty() {
                String::new()
            } else {
                format!("  [queued: {}]", queued.join(", "))
            }
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_deck_commands() {
        assert_eq!("play left".parse::<Command>().unwrap(), Command::Play(Deck::Left));
        assert_eq!(
            "gain r 0.5".parse::<Command>().unwrap(),
            Command::Gain(Deck::Right, 0.5)
        );
        assert_eq!(
            "room left 0.8".parse::<Command>().unwrap(),
            Command::ReverbParam(Deck::Left, ReverbParam::RoomSize, 0.8)
        );
        assert_eq!(
            "reverb right ON".parse::<Command>().unwrap(),
            Command::Reverb(Deck::Right, true)
        );
    }

    #[test]
    fn test_parse_load_keeps_spaces() {
        let command = "load left /music/My Set.wav".parse::<Command>().unwrap();
        assert_eq!(
            command,
            Command::Load(Deck::Left, SourceLocator::parse("/music/My Set.wav"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Command>().is_err());
        assert!("play".parse::<Command>().is_err());
        assert!("play middle".parse::<Command>().is_err());
        assert!("gain left loud".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }

    #[test]
    fn test_devices_listing() {
        assert_eq!("devices".parse::<Command>().unwrap(), Command::Devices);

        let mut out = String::new();
        write_devices(&mut out, &[]).unwrap();
        assert_eq!(out, "(no output devices)\n");

        let mut out = String::new();
        let devices = [
            OutputDevice {
                name: "Speakers".to_string(),
                is_default: true,
            },
            OutputDevice {
                name: "Headphones".to_string(),
                is_default: false,
            },
        ];
        write_devices(&mut out, &devices).unwrap();
        assert_eq!(out, "* Speakers\n  Headphones\n");
    }

    #[test]
    fn test_execute_playlist_flow() {
        let mut session = Session::default();
        execute(
            &mut session,
            "add /music/one.wav https://example.com/two.mp3 /music/cover.jpg"
                .parse()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(session.playlist().len(), 2);

        execute(&mut session, "queue 1 left".parse().unwrap()).unwrap();
        let listing = execute(&mut session, Command::List).unwrap();
        assert!(listing.contains("[queued: left]"));

        let found = execute(&mut session, "search ONE".parse().unwrap()).unwrap();
        assert!(found.contains("one"));
        assert!(!found.contains("two"));

        assert!(execute(&mut session, "speed left 0".parse().unwrap()).is_err());
        assert!(execute(&mut session, "delete 9".parse().unwrap()).is_err());
    }
}
