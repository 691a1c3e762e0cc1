// Command types - Interactive control of the playback loop
// One command per input line, whitespace separated, section indices from 0

use crate::sequencer::error::SequencerError;
use crate::sequencer::pattern::Instrument;
use crate::sequencer::section::Direction;
use crate::sequencer::timeline::TimeSignature;
use std::str::FromStr;
use thiserror::Error;

/// Usage text printed by `help`
pub const HELP: &str = "\
commands:
  add <name> [bars] [meter]          append a section (meter defaults to the current one)
  resize <section> <bars>            change a section's bar count
  meter <meter>                      change the default meter (4/4, 3/4, 6/8, ...)
  meter <section> <meter>            change a section's meter
  toggle <section> <drum> <step>     flip one step
  set <section> <drum> <step> on|off set one step
  clear <section>                    clear a section's pattern
  move <section> up|down             reorder the timeline
  delete <section>                   remove a section
  select <section>|none              choose the section to play
  start | stop                       control playback
  bpm <tempo>                        change the tempo (20 to 999)
  volume <0.0-1.0>                   change the output gain
  show                               print the timeline and the selected pattern
  help | quit
drums: kick, snare, ohat, chat, crash";

/// Parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddSection {
        name: String,
        measures: u32,
        time_signature: Option<TimeSignature>,
    },
    Resize {
        section: usize,
        measures: u32,
    },
    SetDefaultMeter(TimeSignature),
    SetSectionMeter {
        section: usize,
        time_signature: TimeSignature,
    },
    Toggle {
        section: usize,
        instrument: Instrument,
        step: usize,
    },
    SetStep {
        section: usize,
        instrument: Instrument,
        step: usize,
        on: bool,
    },
    Clear {
        section: usize,
    },
    Move {
        section: usize,
        direction: Direction,
    },
    Delete {
        section: usize,
    },
    Select(Option<usize>),
    Start,
    Stop,
    SetTempo(f64),
    SetVolume(f32),
    Show,
    Help,
    Quit,
}

/// Errors raised while parsing an input line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: invalid {argument} '{value}'")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },

    #[error("{command}: unexpected argument '{value}'")]
    TrailingArgument { command: &'static str, value: String },

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

/// Positional argument reader for one command
struct Args<'a> {
    command: &'static str,
    tokens: std::slice::Iter<'a, &'a str>,
}

impl<'a> Args<'a> {
    fn next(&mut self, argument: &'static str) -> Result<&'a str, ParseCommandError> {
        self.tokens
            .next()
            .copied()
            .ok_or(ParseCommandError::MissingArgument {
                command: self.command,
                argument,
            })
    }

    fn optional(&mut self) -> Option<&'a str> {
        self.tokens.next().copied()
    }

    fn parse<T: FromStr>(&mut self, argument: &'static str) -> Result<T, ParseCommandError> {
        let value = self.next(argument)?;
        self.convert(argument, value)
    }

    fn convert<T: FromStr>(&self, argument: &'static str, value: &str) -> Result<T, ParseCommandError> {
        value.parse().map_err(|_| ParseCommandError::InvalidArgument {
            command: self.command,
            argument,
            value: value.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), ParseCommandError> {
        match self.tokens.next() {
            Some(value) => Err(ParseCommandError::TrailingArgument {
                command: self.command,
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "x" => Some(true),
        "off" | "0" | "false" | "-" => Some(false),
        _ => None,
    }
}

fn parse_direction(value: &str) -> Option<Direction> {
    match value.to_ascii_lowercase().as_str() {
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        _ => None,
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (&name, rest) = tokens.split_first().ok_or(ParseCommandError::Empty)?;
        let keyword = name.to_ascii_lowercase();

        let command: &'static str = match keyword.as_str() {
            "add" => "add",
            "resize" => "resize",
            "meter" => "meter",
            "toggle" => "toggle",
            "set" => "set",
            "clear" => "clear",
            "move" => "move",
            "delete" | "rm" => "delete",
            "select" => "select",
            "start" | "play" => "start",
            "stop" => "stop",
            "bpm" | "tempo" => "bpm",
            "volume" | "vol" => "volume",
            "show" | "ls" => "show",
            "help" | "?" => "help",
            "quit" | "exit" | "q" => "quit",
            _ => return Err(ParseCommandError::Unknown(name.to_string())),
        };
        let mut args = Args {
            command,
            tokens: rest.iter(),
        };

        let parsed = match command {
            "add" => {
                let name = args.next("name")?.to_string();
                let measures = match args.optional() {
                    Some(value) => args.convert("bar count", value)?,
                    None => 1,
                };
                let time_signature = args
                    .optional()
                    .map(str::parse::<TimeSignature>)
                    .transpose()?;
                Command::AddSection {
                    name,
                    measures,
                    time_signature,
                }
            }
            "resize" => Command::Resize {
                section: args.parse("section")?,
                measures: args.parse("bar count")?,
            },
            "meter" => {
                let first = args.next("meter")?;
                match args.optional() {
                    Some(meter) => Command::SetSectionMeter {
                        section: args.convert("section", first)?,
                        time_signature: meter.parse()?,
                    },
                    None => Command::SetDefaultMeter(first.parse()?),
                }
            }
            "toggle" => Command::Toggle {
                section: args.parse("section")?,
                instrument: args.next("drum")?.parse()?,
                step: args.parse("step")?,
            },
            "set" => {
                let section: usize = args.parse("section")?;
                let instrument: Instrument = args.next("drum")?.parse()?;
                let step: usize = args.parse("step")?;
                let value = args.next("on|off")?;
                let on = parse_switch(value).ok_or_else(|| ParseCommandError::InvalidArgument {
                    command,
                    argument: "on|off",
                    value: value.to_string(),
                })?;
                Command::SetStep {
                    section,
                    instrument,
                    step,
                    on,
                }
            }
            "clear" => Command::Clear {
                section: args.parse("section")?,
            },
            "move" => {
                let section: usize = args.parse("section")?;
                let value = args.next("direction")?;
                let direction =
                    parse_direction(value).ok_or_else(|| ParseCommandError::InvalidArgument {
                        command,
                        argument: "direction",
                        value: value.to_string(),
                    })?;
                Command::Move { section, direction }
            }
            "delete" => Command::Delete {
                section: args.parse("section")?,
            },
            "select" => {
                let value = args.next("section")?;
                if value.eq_ignore_ascii_case("none") {
                    Command::Select(None)
                } else {
                    Command::Select(Some(args.convert("section", value)?))
                }
            }
            "start" => Command::Start,
            "stop" => Command::Stop,
            "bpm" => Command::SetTempo(args.parse("tempo")?),
            "volume" => {
                let value = args.next("volume")?;
                let volume: f32 = args.convert("volume", value)?;
                if !(0.0..=1.0).contains(&volume) {
                    return Err(ParseCommandError::InvalidArgument {
                        command,
                        argument: "volume",
                        value: value.to_string(),
                    });
                }
                Command::SetVolume(volume)
            }
            "show" => Command::Show,
            "help" => Command::Help,
            _ => Command::Quit,
        };

        args.finish()?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        assert_eq!(
            "add Verse".parse::<Command>(),
            Ok(Command::AddSection {
                name: "Verse".to_string(),
                measures: 1,
                time_signature: None,
            })
        );
        assert_eq!(
            "ADD Bridge 4 6/8".parse::<Command>(),
            Ok(Command::AddSection {
                name: "Bridge".to_string(),
                measures: 4,
                time_signature: Some(TimeSignature::six_eight()),
            })
        );
    }

    #[test]
    fn test_parse_meter_forms() {
        assert_eq!(
            "meter 3/4".parse::<Command>(),
            Ok(Command::SetDefaultMeter(TimeSignature::three_four()))
        );
        assert_eq!(
            "meter 1 6/8".parse::<Command>(),
            Ok(Command::SetSectionMeter {
                section: 1,
                time_signature: TimeSignature::six_eight(),
            })
        );
        assert!(matches!(
            "meter 5/8".parse::<Command>(),
            Err(ParseCommandError::Sequencer(SequencerError::InvalidTimeSignature(_)))
        ));
    }

    #[test]
    fn test_parse_step_edits() {
        assert_eq!(
            "toggle 0 ohat 3".parse::<Command>(),
            Ok(Command::Toggle {
                section: 0,
                instrument: Instrument::OpenHat,
                step: 3,
            })
        );
        assert_eq!(
            "set 2 kick 0 off".parse::<Command>(),
            Ok(Command::SetStep {
                section: 2,
                instrument: Instrument::Kick,
                step: 0,
                on: false,
            })
        );
        assert_eq!(
            "toggle 0 cowbell 3".parse::<Command>(),
            Err(ParseCommandError::Sequencer(SequencerError::UnknownInstrument(
                "cowbell".to_string()
            )))
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("  stop  ".parse::<Command>(), Ok(Command::Stop));
        assert_eq!("bpm 96.5".parse::<Command>(), Ok(Command::SetTempo(96.5)));
        assert_eq!("select none".parse::<Command>(), Ok(Command::Select(None)));
        assert_eq!("select 2".parse::<Command>(), Ok(Command::Select(Some(2))));
        assert_eq!(
            "move 1 up".parse::<Command>(),
            Ok(Command::Move {
                section: 1,
                direction: Direction::Up,
            })
        );
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert_eq!("volume 0.5".parse::<Command>(), Ok(Command::SetVolume(0.5)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(ParseCommandError::Unknown("dance".to_string()))
        );
        assert_eq!(
            "resize 0".parse::<Command>(),
            Err(ParseCommandError::MissingArgument {
                command: "resize",
                argument: "bar count",
            })
        );
        assert_eq!(
            "delete x".parse::<Command>(),
            Err(ParseCommandError::InvalidArgument {
                command: "delete",
                argument: "section",
                value: "x".to_string(),
            })
        );
        assert_eq!(
            "stop now".parse::<Command>(),
            Err(ParseCommandError::TrailingArgument {
                command: "stop",
                value: "now".to_string(),
            })
        );
        assert!("move 0 sideways".parse::<Command>().is_err());
        assert_eq!(
            "vol 1.5".parse::<Command>(),
            Err(ParseCommandError::InvalidArgument {
                command: "volume",
                argument: "volume",
                value: "1.5".to_string(),
            })
        );
    }
}
