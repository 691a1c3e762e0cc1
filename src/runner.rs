// Playback host - Cooperative loop driving the transport from typed commands
//
// Single-threaded: commands arrive through a ring buffer filled by the stdin
// reader, fired timers are dispatched in between, and the loop sleeps until
// the next timer or the idle tick, whichever comes first.

use crate::audio::sink::EventSink;
use crate::clock::Clock;
use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::{Command, HELP};
use crate::sequencer::error::SequencerResult;
use crate::sequencer::section::Section;
use crate::sequencer::store::PatternStore;
use crate::sequencer::transport::Transport;
use ringbuf::traits::Consumer;
use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest sleep between two command checks
pub const IDLE_TICK: Duration = Duration::from_millis(10);

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owner of the transport in the interactive binary
pub struct PlaybackHost<C: Clock, S: EventSink, W: Write> {
    transport: Transport<C, S>,
    commands: CommandConsumer,
    out: W,
}

impl<C: Clock, S: EventSink, W: Write> PlaybackHost<C, S, W> {
    pub fn new(transport: Transport<C, S>, commands: CommandConsumer, out: W) -> Self {
        Self {
            transport,
            commands,
            out,
        }
    }

    pub fn transport(&self) -> &Transport<C, S> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<C, S> {
        &mut self.transport
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `quit` (or until the command channel delivers it on EOF)
    pub fn run(&mut self) {
        loop {
            if self.run_once() == Flow::Quit {
                break;
            }
            let wait = self
                .transport
                .until_next_timer()
                .map_or(IDLE_TICK, |next| next.min(IDLE_TICK));
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }
        self.transport.stop();
    }

    /// Drain pending commands, then dispatch due timers
    pub fn run_once(&mut self) -> Flow {
        while let Some(command) = self.commands.try_pop() {
            if self.handle(command) == Flow::Quit {
                return Flow::Quit;
            }
        }
        self.transport.dispatch_due();
        Flow::Continue
    }

    /// Apply one command, reporting failures on the output
    pub fn handle(&mut self, command: Command) -> Flow {
        debug!("command: {:?}", command);
        match self.execute(command) {
            Ok(flow) => flow,
            Err(e) => {
                self.print(&format!("error: {}", e));
                Flow::Continue
            }
        }
    }

    fn execute(&mut self, command: Command) -> SequencerResult<Flow> {
        match command {
            Command::AddSection {
                name,
                measures,
                time_signature,
            } => {
                let ts = time_signature.unwrap_or(self.transport.default_time_signature());
                let store = self.transport.store_mut();
                let index = store.append_section(name, measures, ts);
                let line = format!("added {}: {}", index, store.section(index)?);
                self.print(&line);
            }
            Command::Resize { section, measures } => {
                let total = self.transport.store_mut().resize(section, measures)?;
                self.print(&format!("section {}: {} steps", section, total));
            }
            Command::SetDefaultMeter(ts) => {
                self.transport.set_default_time_signature(ts);
                self.print(&format!("meter {}", ts));
            }
            Command::SetSectionMeter {
                section,
                time_signature,
            } => {
                let total = self
                    .transport
                    .store_mut()
                    .set_time_signature(section, time_signature)?;
                self.print(&format!("section {}: {}, {} steps", section, time_signature, total));
            }
            Command::Toggle {
                section,
                instrument,
                step,
            } => {
                let on = self
                    .transport
                    .store_mut()
                    .toggle_step(section, instrument, step)?;
                self.print(&format!("{} step {}: {}", instrument, step, if on { "on" } else { "off" }));
            }
            Command::SetStep {
                section,
                instrument,
                step,
                on,
            } => {
                self.transport
                    .store_mut()
                    .set_step(section, instrument, step, on)?;
            }
            Command::Clear { section } => {
                self.transport.store_mut().clear_pattern(section)?;
            }
            Command::Move { section, direction } => {
                let index = self.transport.store_mut().move_section(section, direction)?;
                self.print(&format!("moved {} {} to {}", section, direction, index));
            }
            Command::Delete { section } => {
                let removed = self.transport.store_mut().delete_section(section)?;
                self.print(&format!("deleted {}", removed));
            }
            Command::Select(index) => {
                self.transport.set_active_section(index)?;
                if self.transport.resync() {
                    debug!("switched playing section");
                }
            }
            Command::Start => {
                self.transport.start()?;
                let line = match self.transport.store().active_section() {
                    Some(section) => format!("playing {} at {}", section, self.transport.tempo()),
                    None => format!(
                        "metronome {} at {}",
                        self.transport.default_time_signature(),
                        self.transport.tempo()
                    ),
                };
                self.print(&line);
            }
            Command::Stop => {
                self.transport.stop();
            }
            Command::SetTempo(bpm) => {
                self.transport.set_tempo(bpm)?;
            }
            Command::SetVolume(volume) => {
                self.transport.sink_mut().set_volume(volume);
                self.print(&format!("volume {:.2}", volume));
            }
            Command::Show => {
                let text = render_song(self.transport.store());
                self.print(&text);
            }
            Command::Help => self.print(HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            warn!("cannot write output: {}", e);
        }
    }
}

/// Timeline listing followed by the active section's grid
pub fn render_song(store: &PatternStore) -> String {
    let mut text = String::new();
    if store.is_empty() {
        text.push_str("(no sections)");
        return text;
    }
    for (index, section) in store.sections().iter().enumerate() {
        let marker = if store.active_index() == Some(index) { '>' } else { ' ' };
        let _ = writeln!(text, "{} {:>2}  {}", marker, index, section);
    }
    match store.active_section() {
        Some(section) => text.push_str(&render_pattern(section)),
        None => text.push_str("(no section selected)"),
    }
    text
}

/// Step grid of one section: `x` for hits, beats grouped, bars fenced
pub fn render_pattern(section: &Section) -> String {
    let steps_per_beat = section.steps_per_beat();
    let steps_per_measure = section.steps_per_measure();
    let mut text = String::new();

    for (row, instrument) in crate::sequencer::pattern::Instrument::ALL.iter().enumerate() {
        if row > 0 {
            text.push('\n');
        }
        let _ = write!(text, "{:<10} |", instrument.name());
        for step in 0..section.total_steps() {
            if step > 0 && step % steps_per_measure == 0 {
                text.push('|');
            } else if step > 0 && step % steps_per_beat == 0 {
                text.push(' ');
            }
            text.push(if section.is_on(*instrument, step) { 'x' } else { '.' });
        }
        text.push('|');
    }
    text
}
