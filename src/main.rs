use clap::{ArgAction, Parser, Subcommand};
use ringbuf::traits::Producer;
use rhythm_practice::audio::{ConsoleSink, EventFormat};
use rhythm_practice::messaging::channels::{COMMAND_CHANNEL_CAPACITY, CommandProducer};
use rhythm_practice::{
    AppConfig, AudioClock, Clock, Command, CpalSink, EventSink, Instrument, ManualClock,
    PatternStore, PlaybackHost, SimulationOptions, SystemClock, TimeSignature, Transport,
    create_command_channel, run_simulation,
};
use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;

/// Metronome with step-sequenced drum accompaniment
#[derive(Parser)]
#[command(name = "rhythm_practice")]
#[command(about = "Practice metronome with a step-sequenced drum kit")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/rhythm_practice/config.ron)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tempo in BPM, overrides the configuration
    #[arg(long, global = true)]
    bpm: Option<f64>,

    /// Default meter (4/4, 3/4, 6/8, ...), overrides the configuration
    #[arg(long, global = true)]
    meter: Option<TimeSignature>,

    /// Log more (-v info, -vv debug, -vvv trace); logs go to stderr
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session: type commands on stdin ('help' lists them)
    Play {
        /// Print events instead of opening the audio device
        #[arg(long)]
        no_audio: bool,

        /// Event format used with --no-audio
        #[arg(long, value_enum, default_value_t = EventFormat::Text)]
        format: EventFormat,
    },

    /// Run the scheduler on simulated time and print every event
    Simulate {
        /// Bars in the simulated section
        #[arg(long, default_value_t = 1)]
        measures: u32,

        /// Steps with a kick, comma separated
        #[arg(long, value_delimiter = ',')]
        kick: Vec<usize>,

        #[arg(long, value_delimiter = ',')]
        snare: Vec<usize>,

        #[arg(long, value_delimiter = ',')]
        ohat: Vec<usize>,

        #[arg(long, value_delimiter = ',')]
        chat: Vec<usize>,

        #[arg(long, value_delimiter = ',')]
        crash: Vec<usize>,

        /// Clicks only, no section selected
        #[arg(long)]
        metronome_only: bool,

        /// Simulated seconds
        #[arg(long, default_value_t = 4.0)]
        seconds: f64,

        /// Maximum random lateness of each poll, in milliseconds
        #[arg(long, default_value_t = 0)]
        jitter_ms: u64,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, value_enum, default_value_t = EventFormat::Text)]
        format: EventFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(bpm) = cli.bpm {
        config.tempo_bpm = bpm;
    }
    if let Some(meter) = cli.meter {
        config.time_signature = meter;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Play {
        no_audio: false,
        format: EventFormat::Text,
    }) {
        Commands::Play { no_audio, format } => {
            if no_audio {
                let sink = ConsoleSink::new(std::io::stdout(), format);
                play(&config, SystemClock::new(), sink)
            } else {
                let sink = CpalSink::new(config.kit.clone(), config.volume);
                let clock = AudioClock::new(sink.timing().clone());
                play(&config, clock, sink)
            }
        }
        Commands::Simulate {
            measures,
            kick,
            snare,
            ohat,
            chat,
            crash,
            metronome_only,
            seconds,
            jitter_ms,
            seed,
            format,
        } => {
            let mut store = PatternStore::with_max_measures(config.max_measures);
            let index = store.append_section("Simulated", measures, config.time_signature);
            let hits = [
                (Instrument::Kick, kick),
                (Instrument::Snare, snare),
                (Instrument::OpenHat, ohat),
                (Instrument::ClosedHat, chat),
                (Instrument::Crash, crash),
            ];
            for (instrument, steps) in hits {
                for step in steps {
                    store.set_step(index, instrument, step, true)?;
                }
            }
            if !metronome_only {
                store.set_active(Some(index))?;
            }

            let sink = ConsoleSink::new(std::io::stdout().lock(), format);
            let mut transport = transport(&config, ManualClock::new(), sink, store)?;
            let options = SimulationOptions {
                duration: seconds,
                jitter: Duration::from_millis(jitter_ms),
                seed,
            };
            run_simulation(&mut transport, &options)?;
            Ok(())
        }
    }
}

fn transport<C: Clock, S: EventSink>(
    config: &AppConfig,
    clock: C,
    sink: S,
    store: PatternStore,
) -> Result<Transport<C, S>, Box<dyn Error>> {
    let mut transport = Transport::with_config(clock, sink, store, config.scheduler)?;
    transport.set_tempo(config.tempo_bpm)?;
    transport.set_default_time_signature(config.time_signature);
    Ok(transport)
}

fn play<C: Clock, S: EventSink>(config: &AppConfig, clock: C, sink: S) -> Result<(), Box<dyn Error>> {
    let store = PatternStore::with_max_measures(config.max_measures);
    let transport = transport(config, clock, sink, store)?;

    let (producer, consumer) = create_command_channel(COMMAND_CHANNEL_CAPACITY);
    std::thread::spawn(move || read_commands(producer));

    println!("rhythm_practice {} - type 'help' for commands", env!("CARGO_PKG_VERSION"));
    let mut host = PlaybackHost::new(transport, consumer, std::io::stdout());
    host.run();
    Ok(())
}

/// Stdin reader thread: parse each line and hand it to the playback loop
fn read_commands(mut producer: CommandProducer) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => send(&mut producer, command),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    send(&mut producer, Command::Quit);
}

fn send(producer: &mut CommandProducer, mut command: Command) {
    // The loop drains every 10ms at most, so a full queue clears quickly
    while let Err(rejected) = producer.try_push(command) {
        command = rejected;
        std::thread::sleep(Duration::from_millis(5));
    }
}
