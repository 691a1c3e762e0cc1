// Offline simulation - Drive a transport on simulated time
// Timer firings can be delayed at random to reproduce a sloppy wall clock

use crate::audio::sink::EventSink;
use crate::clock::{Clock, ManualClock};
use crate::sequencer::error::SequencerResult;
use crate::sequencer::transport::Transport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOptions {
    /// Simulated seconds to run after `start()`
    pub duration: f64,
    /// Upper bound of the random delay added to every timer firing
    pub jitter: Duration,
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            duration: 4.0,
            jitter: Duration::ZERO,
            seed: 0,
        }
    }
}

/// Start the transport, fire its timers until `duration`, then stop it
///
/// Returns the number of polls that ran.
pub fn run_simulation<S: EventSink>(
    transport: &mut Transport<ManualClock, S>,
    options: &SimulationOptions,
) -> SequencerResult<usize> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let jitter = options.jitter.as_secs_f64();
    let end = transport.clock().now() + options.duration;

    transport.start()?;
    let mut polls = 0;
    while let Some(deadline) = transport.clock().next_deadline() {
        if deadline > end {
            break;
        }
        let late = if jitter > 0.0 {
            rng.gen_range(0.0..jitter)
        } else {
            0.0
        };
        transport.clock_mut().advance_to(deadline + late);
        polls += transport.dispatch_due();
    }
    transport.stop();
    debug!("simulation ran {} polls", polls);
    Ok(polls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::RecordingSink;
    use crate::sequencer::pattern::Instrument;
    use crate::sequencer::timeline::TimeSignature;

    fn transport_with_hat_on_every_step() -> Transport<ManualClock, RecordingSink> {
        let mut transport = Transport::new(ManualClock::new(), RecordingSink::new());
        let store = transport.store_mut();
        let i = store.append_section("Hats", 1, TimeSignature::four_four());
        for step in 0..16 {
            store.set_step(i, Instrument::ClosedHat, step, true).unwrap();
        }
        transport.set_active_section(Some(i)).unwrap();
        transport
    }

    #[test]
    fn test_simulation_without_jitter() {
        let mut transport = transport_with_hat_on_every_step();
        let polls = run_simulation(&mut transport, &SimulationOptions::default()).unwrap();

        // One poll every 25ms over 4 seconds
        assert!((159..=160).contains(&polls));
        let hats = transport.sink().samples();
        assert!(hats.len() >= 32);
        assert!(transport.session().is_none());
    }

    #[test]
    fn test_jitter_does_not_move_events() {
        let options = SimulationOptions {
            duration: 2.0,
            jitter: Duration::from_millis(40),
            seed: 7,
        };
        let mut transport = transport_with_hat_on_every_step();
        run_simulation(&mut transport, &options).unwrap();

        let times: Vec<f64> = transport.sink().samples().iter().map(|(_, t)| *t).collect();
        assert!(times.len() > 10);
        for (i, t) in times.iter().enumerate() {
            assert!((t - (0.05 + i as f64 * 0.125)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_polls() {
        let options = SimulationOptions {
            duration: 1.0,
            jitter: Duration::from_millis(30),
            seed: 42,
        };
        let mut a = transport_with_hat_on_every_step();
        let mut b = transport_with_hat_on_every_step();
        assert_eq!(
            run_simulation(&mut a, &options).unwrap(),
            run_simulation(&mut b, &options).unwrap()
        );
        assert_eq!(a.sink().events(), b.sink().events());
    }
}
