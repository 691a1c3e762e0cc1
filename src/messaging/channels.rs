// Communication channel lock-free: stdin reader thread -> playback loop

use crate::messaging::command::Command;
use ringbuf::{HeapRb, traits::Split};

/// Ring buffer capacity for pending commands
/// Commands are typed by hand, so a short queue is plenty
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity);
    rb.split()
}
