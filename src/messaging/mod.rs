// Messaging module - Interactive commands and the lock-free channel carrying them

pub mod channels;
pub mod command;

pub use channels::{CommandConsumer, CommandProducer, create_command_channel};
pub use command::{Command, HELP, ParseCommandError};
