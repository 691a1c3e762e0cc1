// Audio module - Event sinks, CPAL output and the sample-position clock

pub mod error;
pub mod mixer;
pub mod output;
pub mod sink;
pub mod timing;

pub use error::AudioError;
pub use output::CpalSink;
pub use sink::{ConsoleSink, EventFormat, EventSink, RecordingSink, TriggerEvent};
pub use timing::AudioTiming;
