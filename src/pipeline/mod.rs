//! Line fan-out pipeline from one byte stream to many sinks

pub mod cancel;
pub mod fan_out;
pub mod pipe;

pub use cancel::CancelToken;
pub use fan_out::FanOut;
pub use pipe::{pipe, PipeReader, PipeWriter};
