//! Concrete sink implementations

pub mod console;
pub mod rotating_file;
pub mod stream;

pub use console::{ConsoleSink, ConsoleTarget};
pub use rotating_file::{RotatingFileSink, RotationPolicy};
pub use stream::StreamSink;
