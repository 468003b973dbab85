//! Audio buffer type and file I/O boundary

mod buffer;
pub mod io;

pub use buffer::SampleBuffer;
pub use io::OutputFormat;
