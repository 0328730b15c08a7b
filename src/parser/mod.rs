pub mod line_source;
pub mod scanner;

pub use line_source::{BufferSource, LineSource, StreamSource};
pub use scanner::{scan, ParseOptions};
