pub mod logging;

pub use logging::{init_file_logging, init_logging, LogConfig, LogFormat, LogOutput};
