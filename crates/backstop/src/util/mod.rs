pub mod format;
pub mod logging;
pub mod progress;

pub use format::{format_bytes, format_date, format_duration, format_timestamp};
pub use logging::init_logging;
pub use progress::create_spinner;
