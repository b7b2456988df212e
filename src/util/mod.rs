pub mod fs;
pub mod log;

pub use log::init_logging;
