pub mod metrics;
pub mod timer;

pub use metrics::*;
pub use timer::*;
