pub mod backend;
pub mod event;
pub mod markers;
pub mod popup;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::*;
pub use event::*;
pub use markers::*;
pub use popup::*;
