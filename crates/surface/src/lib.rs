//! The interactive incident map: gesture recognition on raw pointer input,
//! marker reconciliation and lazy popup addresses, composed behind
//! `MapSurface`.

pub mod config;
pub mod error;
pub mod gesture;
pub mod prefill;
pub mod surface;

pub use config::*;
pub use error::*;
pub use gesture::*;
pub use prefill::*;
pub use surface::*;
