use layers::backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The map engine could not create its instance. Nothing else about the
    /// surface fails loudly.
    #[error("map backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),
}
