use thiserror::Error;

use elink_core::ElinkCoreError;
use elink_ranges::AnnotationError;
use elink_signal::SignalError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ContactError {
    #[error(transparent)]
    Core(#[from] ElinkCoreError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ContactError>;
