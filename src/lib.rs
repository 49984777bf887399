//! ffexport
//!
//! Composes ffmpeg exports from inputs on named disks, complex filters and
//! per-output format mappings, runs them as one invocation and stages the
//! produced files onto their destination disks.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, DefaultAppContainer, ExportContext, ExportReport, MediaExporter, MediaOpener};
pub use domain::errors::DomainError;
pub use domain::model::{ExportState, Format, MediaRef, TimeSpec, Visibility};
pub use error::{ExportError, ExportResult};
