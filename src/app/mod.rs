// Application layer - Opening media and running exports

pub mod container;
pub mod exporter;
pub mod opener;

// Re-export use cases
pub use container::{AppContainer, DefaultAppContainer, ExportContext};
pub use exporter::{ExportReport, MediaExporter};
pub use opener::MediaOpener;
