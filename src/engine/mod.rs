//! Command composition and progress for one transcode invocation

pub mod composer;
pub mod driver;
pub mod filters;
pub mod progress;

pub use composer::{CommandComposer, CompositionMode, InvocationPlan, SupportFile};
pub use driver::{OutputBlock, TranscodeDriver};
pub use filters::ComplexFilterRegistry;
pub use progress::{ProgressBridge, ProgressCallback, StderrProgressParser};
