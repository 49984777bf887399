//! Live transcode handle
//!
//! The driver accumulates what one ffmpeg invocation will contain: the loaded
//! inputs, the complex filters already applied and one block per output.
//! [`CommandComposer`](super::composer::CommandComposer) turns it into an
//! argument list.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{ComplexFilter, Format, OutputMapping, TimeSpec};
use crate::domain::rules::LabelResolver;

/// One output of the invocation
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBlock {
    /// `-map` arguments, already resolved
    pub maps: Vec<String>,
    pub format: Format,
    pub path: PathBuf,
    pub disable_audio: bool,
    pub disable_video: bool,
}

/// Live transcode handle for one export
#[derive(Debug, Clone)]
pub struct TranscodeDriver {
    inputs: Vec<PathBuf>,
    /// Extract a single frame at this position of the first input
    frame: Option<TimeSpec>,
    /// Stream-copy concatenation through the concat demuxer
    concat_copy: bool,
    filters: Vec<ComplexFilter>,
    outputs: Vec<OutputBlock>,
    threads: Option<usize>,
}

impl Default for TranscodeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeDriver {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            frame: None,
            concat_copy: false,
            filters: Vec::new(),
            outputs: Vec::new(),
            threads: None,
        }
    }

    /// Set `-threads` for every output
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|t| *t > 0);
        self
    }

    pub fn add_input(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        debug!(input = %path.display(), index = self.inputs.len(), "Input loaded");
        self.inputs.push(path);
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn set_frame_position(&mut self, position: Option<TimeSpec>) -> &mut Self {
        self.frame = position;
        self
    }

    pub fn frame_position(&self) -> Option<&TimeSpec> {
        self.frame.as_ref()
    }

    pub fn set_concat_copy(&mut self, enabled: bool) -> &mut Self {
        self.concat_copy = enabled;
        self
    }

    pub fn is_concat(&self) -> bool {
        self.concat_copy
    }

    pub fn threads(&self) -> Option<usize> {
        self.threads
    }

    /// Add one edge to the filter graph. Labels are checked by the registry.
    pub fn add_complex_filter(&mut self, filter: ComplexFilter) -> &mut Self {
        debug!(filter = %filter.render(), "Complex filter applied");
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[ComplexFilter] {
        &self.filters
    }

    pub fn add_output(&mut self, block: OutputBlock) -> &mut Self {
        debug!(
            output = %block.path.display(),
            maps = ?block.maps,
            "Output added"
        );
        self.outputs.push(block);
        self
    }

    pub fn outputs(&self) -> &[OutputBlock] {
        &self.outputs
    }

    /// A handle with the same inputs and modes but nothing applied
    pub fn fresh(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
            frame: self.frame.clone(),
            concat_copy: self.concat_copy,
            filters: Vec::new(),
            outputs: Vec::new(),
            threads: self.threads,
        }
    }
}

impl OutputMapping {
    /// Add this mapping as an output of the live handle, writing to `local_path`.
    /// Labels are resolved against the inputs and the filters already applied.
    pub fn apply(&self, driver: &mut TranscodeDriver, local_path: &Path) -> Result<(), DomainError> {
        let resolver = LabelResolver::new(driver.inputs().len(), driver.filters());

        let maps = self
            .sources()
            .iter()
            .map(|label| {
                resolver.resolve(label).map(|source| source.map_argument()).map_err(|e| match e {
                    DomainError::InvalidMapping(msg) => {
                        DomainError::InvalidMapping(format!("{} (output {})", msg, self.output()))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        driver.add_output(OutputBlock {
            maps,
            format: self.format().clone(),
            path: local_path.to_path_buf(),
            disable_audio: self.disable_audio(),
            disable_video: self.disable_video(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MediaRef;

    fn driver_with_inputs(n: usize) -> TranscodeDriver {
        let mut driver = TranscodeDriver::new();
        for i in 0..n {
            driver.add_input(format!("/media/in{}.mp4", i));
        }
        driver
    }

    #[test]
    fn apply_resolves_filter_and_input_labels() {
        let mut driver = driver_with_inputs(1);
        driver.add_complex_filter(ComplexFilter::new("[0:v]", "scale=640:480", "[v480]").unwrap());

        let mapping = OutputMapping::new(
            vec!["[v480]".to_string(), "[0:a]".to_string()],
            Format::x264(),
            MediaRef::new("local", "small.mp4").unwrap(),
            false,
            false,
        )
        .unwrap();
        mapping.apply(&mut driver, Path::new("/tmp/small.mp4")).unwrap();

        let block = &driver.outputs()[0];
        assert_eq!(block.maps, vec!["[v480]", "0:a"]);
        assert_eq!(block.path, PathBuf::from("/tmp/small.mp4"));
    }

    #[test]
    fn apply_fails_for_undeclared_label_and_adds_nothing() {
        let mut driver = driver_with_inputs(1);
        let mapping = OutputMapping::new(
            vec!["[missing]".to_string()],
            Format::x264(),
            MediaRef::new("local", "out.mp4").unwrap(),
            false,
            false,
        )
        .unwrap();

        let err = mapping.apply(&mut driver, Path::new("/tmp/out.mp4")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidMapping(_)));
        assert!(err.to_string().contains("local:out.mp4"));
        assert!(driver.outputs().is_empty());
    }

    #[test]
    fn applying_twice_duplicates_the_output() {
        let mut driver = driver_with_inputs(1);
        let mapping = OutputMapping::new(
            vec!["0".to_string()],
            Format::x264(),
            MediaRef::new("local", "out.mp4").unwrap(),
            true,
            false,
        )
        .unwrap();
        mapping.apply(&mut driver, Path::new("/tmp/out.mp4")).unwrap();
        mapping.apply(&mut driver, Path::new("/tmp/out.mp4")).unwrap();
        assert_eq!(driver.outputs().len(), 2);
        assert!(driver.outputs()[0].disable_audio);
    }

    #[test]
    fn fresh_keeps_inputs_and_drops_applied_state() {
        let mut driver = driver_with_inputs(2).with_threads(Some(4));
        driver
            .set_concat_copy(true)
            .set_frame_position(Some(TimeSpec::from_seconds(2.0)));
        driver.add_complex_filter(ComplexFilter::new("[0][1]", "hstack", "[v]").unwrap());

        let fresh = driver.fresh();
        assert_eq!(fresh.inputs().len(), 2);
        assert!(fresh.is_concat());
        assert_eq!(fresh.frame_position(), Some(&TimeSpec::from_seconds(2.0)));
        assert!(fresh.filters().is_empty());
        assert!(fresh.outputs().is_empty());
        assert_eq!(fresh.threads(), Some(4));
    }
}
