// Domain rules - Composition policies

use std::collections::BTreeSet;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Output label produced by the synthesized concatenation filter
pub const CONCAT_LABEL: &str = "concat";

/// What a mapping or filter label points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    /// A stream of a loaded input, e.g. `0` or `1:a`
    Input { index: usize, specifier: String },
    /// An output label of a declared complex filter
    Filter(String),
}

impl StreamSource {
    /// Argument for `-map`
    pub fn map_argument(&self) -> String {
        match self {
            StreamSource::Input { specifier, .. } => specifier.clone(),
            StreamSource::Filter(label) => format!("[{}]", label),
        }
    }
}

/// Resolves labels against the loaded inputs and the declared filter outputs
#[derive(Debug, Clone)]
pub struct LabelResolver {
    input_count: usize,
    declared_outputs: BTreeSet<String>,
}

impl LabelResolver {
    pub fn new<'a, I>(input_count: usize, filters: I) -> Self
    where
        I: IntoIterator<Item = &'a ComplexFilter>,
    {
        let declared_outputs = filters
            .into_iter()
            .flat_map(|f| f.outputs.iter().cloned())
            .collect();

        Self {
            input_count,
            declared_outputs,
        }
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Resolve a label written either bracketed (`[v1]`, `[0:v]`) or bare (`0:a`)
    pub fn resolve(&self, label: &str) -> Result<StreamSource, DomainError> {
        let trimmed = label.trim();
        let bracketed = trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() > 2;
        let inner = if bracketed {
            &trimmed[1..trimmed.len() - 1]
        } else {
            trimmed
        };

        let head = inner.split(':').next().unwrap_or_default();
        if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) {
            let index: usize = head.parse().map_err(|_| {
                DomainError::InvalidMapping(format!("Input index out of range in '{}'", label))
            })?;
            if index >= self.input_count {
                return Err(DomainError::InvalidMapping(format!(
                    "Label '{}' references input {} but only {} input(s) are loaded",
                    label, index, self.input_count
                )));
            }
            return Ok(StreamSource::Input {
                index,
                specifier: inner.to_string(),
            });
        }

        if !bracketed {
            return Err(DomainError::InvalidMapping(format!(
                "Label '{}' is neither an input stream nor a bracketed filter output",
                label
            )));
        }

        if self.declared_outputs.contains(inner) {
            Ok(StreamSource::Filter(inner.to_string()))
        } else {
            Err(DomainError::InvalidMapping(format!(
                "Label '{}' is not produced by any declared filter",
                label
            )))
        }
    }

    /// Check every input label of a filter declaration
    pub fn check_filter(&self, filter: &ComplexFilter) -> Result<(), DomainError> {
        for input in &filter.inputs {
            self.resolve(&format!("[{}]", input)).map_err(|e| match e {
                DomainError::InvalidMapping(msg) => DomainError::InvalidMapping(format!(
                    "{} (filter '{}')",
                    msg, filter.expression
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Builds the filter used for concatenation with re-encoding
pub struct ConcatSynthesizer;

impl ConcatSynthesizer {
    /// `[0][1]…[N-1]concat=n=N:v=<0|1>:a=<0|1>[concat]`
    pub fn filter(input_count: usize, options: ConcatOptions) -> Result<ComplexFilter, DomainError> {
        if input_count == 0 {
            return Err(DomainError::BadArgs(
                "Concatenation needs at least one input".to_string(),
            ));
        }

        Ok(ComplexFilter {
            inputs: (0..input_count).map(|i| i.to_string()).collect(),
            expression: format!(
                "concat=n={}:v={}:a={}",
                input_count,
                u8::from(options.has_video),
                u8::from(options.has_audio)
            ),
            outputs: vec![CONCAT_LABEL.to_string()],
        })
    }

    pub fn source_label() -> String {
        format!("[{}]", CONCAT_LABEL)
    }
}

/// Timelapse parameter injection
pub struct TimelapseRule;

impl TimelapseRule {
    /// Timelapse only applies without explicit mappings and with a positive framerate
    pub fn applies(has_mappings: bool, framerate: Option<f64>) -> bool {
        !has_mappings && framerate.map_or(false, |f| f > 0.0)
    }

    /// Append `-framerate <f> -f image2` to the existing initial parameters
    pub fn merge(initial: &[String], framerate: f64) -> Vec<String> {
        let mut merged = initial.to_vec();
        merged.push("-framerate".to_string());
        merged.push(format_number(framerate));
        merged.push("-f".to_string());
        merged.push("image2".to_string());
        merged
    }
}

/// Render a float without a trailing `.0` for whole numbers
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// What the session asked for, as seen by the conflict checks
#[derive(Debug, Clone, Default)]
pub struct CompositionRequest {
    pub has_mappings: bool,
    pub concat_with_transcoding: bool,
    pub concat_without_transcoding: bool,
    pub frame_extraction: bool,
    pub has_format: bool,
    pub has_save_path: bool,
    pub input_count: usize,
}

/// Rejects mutually exclusive configuration before anything is applied
pub struct CompositionRules;

impl CompositionRules {
    pub fn check(request: &CompositionRequest) -> Result<(), DomainError> {
        if request.input_count == 0 {
            return Err(DomainError::BadArgs(
                "No inputs opened for this export".to_string(),
            ));
        }

        let multi_output = request.has_mappings || request.concat_with_transcoding;

        if request.frame_extraction && multi_output {
            return Err(DomainError::CompositionConflict(
                "Frame extraction cannot be combined with output mappings or concatenation"
                    .to_string(),
            ));
        }
        if request.concat_without_transcoding && multi_output {
            return Err(DomainError::CompositionConflict(
                "Concatenation without transcoding cannot be combined with output mappings or concatenation with transcoding"
                    .to_string(),
            ));
        }
        if request.frame_extraction && request.concat_without_transcoding {
            return Err(DomainError::CompositionConflict(
                "Frame extraction cannot be combined with concatenation".to_string(),
            ));
        }
        if request.concat_with_transcoding && !request.has_format {
            return Err(DomainError::CompositionConflict(
                "Concatenation with transcoding needs a format".to_string(),
            ));
        }
        if request.concat_with_transcoding && !request.has_save_path {
            return Err(DomainError::BadArgs(
                "Concatenation with transcoding needs a destination path".to_string(),
            ));
        }

        if !multi_output {
            if !request.has_save_path {
                return Err(DomainError::BadArgs(
                    "A destination path is required when no output mappings are declared"
                        .to_string(),
                ));
            }
            let needs_format = !request.concat_without_transcoding && !request.frame_extraction;
            if needs_format && !request.has_format {
                return Err(DomainError::CompositionConflict(
                    "No format selected for single-output export".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Each output of one invocation needs a destination of its own
    pub fn check_destinations(destinations: &[MediaRef]) -> Result<(), DomainError> {
        let mut seen = BTreeSet::new();
        for destination in destinations {
            if !seen.insert((destination.disk(), destination.path())) {
                return Err(DomainError::CompositionConflict(format!(
                    "More than one output writes to {}",
                    destination
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
