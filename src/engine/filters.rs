//! Complex filter registry

use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{ComplexFilter, OutputMapping};
use crate::domain::rules::LabelResolver;
use crate::engine::driver::TranscodeDriver;

/// Pending filter declarations in insertion order, plus the ones already applied
#[derive(Debug, Clone, Default)]
pub struct ComplexFilterRegistry {
    pending: Vec<ComplexFilter>,
    applied: Vec<ComplexFilter>,
}

impl ComplexFilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: ComplexFilter) {
        self.pending.push(filter);
    }

    pub fn pending(&self) -> &[ComplexFilter] {
        &self.pending
    }

    pub fn applied(&self) -> &[ComplexFilter] {
        &self.applied
    }

    /// Apply every pending declaration to the driver, in order, exactly once.
    ///
    /// Labels may refer to outputs of any declaration in the registry. On the
    /// first invalid declaration the remaining ones stay pending.
    pub fn apply_all(
        &mut self,
        driver: &mut TranscodeDriver,
        mappings: &[OutputMapping],
    ) -> Result<usize, DomainError> {
        let resolver = LabelResolver::new(
            driver.inputs().len(),
            driver.filters().iter().chain(self.pending.iter()),
        );

        let mut count = 0;
        while !self.pending.is_empty() {
            resolver.check_filter(&self.pending[0])?;

            let filter = self.pending.remove(0);
            Self::warn_if_unconsumed(&filter, &self.pending, mappings);
            driver.add_complex_filter(filter.clone());
            self.applied.push(filter);
            count += 1;
        }

        debug!(count, "Complex filters applied");
        Ok(count)
    }

    fn warn_if_unconsumed(filter: &ComplexFilter, later: &[ComplexFilter], mappings: &[OutputMapping]) {
        for label in &filter.outputs {
            let bracketed = format!("[{}]", label);
            let consumed_by_filter = later.iter().any(|f| f.inputs.contains(label));
            let consumed_by_mapping = mappings
                .iter()
                .any(|m| m.sources().iter().any(|s| s.trim() == bracketed));
            if !consumed_by_filter && !consumed_by_mapping {
                warn!(label = %bracketed, filter = %filter.expression, "Filter output is not mapped to any output");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(inputs: usize) -> TranscodeDriver {
        let mut driver = TranscodeDriver::new();
        for i in 0..inputs {
            driver.add_input(format!("/in{}.mp4", i));
        }
        driver
    }

    #[test]
    fn applies_in_insertion_order_once() {
        let mut registry = ComplexFilterRegistry::new();
        registry.add(ComplexFilter::new("[0:v]", "split=2", "[a][b]").unwrap());
        registry.add(ComplexFilter::new("[a]", "scale=1920:1080", "[v1080]").unwrap());
        registry.add(ComplexFilter::new("[b]", "scale=854:480", "[v480]").unwrap());

        let mut live = driver(1);
        assert_eq!(registry.apply_all(&mut live, &[]).unwrap(), 3);
        let expressions: Vec<&str> = live.filters().iter().map(|f| f.expression.as_str()).collect();
        assert_eq!(expressions, vec!["split=2", "scale=1920:1080", "scale=854:480"]);
        assert!(registry.pending().is_empty());
        assert_eq!(registry.applied().len(), 3);

        assert_eq!(registry.apply_all(&mut live, &[]).unwrap(), 0);
        assert_eq!(live.filters().len(), 3);
    }

    #[test]
    fn later_declaration_may_feed_earlier_one() {
        let mut registry = ComplexFilterRegistry::new();
        registry.add(ComplexFilter::new("[scaled]", "hflip", "[out]").unwrap());
        registry.add(ComplexFilter::new("[0]", "scale=640:360", "[scaled]").unwrap());

        let mut live = driver(1);
        assert!(registry.apply_all(&mut live, &[]).is_ok());
    }

    #[test]
    fn failure_leaves_remaining_declarations_pending() {
        let mut registry = ComplexFilterRegistry::new();
        registry.add(ComplexFilter::new("[0]", "scale=640:360", "[small]").unwrap());
        registry.add(ComplexFilter::new("[2]", "scale=640:360", "[bad]").unwrap());
        registry.add(ComplexFilter::new("[small]", "hflip", "[flipped]").unwrap());

        let mut live = driver(1);
        let err = registry.apply_all(&mut live, &[]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidMapping(_)));
        assert_eq!(registry.applied().len(), 1);
        assert_eq!(registry.pending().len(), 2);
        assert_eq!(live.filters().len(), 1);
    }
}
