// Unit tests for composition rules

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;
    use crate::domain::rules::*;

    fn scale_filter() -> ComplexFilter {
        ComplexFilter::new("[0:v]", "scale=1280:720", "[v720]").unwrap()
    }

    #[test]
    fn test_resolver_accepts_inputs_and_filter_outputs() {
        let filters = vec![scale_filter()];
        let resolver = LabelResolver::new(2, &filters);

        assert_eq!(
            resolver.resolve("[1]").unwrap(),
            StreamSource::Input {
                index: 1,
                specifier: "1".to_string()
            }
        );
        assert_eq!(
            resolver.resolve("0:a").unwrap().map_argument(),
            "0:a".to_string()
        );
        assert_eq!(
            resolver.resolve("[v720]").unwrap(),
            StreamSource::Filter("v720".to_string())
        );
        assert_eq!(resolver.resolve("[v720]").unwrap().map_argument(), "[v720]");
    }

    #[test]
    fn test_resolver_rejects_out_of_range_input() {
        let resolver = LabelResolver::new(1, &[]);
        let err = resolver.resolve("[1:v]").unwrap_err();
        assert!(matches!(err, DomainError::InvalidMapping(_)));
        assert!(err.to_string().contains("input 1"));
    }

    #[test]
    fn test_resolver_rejects_undeclared_label() {
        let filters = vec![scale_filter()];
        let resolver = LabelResolver::new(1, &filters);
        assert!(matches!(
            resolver.resolve("[v480]"),
            Err(DomainError::InvalidMapping(_))
        ));
        assert!(matches!(
            resolver.resolve("v720"),
            Err(DomainError::InvalidMapping(_))
        ));
    }

    #[test]
    fn test_check_filter_names_the_expression() {
        let resolver = LabelResolver::new(1, &[]);
        let filter = ComplexFilter::new("[0][3]", "hstack", "[out]").unwrap();
        let err = resolver.check_filter(&filter).unwrap_err();
        assert!(err.to_string().contains("hstack"));
    }

    #[test]
    fn test_concat_filter_for_many_inputs() {
        for n in 1..=5usize {
            let filter = ConcatSynthesizer::filter(
                n,
                ConcatOptions {
                    has_video: true,
                    has_audio: false,
                },
            )
            .unwrap();
            let expected_inputs: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            assert_eq!(filter.inputs, expected_inputs);
            assert_eq!(filter.expression, format!("concat=n={}:v=1:a=0", n));
            assert_eq!(filter.outputs, vec![CONCAT_LABEL.to_string()]);
        }
        assert!(ConcatSynthesizer::filter(0, ConcatOptions::default()).is_err());
        assert_eq!(ConcatSynthesizer::source_label(), "[concat]");
    }

    #[test]
    fn test_timelapse_applies_only_without_mappings_and_positive_rate() {
        assert!(TimelapseRule::applies(false, Some(1.5)));
        assert!(!TimelapseRule::applies(true, Some(1.5)));
        assert!(!TimelapseRule::applies(false, Some(0.0)));
        assert!(!TimelapseRule::applies(false, Some(-2.0)));
        assert!(!TimelapseRule::applies(false, None));
    }

    #[test]
    fn test_timelapse_merge_appends() {
        let initial = vec!["-hwaccel".to_string(), "auto".to_string()];
        let merged = TimelapseRule::merge(&initial, 24.0);
        assert_eq!(
            merged,
            vec!["-hwaccel", "auto", "-framerate", "24", "-f", "image2"]
        );
        assert_eq!(TimelapseRule::merge(&[], 0.5)[1], "0.5");
    }

    #[test]
    fn test_composition_rules_conflicts() {
        let base = CompositionRequest {
            has_format: true,
            has_save_path: true,
            input_count: 1,
            ..Default::default()
        };
        assert!(CompositionRules::check(&base).is_ok());

        let frame_with_mapping = CompositionRequest {
            frame_extraction: true,
            has_mappings: true,
            ..base.clone()
        };
        assert!(matches!(
            CompositionRules::check(&frame_with_mapping),
            Err(DomainError::CompositionConflict(_))
        ));

        let copy_concat_with_mapping = CompositionRequest {
            concat_without_transcoding: true,
            has_mappings: true,
            ..base.clone()
        };
        assert!(matches!(
            CompositionRules::check(&copy_concat_with_mapping),
            Err(DomainError::CompositionConflict(_))
        ));
    }

    #[test]
    fn test_composition_rules_single_output_requirements() {
        let no_format = CompositionRequest {
            has_save_path: true,
            input_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            CompositionRules::check(&no_format),
            Err(DomainError::CompositionConflict(_))
        ));

        let frame_without_format = CompositionRequest {
            frame_extraction: true,
            ..no_format.clone()
        };
        assert!(CompositionRules::check(&frame_without_format).is_ok());

        let no_inputs = CompositionRequest {
            has_format: true,
            has_save_path: true,
            ..Default::default()
        };
        assert!(matches!(
            CompositionRules::check(&no_inputs),
            Err(DomainError::BadArgs(_))
        ));

        let mappings_without_path = CompositionRequest {
            has_mappings: true,
            input_count: 1,
            ..Default::default()
        };
        assert!(CompositionRules::check(&mappings_without_path).is_ok());
    }

    #[test]
    fn test_destinations_must_be_distinct() {
        let hd = MediaRef::new("local", "renditions/hd.mp4").unwrap();
        let sd = MediaRef::new("local", "renditions/sd.mp4").unwrap();
        let archived = MediaRef::new("archive", "renditions/hd.mp4").unwrap();

        assert!(CompositionRules::check_destinations(&[hd.clone(), sd.clone(), archived]).is_ok());

        let err = CompositionRules::check_destinations(&[hd.clone(), sd, hd]).unwrap_err();
        assert!(matches!(err, DomainError::CompositionConflict(_)));
        assert!(err.to_string().contains("local:renditions/hd.mp4"));
    }
}
