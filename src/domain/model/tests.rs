// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;

    #[test]
    fn test_time_spec_parse_seconds() {
        let time = TimeSpec::parse("123.456").unwrap();
        assert_eq!(time.seconds, 123.456);
    }

    #[test]
    fn test_time_spec_parse_mm_ss() {
        let time = TimeSpec::parse("01:30.5").unwrap();
        assert_eq!(time.seconds, 90.5);
    }

    #[test]
    fn test_time_spec_parse_hh_mm_ss() {
        let time = TimeSpec::parse("01:02:03.5").unwrap();
        assert_eq!(time.seconds, 3723.5);
    }

    #[test]
    fn test_time_spec_parse_invalid() {
        assert!(TimeSpec::parse("invalid").is_err());
        assert!(TimeSpec::parse("00:60").is_err());
        assert!(TimeSpec::parse("00:61:00").is_err());
        assert!(TimeSpec::parse("-10").is_err());
        assert!(TimeSpec::parse("1:2:3:4").is_err());
    }

    #[test]
    fn test_time_spec_display() {
        let time = TimeSpec::from_seconds(3723.456);
        assert_eq!(format!("{}", time), "01:02:03.456");

        let short = TimeSpec::from_seconds(5.0);
        assert_eq!(short.format_hms(), "00:00:05.000");
    }

    #[test]
    fn test_media_ref_normalizes_path() {
        let media = MediaRef::new("local", "/videos/clip.MP4").unwrap();
        assert_eq!(media.disk(), "local");
        assert_eq!(media.path(), "videos/clip.MP4");
        assert_eq!(media.file_name(), "clip.MP4");
        assert_eq!(media.directory(), "videos");
        assert_eq!(media.to_string(), "local:videos/clip.MP4");
    }

    #[test]
    fn test_media_ref_rejects_escaping_paths() {
        assert!(matches!(
            MediaRef::new("local", "../secret.mp4"),
            Err(DomainError::BadArgs(_))
        ));
        assert!(MediaRef::new("local", "").is_err());
        assert!(MediaRef::new("", "a.mp4").is_err());
    }

    #[test]
    fn test_media_ref_at_disk_root_has_empty_directory() {
        let root = MediaRef::new("local", "video.mp4").unwrap();
        assert_eq!(root.directory(), "");
        assert_eq!(root.file_name(), "video.mp4");
    }

    #[test]
    fn test_media_collection_keeps_insertion_order() {
        let mut collection = MediaCollection::new();
        collection.push(MediaRef::new("local", "a.mp4").unwrap());
        collection.push(MediaRef::new("s3", "b.mp4").unwrap());

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.first().unwrap().path(), "a.mp4");
        assert_eq!(collection.last().unwrap().disk(), "s3");
        let paths: Vec<&str> = collection.iter().map(|m| m.path()).collect();
        assert_eq!(paths, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_format_output_args_order() {
        let format = Format::x264()
            .with_video_kbps(2500)
            .with_audio_kbps(128)
            .with_audio_channels(2)
            .with_extra_parameters(["-preset", "fast"]);

        assert_eq!(
            format.output_args(),
            vec![
                "-vcodec", "libx264", "-b:v", "2500k", "-acodec", "aac", "-b:a", "128k", "-ac",
                "2", "-preset", "fast"
            ]
        );
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_labels("[0][1]").unwrap(), vec!["0", "1"]);
        assert_eq!(parse_labels(" [0:v] [v1] ").unwrap(), vec!["0:v", "v1"]);
        assert!(parse_labels("").unwrap().is_empty());
        assert!(parse_labels("0:v").is_err());
        assert!(parse_labels("[v1").is_err());
        assert!(parse_labels("[]").is_err());
    }

    #[test]
    fn test_complex_filter_render() {
        let filter = ComplexFilter::new("[0][1]", "concat=n=2:v=1:a=0", "[concat]").unwrap();
        assert_eq!(filter.render(), "[0][1]concat=n=2:v=1:a=0[concat]");
        assert!(ComplexFilter::new("[0]", "  ", "[v]").is_err());
    }

    #[test]
    fn test_output_mapping_requires_a_source() {
        let output = MediaRef::new("local", "out.mp4").unwrap();
        let result = OutputMapping::new(vec![" ".to_string()], Format::x264(), output, false, false);
        assert!(matches!(result, Err(DomainError::BadArgs(_))));
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!(Visibility::parse("PUBLIC").unwrap(), Visibility::Public);
        assert_eq!(Visibility::parse("private").unwrap(), Visibility::Private);
        assert!(Visibility::parse("world").is_err());
    }
}
