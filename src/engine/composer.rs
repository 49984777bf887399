//! Command composer
//!
//! Merges the driver's inputs, applied filters and outputs with the chosen
//! format into one ordered ffmpeg argument list.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::errors::DomainError;
use crate::domain::model::Format;
use crate::engine::driver::{OutputBlock, TranscodeDriver};

/// File name of the concat demuxer list inside its scratch directory
pub const CONCAT_LIST_FILE: &str = "concat-list.txt";

/// Which composition path produced a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionMode {
    Legacy,
    Advanced,
}

/// A file that must exist before the engine starts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportFile {
    pub path: PathBuf,
    pub contents: String,
}

/// One complete engine invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationPlan {
    pub mode: CompositionMode,
    /// Arguments after the program name
    pub args: Vec<String>,
    /// Local paths the engine writes to, in output order
    pub outputs: Vec<PathBuf>,
    pub support_files: Vec<SupportFile>,
    /// Inputs are played back to back, so progress is measured against their
    /// summed duration
    pub concatenates: bool,
}

impl InvocationPlan {
    /// Value passed to `-filter_complex`, if any
    pub fn filter_graph(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == "-filter_complex")
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Shell-quoted command line for display
    pub fn command_line(&self, program: &str) -> String {
        std::iter::once(program)
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Builds invocation plans from a driver
pub struct CommandComposer;

impl CommandComposer {
    /// Single-output path: one format, one destination, honouring the
    /// driver's concat-copy and frame modes.
    pub fn compose_legacy(
        driver: &TranscodeDriver,
        format: Option<&Format>,
        output: &Path,
        scratch_dir: &Path,
    ) -> Result<InvocationPlan, DomainError> {
        if driver.inputs().is_empty() {
            return Err(DomainError::BadArgs("No inputs loaded".to_string()));
        }

        let mut args = vec!["-y".to_string()];
        let mut support_files = Vec::new();

        match (driver.is_concat(), driver.frame_position()) {
            (true, Some(_)) => {
                return Err(DomainError::CompositionConflict(
                    "Frame extraction cannot be combined with concatenation".to_string(),
                ));
            }
            (true, None) => {
                let list_path = scratch_dir.join(CONCAT_LIST_FILE);
                support_files.push(SupportFile {
                    path: list_path.clone(),
                    contents: concat_list(driver.inputs()),
                });
                args.extend(["-f", "concat", "-safe", "0", "-i"].map(String::from));
                args.push(path_arg(&list_path));
                args.extend(["-c", "copy"].map(String::from));
            }
            (false, Some(position)) => {
                args.push("-ss".to_string());
                args.push(position.format_hms());
                args.push("-i".to_string());
                args.push(path_arg(&driver.inputs()[0]));
                args.extend(["-frames:v", "1"].map(String::from));
                if let Some(format) = format {
                    args.extend(format.output_args());
                }
            }
            (false, None) => {
                let format = format.ok_or_else(|| {
                    DomainError::CompositionConflict(
                        "No format selected for single-output export".to_string(),
                    )
                })?;
                args.extend(format.initial_parameters().iter().cloned());
                push_inputs(&mut args, driver);
                push_filter_graph(&mut args, driver);
                push_threads(&mut args, driver);
                args.extend(format.output_args());
            }
        }

        args.push(path_arg(output));

        Ok(InvocationPlan {
            mode: CompositionMode::Legacy,
            args,
            outputs: vec![output.to_path_buf()],
            support_files,
            concatenates: driver.is_concat() || has_concat_filter(driver),
        })
    }

    /// Multi-output path: every applied filter in one graph, one block per output
    pub fn compose_advanced(driver: &TranscodeDriver) -> Result<InvocationPlan, DomainError> {
        if driver.inputs().is_empty() {
            return Err(DomainError::BadArgs("No inputs loaded".to_string()));
        }
        if driver.outputs().is_empty() {
            return Err(DomainError::BadArgs(
                "No outputs applied to the driver".to_string(),
            ));
        }

        let mut args = vec!["-y".to_string()];

        let mut emitted: Vec<&[String]> = Vec::new();
        for block in driver.outputs() {
            let initial = block.format.initial_parameters();
            if !initial.is_empty() && !emitted.contains(&initial) {
                args.extend(initial.iter().cloned());
                emitted.push(initial);
            }
        }

        push_inputs(&mut args, driver);
        push_filter_graph(&mut args, driver);

        for block in driver.outputs() {
            push_output_block(&mut args, block, driver.threads());
        }

        Ok(InvocationPlan {
            mode: CompositionMode::Advanced,
            args,
            outputs: driver.outputs().iter().map(|b| b.path.clone()).collect(),
            support_files: Vec::new(),
            concatenates: has_concat_filter(driver),
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn push_inputs(args: &mut Vec<String>, driver: &TranscodeDriver) {
    for input in driver.inputs() {
        args.push("-i".to_string());
        args.push(path_arg(input));
    }
}

fn push_filter_graph(args: &mut Vec<String>, driver: &TranscodeDriver) {
    if driver.filters().is_empty() {
        return;
    }
    let graph = driver
        .filters()
        .iter()
        .map(|f| f.render())
        .collect::<Vec<_>>()
        .join(";");
    args.push("-filter_complex".to_string());
    args.push(graph);
}

fn push_threads(args: &mut Vec<String>, driver: &TranscodeDriver) {
    if let Some(threads) = driver.threads() {
        args.push("-threads".to_string());
        args.push(threads.to_string());
    }
}

fn push_output_block(args: &mut Vec<String>, block: &OutputBlock, threads: Option<usize>) {
    for map in &block.maps {
        args.push("-map".to_string());
        args.push(map.clone());
    }
    if block.disable_audio {
        args.push("-an".to_string());
    }
    if block.disable_video {
        args.push("-vn".to_string());
    }
    if let Some(threads) = threads {
        args.push("-threads".to_string());
        args.push(threads.to_string());
    }
    args.extend(block.format.output_args());
    args.push(path_arg(&block.path));
}

fn has_concat_filter(driver: &TranscodeDriver) -> bool {
    driver
        .filters()
        .iter()
        .any(|f| f.expression.starts_with("concat="))
}

/// Concat demuxer list: one `file '<path>'` line per input
fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", path_arg(p).replace('\'', "'\\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ComplexFilter, TimeSpec};

    fn driver(inputs: &[&str]) -> TranscodeDriver {
        let mut driver = TranscodeDriver::new();
        for input in inputs {
            driver.add_input(*input);
        }
        driver
    }

    fn block(maps: &[&str], format: Format, path: &str) -> OutputBlock {
        OutputBlock {
            maps: maps.iter().map(|m| m.to_string()).collect(),
            format,
            path: PathBuf::from(path),
            disable_audio: false,
            disable_video: false,
        }
    }

    #[test]
    fn legacy_plain_transcode_has_no_filter_graph() {
        let live = driver(&["/in/a.mp4"]);
        let plan = CommandComposer::compose_legacy(
            &live,
            Some(&Format::x264()),
            Path::new("/tmp/out.mp4"),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert_eq!(plan.mode, CompositionMode::Legacy);
        assert_eq!(plan.filter_graph(), None);
        assert_eq!(
            plan.args,
            vec!["-y", "-i", "/in/a.mp4", "-vcodec", "libx264", "-acodec", "aac", "/tmp/out.mp4"]
        );
        assert_eq!(plan.outputs, vec![PathBuf::from("/tmp/out.mp4")]);
    }

    #[test]
    fn legacy_initial_parameters_precede_inputs() {
        let live = driver(&["/in/frame-%03d.png"]);
        let mut format = Format::x264();
        format.set_initial_parameters(vec!["-framerate".into(), "2".into(), "-f".into(), "image2".into()]);

        let plan = CommandComposer::compose_legacy(
            &live,
            Some(&format),
            Path::new("/tmp/out.mp4"),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        let framerate = plan.args.iter().position(|a| a == "-framerate").unwrap();
        let input = plan.args.iter().position(|a| a == "-i").unwrap();
        assert!(framerate < input);
    }

    #[test]
    fn legacy_concat_copy_writes_list_file() {
        let mut live = driver(&["/in/a.mp4", "/in/it's.mp4"]);
        live.set_concat_copy(true);

        let plan = CommandComposer::compose_legacy(
            &live,
            None,
            Path::new("/tmp/out.mp4"),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert_eq!(
            plan.args,
            vec![
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/tmp/scratch/concat-list.txt",
                "-c",
                "copy",
                "/tmp/out.mp4"
            ]
        );
        assert!(plan.concatenates);
        assert_eq!(plan.support_files.len(), 1);
        assert_eq!(
            plan.support_files[0].contents,
            "file '/in/a.mp4'\nfile '/in/it'\\''s.mp4'\n"
        );
    }

    #[test]
    fn legacy_frame_extraction() {
        let mut live = driver(&["/in/a.mp4"]);
        live.set_frame_position(Some(TimeSpec::from_seconds(5.5)));

        let plan = CommandComposer::compose_legacy(
            &live,
            None,
            Path::new("/tmp/thumb.jpg"),
            Path::new("/tmp/scratch"),
        )
        .unwrap();

        assert_eq!(
            plan.args,
            vec!["-y", "-ss", "00:00:05.500", "-i", "/in/a.mp4", "-frames:v", "1", "/tmp/thumb.jpg"]
        );
    }

    #[test]
    fn legacy_standard_without_format_is_a_conflict() {
        let live = driver(&["/in/a.mp4"]);
        let err = CommandComposer::compose_legacy(
            &live,
            None,
            Path::new("/tmp/out.mp4"),
            Path::new("/tmp/scratch"),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::CompositionConflict(_)));
    }

    #[test]
    fn legacy_frame_with_concat_copy_is_a_conflict() {
        let mut live = driver(&["/in/a.mp4", "/in/b.mp4"]);
        live.set_concat_copy(true)
            .set_frame_position(Some(TimeSpec::from_seconds(1.0)));

        let err = CommandComposer::compose_legacy(
            &live,
            Some(&Format::image()),
            Path::new("/tmp/thumb.jpg"),
            Path::new("/tmp/scratch"),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::CompositionConflict(_)));
    }

    #[test]
    fn advanced_two_outputs_share_one_input() {
        let mut live = driver(&["/in/a.mp4"]).with_threads(Some(2));
        live.add_complex_filter(ComplexFilter::new("[0:v]", "split=2", "[s1][s2]").unwrap());
        live.add_complex_filter(ComplexFilter::new("[s1]", "scale=-2:1080", "[v1080]").unwrap());
        live.add_complex_filter(ComplexFilter::new("[s2]", "scale=-2:480", "[v480]").unwrap());
        live.add_output(block(&["[v1080]", "0:a"], Format::x264().with_video_kbps(5000), "/tmp/1080.mp4"));
        let mut small = block(&["[v480]"], Format::x264().with_video_kbps(900), "/tmp/480.mp4");
        small.disable_audio = true;
        live.add_output(small);

        let plan = CommandComposer::compose_advanced(&live).unwrap();

        assert_eq!(plan.mode, CompositionMode::Advanced);
        assert_eq!(plan.args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(
            plan.filter_graph(),
            Some("[0:v]split=2[s1][s2];[s1]scale=-2:1080[v1080];[s2]scale=-2:480[v480]")
        );
        assert_eq!(plan.args.iter().filter(|a| *a == "-map").count(), 3);
        assert_eq!(
            plan.outputs,
            vec![PathBuf::from("/tmp/1080.mp4"), PathBuf::from("/tmp/480.mp4")]
        );

        let tail: Vec<&str> = plan.args.iter().map(String::as_str).collect();
        let second = tail.iter().position(|a| *a == "[v480]").unwrap();
        assert_eq!(
            &tail[second - 1..],
            &["-map", "[v480]", "-an", "-threads", "2", "-vcodec", "libx264", "-b:v", "900k", "-acodec", "aac", "/tmp/480.mp4"]
        );
    }

    #[test]
    fn advanced_emits_identical_initial_parameters_once() {
        let mut live = driver(&["/in/a.mp4"]);
        let mut format = Format::x264();
        format.set_initial_parameters(vec!["-hwaccel".into(), "auto".into()]);
        live.add_output(block(&["0"], format.clone(), "/tmp/a.mp4"));
        live.add_output(block(&["0"], format, "/tmp/b.mp4"));

        let plan = CommandComposer::compose_advanced(&live).unwrap();
        assert_eq!(plan.args.iter().filter(|a| *a == "-hwaccel").count(), 1);
    }

    #[test]
    fn advanced_requires_outputs() {
        let live = driver(&["/in/a.mp4"]);
        assert!(CommandComposer::compose_advanced(&live).is_err());
    }

    #[test]
    fn command_line_quotes_graph_arguments() {
        let mut live = driver(&["/in/my clip.mp4"]);
        live.add_complex_filter(ComplexFilter::new("[0][0]", "concat=n=2:v=1:a=0", "[concat]").unwrap());
        live.add_output(block(&["[concat]"], Format::x264(), "/tmp/out.mp4"));

        let plan = CommandComposer::compose_advanced(&live).unwrap();
        let line = plan.command_line("ffmpeg");
        assert!(line.starts_with("ffmpeg -y -i '/in/my clip.mp4' -filter_complex '[0][0]concat=n=2:v=1:a=0[concat]'"));
        assert!(plan.concatenates);
    }
}
