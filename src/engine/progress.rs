//! Progress reporting
//!
//! [`ProgressBridge`] forwards engine progress to a user callback, dropping
//! repeats, regressions and the engine's own 100, and emits the final 100
//! once the export has been staged. [`StderrProgressParser`] turns ffmpeg's
//! stderr into percentages.

use std::fmt;

use crate::domain::model::TimeSpec;
use crate::ports::ProgressEvent;

/// User progress callback, called with whole percentages
pub type ProgressCallback = Box<dyn FnMut(u32) + Send>;

/// De-duplicating bridge between engine events and a user callback
pub struct ProgressBridge {
    callback: Option<ProgressCallback>,
    last: u32,
    finished: bool,
}

impl fmt::Debug for ProgressBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBridge")
            .field("attached", &self.callback.is_some())
            .field("last", &self.last)
            .field("finished", &self.finished)
            .finish()
    }
}

impl ProgressBridge {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: 0,
            finished: false,
        }
    }

    /// Forward an engine event. Only values strictly between 0 and 100 and
    /// strictly above the last forwarded value reach the callback.
    pub fn on_event(&mut self, event: ProgressEvent) {
        if self.finished || !event.percentage.is_finite() {
            return;
        }
        let percentage = event.percentage.clamp(0.0, 100.0).floor() as u32;
        if percentage == 0 || percentage >= 100 || percentage <= self.last {
            return;
        }

        self.last = percentage;
        if let Some(callback) = self.callback.as_mut() {
            callback(percentage);
        }
    }

    /// Emit the final 100. Later calls and events are ignored.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.last = 100;
        if let Some(callback) = self.callback.as_mut() {
            callback(100);
        }
    }

    /// Hand the callback back, e.g. to keep it for another export
    pub fn into_callback(self) -> Option<ProgressCallback> {
        self.callback
    }
}

/// Parses ffmpeg stderr lines into progress percentages.
///
/// Input durations come from the `Duration:` header lines and the position
/// from `time=` in the status lines.
#[derive(Debug, Clone, Default)]
pub struct StderrProgressParser {
    durations: Vec<f64>,
    sum_durations: bool,
}

impl StderrProgressParser {
    /// With `sum_durations` the expected length is the sum of all inputs
    /// (concatenation), otherwise the longest input.
    pub fn new(sum_durations: bool) -> Self {
        Self {
            durations: Vec::new(),
            sum_durations,
        }
    }

    /// Expected output length in seconds, once known
    pub fn total_seconds(&self) -> Option<f64> {
        let total = if self.sum_durations {
            self.durations.iter().sum()
        } else {
            self.durations.iter().cloned().fold(0.0, f64::max)
        };
        (total > 0.0).then_some(total)
    }

    /// Feed one line; returns a percentage when the line reports a position
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if let Some(duration) = Self::field(line, "Duration:") {
            if let Ok(time) = TimeSpec::parse(duration) {
                self.durations.push(time.seconds);
            }
            return None;
        }

        let position = Self::field(line, "time=")?;
        let position = TimeSpec::parse(position).ok()?;
        let total = self.total_seconds()?;
        Some((position.seconds / total * 100.0).clamp(0.0, 100.0))
    }

    /// Value following `key`, up to the next comma or whitespace
    fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
        let start = line.find(key)? + key.len();
        let rest = line[start..].trim_start();
        let end = rest
            .find(|c: char| c == ',' || c.is_whitespace())
            .unwrap_or(rest.len());
        let value = &rest[..end];
        (!value.is_empty()).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_bridge() -> (ProgressBridge, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let bridge = ProgressBridge::new(Some(Box::new(move |p| sink.lock().unwrap().push(p))));
        (bridge, seen)
    }

    fn event(percentage: f64) -> ProgressEvent {
        ProgressEvent { percentage }
    }

    #[test]
    fn bridge_drops_repeats_regressions_and_engine_hundred() {
        let (mut bridge, seen) = recording_bridge();
        for p in [0.0, 10.2, 10.9, 25.0, 20.0, 25.5, 99.9, 100.0, 100.0] {
            bridge.on_event(event(p));
        }
        assert_eq!(*seen.lock().unwrap(), vec![10, 25, 99]);

        bridge.finish();
        bridge.finish();
        bridge.on_event(event(50.0));
        assert_eq!(*seen.lock().unwrap(), vec![10, 25, 99, 100]);
    }

    #[test]
    fn bridge_without_events_still_finishes_with_hundred() {
        let (mut bridge, seen) = recording_bridge();
        bridge.finish();
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[test]
    fn bridge_without_callback_is_silent() {
        let mut bridge = ProgressBridge::new(None);
        bridge.on_event(event(50.0));
        bridge.finish();
    }

    #[test]
    fn parser_uses_longest_input_by_default() {
        let mut parser = StderrProgressParser::new(false);
        assert_eq!(parser.feed("frame=1 time=00:00:01.00 bitrate=N/A"), None);
        parser.feed("  Duration: 00:00:10.00, start: 0.000000, bitrate: 1205 kb/s");
        parser.feed("  Duration: 00:00:20.00, start: 0.000000, bitrate: 1205 kb/s");
        assert_eq!(parser.total_seconds(), Some(20.0));

        let p = parser
            .feed("frame=  120 fps= 60 q=28.0 size=512kB time=00:00:05.00 bitrate=838.9kbits/s speed=2x")
            .unwrap();
        assert!((p - 25.0).abs() < 1e-9);
    }

    #[test]
    fn parser_sums_inputs_for_concatenation() {
        let mut parser = StderrProgressParser::new(true);
        parser.feed("  Duration: 00:00:10.00, start: 0.000000");
        parser.feed("  Duration: 00:00:30.00, start: 0.000000");
        let p = parser.feed("size=1kB time=00:00:20.00 bitrate=1k").unwrap();
        assert!((p - 50.0).abs() < 1e-9);
    }

    #[test]
    fn parser_ignores_unknown_values() {
        let mut parser = StderrProgressParser::new(false);
        parser.feed("  Duration: N/A, bitrate: N/A");
        assert_eq!(parser.total_seconds(), None);
        parser.feed("  Duration: 00:00:10.00, start: 0.000000");
        assert_eq!(parser.feed("time=N/A bitrate=N/A"), None);
        assert_eq!(parser.feed("Stream mapping:"), None);
    }
}
