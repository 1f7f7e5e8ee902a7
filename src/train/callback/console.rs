//! Console writer printing periodic scalar summaries

use std::collections::BTreeMap;

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};
use super::writer::Writer;
use crate::error::Result;
use crate::logging::{default_sink, SharedSink};
use crate::matching::NameMatcher;
use crate::train::handle::TrainerHandle;

/// Writes buffered scalars to the log on every trigger
///
/// Only the last value per name since the previous trigger is kept. On a
/// trigger the matching names are logged in name order as one message and
/// the buffer is cleared, matched or not.
pub struct ConsoleWriter {
    matcher: NameMatcher,
    scalars: BTreeMap<String, f64>,
    sink: SharedSink,
    handle: TrainerHandle,
}

impl ConsoleWriter {
    /// Console writer showing names matching any of `patterns`
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::with_matcher(NameMatcher::new(patterns)?))
    }

    pub fn with_matcher(matcher: NameMatcher) -> Self {
        Self {
            matcher,
            scalars: BTreeMap::new(),
            sink: default_sink(),
            handle: TrainerHandle::default(),
        }
    }

    /// Route output to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Scalars buffered since the last trigger
    pub fn pending(&self) -> &BTreeMap<String, f64> {
        &self.scalars
    }

    /// Text that the next trigger would log, if any
    pub fn render(&self) -> Option<String> {
        let texts: Vec<String> = self
            .scalars
            .iter()
            .filter(|(name, _)| self.matcher.matches(name))
            .map(|(name, value)| format!("[{name}] = {}", format_significant(*value, 5)))
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(format!("\n+ {}", texts.join("\n+ ")))
        }
    }

    fn flush(&mut self) {
        if let Some(text) = self.render() {
            self.sink.info(&text);
        }
        self.scalars.clear();
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::with_matcher(NameMatcher::any())
    }
}

impl TrainerCallback for ConsoleWriter {
    fn bind(&mut self, handle: TrainerHandle) {
        self.handle = handle;
    }

    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.flush();
        CallbackAction::Continue
    }

    fn on_trigger(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.flush();
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "ConsoleWriter"
    }
}

impl Writer for ConsoleWriter {
    fn handle(&self) -> &TrainerHandle {
        &self.handle
    }

    fn master_only(&self) -> bool {
        true
    }

    fn write_scalar(&mut self, name: &str, value: f64) {
        self.scalars.insert(name.to_string(), value);
    }
}

/// Format with `digits` significant digits, printf `%g` style
///
/// Trailing zeros are dropped; exponent notation is used when the decimal
/// exponent is below -4 or at least `digits`.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let digits = digits.max(1);
    // Scientific rendering gives the exponent after rounding
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.unsigned_abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::Rank;
    use crate::logging::{LogLevel, MemorySink};
    use std::sync::Arc;

    fn capture(patterns: &[&str]) -> (ConsoleWriter, MemorySink) {
        let sink = MemorySink::new();
        let writer = ConsoleWriter::new(patterns.iter().copied())
            .unwrap()
            .with_sink(Arc::new(sink.clone()));
        (writer, sink)
    }

    #[test]
    fn test_single_scalar_five_significant_digits() {
        let (mut w, sink) = capture(&["*"]);
        w.add_scalar("loss", 0.12345678);
        w.on_trigger(&CallbackContext::default());

        let infos = sink.messages(LogLevel::Info);
        assert_eq!(infos, vec!["\n+ [loss] = 0.12346".to_string()]);
    }

    #[test]
    fn test_lines_sorted_by_name() {
        let (mut w, sink) = capture(&["*"]);
        w.add_scalar("zeta", 3.0);
        w.add_scalar("alpha", 1.0);
        w.add_scalar("mid", 2.0);
        w.on_epoch_end(&CallbackContext::default());

        assert_eq!(
            sink.messages(LogLevel::Info),
            vec!["\n+ [alpha] = 1\n+ [mid] = 2\n+ [zeta] = 3".to_string()]
        );
    }

    #[test]
    fn test_last_write_wins() {
        let (mut w, sink) = capture(&["*"]);
        w.add_scalar("loss", 1.0);
        w.add_scalar("loss", 0.5);
        w.on_trigger(&CallbackContext::default());
        assert_eq!(sink.messages(LogLevel::Info), vec!["\n+ [loss] = 0.5".to_string()]);
    }

    #[test]
    fn test_unmatched_entries_are_cleared_silently() {
        let (mut w, sink) = capture(&["train/*"]);
        w.add_scalar("val/loss", 1.0);
        w.add_scalar("train/loss", 2.0);
        assert_eq!(w.pending().len(), 2);

        w.on_trigger(&CallbackContext::default());
        assert_eq!(sink.messages(LogLevel::Info), vec!["\n+ [train/loss] = 2".to_string()]);
        assert!(w.pending().is_empty());
    }

    #[test]
    fn test_nothing_matched_logs_nothing() {
        let (mut w, sink) = capture(&["acc"]);
        w.add_scalar("loss", 1.0);
        w.on_trigger(&CallbackContext::default());
        assert!(sink.records().is_empty());
        assert!(w.pending().is_empty());
    }

    #[test]
    fn test_empty_buffer_logs_nothing() {
        let (mut w, sink) = capture(&["*"]);
        w.on_epoch_end(&CallbackContext::default());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_silent_on_non_master() {
        let (mut w, sink) = capture(&["*"]);
        w.bind(TrainerHandle::new(Arc::new(Rank::new(2, 4))));
        w.add_scalar("loss", 1.0);
        w.on_trigger(&CallbackContext::default());
        assert!(w.pending().is_empty());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_default_writer_is_master_only_catch_all() {
        let writer = ConsoleWriter::default();
        assert_eq!(writer.matcher.patterns(), ["*".to_string()]);
        assert_eq!(writer.name(), "ConsoleWriter");
        assert!(writer.master_only());
    }

    #[test]
    fn test_format_significant_matches_printf_g() {
        assert_eq!(format_significant(0.12345678, 5), "0.12346");
        assert_eq!(format_significant(1.0, 5), "1");
        assert_eq!(format_significant(12345.678, 5), "12346");
        assert_eq!(format_significant(123456.0, 5), "1.2346e+05");
        assert_eq!(format_significant(100000.0, 5), "1e+05");
        assert_eq!(format_significant(99999.9, 5), "1e+05");
        assert_eq!(format_significant(0.0001, 5), "0.0001");
        assert_eq!(format_significant(0.00001234, 5), "1.234e-05");
        assert_eq!(format_significant(-2.5, 5), "-2.5");
        assert_eq!(format_significant(1e300, 5), "1e+300");
        assert_eq!(format_significant(0.0, 5), "0");
        assert_eq!(format_significant(f64::NAN, 5), "nan");
        assert_eq!(format_significant(f64::NEG_INFINITY, 5), "-inf");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::logging::MemorySink;
    use proptest::prelude::*;
    use std::sync::Arc;

    proptest! {
        /// Buffer is always empty after a trigger, whatever the filter
        #[test]
        fn trigger_always_clears(
            names in proptest::collection::vec("[a-c]{1,3}", 0..20),
            pattern in "[a-c*]{1,3}",
        ) {
            let sink = MemorySink::new();
            let mut w = ConsoleWriter::new([pattern]).unwrap().with_sink(Arc::new(sink.clone()));
            for (i, name) in names.iter().enumerate() {
                w.add_scalar(name, i as f64);
            }
            w.on_trigger(&CallbackContext::default());
            prop_assert!(w.pending().is_empty());
            prop_assert!(sink.records().len() <= 1);
        }

        /// Output order is lexicographic regardless of insertion order
        #[test]
        fn output_is_sorted(names in proptest::collection::hash_set("[a-z]{1,6}", 1..12)) {
            let sink = MemorySink::new();
            let mut w = ConsoleWriter::default().with_sink(Arc::new(sink.clone()));
            for name in &names {
                w.add_scalar(name, 1.0);
            }
            w.on_trigger(&CallbackContext::default());

            let message = sink.records()[0].message.clone();
            let logged: Vec<String> = message
                .split("\n+ ")
                .filter(|l| !l.is_empty())
                .map(|l| l.trim_start_matches('[').split(']').next().unwrap_or("").to_string())
                .collect();
            let mut expected: Vec<String> = names.into_iter().collect();
            expected.sort();
            prop_assert_eq!(logged, expected);
        }

        /// Rendering keeps at most five significant digits
        #[test]
        fn significant_digits_bounded(value in -1.0e6f64..1.0e6) {
            let text = format_significant(value, 5);
            let mantissa = text.split('e').next().unwrap_or("");
            let digits = mantissa
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>();
            let significant = digits.trim_start_matches('0');
            prop_assert!(significant.len() <= 5, "{} -> {}", value, text);
        }
    }
}
