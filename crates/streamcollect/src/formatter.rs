// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record formatters: decimal and hexadecimal tab-separated lines.
//!
//! Field layout (tab separated):
//!
//! ```text
//! rx_id  time  tx_id  0  rss  0x00  Extra:<k>  sense_0 ... sense_{k-1}
//! ```
//!
//! Every line has exactly `7 + k` fields.

use crate::sample::SampleRecord;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Identifier representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    /// Identifiers in decimal.
    #[default]
    Decimal,
    /// Identifiers in lowercase hexadecimal, no prefix.
    Hex,
}

/// Source of the second field in hex mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HexTimestamp {
    /// Wall-clock time read when the line is formatted. Matches the output
    /// of earlier collector releases.
    #[default]
    Current,
    /// The sample's own receive timestamp.
    Sample,
}

/// Wall-clock source in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a fixed reading, for replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Record formatter trait.
pub trait RecordFormatter {
    /// Format a sample as one line, without the trailing newline.
    fn format(&self, sample: &SampleRecord) -> String;
}

/// Decimal formatter: every field in decimal, time from the sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalFormatter;

impl RecordFormatter for DecimalFormatter {
    fn format(&self, sample: &SampleRecord) -> String {
        let mut line = String::with_capacity(64 + sample.sense_data.len() * 4);
        let _ = write!(
            line,
            "{}\t{}\t{}",
            sample.rx_id, sample.rx_timestamp, sample.tx_id
        );
        write_tail(&mut line, sample);
        line
    }
}

/// Hex formatter: rx id, time and tx id in hex, everything after tx in
/// decimal.
pub struct HexFormatter {
    timestamp: HexTimestamp,
    clock: Box<dyn Clock>,
}

impl Default for HexFormatter {
    fn default() -> Self {
        Self::new(HexTimestamp::Current)
    }
}

impl HexFormatter {
    pub fn new(timestamp: HexTimestamp) -> Self {
        Self::with_clock(timestamp, SystemClock)
    }

    pub fn with_clock(timestamp: HexTimestamp, clock: impl Clock + 'static) -> Self {
        Self {
            timestamp,
            clock: Box::new(clock),
        }
    }

    fn time_field(&self, sample: &SampleRecord) -> i64 {
        match self.timestamp {
            HexTimestamp::Current => self.clock.now_millis(),
            HexTimestamp::Sample => sample.rx_timestamp,
        }
    }
}

impl RecordFormatter for HexFormatter {
    fn format(&self, sample: &SampleRecord) -> String {
        let mut line = String::with_capacity(96 + sample.sense_data.len() * 4);
        let _ = write!(
            line,
            "{:x}\t{:x}\t{:x}",
            sample.rx_id,
            self.time_field(sample),
            sample.tx_id
        );
        write_tail(&mut line, sample);
        line
    }
}

/// Fields 4 onward, identical in both modes.
fn write_tail(line: &mut String, sample: &SampleRecord) {
    let _ = write!(
        line,
        "\t0\t{}\t0x00\tExtra:{}",
        sample.rss,
        sample.sense_data.len()
    );
    for value in &sample.sense_data {
        let _ = write!(line, "\t{}", value);
    }
}

/// Create a formatter for the given mode.
pub fn create_formatter(
    mode: OutputMode,
    hex_timestamp: HexTimestamp,
) -> Box<dyn RecordFormatter + Send + Sync> {
    match mode {
        OutputMode::Decimal => Box::new(DecimalFormatter),
        OutputMode::Hex => Box::new(HexFormatter::new(hex_timestamp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SampleRecord {
        SampleRecord::new(10, 20)
            .with_timestamp(1000)
            .with_rss(-42.0)
            .with_sense_data(vec![1, 2, 3])
    }

    #[test]
    fn test_decimal_line() {
        let line = DecimalFormatter.format(&sample());
        assert_eq!(line, "20\t1000\t10\t0\t-42\t0x00\tExtra:3\t1\t2\t3");
    }

    #[test]
    fn test_hex_line_uses_clock() {
        let formatter = HexFormatter::with_clock(HexTimestamp::Current, FixedClock(1_700_000_000_123));
        let line = formatter.format(&sample());
        assert_eq!(
            line,
            "14\t18bcfe5687b\ta\t0\t-42\t0x00\tExtra:3\t1\t2\t3"
        );
    }

    #[test]
    fn test_hex_time_field_is_hex() {
        let formatter = HexFormatter::with_clock(HexTimestamp::Current, FixedClock(0x1234));
        let line = formatter.format(&SampleRecord::new(10, 20));
        assert_eq!(line, "14\t1234\ta\t0\t0\t0x00\tExtra:0");
    }

    #[test]
    fn test_hex_line_with_sample_time() {
        let formatter = HexFormatter::with_clock(HexTimestamp::Sample, FixedClock(99));
        let line = formatter.format(&sample());
        assert_eq!(line, "14\t3e8\ta\t0\t-42\t0x00\tExtra:3\t1\t2\t3");
    }

    #[test]
    fn test_empty_sense_data() {
        let s = SampleRecord::new(1, 2).with_timestamp(5).with_rss(-70.0);
        let line = DecimalFormatter.format(&s);
        assert!(line.ends_with("\tExtra:0"));
        assert_eq!(line, "2\t5\t1\t0\t-70\t0x00\tExtra:0");
    }

    #[test]
    fn test_field_count() {
        for k in [0usize, 1, 7, 255] {
            let s = SampleRecord::new(3, 4).with_sense_data(vec![9u8; k]);
            let decimal = DecimalFormatter.format(&s);
            let hex = HexFormatter::with_clock(HexTimestamp::Current, FixedClock(0)).format(&s);
            assert_eq!(decimal.split('\t').count(), 7 + k);
            assert_eq!(hex.split('\t').count(), 7 + k);
        }
    }

    #[test]
    fn test_format_is_idempotent() {
        let s = sample();
        assert_eq!(DecimalFormatter.format(&s), DecimalFormatter.format(&s));

        let hex = HexFormatter::with_clock(HexTimestamp::Current, FixedClock(42));
        assert_eq!(hex.format(&s), hex.format(&s));
    }

    #[test]
    fn test_full_width_identifiers() {
        let s = SampleRecord::new(u128::MAX, 0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        let hex = HexFormatter::with_clock(HexTimestamp::Sample, FixedClock(0)).format(&s);
        assert!(hex.starts_with("123456789abcdef0011223344556677\t0\tffffffffffffffffffffffffffffffff\t"));

        let decimal = DecimalFormatter.format(&s);
        assert!(decimal.contains("\t340282366920938463463374607431768211455\t"));
    }

    #[test]
    fn test_fractional_rss() {
        let s = SampleRecord::new(1, 1).with_rss(-67.5);
        assert_eq!(DecimalFormatter.format(&s), "1\t0\t1\t0\t-67.5\t0x00\tExtra:0");
    }

    #[test]
    fn test_create_formatter() {
        let s = sample();
        let decimal = create_formatter(OutputMode::Decimal, HexTimestamp::Current);
        assert_eq!(decimal.format(&s), DecimalFormatter.format(&s));

        let hex = create_formatter(OutputMode::Hex, HexTimestamp::Sample);
        assert_eq!(hex.format(&s), "14\t3e8\ta\t0\t-42\t0x00\tExtra:3\t1\t2\t3");
    }
}
