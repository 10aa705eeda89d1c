//! Split raw log lines into logical multi-line groups.
//!
//! A new group starts whenever a line carries a bracketed timestamp that
//! differs from the one that opened the current group. Lines without a
//! timestamp (stack traces, profile blocks, wrapped messages) join whatever
//! group is open, so the groups always partition the input.

use super::schema::LogGroup;
use crate::utils::error::InputError;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use log::{debug, warn};
use regex::Regex;
use std::io::BufRead;
use std::sync::LazyLock;

/// `[2024-01-01 10:00:00.000 +00:00]`
static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3} [+-]\d{2}:\d{2}\]")
        .expect("Invalid ISO timestamp regex")
});

/// `[01/Jan/2024:10:00:00 +0000]`
static APACHE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}\]")
        .expect("Invalid Apache timestamp regex")
});

/// `[Mon Jan 01 10:00:00.123456 2024]`
static APACHE_CTIME_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[A-Za-z]{3} [A-Za-z]{3} \d{2} \d{2}:\d{2}:\d{2}\.\d+ \d{4}\]")
        .expect("Invalid Apache ctime timestamp regex")
});

/// Which grammar produced a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    Iso,
    Apache,
    ApacheCtime,
}

/// A timestamp found on a line, kept verbatim (brackets included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub raw: String,
    pub format: TimestampFormat,
    /// Byte offset of the opening bracket within the line
    pub offset: usize,
}

impl Boundary {
    /// Timestamp text without the surrounding brackets
    pub fn inner(&self) -> &str {
        self.raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(&self.raw)
    }

    /// Parse into a point in time; the ctime variant carries no offset and is read as UTC
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let inner = self.inner();
        match self.format {
            TimestampFormat::Iso => {
                DateTime::parse_from_str(inner, "%Y-%m-%d %H:%M:%S%.3f %:z").ok()
            }
            TimestampFormat::Apache => DateTime::parse_from_str(inner, "%d/%b/%Y:%H:%M:%S %z").ok(),
            TimestampFormat::ApacheCtime => {
                NaiveDateTime::parse_from_str(inner, "%a %b %d %H:%M:%S%.f %Y")
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            }
        }
    }
}

/// Find the first timestamp on a line
///
/// The ISO grammar wins over the Apache ones when a line carries both.
pub fn extract_timestamp(line: &str) -> Option<Boundary> {
    let grammars: [(&Regex, TimestampFormat); 3] = [
        (&*ISO_TIMESTAMP, TimestampFormat::Iso),
        (&*APACHE_TIMESTAMP, TimestampFormat::Apache),
        (&*APACHE_CTIME_TIMESTAMP, TimestampFormat::ApacheCtime),
    ];

    grammars.iter().find_map(|(regex, format)| {
        regex.find(line).map(|m| Boundary {
            raw: m.as_str().to_string(),
            format: *format,
            offset: m.start(),
        })
    })
}

/// True if the line opens with a timestamp (a fresh top-level log entry)
pub fn starts_with_timestamp(line: &str) -> bool {
    extract_timestamp(line).is_some_and(|b| b.offset == 0)
}

/// Incremental grouper: feed lines one at a time, receive finished groups
#[derive(Debug, Default)]
pub struct LineGrouper {
    current: Option<LogGroup>,
    current_boundary: Option<String>,
    last_time: Option<DateTime<FixedOffset>>,
}

impl LineGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line; returns the previous group if this line closed it
    pub fn push(&mut self, line: impl Into<String>) -> Option<LogGroup> {
        let line = line.into();
        let mut finished = None;

        if let Some(boundary) = extract_timestamp(&line) {
            if self.current_boundary.as_deref() != Some(boundary.raw.as_str()) {
                self.check_order(&boundary);
                finished = self.current.take().filter(|group| !group.is_empty());
                self.current = Some(LogGroup::new(Some(boundary.raw.clone()), Vec::new()));
                self.current_boundary = Some(boundary.raw);
            }
        }

        self.current
            .get_or_insert_with(|| LogGroup::new(None, Vec::new()))
            .push(line);

        finished
    }

    /// Flush the trailing group
    pub fn finish(mut self) -> Option<LogGroup> {
        self.current.take().filter(|group| !group.is_empty())
    }

    fn check_order(&mut self, boundary: &Boundary) {
        let Some(time) = boundary.to_datetime() else {
            return;
        };
        if let Some(last) = self.last_time {
            if time < last {
                warn!("Timestamp {} goes backwards, starting a new group anyway", boundary.raw);
            }
        }
        self.last_time = Some(time);
    }
}

/// Group an in-memory line sequence
pub fn group_lines<I, S>(lines: I) -> Vec<LogGroup>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut grouper = LineGrouper::new();
    let mut groups: Vec<LogGroup> = lines.into_iter().filter_map(|line| grouper.push(line)).collect();
    groups.extend(grouper.finish());

    debug!("Grouped input into {} groups", groups.len());
    groups
}

/// Group raw text split on `\n`; empty text yields no groups
pub fn group_text(text: &str) -> Vec<LogGroup> {
    if text.is_empty() {
        return Vec::new();
    }
    group_lines(text.split('\n'))
}

/// Stream groups from a reader to a sink as soon as each one closes
///
/// Only the `\n` terminator is removed from each line, so `\r` and other
/// trailing bytes survive. Invalid UTF-8 is decoded lossily. Returns the
/// number of groups emitted.
pub fn stream_groups<R: BufRead>(
    mut reader: R,
    mut sink: impl FnMut(LogGroup),
) -> Result<usize, InputError> {
    let mut grouper = LineGrouper::new();
    let mut emitted = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let line = String::from_utf8_lossy(bytes);
        if let Some(group) = grouper.push(line) {
            emitted += 1;
            sink(group);
        }
    }

    if let Some(group) = grouper.finish() {
        emitted += 1;
        sink(group);
    }

    debug!("Streamed {} groups", emitted);
    Ok(emitted)
}

/// Collect every group from a reader
pub fn group_reader<R: BufRead>(reader: R) -> Result<Vec<LogGroup>, InputError> {
    let mut groups = Vec::new();
    stream_groups(reader, |group| groups.push(group))?;
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_iso_timestamp() {
        let boundary = extract_timestamp("[2024-01-01 10:00:00.000 +00:00] [Info] hello").unwrap();
        assert_eq!(boundary.raw, "[2024-01-01 10:00:00.000 +00:00]");
        assert_eq!(boundary.format, TimestampFormat::Iso);
        assert_eq!(boundary.offset, 0);
        assert_eq!(boundary.inner(), "2024-01-01 10:00:00.000 +00:00");
    }

    #[test]
    fn test_extract_apache_timestamps() {
        let apache = extract_timestamp(r#"10.0.0.1 - - [01/Jan/2024:10:00:00 +0000] "GET / HTTP/1.1" 200"#).unwrap();
        assert_eq!(apache.format, TimestampFormat::Apache);
        assert_eq!(apache.raw, "[01/Jan/2024:10:00:00 +0000]");

        let ctime = extract_timestamp("[Mon Jan 01 10:00:00.123456 2024] [core:error] oops").unwrap();
        assert_eq!(ctime.format, TimestampFormat::ApacheCtime);
    }

    #[test]
    fn test_no_timestamp() {
        assert!(extract_timestamp("   at Foo.Bar()").is_none());
        assert!(extract_timestamp("[2024-01-01] partial").is_none());
    }

    #[test]
    fn test_boundary_datetime() {
        let iso = extract_timestamp("[2024-01-01 10:00:00.250 +02:00]").unwrap();
        let time = iso.to_datetime().unwrap();
        assert_eq!(time.to_rfc3339(), "2024-01-01T10:00:00.250+02:00");

        let apache = extract_timestamp("[01/Jan/2024:10:00:00 +0000]").unwrap();
        assert!(apache.to_datetime().is_some());
    }

    #[test]
    fn test_starts_with_timestamp() {
        assert!(starts_with_timestamp("[2024-01-01 10:00:00.000 +00:00] x"));
        assert!(!starts_with_timestamp("x [2024-01-01 10:00:00.000 +00:00]"));
    }

    #[test]
    fn test_continuation_lines_join_group() {
        let groups = group_lines(vec![
            "[2024-01-01 10:00:00.000 +00:00] first",
            "  continuation",
            "[2024-01-01 10:00:01.000 +00:00] second",
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].lines(), &["[2024-01-01 10:00:00.000 +00:00] first", "  continuation"]);
        assert_eq!(groups[1].boundary(), Some("[2024-01-01 10:00:01.000 +00:00]"));
    }

    #[test]
    fn test_same_timestamp_stays_in_group() {
        let groups = group_lines(vec![
            "[2024-01-01 10:00:00.000 +00:00] a",
            "[2024-01-01 10:00:00.000 +00:00] b",
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_no_timestamps_single_group() {
        let groups = group_text("one\ntwo\nthree");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].boundary(), None);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_leading_lines_before_first_timestamp() {
        let groups = group_text("preamble\n[2024-01-01 10:00:00.000 +00:00] a");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].lines(), &["preamble"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(group_text("").is_empty());
    }

    #[test]
    fn test_streaming_keeps_carriage_returns() {
        let input = "[2024-01-01 10:00:00.000 +00:00] a\r\nb\r\n[2024-01-01 10:00:01.000 +00:00] c\n";
        let mut seen = Vec::new();
        let count = stream_groups(input.as_bytes(), |g| seen.push(g)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[0].lines(), &["[2024-01-01 10:00:00.000 +00:00] a\r", "b\r"]);
        assert_eq!(seen[1].lines(), &["[2024-01-01 10:00:01.000 +00:00] c"]);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let input: &[u8] = b"[2024-01-01 10:00:00.000 +00:00] caf\xE9\n[2024-01-01 10:00:01.000 +00:00] next\n";
        let groups = group_reader(input).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].lines(), &["[2024-01-01 10:00:00.000 +00:00] caf\u{FFFD}"]);
        assert_eq!(groups[1].lines(), &["[2024-01-01 10:00:01.000 +00:00] next"]);
    }
}
