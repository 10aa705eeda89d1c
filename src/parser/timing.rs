//! Root timing lines: one matcher over the three textual shapes a request's
//! total/self time shows up in.
//!
//! Times on these lines are seconds. A shape only becomes active once its
//! marker line has been seen in the group (the API root needs no marker).

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// `/api/data POST` profiler root token
pub static PROFILE_ROOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/api/data[\t ]+POST").expect("Invalid profile root regex"));

/// Marker of a background job that ran too long
pub static LONG_EXECUTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Too long execution").expect("Invalid long execution regex"));

/// Header that opens an indented execution profile
pub static EXECUTION_PROFILE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Execution profile").expect("Invalid execution profile regex")
});

/// `/api/data  POST  3  0.250 / 0.040`
static API_ROOT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/api/data[\t ]+POST\s+(\d+)\s+(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)")
        .expect("Invalid API root line regex")
});

/// `- (!)KeepUpSsoConnectionJob  1  24.045 (10)` or `- SyncCommand  1  1.234 / 0.100 (3)`
static LONG_EXECUTION_JOB_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[-\s]*(?:\(!\))?\s*([A-Za-z0-9_.]+(?:Job|Command|Service|Process|Task))\s+(\d+)\s+(\d+(?:\.\d+)?)(?:\s*/\s*(\d+(?:\.\d+)?))?\s*\(\d+\)",
    )
    .expect("Invalid long execution job regex")
});

/// `- EnvController.selectApp\t1\t0.326 / 0.001`
static EXECUTION_ROOT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\s+[^\t\n]+\t(\d+)\t(\d+(?:\.\d+)?)(?:\s*/\s*(\d+(?:\.\d+)?))?(?:\s*\(\d+\))?")
        .expect("Invalid execution root line regex")
});

/// The closed set of root timing line grammars, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingShape {
    /// `/api/data POST` request root; self time is mandatory
    ApiRoot,
    /// First job line of a "Too long execution" block; self time defaults to 0
    LongExecutionJob,
    /// First node line of an "Execution profile" block; self time defaults to 0
    ExecutionProfileRoot,
}

/// One captured root timing, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSample {
    pub shape: TimingShape,
    /// How many times the unit ran (at least 1)
    pub count: u64,
    pub total: f64,
    pub self_time: f64,
}

impl TimingShape {
    pub const ALL: [TimingShape; 3] = [
        TimingShape::ApiRoot,
        TimingShape::LongExecutionJob,
        TimingShape::ExecutionProfileRoot,
    ];

    fn index(self) -> usize {
        match self {
            TimingShape::ApiRoot => 0,
            TimingShape::LongExecutionJob => 1,
            TimingShape::ExecutionProfileRoot => 2,
        }
    }

    /// Try to read a sample from a line under this grammar
    pub fn capture(self, line: &str) -> Option<TimingSample> {
        match self {
            TimingShape::ApiRoot => {
                let caps = API_ROOT_LINE.captures(line)?;
                let self_time = decimal(&caps, 3)?;
                self.sample(&caps, 1, 2, Some(self_time))
            }
            TimingShape::LongExecutionJob => {
                let caps = LONG_EXECUTION_JOB_LINE.captures(line)?;
                self.sample(&caps, 2, 3, decimal(&caps, 4))
            }
            TimingShape::ExecutionProfileRoot => {
                let caps = EXECUTION_ROOT_LINE.captures(line)?;
                self.sample(&caps, 1, 2, decimal(&caps, 3))
            }
        }
    }

    fn sample(
        self,
        caps: &Captures<'_>,
        count_group: usize,
        total_group: usize,
        self_time: Option<f64>,
    ) -> Option<TimingSample> {
        let count = caps
            .get(count_group)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(1);
        let total = decimal(caps, total_group)?;

        Some(TimingSample {
            shape: self,
            count,
            total,
            self_time: self_time.unwrap_or(0.0),
        })
    }
}

fn decimal(caps: &Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse::<f64>().ok()
}

/// Per-group scanner that yields at most one sample per shape
///
/// A line belongs to the highest-priority shape that matches it. Every
/// active shape matching that line counts as having seen its first line,
/// so a request root is never counted twice under two grammars.
#[derive(Debug, Default)]
pub struct TimingLineMatcher {
    seen_long_execution: bool,
    seen_execution_profile: bool,
    captured: [bool; 3],
}

impl TimingLineMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_active(&self, shape: TimingShape) -> bool {
        match shape {
            TimingShape::ApiRoot => true,
            TimingShape::LongExecutionJob => self.seen_long_execution,
            TimingShape::ExecutionProfileRoot => self.seen_execution_profile,
        }
    }

    /// Feed the next line of the group
    pub fn feed(&mut self, line: &str) -> Option<TimingSample> {
        if LONG_EXECUTION_MARKER.is_match(line) {
            self.seen_long_execution = true;
        }
        if EXECUTION_PROFILE_HEADER.is_match(line) {
            self.seen_execution_profile = true;
        }

        let mut owned = false;
        let mut result = None;

        for shape in TimingShape::ALL {
            if !self.is_active(shape) {
                continue;
            }
            let Some(sample) = shape.capture(line) else {
                continue;
            };
            let fresh = !self.captured[shape.index()];
            self.captured[shape.index()] = true;
            if !owned {
                owned = true;
                if fresh {
                    result = Some(sample);
                }
            }
        }

        result
    }
}

/// Scan a whole group, returning its samples in line order
pub fn scan_group(lines: &[String]) -> Vec<TimingSample> {
    let mut matcher = TimingLineMatcher::new();
    lines.iter().filter_map(|line| matcher.feed(line)).collect()
}
