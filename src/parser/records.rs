//! Extract per-request profiling records from grouped log text.
//!
//! Two log producers describe the same request independently:
//! - the request/response middleware (timestamp, workspace, measured duration)
//! - the profiler (route, method, wall/core seconds, execution profile tree)
//!
//! Each view is collected into its own map keyed by response id and the two
//! are merged at the end. Nothing is kept between calls.

use super::profile_tree::{build_tree, is_profile_marker};
use super::schema::{Extraction, LogGroup, ProfileTreeStore, ProfilingRecord};
use crate::utils::config::{MIDDLEWARE_COMPONENT, PROFILER_COMPONENT};
use log::debug;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static MIDDLEWARE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[(?P<ts>[^\]]+)\] \[WebScape\.Server\.Services\.Middlewares\.RequestResponseLoggingMiddleware\].*?(?:\[(?P<ws>[0-9a-fA-F-]{36})\])?$",
    )
    .expect("Invalid middleware header regex")
});

static RESPONSE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Response ID:\s*(?P<id>[0-9a-fA-F-]{36})").expect("Invalid response id regex")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Time request-response:\s+(?P<dur>\d+)\s+ms").expect("Invalid duration regex")
});

static PROFILER_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[WebScape\.Common\.Profiling\.ProfileService\].*?\[(?P<resp>[0-9a-fA-F-]{36})\] \[(?P<ws>[0-9a-fA-F-]{36})\]",
    )
    .expect("Invalid profiler header regex")
});

static EXECUTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"-\s+(?P<route>/\S*)\s+(?P<method>GET|POST|PUT|DELETE|PATCH)\s+\d+\s+(?P<wall>\d+\.\d+)\s*/\s*(?P<core>\d+\.\d+)",
    )
    .expect("Invalid execution line regex")
});

#[derive(Debug, Default)]
struct MiddlewareView {
    timestamp: Option<String>,
    workspace_id: Option<String>,
    duration_ms: Option<f64>,
}

#[derive(Debug, Default)]
struct ProfilerView {
    workspace_id: Option<String>,
    route: Option<String>,
    method: Option<String>,
    wall_ms: Option<f64>,
    core_ms: Option<f64>,
}

/// Insertion-ordered map from response id to a partial view
#[derive(Debug)]
struct ViewMap<T> {
    order: Vec<String>,
    entries: HashMap<String, T>,
}

impl<T: Default> ViewMap<T> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    fn entry(&mut self, id: &str) -> &mut T {
        if !self.entries.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.entries.entry(id.to_string()).or_default()
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        self.entries.remove(id)
    }
}

/// Extract profiling records and execution-profile trees
///
/// **Public** - main entry point for record extraction
///
/// Records come out in first-seen order: ids seen by the middleware first,
/// then ids only the profiler reported.
pub fn extract_records(groups: &[LogGroup]) -> Extraction {
    let mut middleware: ViewMap<MiddlewareView> = ViewMap::new();
    let mut profiler: ViewMap<ProfilerView> = ViewMap::new();
    let mut trees = ProfileTreeStore::new();

    for group in groups {
        scan_middleware(group, &mut middleware);
        scan_profiler(group, &mut profiler, &mut trees);
    }

    let records = merge_views(middleware, profiler);

    debug!(
        "Extracted {} profiling records and {} profile trees",
        records.len(),
        trees.len()
    );

    Extraction { records, trees }
}

/// Middleware view: response id, header timestamp/workspace, duration
fn scan_middleware(group: &LogGroup, views: &mut ViewMap<MiddlewareView>) {
    for line in group.lines() {
        let Some(caps) = RESPONSE_ID.captures(line) else {
            continue;
        };
        let view = views.entry(&caps["id"]);

        if view.timestamp.is_none() {
            if let Some(header) = middleware_header(group) {
                view.timestamp = header.name("ts").map(|m| m.as_str().to_string());
                view.workspace_id = header.name("ws").map(|m| m.as_str().to_string());
            } else if let Some(boundary) = group.boundary() {
                view.timestamp = Some(strip_brackets(boundary).to_string());
            }
        }

        if let Some(duration) = group
            .lines()
            .iter()
            .find_map(|l| DURATION.captures(l))
            .and_then(|d| d["dur"].parse::<f64>().ok())
        {
            view.duration_ms = Some(duration);
        }
    }
}

fn middleware_header(group: &LogGroup) -> Option<Captures<'_>> {
    group
        .lines()
        .iter()
        .filter(|l| l.contains(MIDDLEWARE_COMPONENT))
        .find_map(|l| MIDDLEWARE_HEADER.captures(l.trim_end()))
}

fn profiler_header(group: &LogGroup) -> Option<Captures<'_>> {
    group
        .lines()
        .iter()
        .filter(|l| l.contains(PROFILER_COMPONENT))
        .find_map(|l| PROFILER_HEADER.captures(l))
}

/// Profiler view: header ids, the `- /route METHOD n wall / core` line, and the tree
fn scan_profiler(group: &LogGroup, views: &mut ViewMap<ProfilerView>, trees: &mut ProfileTreeStore) {
    for line in group.lines().iter().filter(|l| l.contains(PROFILER_COMPONENT)) {
        if let Some(caps) = PROFILER_HEADER.captures(line) {
            let view = views.entry(&caps["resp"]);
            if view.workspace_id.is_none() {
                view.workspace_id = Some(caps["ws"].to_string());
            }
        }
    }

    let Some(header) = profiler_header(group) else {
        return;
    };
    let response_id = header["resp"].to_string();

    for line in group.lines().iter().filter(|l| l.starts_with("- /")) {
        let Some(exec) = EXECUTION_LINE.captures(line) else {
            continue;
        };
        let view = views.entry(&response_id);
        view.route = Some(exec["route"].to_string());
        view.method = Some(exec["method"].to_string());
        view.wall_ms = exec["wall"].parse::<f64>().ok().map(|s| s * 1000.0);
        view.core_ms = exec["core"].parse::<f64>().ok().map(|s| s * 1000.0);
    }

    if group.any_line(is_profile_marker) {
        if let Some(tree) = build_tree(group.lines()) {
            if trees.insert(response_id.clone(), tree).is_some() {
                debug!("Replaced earlier profile tree for {}", response_id);
            }
        }
    }
}

fn merge_views(
    mut middleware: ViewMap<MiddlewareView>,
    mut profiler: ViewMap<ProfilerView>,
) -> Vec<ProfilingRecord> {
    let mut ids = std::mem::take(&mut middleware.order);
    for id in std::mem::take(&mut profiler.order) {
        if !middleware.entries.contains_key(&id) {
            ids.push(id);
        }
    }

    ids.into_iter()
        .map(|id| {
            let mid = middleware.remove(&id).unwrap_or_default();
            let prof = profiler.remove(&id).unwrap_or_default();
            merge_record(id, mid, prof)
        })
        .collect()
}

fn merge_record(response_id: String, mid: MiddlewareView, prof: ProfilerView) -> ProfilingRecord {
    let duration_ms = mid.duration_ms.or(prof.wall_ms);
    let wait_ms = match (prof.wall_ms, prof.core_ms) {
        (Some(wall), Some(core)) => Some(wall - core),
        _ => None,
    };
    let wait_ratio = match (wait_ms, duration_ms) {
        (Some(wait), Some(duration)) if duration != 0.0 => Some(wait / duration),
        _ => None,
    };

    ProfilingRecord {
        timestamp: mid.timestamp.unwrap_or_default(),
        response_id,
        workspace_id: mid.workspace_id.or(prof.workspace_id),
        route: prof.route,
        method: prof.method,
        duration_ms,
        wall_ms: prof.wall_ms,
        core_ms: prof.core_ms,
        wait_ms,
        wait_ratio,
    }
}

fn strip_brackets(boundary: &str) -> &str {
    boundary
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(boundary)
}
