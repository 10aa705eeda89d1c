//! Order-preserving predicate filters over log groups.
//!
//! Stages run in a fixed order and only when their criterion is active:
//! identifier, protocol markers, status buckets, profiler-only, and finally
//! request/response correlation, which rebuckets whatever survived.

use super::criteria::FilterCriteria;
use crate::parser::schema::LogGroup;
use crate::parser::timing::{EXECUTION_PROFILE_HEADER, LONG_EXECUTION_MARKER, PROFILE_ROOT_TOKEN};
use log::debug;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Apache access-log status: `"GET / HTTP/1.1" 404`
pub(crate) static APACHE_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"HTTP/\d\.\d" (\d{3})"#).expect("Invalid HTTP status regex"));

static REQUEST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Request ID:([a-zA-Z0-9-]+)").expect("Invalid request id regex"));

static RESPONSE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Response ID:([a-zA-Z0-9-]+)").expect("Invalid response id regex"));

/// Apply every active criterion to the groups
///
/// **Public** - main entry point for filtering; a pure function of its inputs
pub fn filter_groups(groups: &[LogGroup], criteria: &FilterCriteria) -> Vec<LogGroup> {
    let mut filtered: Vec<LogGroup> = groups.to_vec();

    if let Some(identifier) = criteria.identifier() {
        let needle = identifier.to_lowercase();
        filtered.retain(|g| contains_identifier(g, &needle));
        debug!("Identifier filter kept {} groups", filtered.len());
    }

    if criteria.markers_active() {
        filtered.retain(|g| g.any_line(|line| criteria.line_matches_markers(line)));
        debug!("Protocol marker filter kept {} groups", filtered.len());
    }

    if !criteria.status_buckets.is_empty() {
        filtered.retain(|g| matches_status_buckets(g, &criteria.status_buckets));
        debug!("Status bucket filter kept {} groups", filtered.len());
    }

    if criteria.profiler_only {
        filtered.retain(is_profiler_group);
        debug!("Profiler filter kept {} groups", filtered.len());
    }

    if criteria.request_response {
        filtered = correlate_request_response(filtered, criteria.identifier());
        debug!("Request/response correlation produced {} groups", filtered.len());
    }

    filtered
}

/// Case-insensitive containment; `needle_lower` must already be lowercase
pub fn contains_identifier(group: &LogGroup, needle_lower: &str) -> bool {
    group.any_line(|line| line.to_lowercase().contains(needle_lower))
}

/// Status code of the first Apache-style status token on a line
pub fn status_code(line: &str) -> Option<u16> {
    APACHE_STATUS
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}

/// True if `code` falls in the hundred-bucket starting at `bucket`
pub fn in_bucket(code: u16, bucket: u16) -> bool {
    code >= bucket && code <= bucket + 99
}

pub fn matches_status_buckets(group: &LogGroup, buckets: &[u16]) -> bool {
    group.any_line(|line| {
        status_code(line).is_some_and(|code| buckets.iter().any(|&b| in_bucket(code, b)))
    })
}

/// Profiler root token, long-execution marker or execution-profile header
pub fn is_profiler_line(line: &str) -> bool {
    PROFILE_ROOT_TOKEN.is_match(line)
        || LONG_EXECUTION_MARKER.is_match(line)
        || EXECUTION_PROFILE_HEADER.is_match(line)
}

pub fn is_profiler_group(group: &LogGroup) -> bool {
    group.any_line(is_profiler_line)
}

fn first_capture(group: &LogGroup, regex: &Regex) -> Option<String> {
    group
        .lines()
        .iter()
        .find_map(|line| regex.captures(line).map(|caps| caps[1].to_string()))
}

/// Rebucket groups by the id behind "Request ID:" / "Response ID:"
///
/// Groups without either token are dropped. Each bucket becomes one group
/// made of its distinct member groups in arrival order; under an identifier
/// filter only members containing the identifier are kept and buckets left
/// without one are dropped.
pub fn correlate_request_response(groups: Vec<LogGroup>, identifier: Option<&str>) -> Vec<LogGroup> {
    let needle = identifier.map(str::to_lowercase);
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<LogGroup>> = HashMap::new();

    for group in groups {
        let ids = [
            first_capture(&group, &REQUEST_ID),
            first_capture(&group, &RESPONSE_ID),
        ];
        let keep = needle
            .as_deref()
            .map_or(true, |n| contains_identifier(&group, n));

        for id in ids.into_iter().flatten() {
            let bucket = buckets.entry(id.clone()).or_insert_with(|| {
                order.push(id);
                Vec::new()
            });
            if keep {
                bucket.push(group.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let members = buckets.remove(&id)?;
            merge_bucket(members, needle.as_deref())
        })
        .collect()
}

fn merge_bucket(members: Vec<LogGroup>, needle: Option<&str>) -> Option<LogGroup> {
    let mut seen: HashSet<String> = HashSet::new();
    let unique: Vec<LogGroup> = members
        .into_iter()
        .filter(|g| seen.insert(g.text()))
        .collect();

    if unique.is_empty() {
        return None;
    }
    if let Some(n) = needle {
        if !unique.iter().any(|g| contains_identifier(g, n)) {
            return None;
        }
    }

    let boundary = unique[0].boundary().map(str::to_string);
    let lines = unique.into_iter().flat_map(LogGroup::into_lines).collect();
    Some(LogGroup::new(boundary, lines))
}
