//! Row table and diff engine for the review view.
//!
//! Pure functions over an ordered list of analyzed clips: header set, key
//! hiding, search, sort and the adjacent-row diff. Callers filter and sort
//! first, then diff, so the diff always compares rows in display order.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::clip::ClipDescriptor;
use crate::diff::DiffStatus;
use crate::error::CoreError;
use crate::graph::display_value;

/// Columns every row has, in display order.
pub const BASE_COLUMNS: [&str; 8] = [
    "file_path",
    "created_at",
    "name",
    "size",
    "duration",
    "width",
    "height",
    "fps",
];

/// Base columns hidden by the "hide paths" toggle.
pub const PATH_COLUMNS: [&str; 2] = ["file_path", "created_at"];

// ---------------------------------------------------------------------------
// Headers and cell values
// ---------------------------------------------------------------------------

/// Base columns followed by the sorted union of every row's field keys.
pub fn build_headers<R: Borrow<ClipDescriptor>>(rows: &[R]) -> Vec<String> {
    let mut dynamic: Vec<&String> = rows
        .iter()
        .flat_map(|r| as_row(r).fields.keys())
        .collect();
    dynamic.sort();
    dynamic.dedup();

    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(dynamic.into_iter().cloned())
        .collect()
}

fn as_row<R: Borrow<ClipDescriptor>>(row: &R) -> &ClipDescriptor {
    row.borrow()
}

/// Display value of one cell. Missing fields read as `""`.
pub fn cell_value(row: &ClipDescriptor, header: &str) -> String {
    match header {
        "file_path" => row.file_path.clone(),
        "created_at" => row.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        "name" => row.name.clone(),
        "size" => row.size.to_string(),
        "duration" => row.duration.to_string(),
        "width" => row.width.to_string(),
        "height" => row.height.to_string(),
        "fps" => row.fps.to_string(),
        key => row.fields.get(key).map(display_value).unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Key hiding
// ---------------------------------------------------------------------------

/// Parsed key-hide specification.
///
/// `"seed, /^internal_/i"` hides headers containing `seed` (any case) and
/// headers matching the regex `^internal_` case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct HideSpec {
    substrings: Vec<String>,
    regexes: Vec<Regex>,
}

impl HideSpec {
    /// Parse a comma-separated spec. Regex flags `i`, `m`, `s` and `x` are
    /// honoured, other letters are ignored. A token whose regex fails to
    /// compile is used as a plain substring.
    pub fn parse(spec: &str) -> Self {
        let mut parsed = Self::default();

        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(re) = parse_regex_token(token) {
                parsed.regexes.push(re);
            } else {
                parsed.substrings.push(token.to_lowercase());
            }
        }

        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty() && self.regexes.is_empty()
    }

    pub fn matches(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        self.substrings.iter().any(|s| lower.contains(s.as_str()))
            || self.regexes.iter().any(|re| re.is_match(header))
    }
}

/// `/pattern/flags` → compiled regex. `None` when the token is not in that
/// form or the pattern is invalid.
fn parse_regex_token(token: &str) -> Option<Regex> {
    let body = token.strip_prefix('/')?;
    let close = body.rfind('/')?;
    let (pattern, flags) = (&body[..close], &body[close + 1..]);
    if pattern.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars().map(|c| c.to_ascii_lowercase()) {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => &mut builder,
        };
    }
    builder.build().ok()
}

pub fn is_hidden(header: &str, spec: &HideSpec, hide_paths: bool) -> bool {
    (hide_paths && PATH_COLUMNS.contains(&header.to_lowercase().as_str())) || spec.matches(header)
}

pub fn visible_headers(headers: &[String], spec: &HideSpec, hide_paths: bool) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !is_hidden(h, spec, hide_paths))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Search and sort
// ---------------------------------------------------------------------------

/// Rows whose header values contain `search` (case-insensitive). An empty
/// search keeps every row.
pub fn filter_rows<'a, R: Borrow<ClipDescriptor>>(
    rows: &'a [R],
    headers: &[String],
    search: &str,
) -> Vec<&'a ClipDescriptor> {
    let term = search.trim().to_lowercase();
    rows.iter()
        .map(as_row)
        .filter(|row| {
            term.is_empty()
                || headers
                    .iter()
                    .any(|h| cell_value(row, h).to_lowercase().contains(&term))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Duration,
    Fps,
    Size,
    #[default]
    Ctime,
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "duration" => Ok(Self::Duration),
            "fps" => Ok(Self::Fps),
            "size" => Ok(Self::Size),
            "ctime" => Ok(Self::Ctime),
            other => Err(CoreError::Validation(format!("unknown sort key '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Stable sort by one column.
pub fn sort_rows<R: Borrow<ClipDescriptor>>(rows: &mut [R], key: SortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let (a, b) = (as_row(a), as_row(b));
        let ord = match key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Duration => a.duration.total_cmp(&b.duration),
            SortKey::Fps => a.fps.total_cmp(&b.fps),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Ctime => a.created_at_epoch().total_cmp(&b.created_at_epoch()),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Headers whose display values differ between two rows, in header order.
pub fn diff(current: &ClipDescriptor, previous: &ClipDescriptor, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| cell_value(current, h) != cell_value(previous, h))
        .cloned()
        .collect()
}

/// One changed field in the diff view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub key: String,
    pub status: DiffStatus,
    pub current: String,
    pub previous: String,
}

/// Diff of one row against the row displayed before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiff {
    pub name: String,
    /// The first row has no predecessor and shows no changes.
    pub baseline: bool,
    pub changes: Vec<FieldChange>,
}

/// Adjacent-row diffs over rows in display order.
pub fn diff_view<R: Borrow<ClipDescriptor>>(rows: &[R], headers: &[String]) -> Vec<RowDiff> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let row = as_row(row);
            let Some(prev) = i.checked_sub(1).map(|p| as_row(&rows[p])) else {
                return RowDiff {
                    name: row.name.clone(),
                    baseline: true,
                    changes: Vec::new(),
                };
            };

            let changes = diff(row, prev, headers)
                .into_iter()
                .map(|key| {
                    let current = cell_value(row, &key);
                    let previous = cell_value(prev, &key);
                    FieldChange {
                        status: DiffStatus::between(&previous, &current),
                        key,
                        current,
                        previous,
                    }
                })
                .collect();

            RowDiff {
                name: row.name.clone(),
                baseline: false,
                changes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::ResolvedFieldMap;

    fn row(name: &str, fields: serde_json::Value) -> ClipDescriptor {
        let values = fields
            .as_object()
            .map(|m| m.clone().into_iter().collect::<Vec<_>>())
            .unwrap_or_default();
        ClipDescriptor {
            file_path: format!("/clips/{name}"),
            name: name.to_string(),
            width: 512,
            height: 512,
            fps: 16.0,
            fields: ResolvedFieldMap::from_values(values),
            ..Default::default()
        }
    }

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    // -- Headers --

    #[test]
    fn headers_are_base_then_sorted_union() {
        let rows = vec![
            row("a", json!({ "Z #2.x": 1, "A #1.y": 2 })),
            row("b", json!({ "M #5.z": 3, "A #1.y": 4 })),
        ];
        let built = build_headers(&rows);
        assert_eq!(&built[..8], &BASE_COLUMNS.map(String::from));
        assert_eq!(&built[8..], &headers(&["A #1.y", "M #5.z", "Z #2.x"])[..]);
    }

    // -- Hiding --

    #[test]
    fn hide_spec_substrings_and_regexes() {
        let spec = HideSpec::parse("seed,/^internal_/i");
        assert!(is_hidden("KSampler #3.seed", &spec, false));
        assert!(is_hidden("internal_debug", &spec, false));
        assert!(is_hidden("INTERNAL_debug", &spec, false));
        assert!(!is_hidden("KSamplerAdvanced #5.cfg", &spec, false));
    }

    #[test]
    fn hide_spec_substrings_ignore_case() {
        let spec = HideSpec::parse(" Lora ");
        assert!(is_hidden("LoraLoader #2.widgets_values[0]", &spec, false));
        assert!(is_hidden("my_lora", &spec, false));
    }

    #[test]
    fn regex_without_flag_is_case_sensitive() {
        let spec = HideSpec::parse("/^Seed$/");
        assert!(is_hidden("Seed", &spec, false));
        assert!(!is_hidden("seed", &spec, false));
    }

    #[test]
    fn invalid_regex_degrades_to_substring() {
        let spec = HideSpec::parse("/([/");
        assert!(is_hidden("x/([/y", &spec, false));
        assert!(!is_hidden("plain", &spec, false));
    }

    #[test]
    fn empty_spec_hides_nothing() {
        let spec = HideSpec::parse(" , ,");
        assert!(spec.is_empty());
        assert!(!is_hidden("file_path", &spec, false));
    }

    #[test]
    fn hide_paths_hides_path_columns_only() {
        let spec = HideSpec::default();
        assert!(is_hidden("file_path", &spec, true));
        assert!(is_hidden("created_at", &spec, true));
        assert!(!is_hidden("name", &spec, true));
        let visible = visible_headers(&headers(&BASE_COLUMNS), &spec, true);
        assert_eq!(visible.len(), 6);
    }

    // -- Search and sort --

    #[test]
    fn search_matches_any_header_value() {
        let rows = vec![
            row("a.mp4", json!({ "K #1.sampler": "euler" })),
            row("b.mp4", json!({ "K #1.sampler": "DPM++" })),
        ];
        let hs = build_headers(&rows);
        let found = filter_rows(&rows, &hs, "dpm");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "b.mp4");
        assert_eq!(filter_rows(&rows, &hs, "  ").len(), 2);
    }

    #[test]
    fn search_only_looks_at_given_headers() {
        let rows = vec![row("a.mp4", json!({ "K #1.sampler": "euler" }))];
        assert!(filter_rows(&rows, &headers(&["name"]), "euler").is_empty());
    }

    #[test]
    fn sort_by_size_both_directions() {
        let mut rows = vec![
            ClipDescriptor { size: 20, ..row("b", json!({})) },
            ClipDescriptor { size: 10, ..row("a", json!({})) },
            ClipDescriptor { size: 30, ..row("c", json!({})) },
        ];
        sort_rows(&mut rows, SortKey::Size, SortDirection::Asc);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        sort_rows(&mut rows, SortKey::Size, SortDirection::Desc);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("ctime".parse::<SortKey>().unwrap(), SortKey::Ctime);
        assert!("colour".parse::<SortKey>().is_err());
    }

    // -- Diff --

    #[test]
    fn diff_against_self_is_empty() {
        let a = row("a", json!({ "K #1.seed": 1, "K #1.cfg": null }));
        let hs = build_headers(&[a.clone()]);
        assert!(diff(&a, &a, &hs).is_empty());
    }

    #[test]
    fn diff_detection_is_symmetric() {
        let a = row("a", json!({ "K #1.seed": 1, "K #1.cfg": 7 }));
        let b = row("b", json!({ "K #1.seed": 2, "L #2.lora": "x" }));
        let hs = build_headers(&[a.clone(), b.clone()]);
        let mut ab = diff(&a, &b, &hs);
        let mut ba = diff(&b, &a, &hs);
        ab.sort();
        ba.sort();
        assert_eq!(ab, ba);
        assert!(ab.contains(&"K #1.seed".to_string()));
        assert!(ab.contains(&"K #1.cfg".to_string()));
    }

    #[test]
    fn null_and_missing_compare_equal() {
        let a = row("a", json!({ "K #1.cfg": null }));
        let b = row("a", json!({}));
        let hs = build_headers(&[a.clone(), b.clone()]);
        assert!(!diff(&a, &b, &hs).contains(&"K #1.cfg".to_string()));
    }

    #[test]
    fn diff_view_first_row_is_baseline() {
        let rows = vec![
            row("a", json!({ "K #1.seed": 1 })),
            row("b", json!({ "K #1.seed": 2, "K #1.cfg": 7 })),
            row("c", json!({ "K #1.seed": 2 })),
        ];
        let hs = visible_headers(&build_headers(&rows), &HideSpec::parse("name,file_path"), false);
        let view = diff_view(&rows, &hs);

        assert!(view[0].baseline);
        assert!(view[0].changes.is_empty());

        let second: Vec<(&str, DiffStatus)> = view[1]
            .changes
            .iter()
            .map(|c| (c.key.as_str(), c.status))
            .collect();
        assert_eq!(
            second,
            vec![("K #1.cfg", DiffStatus::Added), ("K #1.seed", DiffStatus::Changed)]
        );

        assert_eq!(view[2].changes.len(), 1);
        assert_eq!(view[2].changes[0].status, DiffStatus::Removed);
        assert_eq!(view[2].changes[0].previous, "7");
    }

    #[test]
    fn diff_follows_display_order() {
        let a = row("a", json!({ "K #1.seed": 1 }));
        let b = row("b", json!({ "K #1.seed": 2 }));
        let c = row("c", json!({ "K #1.seed": 1 }));
        let hs = headers(&["K #1.seed"]);

        let filtered = [&a, &c];
        let view = diff_view(&filtered, &hs);
        assert!(view[1].changes.is_empty());

        let all = [&a, &b, &c];
        let view = diff_view(&all, &hs);
        assert_eq!(view[2].changes.len(), 1);
    }
}
