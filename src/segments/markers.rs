//! Marker-delimited segments
//!
//! Start and end delimiters are only recognized inside a comment wrapper:
//! `// D`, `# D`, `/* D */`, `<!-- D -->`, `""" D """` or `''' D '''`, with
//! any whitespace (newlines included for the block forms) between the opener
//! and the delimiter. A bare delimiter in code or prose is not a marker.
//!
//! Pairs are matched with one stack per delimiter pair: a start pushes, the
//! next end of the same pair pops the nearest pending start. An end with
//! nothing pending is ignored, and a start still pending at end of input
//! produces no segment (protection is never extended to end-of-file).

use crate::policy::MarkerRule;
use crate::segments::{Segment, SegmentKind};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Build the regex recognizing `delimiter` inside any supported comment wrapper
pub fn wrapped_delimiter(delimiter: &str) -> Result<Regex, regex::Error> {
    let mut d = regex::escape(delimiter);
    if delimiter
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        d.push_str(r"\b");
    }

    Regex::new(&format!(
        concat!(
            r"//[ \t]*{d}",
            r"|#[ \t]*{d}",
            r"|/\*\s*{d}(?:\s*\*/)?",
            r"|<!--\s*{d}(?:\s*-->)?",
            r#"|"""\s*{d}(?:\s*""")?"#,
            r"|'''\s*{d}(?:\s*''')?",
        ),
        d = d
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Start,
    End,
    /// Start and end delimiters are the same string
    Toggle,
}

#[derive(Debug)]
struct Occurrence {
    start: usize,
    end: usize,
    pair: usize,
    delimiter: Delimiter,
}

/// A distinct start/end pair and the rules that share it
struct MarkerPair<'a> {
    start: Regex,
    end: Option<Regex>,
    rules: Vec<(usize, &'a MarkerRule)>,
}

/// Find marker-delimited segments in content
pub fn find_marker_segments(content: &str, markers: &[MarkerRule]) -> Vec<Segment> {
    let pairs = group_pairs(markers);
    let mut occurrences = Vec::new();

    for (pair_idx, pair) in pairs.iter().enumerate() {
        let start_kind = if pair.end.is_none() {
            Delimiter::Toggle
        } else {
            Delimiter::Start
        };
        for m in pair.start.find_iter(content) {
            occurrences.push(Occurrence {
                start: m.start(),
                end: m.end(),
                pair: pair_idx,
                delimiter: start_kind,
            });
        }
        if let Some(end) = &pair.end {
            for m in end.find_iter(content) {
                occurrences.push(Occurrence {
                    start: m.start(),
                    end: m.end(),
                    pair: pair_idx,
                    delimiter: Delimiter::End,
                });
            }
        }
    }

    // Left to right; at equal offsets the longer delimiter wins
    occurrences.sort_by_key(|o| (o.start, Reverse(o.end)));

    let mut pending: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut segments = Vec::new();
    let mut cursor = 0;

    for occ in occurrences {
        if occ.start < cursor {
            continue;
        }
        cursor = occ.end;

        let stack = pending.entry(occ.pair).or_default();
        let opened_at = match occ.delimiter {
            Delimiter::Start => {
                stack.push(occ.start);
                None
            }
            Delimiter::End => stack.pop(),
            Delimiter::Toggle => match stack.pop() {
                Some(s) => Some(s),
                None => {
                    stack.push(occ.start);
                    None
                }
            },
        };

        if let Some(start) = opened_at {
            for (index, rule) in &pairs[occ.pair].rules {
                segments.push(Segment {
                    start,
                    end: occ.end,
                    kind: SegmentKind::Marker,
                    rule_index: *index,
                    gate: rule.gate.clone(),
                    source: rule.source.clone(),
                });
            }
        }
    }

    segments.sort_by_key(|s| (s.start, s.end));
    segments
}

fn group_pairs(markers: &[MarkerRule]) -> Vec<MarkerPair<'_>> {
    let mut pairs: Vec<MarkerPair<'_>> = Vec::new();
    let mut by_identity: HashMap<(&str, &str), usize> = HashMap::new();

    for (index, rule) in markers.iter().enumerate() {
        if let Some(&existing) = by_identity.get(&(rule.start.as_str(), rule.end.as_str())) {
            pairs[existing].rules.push((index, rule));
            continue;
        }
        let end = (rule.end != rule.start).then(|| rule.end_pattern.clone());
        by_identity.insert((rule.start.as_str(), rule.end.as_str()), pairs.len());
        pairs.push(MarkerPair {
            start: rule.start_pattern.clone(),
            end,
            rules: vec![(index, rule)],
        });
    }

    pairs
}
