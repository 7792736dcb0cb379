//! Placeholder substitution

use crate::segments::Segment;

/// Text substituted for every protected range
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

/// Replace each segment's byte range with [`REDACTED_PLACEHOLDER`].
///
/// The newlines inside a replaced range are kept after the placeholder so that
/// line numbers and offset/limit slicing stay valid. Overlapping and adjacent
/// ranges collapse into one placeholder.
pub fn redact_content(content: &str, segments: &[Segment]) -> String {
    redact_ranges(content, segments.iter().map(|s| (s.start, s.end)))
}

/// [`redact_content`] over bare `(start, end)` byte ranges
pub fn redact_ranges(content: &str, ranges: impl IntoIterator<Item = (usize, usize)>) -> String {
    let mut ranges: Vec<(usize, usize)> = ranges
        .into_iter()
        .map(|(start, end)| (start.min(content.len()), end.min(content.len())))
        .filter(|(start, end)| start < end)
        .collect();
    if ranges.is_empty() {
        return content.to_string();
    }
    ranges.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (start, end) in merged {
        let (Some(before), Some(hidden)) = (content.get(cursor..start), content.get(start..end))
        else {
            continue;
        };
        out.push_str(before);
        out.push_str(REDACTED_PLACEHOLDER);
        out.extend(hidden.chars().filter(|&c| c == '\n'));
        cursor = end;
    }
    out.push_str(content.get(cursor..).unwrap_or_default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RoleGate;
    use crate::segments::SegmentKind;
    use std::sync::Arc;

    fn seg(start: usize, end: usize) -> Segment {
        Segment {
            start,
            end,
            kind: SegmentKind::Marker,
            rule_index: 0,
            gate: RoleGate::new(vec![], vec![]),
            source: Arc::from("test"),
        }
    }

    #[test]
    fn test_identity_without_segments() {
        let content = "line one\nline two\n";
        assert_eq!(redact_content(content, &[]), content);
    }

    #[test]
    fn test_newline_count_preserved() {
        let content = "a\nb\nc\nd\n";
        let redacted = redact_content(content, &[seg(2, 6)]);
        assert_eq!(redacted, "a\n[REDACTED]\n\nd\n");
        assert_eq!(redacted.lines().count(), content.lines().count());
    }

    #[test]
    fn test_overlapping_segments_merge() {
        let content = "0123456789";
        assert_eq!(redact_content(content, &[seg(2, 6), seg(4, 8)]), "01[REDACTED]89");
        assert_eq!(redact_content(content, &[seg(2, 4), seg(4, 6)]), "01[REDACTED]6789");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(redact_content("abc", &[seg(1, 99)]), "a[REDACTED]");
    }
}
