//! Verse reference extraction: `<work> <chapter>:<verse>[-<verse>]`.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::ReferenceQuery;

/// Work name: optional leading numeral 1-3, then one to three alphabetic words.
/// ASCII digits only, so every captured number parses as an integer.
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b((?:[1-3]\s?)?[a-z]+(?:\s+[a-z]+){0,2})\s+([0-9]+):([0-9]+)(?:\s*[-–]\s*([0-9]+))?",
    )
    .expect("reference regex is valid")
});

pub struct ReferenceParser;

impl ReferenceParser {
    /// First reference in `text`, if any.
    pub fn parse(text: &str) -> Option<ReferenceQuery> {
        let caps = REFERENCE_RE.captures(text)?;

        let work_name_raw = caps.get(1)?.as_str().trim().to_string();
        let chapter = parse_number(caps.get(2)?.as_str());
        let verse_start = parse_number(caps.get(3)?.as_str());
        let verse_end = caps
            .get(4)
            .map(|m| parse_number(m.as_str()))
            .unwrap_or(verse_start);

        let (verse_start, verse_end) = if verse_end < verse_start {
            (verse_end, verse_start)
        } else {
            (verse_start, verse_end)
        };

        Some(ReferenceQuery {
            work_name_raw,
            chapter,
            verse_start,
            verse_end,
        })
    }

    /// Whether `text` contains anything shaped like a reference.
    pub fn matches(text: &str) -> bool {
        REFERENCE_RE.is_match(text)
    }
}

/// Digit strings too large for `u32` saturate; the lookup then finds nothing.
fn parse_number(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}
