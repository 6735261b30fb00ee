//! Character classes and character predicates shared by both tiers.

const CP_LS: u32 = 0x2028;
const CP_PS: u32 = 0x2029;
const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Inclusive ranges matched by `\s`
const SPACE_RANGES: &[(u32, u32)] = &[
    (0x0009, 0x000D),
    (0x0020, 0x0020),
    (0x00A0, 0x00A0),
    (0x1680, 0x1680),
    (0x2000, 0x200A),
    (0x2028, 0x2029),
    (0x202F, 0x202F),
    (0x205F, 0x205F),
    (0x3000, 0x3000),
    (0xFEFF, 0xFEFF),
];

const DIGIT_RANGES: &[(u32, u32)] = &[(0x30, 0x39)];

const WORD_RANGES: &[(u32, u32)] = &[(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)];

/// `\n`, `\r`, U+2028 and U+2029
#[inline]
pub fn is_line_terminator(c: char) -> bool {
    let c = c as u32;
    c == '\n' as u32 || c == '\r' as u32 || c == CP_LS || c == CP_PS
}

/// ASCII word characters `[0-9A-Za-z_]`
#[inline]
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Simple case folding used for ignoreCase comparisons.
///
/// Characters whose lowercase form is not a single character fold to
/// themselves.
#[inline]
pub fn canonicalize(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn uppercase_single(c: char) -> Option<char> {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if u != c => Some(u),
        _ => None,
    }
}

/// A set of code point ranges, optionally negated.
///
/// Ranges are inclusive, sorted and non-overlapping after
/// [`CharClass::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CharClass {
    ranges: Vec<(u32, u32)>,
    negated: bool,
}

impl CharClass {
    pub fn new() -> Self {
        Self::default()
    }

    /// `\d`
    pub fn digit() -> Self {
        Self::from_ranges(DIGIT_RANGES)
    }

    /// `\w`
    pub fn word() -> Self {
        Self::from_ranges(WORD_RANGES)
    }

    /// `\s`
    pub fn space() -> Self {
        Self::from_ranges(SPACE_RANGES)
    }

    fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        CharClass {
            ranges: ranges.to_vec(),
            negated: false,
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.ranges.push((c as u32, c as u32));
    }

    pub fn push_range(&mut self, start: char, end: char) {
        self.ranges.push((start as u32, end as u32));
    }

    /// Add every code point matched by `other` (honoring its negation).
    pub fn push_class(&mut self, other: &CharClass) {
        if other.negated {
            self.ranges.extend(other.complement_ranges());
        } else {
            self.ranges.extend_from_slice(&other.ranges);
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    /// Sort and merge ranges
    pub fn normalize(mut self) -> Self {
        self.ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.ranges.len());
        for (start, end) in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(last) if start <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        self.ranges = merged;
        self
    }

    fn complement_ranges(&self) -> Vec<(u32, u32)> {
        let normalized = CharClass::from_ranges(&self.ranges).normalize();
        let mut out = Vec::with_capacity(normalized.ranges.len() + 1);
        let mut next = 0u32;
        for &(start, end) in &normalized.ranges {
            if start > next {
                out.push((next, start - 1));
            }
            next = end.saturating_add(1);
        }
        if next <= MAX_CODE_POINT {
            out.push((next, MAX_CODE_POINT));
        }
        out
    }

    fn contains_code_point(&self, c: u32) -> bool {
        self.ranges
            .binary_search_by(|&(start, end)| {
                if end < c {
                    std::cmp::Ordering::Less
                } else if start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Test membership of `c`. Requires a normalized class.
    pub fn matches(&self, c: char, ignore_case: bool) -> bool {
        let mut hit = self.contains_code_point(c as u32);
        if !hit && ignore_case {
            let folded = canonicalize(c);
            hit = (folded != c && self.contains_code_point(folded as u32))
                || uppercase_single(c).is_some_and(|u| self.contains_code_point(u as u32));
        }
        hit != self.negated
    }
}
