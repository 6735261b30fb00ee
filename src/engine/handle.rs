//! Regex handles and match results.

use std::ops::Range;
use std::sync::Weak;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::debug;

use super::cache::{PatternCache, PatternKey};
use crate::backend::hybrid::{HybridConfig, HybridMatcher, MatchStats, Tier};
use crate::flags::FlagSet;
use crate::substitution::substitute;
use crate::syntax::{parse, ParseError};

/// A compiled pattern
///
/// Built once per `(pattern, flags)` by [`super::Engine`] and shared through
/// `Arc`. A handle whose pattern failed to parse is still a handle: it never
/// matches and reports the error through [`RegexHandle::parse_error`].
pub struct RegexHandle {
    key: PatternKey,
    subpattern_count: u32,
    compiled: Result<HybridMatcher, ParseError>,
    cache_backref: Weak<Mutex<PatternCache>>,
}

impl RegexHandle {
    /// Parse and compile a pattern outside of any cache
    pub fn new(pattern: &str, flags: FlagSet, config: HybridConfig) -> Self {
        Self::build(PatternKey::new(pattern, flags), config, Weak::new())
    }

    pub(super) fn build(
        key: PatternKey,
        config: HybridConfig,
        cache_backref: Weak<Mutex<PatternCache>>,
    ) -> Self {
        let name = format!("/{}/{}", key.pattern, key.flags);
        let compiled = match parse(&key.pattern, key.flags.to_syntax_flags()) {
            Ok(parsed) => {
                let matcher = HybridMatcher::with_config(name, parsed, config);
                debug!(
                    target: "rexvm::engine",
                    pattern = %key.pattern,
                    flags = %key.flags,
                    groups = matcher.capture_count(),
                    tier = %matcher.tier(),
                    "Built regex handle"
                );
                Ok(matcher)
            }
            Err(err) => {
                debug!(
                    target: "rexvm::engine",
                    pattern = %key.pattern,
                    flags = %key.flags,
                    error = %err,
                    "Pattern failed to parse"
                );
                Err(err)
            }
        };
        let subpattern_count = compiled.as_ref().map_or(0, HybridMatcher::capture_count);
        Self {
            key,
            subpattern_count,
            compiled,
            cache_backref,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.key.pattern
    }

    pub fn flags(&self) -> FlagSet {
        self.key.flags
    }

    pub fn key(&self) -> &PatternKey {
        &self.key
    }

    /// Number of capture groups, excluding the whole match
    pub fn subpattern_count(&self) -> u32 {
        self.subpattern_count
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.compiled.as_ref().err()
    }

    /// Tier tried first, `None` for an invalid pattern
    pub fn tier(&self) -> Option<Tier> {
        self.compiled.as_ref().ok().map(HybridMatcher::tier)
    }

    pub fn stats(&self) -> Option<MatchStats> {
        self.compiled.as_ref().ok().map(HybridMatcher::stats)
    }

    /// Bytecode listing, building the program if needed
    pub fn disassemble(&self) -> Option<String> {
        let matcher = self.compiled.as_ref().ok()?;
        matcher.program().map(|program| program.disassemble())
    }

    /// A buffer sized for this handle
    pub fn capture_buffer(&self) -> CaptureBuffer {
        CaptureBuffer::new(self.subpattern_count)
    }

    /// Search `subject` from character index `start`
    ///
    /// The buffer is resized to `2 * (subpattern_count + 1)` slots if needed
    /// and overwritten; after a failed search every slot is unset.
    pub fn exec_at(&self, subject: &[char], start: usize, buffer: &mut CaptureBuffer) -> bool {
        buffer.fit(self.subpattern_count);
        match &self.compiled {
            Ok(matcher) => matcher.exec(subject, start, &mut buffer.slots),
            Err(_) => {
                buffer.reset();
                false
            }
        }
    }

    /// First match at or after character index `start`
    pub fn find_at<'s>(&self, subject: &'s str, start: usize) -> Option<Match<'s>> {
        let subject = Subject::new(subject);
        let mut buffer = self.capture_buffer();
        self.exec_at(&subject.chars, start, &mut buffer)
            .then(|| Match::new(&subject, &buffer))
    }

    pub fn find<'s>(&self, subject: &'s str) -> Option<Match<'s>> {
        self.find_at(subject, 0)
    }

    pub fn is_match(&self, subject: &str) -> bool {
        let chars: Vec<char> = subject.chars().collect();
        let mut buffer = self.capture_buffer();
        self.exec_at(&chars, 0, &mut buffer)
    }

    /// Successive matches; an empty match advances the search by one position
    pub fn find_iter<'h, 's>(&'h self, subject: &'s str) -> FindIter<'h, 's> {
        FindIter {
            handle: self,
            subject: Subject::new(subject),
            buffer: self.capture_buffer(),
            next: 0,
            done: false,
        }
    }

    /// Replace the first match, or every match when the `g` flag is set
    pub fn replace(&self, subject: &str, template: &str) -> String {
        if self.flags().global() {
            self.replace_all(subject, template)
        } else {
            self.replace_matches(subject, template, self.find(subject).into_iter())
        }
    }

    /// Replace every match
    pub fn replace_all(&self, subject: &str, template: &str) -> String {
        self.replace_matches(subject, template, self.find_iter(subject))
    }

    fn replace_matches<'s>(
        &self,
        subject: &'s str,
        template: &str,
        matches: impl Iterator<Item = Match<'s>>,
    ) -> String {
        let mut out = String::with_capacity(subject.len());
        let mut last = 0;
        for m in matches {
            let bytes = m.byte_range();
            out.push_str(&subject[last..bytes.start]);
            let captures = m.captures_or_empty();
            out.push_str(&substitute(m.as_str(), subject, m.start(), captures.as_slice(), template));
            last = bytes.end;
        }
        out.push_str(&subject[last..]);
        out
    }
}

impl Drop for RegexHandle {
    fn drop(&mut self) {
        if let Some(table) = self.cache_backref.upgrade() {
            table.lock().remove_if_same(&self.key, self as *const RegexHandle);
        }
    }
}

impl std::fmt::Debug for RegexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexHandle")
            .field("pattern", &self.key.pattern)
            .field("flags", &self.key.flags.to_flag_string())
            .field("subpattern_count", &self.subpattern_count)
            .field("valid", &self.is_valid())
            .field("tier", &self.tier())
            .finish()
    }
}

/// Caller-owned capture offsets
///
/// Slot `2i` / `2i + 1` hold the start / end of group `i` (group 0 is the
/// whole match). Every search overwrites the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBuffer {
    slots: Vec<Option<usize>>,
}

impl CaptureBuffer {
    pub fn new(subpattern_count: u32) -> Self {
        Self {
            slots: vec![None; 2 * (subpattern_count as usize + 1)],
        }
    }

    fn fit(&mut self, subpattern_count: u32) {
        let len = 2 * (subpattern_count as usize + 1);
        if self.slots.len() != len {
            self.slots.resize(len, None);
        }
    }

    pub fn reset(&mut self) {
        self.slots.fill(None);
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Number of groups including group 0
    pub fn group_count(&self) -> usize {
        self.slots.len() / 2
    }

    /// `[start, end)` of group `index`, if it participated
    pub fn group(&self, index: usize) -> Option<(usize, usize)> {
        match (self.slots.get(2 * index)?, self.slots.get(2 * index + 1)?) {
            (Some(start), Some(end)) => Some((*start, *end)),
            _ => None,
        }
    }
}

/// Subject text with its characters and their byte offsets
struct Subject<'s> {
    text: &'s str,
    chars: Vec<char>,
    /// Byte offset of each character, plus the text length
    offsets: Vec<usize>,
}

impl<'s> Subject<'s> {
    fn new(text: &'s str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (offset, c) in text.char_indices() {
            chars.push(c);
            offsets.push(offset);
        }
        offsets.push(text.len());
        Self {
            text,
            chars,
            offsets,
        }
    }
}

/// One match in a `&str` subject
///
/// Ranges are character indices; [`Match::byte_range`] converts group 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'s> {
    text: &'s str,
    groups: SmallVec<[Option<Range<usize>>; 4]>,
    bytes: SmallVec<[Option<Range<usize>>; 4]>,
}

impl<'s> Match<'s> {
    fn new(subject: &Subject<'s>, buffer: &CaptureBuffer) -> Self {
        let count = buffer.group_count();
        let mut groups = SmallVec::with_capacity(count);
        let mut bytes = SmallVec::with_capacity(count);
        for index in 0..count {
            match buffer.group(index) {
                Some((start, end)) => {
                    groups.push(Some(start..end));
                    bytes.push(Some(subject.offsets[start]..subject.offsets[end]));
                }
                None => {
                    groups.push(None);
                    bytes.push(None);
                }
            }
        }
        Self {
            text: subject.text,
            groups,
            bytes,
        }
    }

    pub fn start(&self) -> usize {
        self.range().start
    }

    pub fn end(&self) -> usize {
        self.range().end
    }

    /// Character range of the whole match
    pub fn range(&self) -> Range<usize> {
        self.groups.first().cloned().flatten().unwrap_or(0..0)
    }

    /// Byte range of the whole match
    pub fn byte_range(&self) -> Range<usize> {
        self.bytes.first().cloned().flatten().unwrap_or(0..0)
    }

    pub fn as_str(&self) -> &'s str {
        &self.text[self.byte_range()]
    }

    /// Number of groups including group 0
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_empty()
    }

    /// Text of group `index`, if it participated
    pub fn group(&self, index: usize) -> Option<&'s str> {
        let range = self.bytes.get(index)?.clone()?;
        Some(&self.text[range])
    }

    /// Character range of group `index`, if it participated
    pub fn group_range(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index)?.clone()
    }

    /// Groups 1.. with non-participating groups as empty strings
    pub fn captures_or_empty(&self) -> Vec<&'s str> {
        (1..self.len())
            .map(|index| self.group(index).unwrap_or(""))
            .collect()
    }
}

/// Iterator over successive matches, see [`RegexHandle::find_iter`]
pub struct FindIter<'h, 's> {
    handle: &'h RegexHandle,
    subject: Subject<'s>,
    buffer: CaptureBuffer,
    next: usize,
    done: bool,
}

impl<'h, 's> Iterator for FindIter<'h, 's> {
    type Item = Match<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next > self.subject.chars.len() {
            self.done = true;
            return None;
        }
        if !self
            .handle
            .exec_at(&self.subject.chars, self.next, &mut self.buffer)
        {
            self.done = true;
            return None;
        }
        let (start, end) = self.buffer.group(0)?;
        self.next = if end == start { end + 1 } else { end };
        Some(Match::new(&self.subject, &self.buffer))
    }
}
