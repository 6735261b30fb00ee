//! Unit tests for the engine, its cache and handles.

use std::sync::Arc;

use super::*;
use crate::backend::hybrid::Tier;

fn bytecode_engine(policy: CachePolicy) -> Engine {
    Engine::with_config(EngineConfig {
        jit_enabled: false,
        cache_policy: policy,
        ..EngineConfig::default()
    })
}

// ========================================================================
// Cache identity
// ========================================================================

#[test]
fn test_same_key_returns_same_handle() {
    let engine = Engine::new();
    let a = engine.get_or_create("a+", FlagSet::empty());
    let b = engine.get_or_create("a+", FlagSet::empty());
    assert!(Arc::ptr_eq(&a, &b));
    let stats = engine.cache_stats();
    assert_eq!((stats.hits, stats.misses, stats.insertions), (1, 1, 1));
}

#[test]
fn test_flags_are_part_of_the_key() {
    let engine = Engine::new();
    let plain = engine.get_or_create("a", FlagSet::empty());
    let folded = engine.get_or_create("a", FlagSet::IGNORE_CASE);
    assert!(!Arc::ptr_eq(&plain, &folded));
    assert!(folded.is_match("A"));
    assert!(!plain.is_match("A"));
    assert_eq!(engine.cache_len(), 2);
}

#[test]
fn test_dropped_handle_removes_entry() {
    let engine = Engine::new();
    let first = engine.get_or_create("x|y", FlagSet::empty());
    assert_eq!(engine.cache_len(), 1);

    drop(first);
    assert_eq!(engine.cache_len(), 0);
    assert_eq!(engine.cache_stats().removals, 1);

    let second = engine.get_or_create("x|y", FlagSet::empty());
    assert_eq!(engine.cache_stats().misses, 2);
    assert_eq!(second.pattern(), "x|y");
}

#[test]
fn test_lru_retains_recent_handles() {
    let engine = bytecode_engine(CachePolicy::Lru { capacity: 2 });
    let a = Arc::as_ptr(&engine.get_or_create("a", FlagSet::empty()));
    engine.get_or_create("b", FlagSet::empty());
    // Both still alive through retention
    assert_eq!(engine.cache_len(), 2);
    let again = engine.get_or_create("a", FlagSet::empty());
    assert_eq!(Arc::as_ptr(&again), a);
    drop(again);

    // "b" is least recently used and gets evicted
    engine.get_or_create("c", FlagSet::empty());
    let stats = engine.cache_stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(engine.cache_len(), 2);
}

#[test]
fn test_clear_cache_keeps_outstanding_handles_valid() {
    let engine = bytecode_engine(CachePolicy::Lru { capacity: 4 });
    let held = engine.get_or_create("h(i)", FlagSet::empty());
    engine.get_or_create("other", FlagSet::empty());
    engine.clear_cache();
    assert_eq!(engine.cache_len(), 0);

    assert!(held.is_match("hi"));
    let rebuilt = engine.get_or_create("h(i)", FlagSet::empty());
    assert!(!Arc::ptr_eq(&held, &rebuilt));
}

#[test]
fn test_handle_outlives_engine() {
    let handle = {
        let engine = Engine::new();
        engine.get_or_create("a(b)", FlagSet::empty())
    };
    assert_eq!(handle.find("xab").map(|m| m.range()), Some(1..3));
    drop(handle);
}

// ========================================================================
// Invalid patterns
// ========================================================================

#[test]
fn test_invalid_pattern_is_cached_and_never_matches() {
    let engine = Engine::new();
    let handle = engine.get_or_create("(a", FlagSet::empty());
    assert!(!handle.is_valid());
    assert_eq!(handle.subpattern_count(), 0);
    assert_eq!(handle.tier(), None);
    assert!(!handle.is_match(""));
    assert!(!handle.is_match("(a"));

    let mut buffer = CaptureBuffer::new(3);
    buffer.reset();
    assert!(!handle.exec_at(&['a'], 0, &mut buffer));
    assert_eq!(buffer.slots(), &[None, None]);

    let again = engine.get_or_create("(a", FlagSet::empty());
    assert!(Arc::ptr_eq(&handle, &again));
}

#[test]
fn test_try_get_or_create_reports_error() {
    let engine = Engine::new();
    let err = engine.try_get_or_create("a{2,1}", FlagSet::empty()).unwrap_err();
    assert!(matches!(err, ParseError::InvalidQuantifier { .. }));
    assert!(engine.try_get_or_create("a{1,2}", FlagSet::empty()).is_ok());
}

// ========================================================================
// Match API
// ========================================================================

#[test]
fn test_exec_at_resizes_buffer() {
    let engine = Engine::new();
    let handle = engine.get_or_create("(a)(b)?", FlagSet::empty());
    let mut buffer = CaptureBuffer::new(0);
    let chars: Vec<char> = "xa".chars().collect();
    assert!(handle.exec_at(&chars, 0, &mut buffer));
    assert_eq!(buffer.slots().len(), 6);
    assert_eq!(buffer.group(0), Some((1, 2)));
    assert_eq!(buffer.group(1), Some((1, 2)));
    assert_eq!(buffer.group(2), None);
}

#[test]
fn test_match_groups_with_multibyte_text() {
    let engine = Engine::new();
    let handle = engine.get_or_create("é(\\w)", FlagSet::empty());
    let m = handle.find("caféx").expect("match");
    assert_eq!(m.range(), 3..5);
    assert_eq!(m.as_str(), "éx");
    assert_eq!(m.group(1), Some("x"));
    assert_eq!(m.group_range(1), Some(4..5));
    assert_eq!(m.len(), 2);
}

#[test]
fn test_find_iter_advances_past_empty_matches() {
    let engine = Engine::new();
    let handle = engine.get_or_create("a*", FlagSet::empty());
    let ranges: Vec<_> = handle.find_iter("baab").map(|m| m.range()).collect();
    assert_eq!(ranges, vec![0..0, 1..3, 3..3, 4..4]);
}

#[test]
fn test_replace_first_and_global() {
    let engine = Engine::new();
    let first = engine.get_or_create("(\\d+)", FlagSet::empty());
    assert_eq!(first.replace("a1b22", "<$1>"), "a<1>b22");
    assert_eq!(first.replace_all("a1b22", "<$1>"), "a<1>b<22>");

    let global = engine.get_or_create("(\\d+)", FlagSet::GLOBAL);
    assert_eq!(global.replace("a1b22", "[$&]"), "a[1]b[22]");
}

#[test]
fn test_replace_unset_group_is_empty() {
    let engine = Engine::new();
    let handle = engine.get_or_create("(x)?y", FlagSet::empty());
    assert_eq!(handle.replace("ay", "<$1>"), "a<>");
}

#[test]
fn test_no_match_replace_is_identity() {
    let engine = Engine::new();
    let handle = engine.get_or_create("z", FlagSet::GLOBAL);
    assert_eq!(handle.replace("abc", "$&$&"), "abc");
}

#[test]
fn test_disassemble_and_tier() {
    let engine = bytecode_engine(CachePolicy::Weak);
    let handle = engine.get_or_create("ab", FlagSet::empty());
    assert_eq!(handle.tier(), Some(Tier::Bytecode));
    let listing = handle.disassemble().expect("valid pattern");
    assert!(listing.contains("char 'a'"));
    assert!(listing.contains("match"));
}
