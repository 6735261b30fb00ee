//! Contract-level properties of the engine
//!
//! Each test exercises one observable guarantee of the public API.

mod common;

use std::sync::Arc;

use common::{assert_tiers_agree, bytecode_engine, exec_all_starts, native_engine};
use rexvm::syntax::{MAX_CAPTURES, MAX_NESTING};
use rexvm::{substitute, Engine, FlagSet, ParseError};

#[test]
fn tier_equivalence_on_compilable_patterns() {
    let subjects = ["", "a", "abc", "aaab", "xyz abc", "ab\ncd", "ABC abc"];
    for pattern in ["abc", "a+b", "(a|b)*c", "^a", "c$", "\\bab", "a*?", "[a-c]{2}"] {
        assert_tiers_agree(pattern, FlagSet::empty(), &subjects);
        assert_tiers_agree(pattern, FlagSet::IGNORE_CASE | FlagSet::MULTILINE, &subjects);
    }
}

#[test]
fn cache_identity_while_referenced() {
    let engine = Engine::new();
    let first = engine.get_or_create("x+y", FlagSet::MULTILINE);
    let second = engine.get_or_create("x+y", FlagSet::MULTILINE);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn cache_entry_removed_after_release() {
    let engine = Engine::new();
    let first = engine.get_or_create("x+y", FlagSet::empty());
    drop(first);
    assert_eq!(engine.cache_len(), 0);

    let rebuilt = engine.get_or_create("x+y", FlagSet::empty());
    assert_eq!(engine.cache_stats().misses, 2);
    assert!(rebuilt.is_match("xxy"));
}

#[test]
fn flag_round_trip_for_every_value() {
    for bits in 0..=FlagSet::all().bits() {
        let flags = FlagSet::from_bits_truncate(bits);
        assert_eq!(FlagSet::from_flag_str(&flags.to_flag_string()), flags);
        assert_eq!(flags.to_flag_string().parse::<FlagSet>(), Ok(flags));
    }
}

#[test]
fn substitution_literal_dollar() {
    assert_eq!(substitute("X", "XYZ", 0, &[] as &[&str], "a$$b"), "a$b");
}

#[test]
fn substitution_match_prefix_suffix() {
    assert_eq!(
        substitute("oo", "foobar", 1, &[] as &[&str], "[$`|$&|$']"),
        "[f|oo|bar]"
    );
}

#[test]
fn substitution_group_bounds() {
    assert_eq!(substitute("m", "input", 0, &["X"], "$1$2"), "X$2");
}

#[test]
fn substitution_two_digit_groups() {
    assert_eq!(substitute("m", "input", 0, &["A"], "$12"), "A2");

    let twelve: Vec<String> = ('A'..='L').map(String::from).collect();
    assert_eq!(substitute("m", "input", 0, &twelve, "$12"), "L");
    assert_eq!(substitute("m", "input", 0, &twelve, "$13"), "A3");
}

#[test]
fn invalid_pattern_never_matches() {
    for engine in [native_engine(), bytecode_engine()] {
        for pattern in ["(a", "a)", "[b-a]", "a{3,1}", "*", "\\2(a)"] {
            let handle = engine.get_or_create(pattern, FlagSet::empty());
            assert!(!handle.is_valid(), "/{}/ should be invalid", pattern);
            assert_eq!(handle.subpattern_count(), 0);
            for subject in ["", "a", pattern, "aaa)"] {
                assert!(
                    exec_all_starts(&handle, subject).iter().all(Option::is_none),
                    "/{}/ matched {:?}",
                    pattern,
                    subject
                );
            }
            assert_eq!(handle.replace("abc", "X"), "abc");
        }
    }
}

fn assert_rejected(pattern: &str, expected: impl Fn(&ParseError) -> bool) {
    for engine in [native_engine(), bytecode_engine()] {
        let handle = engine.get_or_create(pattern, FlagSet::empty());
        assert!(!handle.is_valid());
        let err = handle.parse_error().expect("invalid handle keeps its error");
        assert!(expected(err), "unexpected error {:?}", err);
        for subject in ["", "a", "b", "ab"] {
            assert!(exec_all_starts(&handle, subject).iter().all(Option::is_none));
        }
        assert!(engine.try_get_or_create(pattern, FlagSet::empty()).is_err());
    }
}

#[test]
fn saturated_size_through_alternation_is_invalid() {
    let pattern = format!("{}a{}|b", "(?:".repeat(7), "){1000}".repeat(7));
    assert_rejected(&pattern, |err| *err == ParseError::PatternTooLarge);
}

#[test]
fn deep_nesting_is_invalid() {
    let depth = 1000;
    let groups = format!("{}a{}", "(?:".repeat(depth), ")".repeat(depth));
    assert_rejected(&groups, |err| matches!(err, ParseError::NestingTooDeep { .. }));

    let captures = format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
    assert_rejected(&captures, |err| matches!(err, ParseError::NestingTooDeep { .. }));

    let lookaheads = format!("{}a{}", "(?!".repeat(depth), ")".repeat(depth));
    assert_rejected(&lookaheads, |err| matches!(err, ParseError::NestingTooDeep { .. }));
}

#[test]
fn nesting_at_the_limit_still_matches() {
    let pattern = format!("{}a{}", "(?:".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
    assert_tiers_agree(&pattern, FlagSet::empty(), &["", "a", "ba"]);
    let engine = bytecode_engine();
    assert!(engine.get_or_create(&pattern, FlagSet::empty()).is_match("xa"));
}

#[test]
fn too_many_captures_is_invalid() {
    let pattern = "()".repeat(MAX_CAPTURES as usize + 1);
    assert_rejected(&pattern, |err| *err == ParseError::TooManyCaptures);
}
