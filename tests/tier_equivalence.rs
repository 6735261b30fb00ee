//! Native and bytecode tiers must report identical results
//!
//! Every pattern is compiled twice, once with native compilation enabled and
//! once without, and compared at every start offset of every subject.

mod common;

use common::{assert_tiers_agree, native_engine};
use rexvm::{FlagSet, Tier};

const SUBJECTS: &[&str] = &[
    "",
    "a",
    "aaaa",
    "abab",
    "abcabc",
    "aabbaabb",
    "The Quick brown fox",
    "line one\nline two\r\nthree",
    "x1y22z333",
    "foo.bar@example.com",
    "naïve café",
    "ab ba  abba",
];

#[test]
fn literals_and_classes() {
    for pattern in [
        "a",
        "ab",
        "abc",
        "[abc]",
        "[^ab]",
        "[a-z]+",
        "\\d+",
        "\\D\\d",
        "\\w+",
        "\\W",
        "\\s+",
        "\\S+",
        ".",
        ".+",
        "[.@]",
        "é",
        "\\x61",
        "\\u0062",
    ] {
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
    }
}

#[test]
fn quantifiers() {
    for pattern in [
        "a*",
        "a+",
        "a?",
        "a*?",
        "a+?",
        "a??",
        "a{2}",
        "a{2,}",
        "a{1,3}",
        "a{1,3}?",
        "a{0,2}b",
        "(?:ab)*",
        "(?:ab)+?c",
        "(?:a|b)*b",
        "(?:a*)*",
        "(?:a?)+b",
        "(?:a*b*)*c",
        "\\d{2,3}",
        "[a-z]{3,}?",
    ] {
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
    }
}

#[test]
fn captures_and_alternation() {
    for pattern in [
        "(a)",
        "(a)(b)?",
        "(a|ab)(c|bcd)(d*)",
        "(a*)(b*)",
        "(a+?)(a*)",
        "((a)|b)+",
        "(a|(b))*",
        "(?:(a)|(b))*",
        "(\\w+)@(\\w+)\\.(\\w+)",
        "(x\\d)+",
        "(|a)+",
        "a|b|c",
        "ab|a",
        "a|ab",
        "(\\d)(\\d)?",
    ] {
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
    }
}

#[test]
fn assertions() {
    for pattern in [
        "^a",
        "a$",
        "^$",
        "^\\w+",
        "\\w+$",
        "\\bb",
        "\\Bb",
        "\\b\\w+\\b",
        "^line",
        "\\w+$",
    ] {
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
        assert_tiers_agree(pattern, FlagSet::MULTILINE, SUBJECTS);
    }
}

#[test]
fn flags() {
    for pattern in ["the", "[a-c]+", "QUICK", "(b)\\w", "CAFÉ", "\\w+"] {
        assert_tiers_agree(pattern, FlagSet::IGNORE_CASE, SUBJECTS);
    }
    for pattern in ["a", "a+", "\\w+", "(a)b", ""] {
        assert_tiers_agree(pattern, FlagSet::STICKY, SUBJECTS);
        assert_tiers_agree(pattern, FlagSet::STICKY | FlagSet::IGNORE_CASE, SUBJECTS);
    }
    assert_tiers_agree("\\u{1F600}|x", FlagSet::UNICODE, &["x😀", "😀"]);
}

#[test]
fn backreferences() {
    for pattern in ["(a)\\1", "(\\w)\\1", "(a+)b\\1", "(a)|\\1b", "\\1(a)", "(?:(a)|b)\\1"] {
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
        assert_tiers_agree(pattern, FlagSet::IGNORE_CASE, SUBJECTS);
    }
}

#[test]
fn lookahead_patterns_stay_on_bytecode() {
    let engine = native_engine();
    for pattern in ["a(?=b)", "a(?!b)", "(?=(a+))a*b\\1"] {
        let handle = engine.get_or_create(pattern, FlagSet::empty());
        assert_eq!(handle.tier(), Some(Tier::Bytecode));
        assert_tiers_agree(pattern, FlagSet::empty(), SUBJECTS);
    }
}

#[test]
fn compiled_patterns_use_native_tier() {
    let engine = native_engine();
    let handle = engine.get_or_create("(\\w+)@(\\w+)", FlagSet::empty());
    let expected = if cfg!(feature = "jit") {
        Tier::Native
    } else {
        Tier::Bytecode
    };
    assert_eq!(handle.tier(), Some(expected));
}
