//! Unit tests for the backtracking VM.

use crate::backend::bytecode::{compile, Opcode, Program, ProgramBuilder};
use crate::syntax::{parse, SyntaxFlags};

use super::{BacktrackVM, VmConfig};

fn program(pattern: &str, flags: SyntaxFlags) -> Program {
    let parsed = parse(pattern, flags).expect("pattern should parse");
    compile("test", &parsed).expect("compilation should succeed")
}

/// Run and return the capture slots, or `None` when nothing matched
fn run_flags(pattern: &str, flags: SyntaxFlags, input: &str, start: usize) -> Option<Vec<Option<usize>>> {
    let program = program(pattern, flags);
    let chars: Vec<char> = input.chars().collect();
    let mut slots = vec![None; program.slot_count()];
    let matched = BacktrackVM::new(&program).exec(&chars, start, &mut slots);
    matched.then_some(slots)
}

fn run(pattern: &str, input: &str) -> Option<Vec<Option<usize>>> {
    run_flags(pattern, SyntaxFlags::empty(), input, 0)
}

/// Whole-match range
fn span(pattern: &str, input: &str) -> Option<(usize, usize)> {
    run(pattern, input).map(|slots| (slots[0].unwrap_or(0), slots[1].unwrap_or(0)))
}

// ========================================================================
// Basic matching
// ========================================================================

#[test]
fn test_literal_leftmost() {
    assert_eq!(span("b", "abcb"), Some((1, 2)));
    assert_eq!(span("x", "abc"), None);
}

#[test]
fn test_empty_pattern_matches_empty_subject() {
    assert_eq!(span("", ""), Some((0, 0)));
    assert_eq!(span("a*", ""), Some((0, 0)));
}

#[test]
fn test_start_offset() {
    let slots = run_flags("a", SyntaxFlags::empty(), "aXa", 1).expect("match");
    assert_eq!(slots[0], Some(2));
    assert!(run_flags("a", SyntaxFlags::empty(), "aaa", 4).is_none());
}

#[test]
fn test_dot_excludes_line_terminators() {
    assert_eq!(span("a.c", "a\nc abc"), Some((4, 7)));
}

// ========================================================================
// Quantifiers and alternation
// ========================================================================

#[test]
fn test_greedy_vs_lazy() {
    assert_eq!(span("a+", "aaa"), Some((0, 3)));
    assert_eq!(span("a+?", "aaa"), Some((0, 1)));
    assert_eq!(span("a{2,3}", "aaaa"), Some((0, 3)));
    assert_eq!(span("a{2,3}?", "aaaa"), Some((0, 2)));
    assert_eq!(span("<.*>", "<a><b>"), Some((0, 6)));
    assert_eq!(span("<.*?>", "<a><b>"), Some((0, 3)));
}

#[test]
fn test_alternation_is_ordered() {
    assert_eq!(span("a|ab", "ab"), Some((0, 1)));
    assert_eq!(span("ab|a", "ab"), Some((0, 2)));
}

#[test]
fn test_captures_reset_each_iteration() {
    // ECMAScript: /(z)((a+)?(b+)?(c))*/ on "zaacbbbcac"
    let slots = run("(z)((a+)?(b+)?(c))*", "zaacbbbcac").expect("match");
    assert_eq!((slots[0], slots[1]), (Some(0), Some(10)));
    assert_eq!((slots[6], slots[7]), (Some(8), Some(9)), "group 3 is 'a'");
    assert_eq!((slots[8], slots[9]), (None, None), "group 4 reset");
}

#[test]
fn test_empty_iteration_terminates_loop() {
    assert_eq!(span("(a*)*b", "b"), Some((0, 1)));
    assert_eq!(span("(?:)*", "x"), Some((0, 0)));
    let slots = run("(a|)+", "aa").expect("match");
    assert_eq!((slots[0], slots[1]), (Some(0), Some(2)));
}

#[test]
fn test_bounded_optional_copies() {
    assert_eq!(span("x(?:ab){1,2}y", "xababy"), Some((0, 6)));
    assert_eq!(span("x(?:ab){1,2}y", "xabababy"), None);
}

// ========================================================================
// Assertions
// ========================================================================

#[test]
fn test_anchors_multiline() {
    assert_eq!(span("^b", "a\nb"), None);
    let slots = run_flags("^b$", SyntaxFlags::MULTILINE, "a\nb\nc", 0).expect("match");
    assert_eq!((slots[0], slots[1]), (Some(2), Some(3)));
}

#[test]
fn test_word_boundary() {
    assert_eq!(span("\\bcat\\b", "concat cat"), Some((7, 10)));
    assert_eq!(span("\\Bcat", "concat cat"), Some((3, 6)));
}

#[test]
fn test_lookahead() {
    assert_eq!(span("a(?=b)", "acab"), Some((2, 3)));
    assert_eq!(span("a(?!b)", "abac"), Some((2, 3)));
    // captures inside positive lookahead survive
    let slots = run("(?=(a+))a*b\\1", "baaabac").expect("match");
    assert_eq!((slots[0], slots[1]), (Some(3), Some(6)));
    assert_eq!((slots[2], slots[3]), (Some(3), Some(4)));
}

#[test]
fn test_negative_lookahead_discards_captures() {
    let slots = run("(?!(a)b)\\w", "ac").expect("match");
    assert_eq!((slots[2], slots[3]), (None, None));
}

// ========================================================================
// Backreferences, case folding, sticky
// ========================================================================

#[test]
fn test_backreference() {
    assert_eq!(span("(a+)b\\1", "aabaa"), Some((0, 5)));
    assert_eq!(span("(a+)b\\1", "aaba"), Some((1, 4)));
    // unset group matches empty
    assert_eq!(span("(x)?y\\1", "y"), Some((0, 1)));
    // forward reference matches empty
    assert_eq!(span("\\1(a)", "a"), Some((0, 1)));
}

#[test]
fn test_ignore_case() {
    let slots = run_flags("h[a-z]LLo", SyntaxFlags::IGNORE_CASE, "say HELLO", 0).expect("match");
    assert_eq!((slots[0], slots[1]), (Some(4), Some(9)));
    let slots = run_flags("(a)\\1", SyntaxFlags::IGNORE_CASE, "aA", 0).expect("match");
    assert_eq!(slots[1], Some(2));
}

#[test]
fn test_sticky_only_tries_start() {
    assert!(run_flags("b", SyntaxFlags::STICKY, "ab", 0).is_none());
    assert!(run_flags("b", SyntaxFlags::STICKY, "ab", 1).is_some());
}

#[test]
fn test_failure_clears_slots() {
    let program = program("(a)b", SyntaxFlags::empty());
    let chars: Vec<char> = "ac".chars().collect();
    let mut slots = vec![Some(9); program.slot_count()];
    assert!(!BacktrackVM::new(&program).exec(&chars, 0, &mut slots));
    assert!(slots.iter().all(Option::is_none));
}

#[test]
fn test_trace_does_not_change_result() {
    let program = program("a(b|c)+", SyntaxFlags::empty());
    let chars: Vec<char> = "xabcb".chars().collect();
    let mut plain = vec![None; program.slot_count()];
    let mut traced = vec![None; program.slot_count()];
    assert!(BacktrackVM::new(&program).exec(&chars, 0, &mut plain));
    assert!(BacktrackVM::with_config(&program, VmConfig::with_trace()).exec(&chars, 0, &mut traced));
    assert_eq!(plain, traced);
}

#[test]
#[should_panic(expected = "malformed bytecode program")]
fn test_malformed_program_panics() {
    let mut builder = ProgramBuilder::new("broken");
    builder.emit_u32(Opcode::Class, 7);
    builder.emit(Opcode::Match);
    let program = builder.build().expect("build");
    let mut slots = vec![None; program.slot_count()];
    BacktrackVM::new(&program).exec(&['a'], 0, &mut slots);
}
