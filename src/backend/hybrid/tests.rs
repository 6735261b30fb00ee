//! Tests for dual-tier execution.

use super::*;
use crate::syntax::{parse, SyntaxFlags};

fn matcher(pattern: &str, config: HybridConfig) -> HybridMatcher {
    let parsed = parse(pattern, SyntaxFlags::empty()).expect("pattern should parse");
    HybridMatcher::with_config(pattern, parsed, config)
}

fn run(matcher: &HybridMatcher, input: &str, start: usize) -> Option<Vec<Option<usize>>> {
    let chars: Vec<char> = input.chars().collect();
    let mut slots = vec![None; matcher.slot_count()];
    matcher.exec(&chars, start, &mut slots).then_some(slots)
}

#[test]
fn test_bytecode_only_never_compiles_natively() {
    let m = matcher("a+b", HybridConfig::bytecode_only());
    assert_eq!(m.tier(), Tier::Bytecode);
    assert!(m.program_if_built().is_none(), "bytecode is built lazily");

    assert_eq!(run(&m, "xaab", 0).map(|s| (s[0], s[1])), Some((Some(1), Some(4))));
    let stats = m.stats();
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.native_runs, 0);
    assert_eq!(stats.bytecode_runs, 1);
    assert_eq!(stats.native_compilations, 0);
    assert!(m.program_if_built().is_some());
}

#[test]
fn test_bytecode_program_is_built_once() {
    let m = matcher("(a|b)c", HybridConfig::bytecode_only());
    for _ in 0..3 {
        assert!(run(&m, "bc", 0).is_some());
    }
    assert_eq!(m.stats().bytecode_builds, 1);
}

#[test]
fn test_lookahead_runs_on_bytecode() {
    let m = matcher("a(?=b)", HybridConfig::default());
    assert_eq!(m.tier(), Tier::Bytecode);
    assert_eq!(run(&m, "acab", 0).map(|s| s[0]), Some(Some(2)));
}

#[test]
fn test_backreference_skipped_by_default() {
    let m = matcher("(a+)b\\1", HybridConfig::default());
    assert_eq!(m.tier(), Tier::Bytecode);
    assert_eq!(run(&m, "aabaa", 0).map(|s| (s[0], s[1])), Some((Some(0), Some(5))));
}

#[test]
fn test_failure_clears_slots() {
    let m = matcher("(a)b", HybridConfig::bytecode_only());
    let chars: Vec<char> = "ac".chars().collect();
    let mut slots = vec![Some(1); m.slot_count()];
    assert!(!m.exec(&chars, 0, &mut slots));
    assert!(slots.iter().all(Option::is_none));
}

#[test]
fn test_trace_config() {
    let config = HybridConfig::default().with_trace();
    assert!(config.trace);
    assert!(config.vm_config.trace);
    let m = matcher("a|b", config);
    assert!(run(&m, "b", 0).is_some());
}

#[test]
fn test_stats_rates() {
    let stats = MatchStats {
        total_runs: 4,
        native_runs: 4,
        fallbacks: 1,
        ..MatchStats::default()
    };
    assert_eq!(stats.native_hit_rate(), 75.0);
    assert_eq!(stats.fallback_rate(), 25.0);
    assert_eq!(MatchStats::default().native_hit_rate(), 0.0);
}

#[cfg(feature = "jit")]
mod native {
    use super::*;
    use crate::backend::jit::BackrefPolicy;

    #[test]
    fn test_native_tier_answers_directly() {
        let m = matcher("(\\w+)@(\\w+)", HybridConfig::default());
        assert_eq!(m.tier(), Tier::Native);
        let slots = run(&m, "to bob@host", 0).expect("match");
        assert_eq!(&slots[..], &[Some(3), Some(11), Some(3), Some(6), Some(7), Some(11)]);
        let stats = m.stats();
        assert_eq!(stats.native_runs, 1);
        assert_eq!(stats.bytecode_runs, 0);
        assert!(m.program_if_built().is_none());
    }

    #[test]
    fn test_deferred_backreference_falls_back() {
        let config = HybridConfig {
            backref_policy: BackrefPolicy::Defer,
            ..HybridConfig::default()
        };
        let m = matcher("(a+)b\\1", config);
        assert_eq!(m.tier(), Tier::Native);

        let slots = run(&m, "xaabaa", 0).expect("match");
        assert_eq!((slots[0], slots[1]), (Some(1), Some(6)));
        let stats = m.stats();
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.overflow_fallbacks, 0);
        assert_eq!(stats.bytecode_runs, 1);
        assert_eq!(stats.bytecode_builds, 1);
    }

    #[test]
    fn test_fallback_resumes_at_native_position() {
        let config = HybridConfig {
            backref_policy: BackrefPolicy::Defer,
            ..HybridConfig::default()
        };
        let m = matcher("(a+)b\\1", config);
        let reference = matcher("(a+)b\\1", HybridConfig::bytecode_only());
        let input = "xxaabaa ab";
        assert_eq!(
            run(&m, input, 0),
            Some(vec![Some(2), Some(7), Some(2), Some(4)])
        );
        for start in 0..=input.len() + 1 {
            assert_eq!(run(&m, input, start), run(&reference, input, start), "from {}", start);
        }
    }

    #[test]
    fn test_overflow_falls_back_with_same_answer() {
        let small = HybridConfig {
            native_backtrack_capacity: 4,
            ..HybridConfig::default()
        };
        let m = matcher("(?:a|b)*c", small);
        let reference = matcher("(?:a|b)*c", HybridConfig::bytecode_only());
        let input = "ababababababc";
        assert_eq!(run(&m, input, 0), run(&reference, input, 0));
        assert_eq!(m.stats().overflow_fallbacks, 1);
    }
}
