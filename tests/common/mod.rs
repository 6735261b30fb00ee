//! Test utilities for rexvm integration tests
//!
//! This module provides shared utilities for integration tests, including:
//! - Engines pinned to one tier or the other
//! - Exhaustive per-start-offset match collection
//! - Tier comparison assertions
#![allow(dead_code)]

use rexvm::{BackrefPolicy, CachePolicy, CaptureBuffer, Engine, EngineConfig, FlagSet, RegexHandle};

/// Engine that tries native code first, deferring backreferences
pub fn native_engine() -> Engine {
    Engine::with_config(EngineConfig {
        jit_enabled: true,
        backref_policy: BackrefPolicy::Defer,
        ..EngineConfig::default()
    })
}

/// Engine that never compiles native code
pub fn bytecode_engine() -> Engine {
    Engine::with_config(EngineConfig {
        jit_enabled: false,
        ..EngineConfig::default()
    })
}

/// Engine with LRU retention of `capacity` handles
pub fn lru_engine(capacity: usize) -> Engine {
    Engine::with_config(EngineConfig {
        cache_policy: CachePolicy::Lru { capacity },
        ..EngineConfig::default()
    })
}

/// Result of `exec_at` for one start offset: the slots on success
pub fn exec_slots(handle: &RegexHandle, subject: &str, start: usize) -> Option<Vec<Option<usize>>> {
    let chars: Vec<char> = subject.chars().collect();
    let mut buffer = CaptureBuffer::new(0);
    handle
        .exec_at(&chars, start, &mut buffer)
        .then(|| buffer.slots().to_vec())
}

/// `exec_slots` for every start offset from 0 to one past the end
pub fn exec_all_starts(handle: &RegexHandle, subject: &str) -> Vec<Option<Vec<Option<usize>>>> {
    let len = subject.chars().count();
    (0..=len + 1)
        .map(|start| exec_slots(handle, subject, start))
        .collect()
}

/// Compile `pattern` on both tiers and compare every start offset of every subject
pub fn assert_tiers_agree(pattern: &str, flags: FlagSet, subjects: &[&str]) {
    let native_engine = native_engine();
    let bytecode_engine = bytecode_engine();
    let native = native_engine.get_or_create(pattern, flags);
    let bytecode = bytecode_engine.get_or_create(pattern, flags);
    assert_eq!(native.is_valid(), bytecode.is_valid(), "validity of /{}/", pattern);
    assert_eq!(native.subpattern_count(), bytecode.subpattern_count());

    for subject in subjects {
        assert_eq!(
            exec_all_starts(&native, subject),
            exec_all_starts(&bytecode, subject),
            "tiers disagree for /{}/{} on {:?} (native tier: {:?})",
            pattern,
            flags,
            subject,
            native.tier()
        );
    }
}
