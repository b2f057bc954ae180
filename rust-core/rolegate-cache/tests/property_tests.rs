// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the role cache, checked against a simple
//! recency-list model.

use std::sync::Arc;

use proptest::prelude::*;
use rolegate_audit::{AuditConfig, Auditor};
use rolegate_cache::{CacheConfig, CacheLookup, RoleCache};
use rolegate_model::{ManualClock, Role, UserId};

#[derive(Debug, Clone)]
enum Op {
    Get(i64),
    Set(i64, Option<u8>),
    Invalidate(i64),
    Advance(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..12).prop_map(Op::Get),
        (0i64..12, proptest::option::of(0u8..3)).prop_map(|(id, r)| Op::Set(id, r)),
        (0i64..12).prop_map(Op::Invalidate),
        (0i64..4).prop_map(Op::Advance),
    ]
}

fn role(idx: Option<u8>) -> Option<Role> {
    idx.map(|i| Role::ALL[i as usize])
}

fn build(ttl: u64, max: usize) -> (RoleCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let auditor = Arc::new(Auditor::new(AuditConfig::default()));
    (RoleCache::with_clock(CacheConfig::new(ttl, max), clock.clone(), auditor), clock)
}

proptest! {
    #[test]
    fn test_cache_matches_recency_model(max in 1usize..6, ops in proptest::collection::vec(op(), 1..80)) {
        // TTL large enough that nothing expires; this property is about LRU.
        let (cache, clock) = build(10_000, max);
        // Front is least recently used.
        let mut model: Vec<(i64, Option<Role>)> = Vec::new();

        for op in ops {
            match op {
                Op::Get(id) => {
                    let got = cache.get(UserId::new(id));
                    match model.iter().position(|(k, _)| *k == id) {
                        Some(pos) => {
                            let entry = model.remove(pos);
                            prop_assert_eq!(got, CacheLookup::Hit(entry.1));
                            model.push(entry);
                        }
                        None => prop_assert_eq!(got, CacheLookup::Miss),
                    }
                }
                Op::Set(id, r) => {
                    let r = role(r);
                    cache.set(UserId::new(id), r);
                    match model.iter().position(|(k, _)| *k == id) {
                        Some(pos) => {
                            model.remove(pos);
                        }
                        None if model.len() >= max => {
                            model.remove(0);
                        }
                        None => {}
                    }
                    model.push((id, r));
                }
                Op::Invalidate(id) => {
                    let expected = usize::from(model.iter().any(|(k, _)| *k == id));
                    model.retain(|(k, _)| *k != id);
                    prop_assert_eq!(cache.invalidate_user(UserId::new(id)), expected);
                }
                Op::Advance(secs) => clock.advance_secs(secs),
            }

            prop_assert!(cache.len() <= max);
            prop_assert_eq!(cache.len(), model.len());
        }

        for (id, r) in &model {
            prop_assert_eq!(cache.peek(UserId::new(*id)).map(|e| e.role()), Some(*r));
        }
    }

    #[test]
    fn test_expiry_boundary(ttl in 1u64..1000, elapsed in 0i64..2000) {
        let (cache, clock) = build(ttl, 4);
        cache.set(UserId::new(1), Some(Role::Viewer));
        clock.advance_secs(elapsed);

        let got = cache.get(UserId::new(1));
        if elapsed as u64 > ttl {
            prop_assert_eq!(got, CacheLookup::Expired(Some(Role::Viewer)));
        } else {
            prop_assert_eq!(got, CacheLookup::Hit(Some(Role::Viewer)));
        }
    }

    #[test]
    fn test_stats_totals_are_consistent(reads in proptest::collection::vec(0i64..8, 0..50)) {
        let (cache, _clock) = build(60, 4);
        for id in 0..4 {
            cache.set(UserId::new(id), None);
        }
        for id in &reads {
            cache.get(UserId::new(*id));
        }
        let stats = cache.stats();
        prop_assert_eq!(stats.total_requests, reads.len() as u64);
        prop_assert_eq!(stats.hit_count, reads.iter().filter(|id| **id < 4).count() as u64);
        prop_assert_eq!(stats.total_requests, stats.hit_count + stats.miss_count + stats.expired_count);
    }
}
