// src/queue.rs
//! Publishing queue builder: turns the classified candidate set into the
//! final, capped, ordered list sent to content generation. Pure logic, no
//! I/O; caps are injected so tests can exercise alternate policies.
//!
//! Policy: breaking news is never starved by a numeric limit (urgent items
//! publish up to a safety cap), routine filler appears only when real news
//! is absent — except for a minimum-throughput guarantee of two items per
//! run when routine material exists.

use crate::config::QueueCaps;
use crate::ingest::types::CandidateItem;

/// Classified items partitioned by priority tier, each bucket ordered for
/// publishing.
#[derive(Debug, Default)]
pub struct QueueSet {
    /// Tier 1: publish immediately.
    pub urgent: Vec<CandidateItem>,
    /// Tier 2: publish this run, capped.
    pub elevated: Vec<CandidateItem>,
    /// Tier 3: batch material.
    pub routine: Vec<CandidateItem>,
}

/// Sort key: priority, with high-profile items ahead of others in the same
/// tier. The original heuristic is `tier + 0.5` for non-high-profile items;
/// doubling both terms keeps the exact ordering in integer space.
fn sort_key(item: &CandidateItem) -> u8 {
    let (priority, high_profile) = match &item.event {
        Some(ec) => (ec.priority, ec.high_profile),
        None => (3, false),
    };
    priority * 2 + u8::from(!high_profile)
}

/// Partition items into the three queues and order each one. The sort is
/// stable: items tied on (tier, high-profile) keep their relative order.
pub fn build_queues(items: Vec<CandidateItem>) -> QueueSet {
    let mut queues = QueueSet::default();
    for item in items {
        let priority = item.event.as_ref().map(|ec| ec.priority).unwrap_or(3);
        match priority {
            1 => queues.urgent.push(item),
            2 => queues.elevated.push(item),
            _ => queues.routine.push(item),
        }
    }
    queues.urgent.sort_by_key(sort_key);
    queues.elevated.sort_by_key(sort_key);
    queues.routine.sort_by_key(sort_key);
    queues
}

/// Walk the queues in priority order and produce the publish list:
/// urgent up to its cap, elevated up to its cap, and routine material only
/// when both upper queues were empty — or a single filler item when the
/// combined selection would otherwise run below two items. An external
/// overall limit truncates last, after all priority logic.
pub fn select_for_publishing(
    queues: QueueSet,
    caps: &QueueCaps,
    overall_limit: Option<usize>,
) -> Vec<CandidateItem> {
    let urgent_empty = queues.urgent.is_empty();
    let elevated_empty = queues.elevated.is_empty();

    let mut selected: Vec<CandidateItem> = Vec::new();
    selected.extend(queues.urgent.into_iter().take(caps.urgent));
    selected.extend(queues.elevated.into_iter().take(caps.elevated));

    if urgent_empty && elevated_empty {
        // No real news this run: allow the routine trickle.
        selected.extend(queues.routine.into_iter().take(caps.routine));
    } else if selected.len() < 2 {
        // Minimum-throughput guarantee: exactly one routine filler.
        selected.extend(queues.routine.into_iter().take(1));
    }

    if let Some(limit) = overall_limit {
        selected.truncate(limit);
    }
    selected
}
