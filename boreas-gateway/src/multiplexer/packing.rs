//! Batch planning for orphaned streams.

use crate::stream::StreamKey;

/// Outcome of [`plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepackPlan {
    /// Indices of active connections to retire; their streams moved into a batch.
    pub retire: Vec<usize>,
    /// Stream sets to open one connection each for.
    pub batches: Vec<Vec<StreamKey>>,
}

/// Packs `orphans` into batches of at most `capacity` streams.
///
/// Streams cannot be added to a live connection, so an active connection
/// with spare room is retired and its streams folded into the new batch
/// instead. `active` lists the streams of each active connection.
#[must_use]
pub fn plan(active: &[Vec<StreamKey>], mut orphans: Vec<StreamKey>, capacity: usize) -> RepackPlan {
    let capacity = capacity.max(1);
    orphans.sort();
    orphans.dedup();
    orphans.reverse();

    let mut plan = RepackPlan::default();
    while !orphans.is_empty() {
        let spare = active
            .iter()
            .enumerate()
            .find(|(index, streams)| streams.len() < capacity && !plan.retire.contains(index));

        let mut batch = match spare {
            Some((index, streams)) => {
                plan.retire.push(index);
                streams.clone()
            }
            None => Vec::with_capacity(capacity),
        };

        while batch.len() < capacity {
            match orphans.pop() {
                Some(key) => batch.push(key),
                None => break,
            }
        }
        plan.batches.push(batch);
    }
    plan
}
