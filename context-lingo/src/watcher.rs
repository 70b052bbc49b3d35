//! Incremental re-scan of mutated subtrees

use std::collections::HashSet;

use tracing::debug;

use crate::dom::{Document, MutationRecord, NodeId, NodeKind};
use crate::exclusion::ExclusionRules;

/// Lifecycle of the mutation watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Observation has not started; the initial pass is still pending
    Dormant,
    /// Waiting for the next batch
    Idle,
    /// A batch is being processed
    Processing,
}

/// Turns batches of mutation records into the subtree roots to re-scan
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    state: WatcherState,
    batches: usize,
}

impl Default for MutationWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationWatcher {
    pub fn new() -> Self {
        MutationWatcher {
            state: WatcherState::Dormant,
            batches: 0,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state != WatcherState::Dormant
    }

    /// Number of batches handled since observation started
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Enter `Idle` once the initial pass has completed
    pub fn start(&mut self) {
        self.state = WatcherState::Idle;
    }

    /// Move to `Processing` and compute the roots to scan for this batch
    ///
    /// Each added node that is still attached and not shielded becomes a
    /// root; a text node is scanned through its parent element. Roots that
    /// already sit under another root of the same batch are dropped. Roots
    /// are returned in the order they were first seen.
    pub fn begin_batch(
        &mut self,
        doc: &Document,
        records: &[MutationRecord],
        rules: &ExclusionRules,
    ) -> Vec<NodeId> {
        self.state = WatcherState::Processing;
        self.batches += 1;

        let mut seen = HashSet::new();
        let mut roots = Vec::new();
        for record in records {
            for &added in &record.added_nodes {
                let root = match doc.kind(added) {
                    NodeKind::Element(_) => Some(added),
                    NodeKind::Text(_) => doc.parent_element(added),
                    _ => None,
                };
                let Some(root) = root else { continue };
                if !doc.is_attached(root) || rules.is_shielded(doc, root) {
                    continue;
                }
                if seen.insert(root) {
                    roots.push(root);
                }
            }
        }

        let covered: Vec<NodeId> = roots
            .iter()
            .copied()
            .filter(|&root| doc.ancestors(root).any(|a| seen.contains(&a)))
            .collect();
        roots.retain(|root| !covered.contains(root));

        debug!(
            "Mutation batch {}: {} record(s), {} root(s) to scan",
            self.batches,
            records.len(),
            roots.len()
        );
        roots
    }

    /// Return to `Idle` after a batch drains
    pub fn finish_batch(&mut self) {
        self.state = WatcherState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::WRAPPER_CLASS;

    fn started() -> MutationWatcher {
        let mut watcher = MutationWatcher::new();
        watcher.start();
        watcher
    }

    #[test]
    fn test_state_transitions() {
        let mut watcher = MutationWatcher::new();
        assert_eq!(watcher.state(), WatcherState::Dormant);
        watcher.start();
        assert_eq!(watcher.state(), WatcherState::Idle);

        let doc = Document::new();
        watcher.begin_batch(&doc, &[], &ExclusionRules::default());
        assert_eq!(watcher.state(), WatcherState::Processing);
        watcher.finish_batch();
        assert_eq!(watcher.state(), WatcherState::Idle);
        assert_eq!(watcher.batches(), 1);
    }

    #[test]
    fn test_text_node_scanned_through_parent() {
        let mut doc = Document::parse("<body><p>x</p></body>");
        let p = doc.children(doc.body())[0];
        doc.observe();
        let text = doc.create_text("thank you");
        doc.append_child(p, text).unwrap();

        let records = doc.take_records();
        let roots = started().begin_batch(&doc, &records, &ExclusionRules::default());
        assert_eq!(roots, vec![p]);
    }

    #[test]
    fn test_nested_roots_collapse_to_outermost() {
        let mut doc = Document::parse("<body></body>");
        let body = doc.body();
        doc.observe();
        let added = doc.append_html(body, "<div><p>a</p></div>").unwrap();
        let div = added[0];
        let p = doc.children(div)[0];
        let extra = doc.create_text("b");
        doc.append_child(p, extra).unwrap();

        let records = doc.take_records();
        let roots = started().begin_batch(&doc, &records, &ExclusionRules::default());
        assert_eq!(roots, vec![div]);
    }

    #[test]
    fn test_detached_and_shielded_nodes_skipped() {
        let mut doc = Document::parse("<body></body>");
        let body = doc.body();
        doc.observe();
        let html = format!(
            "<span class=\"{}\">x</span><script>y</script><p>z</p>",
            WRAPPER_CLASS
        );
        let added = doc.append_html(body, &html).unwrap();
        doc.remove(added[2]);

        let records = doc.take_records();
        let roots = started().begin_batch(&doc, &records, &ExclusionRules::default());
        assert!(roots.is_empty());
    }
}
