use crate::builder::TreeBuilder;
use crate::config::TreeConfig;
use crate::error::{MutationError, Result};
use crate::mutation::MutationService;
use crate::types::{FlatRecord, ParentChange};
use std::collections::HashMap;

/// Flat record snapshot with id lookup.
///
/// Ids are expected to be unique; when they are not, the first record wins and
/// the later ids are kept in [`NodeStore::duplicates`].
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    records: Vec<FlatRecord>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl NodeStore {
    pub fn new(records: impl IntoIterator<Item = FlatRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            if store.index.contains_key(&record.id) {
                log::warn!("Dropping duplicate record id {}", record.id);
                store.duplicates.push(record.id);
                continue;
            }
            store.index.insert(record.id.clone(), store.records.len());
            store.records.push(record);
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&FlatRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insertion position of a record
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatRecord> {
        self.records.iter()
    }

    /// Records declaring `id` as their parent, in insertion order
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a FlatRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.parent_id.as_deref() == Some(id))
    }

    /// Ids dropped because an earlier record already used them
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn into_records(self) -> Vec<FlatRecord> {
        self.records
    }

    /// Return a new store with one parent link rewritten.
    ///
    /// The move is validated by [`MutationService`] against the forest this
    /// store builds into under `config`, so the store accepts exactly the
    /// moves `reparent` accepts and checks them against the repaired
    /// structure (depth cap included), not the declared parent chains.
    pub fn apply(&self, change: &ParentChange, config: &TreeConfig) -> Result<NodeStore> {
        let forest = TreeBuilder::new(config.clone()).build_store(self);
        MutationService::validate(&forest, &change.node_id, change.new_parent_id.as_deref())?;

        let pos = self
            .position(&change.node_id)
            .ok_or_else(|| MutationError::not_found(&change.node_id))?;
        let mut next = self.clone();
        next.records[pos].parent_id = change.new_parent_id.clone();
        Ok(next)
    }
}

impl FromIterator<FlatRecord> for NodeStore {
    fn from_iter<I: IntoIterator<Item = FlatRecord>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationErrorKind;

    fn store() -> NodeStore {
        NodeStore::new(vec![
            FlatRecord::team("root"),
            FlatRecord::team("east").parent("root"),
            FlatRecord::team("west").parent("root"),
            FlatRecord::member("alice").parent("east"),
        ])
    }

    #[test]
    fn test_lookup_and_children() {
        let store = store();
        assert_eq!(store.len(), 4);
        assert!(store.contains("alice"));
        assert_eq!(store.position("west"), Some(2));
        let children: Vec<_> = store.children_of("root").map(|r| r.id.as_str()).collect();
        assert_eq!(children, vec!["east", "west"]);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let store: NodeStore = vec![
            FlatRecord::team("a").metric("sales", 1.0),
            FlatRecord::team("a").metric("sales", 2.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().own_metrics["sales"], Some(1.0));
        assert_eq!(store.duplicates(), ["a".to_string()]);
    }

    #[test]
    fn test_apply_rewrites_parent() {
        let store = store();
        let next = store
            .apply(&ParentChange::new("alice", Some("west")), &TreeConfig::default())
            .unwrap();
        assert_eq!(next.get("alice").unwrap().parent_id.as_deref(), Some("west"));
        // Source snapshot untouched
        assert_eq!(store.get("alice").unwrap().parent_id.as_deref(), Some("east"));
    }

    #[test]
    fn test_apply_rejections() {
        let store = store();
        let config = TreeConfig::default();
        let kind = |change: ParentChange| store.apply(&change, &config).unwrap_err().kind();

        assert_eq!(kind(ParentChange::new("ghost", None)), MutationErrorKind::NodeNotFound);
        assert_eq!(kind(ParentChange::new("east", Some("ghost"))), MutationErrorKind::NodeNotFound);
        assert_eq!(kind(ParentChange::new("east", Some("east"))), MutationErrorKind::SelfParent);
        assert_eq!(kind(ParentChange::new("root", Some("east"))), MutationErrorKind::CycleDetected);
        assert_eq!(kind(ParentChange::new("west", Some("alice"))), MutationErrorKind::LeafParent);
    }

    #[test]
    fn test_apply_checks_depth_cap_of_built_forest() {
        let store = NodeStore::new(vec![
            FlatRecord::team("a"),
            FlatRecord::team("b").parent("a"),
            FlatRecord::team("c").parent("b"),
            FlatRecord::team("x"),
            FlatRecord::member("y").parent("x"),
        ]);
        let config = TreeConfig {
            max_depth: 2,
            ..TreeConfig::default()
        };
        let err = store
            .apply(&ParentChange::new("x", Some("c")), &config)
            .unwrap_err();
        assert_eq!(err.kind(), MutationErrorKind::DepthLimitExceeded);

        // Same move fits under the default cap
        assert!(store
            .apply(&ParentChange::new("x", Some("c")), &TreeConfig::default())
            .is_ok());
    }

    #[test]
    fn test_apply_follows_repaired_structure() {
        // "b" names a member as parent, so it is built as a root and sits
        // outside "a"'s subtree
        let store = NodeStore::new(vec![
            FlatRecord::team("a"),
            FlatRecord::member("m").parent("a"),
            FlatRecord::team("b").parent("m"),
        ]);
        let next = store
            .apply(&ParentChange::new("a", Some("b")), &TreeConfig::default())
            .unwrap();
        assert_eq!(next.get("a").unwrap().parent_id.as_deref(), Some("b"));
    }
}
