//! Merge-base finder
//!
//! Finds the split point of two commits: the lowest common ancestor the
//! three-way merge compares both tips against.
//!
//! ## Algorithm
//!
//! ### Phase 1: Mark both ancestries
//!
//! A bidirectional breadth-first traversal walks parent edges from both
//! commits at once. Every commit reached carries visit flags saying from
//! which side it was reached; a commit is only re-queued when it gains a flag
//! it did not have, so shared history (diamonds, criss-crosses) is expanded
//! at most twice. Commits flagged from both sides are the common ancestors.
//!
//! ### Phase 2: Pick the deepest
//!
//! Among the common ancestors the one with the highest generation number
//! wins, where the generation is the length of the longest parent chain down
//! to a root. A common ancestor that is itself an ancestor of another common
//! ancestor always has a lower generation, so the winner is never redundant.
//! Ties (criss-cross merges) go to the earliest timestamp, then to the
//! smallest id, which keeps the choice deterministic.
//!
//! The finder only sees commits through a loader closure, so the same code
//! runs against the object database and against in-memory graphs in tests.

use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_SOURCE = 0b01;
        const VISITED_FROM_TARGET = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_SOURCE) {
            flags.push("SOURCE");
        }
        if self.contains(VisitState::VISITED_FROM_TARGET) {
            flags.push("TARGET");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Finds the lowest common ancestor of two commits
///
/// # Type Parameters
///
/// * `CommitLoaderFn` - Loads parents and timestamp of a commit. Root
///   commits have no parents.
pub struct BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> anyhow::Result<SlimCommit>,
{
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Finds the best common ancestor of two commits
    ///
    /// Returns `None` when the histories share no commit.
    ///
    /// ```rust,ignore
    /// // Branched history:
    /// //     A
    /// //    / \
    /// //   B   C
    /// let bca = finder.find_best_common_ancestor(&b, &c)?;
    /// assert_eq!(bca, Some(a));
    /// ```
    pub fn find_best_common_ancestor(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> anyhow::Result<Option<ObjectId>> {
        if source_commit_id == target_commit_id {
            return Ok(Some(source_commit_id.clone()));
        }

        let ancestors_states = self.mark_ancestors(source_commit_id, target_commit_id)?;

        let common_ancestors = ancestors_states
            .iter()
            .filter(|(_, state)| state.contains(VisitState::VISITED_FROM_BOTH))
            .map(|(oid, _)| oid.clone())
            .collect::<Vec<_>>();
        debug!(
            visited = ancestors_states.len(),
            common = common_ancestors.len(),
            "marked ancestors of both sides"
        );

        if common_ancestors.is_empty() {
            debug!(source = %source_commit_id, target = %target_commit_id, "no common ancestor");
            return Ok(None);
        }

        let mut generations = HashMap::new();
        let mut best: Option<(usize, Reverse<SlimCommit>)> = None;

        for oid in common_ancestors {
            let generation = self.generation(&oid, &mut generations)?;
            let candidate = (generation, Reverse((self.commit_loader)(&oid)?));

            debug!(%oid, generation, "common ancestor candidate");
            if best.as_ref().is_none_or(|current| candidate > *current) {
                best = Some(candidate);
            }
        }

        let best = best.map(|(_, Reverse(commit))| commit.oid);
        if let Some(oid) = &best {
            debug!(
                source = %source_commit_id,
                target = %target_commit_id,
                base = %oid,
                "selected merge base"
            );
        }

        Ok(best)
    }

    /// Every commit reachable from `commit_id`, itself included
    pub fn ancestors_of(&self, commit_id: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
        let states = self.traverse(vec![(commit_id.clone(), VisitState::VISITED_FROM_SOURCE)])?;

        let mut ancestors = states.into_keys().collect::<Vec<_>>();
        ancestors.sort();

        Ok(ancestors)
    }

    fn mark_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> anyhow::Result<HashMap<ObjectId, VisitState>> {
        self.traverse(vec![
            (source_commit_id.clone(), VisitState::VISITED_FROM_SOURCE),
            (target_commit_id.clone(), VisitState::VISITED_FROM_TARGET),
        ])
    }

    /// Breadth-first walk propagating visit flags down parent edges
    fn traverse(
        &self,
        starts: Vec<(ObjectId, VisitState)>,
    ) -> anyhow::Result<HashMap<ObjectId, VisitState>> {
        let mut ancestors_states = HashMap::<ObjectId, VisitState>::new();
        let mut queue = VecDeque::new();

        for (oid, state) in starts {
            *ancestors_states.entry(oid.clone()).or_insert(VisitState::NONE) |= state;
            queue.push_back(oid);
        }

        while let Some(commit_id) = queue.pop_front() {
            let current_state = ancestors_states
                .get(&commit_id)
                .copied()
                .unwrap_or(VisitState::NONE);
            let current_commit = (self.commit_loader)(&commit_id)?;

            for parent_id in current_commit.parents {
                let parent_state = ancestors_states
                    .get(&parent_id)
                    .copied()
                    .unwrap_or(VisitState::NONE);

                // only revisit a parent when it learns about a new side
                if !parent_state.contains(current_state) {
                    ancestors_states.insert(parent_id.clone(), parent_state | current_state);
                    queue.push_back(parent_id);
                }
            }
        }

        Ok(ancestors_states)
    }

    /// Length of the longest parent chain from `commit_id` down to a root
    fn generation(
        &self,
        commit_id: &ObjectId,
        generations: &mut HashMap<ObjectId, usize>,
    ) -> anyhow::Result<usize> {
        let mut stack = vec![(commit_id.clone(), false)];

        while let Some((oid, parents_done)) = stack.pop() {
            if generations.contains_key(&oid) {
                continue;
            }

            let commit = (self.commit_loader)(&oid)?;
            if parents_done {
                let generation = commit
                    .parents
                    .iter()
                    .filter_map(|parent| generations.get(parent))
                    .max()
                    .map_or(0, |deepest| deepest + 1);
                generations.insert(oid, generation);
            } else {
                stack.push((oid, true));
                for parent in commit.parents {
                    if !generations.contains_key(&parent) {
                        stack.push((parent, false));
                    }
                }
            }
        }

        generations
            .get(commit_id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("failed to compute generation of {commit_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::*;

    /// In-memory commit store for testing
    #[derive(Debug, Clone, Default)]
    struct InMemoryCommitStore {
        commits: HashMap<ObjectId, SlimCommit>,
    }

    impl InMemoryCommitStore {
        fn add_commit(&mut self, commit_id: ObjectId, parents: Vec<ObjectId>) {
            // one hour apart, in insertion order
            let timestamp_offset = self.commits.len() as i64 * 3600;
            let timestamp = FixedOffset::east_opt(0)
                .unwrap()
                .timestamp_opt(1640995200 + timestamp_offset, 0)
                .unwrap();
            self.add_commit_with_timestamp(commit_id, parents, timestamp);
        }

        fn add_commit_with_timestamp(
            &mut self,
            commit_id: ObjectId,
            parents: Vec<ObjectId>,
            timestamp: DateTime<FixedOffset>,
        ) {
            self.commits.insert(
                commit_id.clone(),
                SlimCommit {
                    oid: commit_id,
                    parents,
                    timestamp,
                },
            );
        }

        fn get_slim_commit(&self, commit_id: &ObjectId) -> anyhow::Result<SlimCommit> {
            self.commits
                .get(commit_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("commit {commit_id} not in test store"))
        }

        fn best_common_ancestor(&self, source: &str, target: &str) -> Option<ObjectId> {
            BCAFinder::new(|oid| self.get_slim_commit(oid))
                .find_best_common_ancestor(&create_oid(source), &create_oid(target))
                .unwrap()
        }
    }

    fn create_oid(id: &str) -> ObjectId {
        let mut hex_string = id
            .as_bytes()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();

        while hex_string.len() < 40 {
            hex_string.push('0');
        }
        hex_string.truncate(40);

        ObjectId::try_parse(hex_string).expect("Invalid test ObjectId")
    }

    fn oids(ids: &[&str]) -> Vec<ObjectId> {
        ids.iter().map(|id| create_oid(id)).collect()
    }

    #[fixture]
    fn linear_history() -> InMemoryCommitStore {
        let mut store = InMemoryCommitStore::default();

        // A <- B <- C <- D
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("c"), oids(&["b"]));
        store.add_commit(create_oid("d"), oids(&["c"]));

        store
    }

    #[fixture]
    fn simple_merge() -> InMemoryCommitStore {
        let mut store = InMemoryCommitStore::default();

        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("c"), oids(&["a"]));
        store.add_commit(create_oid("d"), oids(&["b", "c"]));

        store
    }

    #[fixture]
    fn diamond_pattern() -> InMemoryCommitStore {
        let mut store = InMemoryCommitStore::default();

        //     A
        //    /|\
        //   B C D
        //   |X| |
        //   E F G
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("c"), oids(&["a"]));
        store.add_commit(create_oid("d"), oids(&["a"]));
        store.add_commit(create_oid("e"), oids(&["b", "c"]));
        store.add_commit(create_oid("f"), oids(&["c", "d"]));
        store.add_commit(create_oid("g"), oids(&["d"]));

        store
    }

    #[fixture]
    fn criss_cross_merge() -> InMemoryCommitStore {
        let mut store = InMemoryCommitStore::default();

        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        //   |   |
        //   F   G
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("c"), oids(&["a"]));
        store.add_commit(create_oid("d"), oids(&["b", "c"]));
        store.add_commit(create_oid("e"), oids(&["c", "b"]));
        store.add_commit(create_oid("f"), oids(&["d"]));
        store.add_commit(create_oid("g"), oids(&["e"]));

        store
    }

    #[fixture]
    fn uneven_branches() -> InMemoryCommitStore {
        let mut store = InMemoryCommitStore::default();

        //   A <- B <- C <- D <- M
        //    \                 /
        //     X <------------ Y
        //
        // D and Y are merged into M; branching off M (N) and off Y (Z)
        // leaves A, X and Y as common ancestors of N and Z.
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("c"), oids(&["b"]));
        store.add_commit(create_oid("d"), oids(&["c"]));
        store.add_commit(create_oid("x"), oids(&["a"]));
        store.add_commit(create_oid("y"), oids(&["x"]));
        store.add_commit(create_oid("m"), oids(&["d", "y"]));
        store.add_commit(create_oid("n"), oids(&["m"]));
        store.add_commit(create_oid("z"), oids(&["y"]));

        store
    }

    #[rstest]
    fn test_linear_history_picks_the_older_commit(linear_history: InMemoryCommitStore) {
        assert_eq!(
            linear_history.best_common_ancestor("b", "d"),
            Some(create_oid("b"))
        );
        assert_eq!(
            linear_history.best_common_ancestor("d", "b"),
            Some(create_oid("b"))
        );
    }

    #[rstest]
    fn test_same_commit_is_its_own_ancestor(linear_history: InMemoryCommitStore) {
        assert_eq!(
            linear_history.best_common_ancestor("c", "c"),
            Some(create_oid("c"))
        );
    }

    #[rstest]
    fn test_sibling_branches_share_their_fork_point(simple_merge: InMemoryCommitStore) {
        assert_eq!(
            simple_merge.best_common_ancestor("b", "c"),
            Some(create_oid("a"))
        );
        assert_eq!(
            simple_merge.best_common_ancestor("d", "c"),
            Some(create_oid("c"))
        );
    }

    #[rstest]
    fn test_diamond_picks_the_shared_middle_commit(diamond_pattern: InMemoryCommitStore) {
        assert_eq!(
            diamond_pattern.best_common_ancestor("e", "f"),
            Some(create_oid("c"))
        );
        assert_eq!(
            diamond_pattern.best_common_ancestor("e", "g"),
            Some(create_oid("a"))
        );
    }

    #[rstest]
    fn test_criss_cross_tie_goes_to_the_earliest_commit(criss_cross_merge: InMemoryCommitStore) {
        // B and C are both best; B was created first
        assert_eq!(
            criss_cross_merge.best_common_ancestor("f", "g"),
            Some(create_oid("b"))
        );
    }

    #[rstest]
    fn test_criss_cross_tie_uses_timestamps_not_ids() {
        let mut store = InMemoryCommitStore::default();
        let base = FixedOffset::east_opt(0).unwrap().timestamp_opt(0, 0).unwrap();
        let later = base + chrono::Duration::hours(1);

        store.add_commit_with_timestamp(create_oid("a"), vec![], base);
        store.add_commit_with_timestamp(create_oid("b"), oids(&["a"]), later);
        store.add_commit_with_timestamp(create_oid("c"), oids(&["a"]), base);
        store.add_commit_with_timestamp(create_oid("d"), oids(&["b", "c"]), later);
        store.add_commit_with_timestamp(create_oid("e"), oids(&["c", "b"]), later);

        assert_eq!(store.best_common_ancestor("d", "e"), Some(create_oid("c")));
    }

    #[rstest]
    fn test_deepest_common_ancestor_wins(uneven_branches: InMemoryCommitStore) {
        assert_eq!(
            uneven_branches.best_common_ancestor("n", "z"),
            Some(create_oid("y"))
        );
    }

    #[rstest]
    fn test_unrelated_histories_have_no_common_ancestor() {
        let mut store = InMemoryCommitStore::default();
        store.add_commit(create_oid("a"), vec![]);
        store.add_commit(create_oid("b"), oids(&["a"]));
        store.add_commit(create_oid("x"), vec![]);

        assert_eq!(store.best_common_ancestor("b", "x"), None);
    }

    #[rstest]
    fn test_ancestors_visit_shared_history_once(diamond_pattern: InMemoryCommitStore) {
        let finder = BCAFinder::new(|oid| diamond_pattern.get_slim_commit(oid));

        let ancestors = finder.ancestors_of(&create_oid("f")).unwrap();

        let mut expected = oids(&["a", "c", "d", "f"]);
        expected.sort();
        assert_eq!(ancestors, expected);
    }
}
