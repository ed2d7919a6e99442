// Background search engine
//
// `EngineState` is the synchronous core: per-match scenario trees, the active
// work queue and the deferred pool, expanded one scenario per `step`.
// `SearchEngine` is the cloneable handle the rest of the process shares. It
// runs the expansion loop as a tokio task that holds the lock for exactly one
// step and then yields, so referee calls are never blocked for longer than a
// single expansion.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::agent::BoardDims;
use crate::config::{GameRulesConfig, SearchConfig};
use crate::scenario::{MoveOdds, Scenario};
use crate::scenario_tree::{NodeId, Reroot, ScenarioTree};

/// A scenario waiting to be expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub match_id: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatistics {
    pub total_work_done: u64,
    pub total_work_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A scenario was expanded into this many children
    Expanded(usize),
    /// The popped item belonged to a match that is gone
    Skipped,
    /// Nothing to do, or the idle-timeout elapsed
    Idle,
}

/// Where `add_work_item` placed a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
    Deferred,
    Rejected,
}

pub struct EngineState {
    search: SearchConfig,
    rules: GameRulesConfig,
    trees: HashMap<String, ScenarioTree>,
    work_queue: VecDeque<WorkItem>,
    deferred: Vec<WorkItem>,
    status: EngineStatus,
    last_interaction: Option<Instant>,
    statistics: EngineStatistics,
}

impl EngineState {
    pub fn new(search: SearchConfig, rules: GameRulesConfig) -> Self {
        EngineState {
            search,
            rules,
            trees: HashMap::new(),
            work_queue: VecDeque::new(),
            deferred: Vec::new(),
            status: EngineStatus::Idle,
            last_interaction: None,
            statistics: EngineStatistics::default(),
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn statistics(&self) -> EngineStatistics {
        self.statistics
    }

    pub fn work_queue(&self) -> &VecDeque<WorkItem> {
        &self.work_queue
    }

    pub fn deferred(&self) -> &[WorkItem] {
        &self.deferred
    }

    pub fn tree(&self, match_id: &str) -> Option<&ScenarioTree> {
        self.trees.get(match_id)
    }

    pub fn has_match(&self, match_id: &str) -> bool {
        self.trees.contains_key(match_id)
    }

    pub fn match_count(&self) -> usize {
        self.trees.len()
    }

    fn touch(&mut self) {
        self.last_interaction = Some(Instant::now());
    }

    /// Queues a scenario for expansion. Shallow scenarios go to the active
    /// queue, forced ones jump to the front; deeper ones wait in the pool.
    pub fn add_work_item(&mut self, match_id: &str, node: NodeId) -> Placement {
        let Some(tree) = self.trees.get(match_id) else {
            return Placement::Rejected;
        };
        let (Some(age), Some(tree_node)) = (tree.age(node), tree.get(node)) else {
            return Placement::Rejected;
        };

        let item = WorkItem {
            match_id: match_id.to_string(),
            node,
        };

        if age > self.search.max_age {
            self.deferred.push(item);
            Placement::Deferred
        } else if tree_node.scenario.is_forced() {
            self.work_queue.push_front(item);
            Placement::Front
        } else {
            self.work_queue.push_back(item);
            Placement::Back
        }
    }

    fn enqueue_root_children(&mut self, match_id: &str, children: Vec<NodeId>) {
        for child in children {
            self.add_work_item(match_id, child);
        }
    }

    /// Starts tracking a match, replacing any tree it already had
    pub fn register_match(&mut self, match_id: &str, dims: BoardDims, root: Scenario) {
        self.touch();
        self.drop_work_for(match_id);

        let mut tree = ScenarioTree::new(dims, root);
        let root_id = tree.root_id();
        let children = tree.expand(root_id, &self.rules);
        self.trees.insert(match_id.to_string(), tree);
        self.enqueue_root_children(match_id, children);
    }

    /// Stops tracking a match and discards its queued and deferred work
    pub fn remove_match(&mut self, match_id: &str) -> bool {
        self.drop_work_for(match_id);
        self.trees.remove(match_id).is_some()
    }

    fn drop_work_for(&mut self, match_id: &str) {
        self.work_queue.retain(|item| item.match_id != match_id);
        self.deferred.retain(|item| item.match_id != match_id);
    }

    /// Moves the match's root to the observed state.
    ///
    /// Returns `None` when the match is not tracked.
    pub fn update_root_scenario(&mut self, match_id: &str, observed: Scenario) -> Option<Reroot> {
        self.touch();

        let rules = &self.rules;
        let tree = self.trees.get_mut(match_id)?;
        let reroot = tree.reroot(observed);
        if reroot == Reroot::Unchanged {
            return Some(reroot);
        }

        // A fresh root gets one ply right away so an estimate always exists
        let fresh_children = if reroot == Reroot::Restarted {
            let root_id = tree.root_id();
            tree.expand(root_id, rules)
        } else {
            Vec::new()
        };

        let tree = &self.trees[match_id];
        self.work_queue
            .retain(|item| item.match_id != match_id || tree.is_rooted(item.node));

        let (mine, others): (Vec<WorkItem>, Vec<WorkItem>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|item| item.match_id == match_id);
        self.deferred = others;

        if self.search.promote_deferred_on_reroot {
            let survivors: Vec<NodeId> = mine
                .into_iter()
                .filter(|item| tree.is_rooted(item.node))
                .map(|item| item.node)
                .collect();
            for node in survivors {
                self.add_work_item(match_id, node);
            }
        }

        self.enqueue_root_children(match_id, fresh_children);
        Some(reroot)
    }

    /// Per-move estimates out of the match's current root
    pub fn move_odds(&self, match_id: &str) -> Option<Vec<MoveOdds>> {
        self.trees.get(match_id).map(ScenarioTree::move_odds)
    }

    /// Expands the front of the active queue
    pub fn step(&mut self, now: Instant) -> StepOutcome {
        let stale = self.last_interaction.map_or(true, |at| {
            now.saturating_duration_since(at) > self.search.max_runtime_between_interactions()
        });
        if stale {
            return StepOutcome::Idle;
        }
        let Some(item) = self.work_queue.pop_front() else {
            return StepOutcome::Idle;
        };

        let started = Instant::now();
        let Some(tree) = self.trees.get_mut(&item.match_id) else {
            return StepOutcome::Skipped;
        };
        let children = tree.expand(item.node, &self.rules);
        let produced = children.len();
        for child in children {
            self.add_work_item(&item.match_id, child);
        }

        self.statistics.total_work_done += 1;
        self.statistics.total_work_time += started.elapsed();
        StepOutcome::Expanded(produced)
    }

    /// Idle -> Running when there is work; true if the caller must start a worker
    fn begin_run(&mut self) -> bool {
        if self.status == EngineStatus::Idle && !self.work_queue.is_empty() {
            self.status = EngineStatus::Running;
            true
        } else {
            false
        }
    }

    /// Drops every match, queue entry and statistic
    pub fn reset(&mut self) {
        self.trees.clear();
        self.work_queue.clear();
        self.deferred.clear();
        self.last_interaction = None;
        self.statistics = EngineStatistics::default();
    }
}

/// Process-wide handle to the search engine
#[derive(Clone)]
pub struct SearchEngine {
    state: Arc<Mutex<EngineState>>,
    status: Arc<watch::Sender<EngineStatus>>,
}

impl SearchEngine {
    pub fn new(search: SearchConfig, rules: GameRulesConfig) -> Self {
        let (status, _) = watch::channel(EngineStatus::Idle);
        SearchEngine {
            state: Arc::new(Mutex::new(EngineState::new(search, rules))),
            status: Arc::new(status),
        }
    }

    /// Runs `f` against the locked state
    pub fn with_state<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn status(&self) -> EngineStatus {
        self.state.lock().status()
    }

    pub fn has_match(&self, match_id: &str) -> bool {
        self.state.lock().has_match(match_id)
    }

    pub fn register_match(&self, match_id: &str, dims: BoardDims, root: Scenario) {
        let mut state = self.state.lock();
        state.register_match(match_id, dims, root);
        info!(
            "Registered match {} ({} tracked, {} scenarios queued)",
            match_id,
            state.match_count(),
            state.work_queue().len()
        );
        self.kick(&mut state);
    }

    pub fn update_root_scenario(&self, match_id: &str, observed: Scenario) -> Option<Reroot> {
        let mut state = self.state.lock();
        let reroot = state.update_root_scenario(match_id, observed);
        if let Some(reroot) = reroot {
            debug!(
                "Match {}: re-root {:?}, queue {}, deferred {}",
                match_id,
                reroot,
                state.work_queue().len(),
                state.deferred().len()
            );
        }
        self.kick(&mut state);
        reroot
    }

    pub fn remove_match(&self, match_id: &str) -> bool {
        self.state.lock().remove_match(match_id)
    }

    pub fn move_odds(&self, match_id: &str) -> Option<Vec<MoveOdds>> {
        self.state.lock().move_odds(match_id)
    }

    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Resolves once the engine is Idle, immediately if it already is
    pub async fn wait_until_idle(&self) {
        let mut receiver = self.status.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = receiver.wait_for(|status| *status == EngineStatus::Idle).await;
    }

    /// Starts a worker if the state just went Idle -> Running.
    /// Called with the lock held so only one worker ever exists.
    fn kick(&self, state: &mut EngineState) {
        if !state.begin_run() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                self.status.send_replace(EngineStatus::Running);
                let engine = self.clone();
                runtime.spawn(async move { engine.work_loop().await });
            }
            Err(_) => {
                warn!("No async runtime available, background search not started");
                state.status = EngineStatus::Idle;
            }
        }
    }

    async fn work_loop(self) {
        loop {
            {
                let mut state = self.state.lock();
                if state.step(Instant::now()) == StepOutcome::Idle {
                    state.status = EngineStatus::Idle;
                    self.status.send_replace(EngineStatus::Idle);
                    debug!(
                        "Search idle after {} expansions ({}ms total)",
                        state.statistics.total_work_done,
                        state.statistics.total_work_time.as_millis()
                    );
                    break;
                }
            }
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::Config;
    use crate::types::Coord;

    fn agent(id: &str, body: &[(i32, i32)]) -> Agent {
        Agent::new(id, 90, body.iter().map(|&(x, y)| Coord::new(x, y)).collect())
    }

    fn duel(dims: &BoardDims) -> Scenario {
        Scenario::new(
            Some(agent("me", &[(1, 2), (0, 2), (0, 1)])),
            vec![agent("e", &[(3, 2), (4, 2), (4, 1)])],
            vec![],
            vec![],
            dims,
        )
    }

    fn state_with_age(max_age: u32) -> EngineState {
        let config = Config::default_hardcoded();
        let mut search = config.search;
        search.max_age = max_age;
        EngineState::new(search, config.game_rules)
    }

    fn assert_exclusive(state: &EngineState) {
        for item in state.deferred() {
            assert!(!state.work_queue().contains(item), "{:?} in both", item);
        }
    }

    #[test]
    fn test_register_expands_root_and_queues_children() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(7);
        state.register_match("g", dims, duel(&dims));

        let tree = state.tree("g").unwrap();
        assert_eq!(tree.children_of(tree.root_id()).len(), 9);
        assert_eq!(state.work_queue().len(), 9);
        assert!(state.deferred().is_empty());
    }

    #[test]
    fn test_deep_items_are_deferred_not_queued() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(1);
        state.register_match("g", dims, duel(&dims));

        assert!(state.work_queue().is_empty());
        assert_eq!(state.deferred().len(), 9);
        assert_eq!(state.step(Instant::now()), StepOutcome::Idle);
        assert_exclusive(&state);
    }

    #[test]
    fn test_forced_scenarios_jump_the_queue() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(7);
        state.register_match("g", dims, duel(&dims));

        let corridor = Scenario::new(
            Some(agent("me", &[(0, 0), (1, 0), (2, 0)])),
            vec![agent("e", &[(4, 4), (4, 3)])],
            vec![],
            vec![],
            &dims,
        );
        assert!(corridor.is_forced());
        assert!(!duel(&dims).is_forced());

        state.register_match("forced", dims, corridor);
        let root = state.tree("forced").unwrap().root_id();
        assert_eq!(state.add_work_item("forced", root), Placement::Front);
        assert_eq!(state.work_queue().front().unwrap().node, root);

        let duel_root = state.tree("g").unwrap().root_id();
        assert_eq!(state.add_work_item("g", duel_root), Placement::Back);
        assert_eq!(state.work_queue().back().unwrap().node, duel_root);
        assert_eq!(state.add_work_item("missing", duel_root), Placement::Rejected);
    }

    #[test]
    fn test_step_expands_in_queue_order() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(2);
        state.register_match("g", dims, duel(&dims));

        let first = state.work_queue().front().cloned().unwrap();
        match state.step(Instant::now()) {
            StepOutcome::Expanded(_) => {}
            other => panic!("unexpected {:?}", other),
        }
        let tree = state.tree("g").unwrap();
        assert!(tree.get(first.node).unwrap().children.is_some());
        assert_eq!(state.statistics().total_work_done, 1);

        let mut guard = 0;
        while state.step(Instant::now()) != StepOutcome::Idle {
            guard += 1;
            assert!(guard < 10_000);
        }
        assert!(state.work_queue().is_empty());
        assert!(!state.deferred().is_empty());
        assert_exclusive(&state);
    }

    #[test]
    fn test_idle_timeout_stops_work() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(7);
        state.register_match("g", dims, duel(&dims));

        let later = Instant::now() + Duration::from_secs(5);
        assert_eq!(state.step(later), StepOutcome::Idle);
        assert_eq!(state.work_queue().len(), 9);
    }

    #[test]
    fn test_reroot_to_current_root_is_a_no_op() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(2);
        state.register_match("g", dims, duel(&dims));
        state.step(Instant::now());

        let queue: Vec<WorkItem> = state.work_queue().iter().cloned().collect();
        let deferred = state.deferred().to_vec();

        assert_eq!(
            state.update_root_scenario("g", duel(&dims)),
            Some(Reroot::Unchanged)
        );
        assert_eq!(state.work_queue().iter().cloned().collect::<Vec<_>>(), queue);
        assert_eq!(state.deferred(), &deferred[..]);
    }

    #[test]
    fn test_reroot_keeps_only_descendants_of_new_root() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(2);
        state.register_match("g", dims, duel(&dims));
        while state.step(Instant::now()) != StepOutcome::Idle {}

        let tree = state.tree("g").unwrap();
        let target = tree
            .children_of(tree.root_id())
            .into_iter()
            .find(|child| !child.is_terminal())
            .cloned()
            .unwrap();

        assert_eq!(
            state.update_root_scenario("g", target),
            Some(Reroot::Reused)
        );

        let tree = state.tree("g").unwrap();
        for item in state.work_queue().iter().chain(state.deferred()) {
            assert!(tree.is_rooted(item.node));
            assert!(tree.age(item.node).unwrap() <= 3);
        }
        assert!(!state.work_queue().is_empty(), "deferred grandchildren are re-offered");
        assert_exclusive(&state);
    }

    #[test]
    fn test_reroot_leaves_other_matches_alone() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(7);
        state.register_match("a", dims, duel(&dims));
        state.register_match("b", dims, duel(&dims));

        let elsewhere = Scenario::new(
            Some(agent("me", &[(0, 0), (0, 1), (0, 2)])),
            vec![agent("e", &[(4, 4), (4, 3), (4, 2)])],
            vec![],
            vec![],
            &dims,
        );
        assert_eq!(
            state.update_root_scenario("a", elsewhere),
            Some(Reroot::Restarted)
        );

        let b_items = state
            .work_queue()
            .iter()
            .filter(|item| item.match_id == "b")
            .count();
        assert_eq!(b_items, 9);
        let a_tree = state.tree("a").unwrap();
        for item in state.work_queue().iter().filter(|item| item.match_id == "a") {
            assert!(a_tree.is_rooted(item.node));
        }
    }

    #[test]
    fn test_remove_match_discards_its_work() {
        let dims = BoardDims::new(5, 5);
        let mut state = state_with_age(1);
        state.register_match("a", dims, duel(&dims));
        state.register_match("b", dims, duel(&dims));

        assert_eq!(state.match_count(), 2);
        assert!(state.remove_match("a"));
        assert!(!state.remove_match("a"));
        assert_eq!(state.match_count(), 1);
        assert!(state.deferred().iter().all(|item| item.match_id == "b"));
        assert_eq!(state.update_root_scenario("a", duel(&dims)), None);
    }

    #[tokio::test]
    async fn test_engine_reaches_idle_in_background() {
        let config = Config::default_hardcoded();
        let mut search = config.search;
        search.max_age = 3;
        let engine = SearchEngine::new(search, config.game_rules);
        let dims = BoardDims::new(5, 5);

        engine.register_match("g", dims, duel(&dims));
        tokio::time::timeout(Duration::from_secs(10), engine.wait_until_idle())
            .await
            .expect("search should settle");

        assert_eq!(engine.status(), EngineStatus::Idle);
        assert!(engine.with_state(|s| s.statistics().total_work_done) > 0);
        let odds = engine.move_odds("g").unwrap();
        assert_eq!(odds.len(), 3);
    }
}
