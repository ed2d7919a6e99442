// Match Controller
//
// One per match. Turns referee state into scenarios, keeps the engine's root
// in step with reality, and picks the move: a heuristic guess, vetoed by the
// engine's loss odds when they say it is too risky.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::{Agent, BoardDims};
use crate::config::Config;
use crate::safety::SafetyIndex;
use crate::scenario::{self, MoveOdds, Scenario};
use crate::search_engine::SearchEngine;
use crate::strategies::{self, StrategyKind};
use crate::types::{Battlesnake, Board, Coord, Direction, Game};

/// Everything decided on one turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnDecision {
    pub direction: Direction,
    pub strategy: Option<StrategyKind>,
    /// What the heuristics proposed before the engine had its say
    pub heuristic: Option<Direction>,
    pub vetoed: bool,
    /// Engine loss odds of the final move, if it had any
    pub lose_odds: Option<f64>,
    /// The engine went Idle before the deadline
    pub search_settled: bool,
}

#[derive(Debug, Clone, Copy)]
struct SentMove {
    head: Coord,
    direction: Direction,
}

/// Keeps the heuristic move when the engine rates it acceptable, otherwise
/// takes the engine's safest move. Returns the move and whether it was vetoed.
pub fn resolve_move(
    candidate: Option<Direction>,
    odds: &[MoveOdds],
    tolerance: f64,
) -> (Direction, bool) {
    if odds.is_empty() {
        return (candidate.unwrap_or_default(), false);
    }

    let acceptable = candidate.filter(|dir| {
        odds.iter()
            .any(|o| o.direction == *dir && o.lose <= tolerance)
    });

    match acceptable {
        Some(dir) => (dir, false),
        None => (scenario::safest_move(odds), candidate.is_some()),
    }
}

pub struct MatchController {
    match_id: String,
    dims: BoardDims,
    timeout: Duration,
    latency_ms: u64,
    previous: Option<SentMove>,
    /// Food of the last observed state, to tell who ate since
    previous_food: Vec<Coord>,
    config: Arc<Config>,
}

impl MatchController {
    pub fn new(game: &Game, board: &Board, config: Arc<Config>) -> Self {
        let timeout_ms = match game.timeout {
            0 => config.timing.default_timeout_ms,
            ms => u64::from(ms),
        };

        MatchController {
            match_id: game.id.clone(),
            dims: BoardDims::new(board.width, board.height),
            timeout: Duration::from_millis(timeout_ms),
            latency_ms: config.timing.default_latency_ms,
            previous: None,
            previous_food: Vec::new(),
            config,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    /// Deadline for a decision, measured from when the request arrived
    pub fn max_response_time(&self) -> Duration {
        self.timeout
            .saturating_sub(Duration::from_millis(self.latency_ms))
    }

    /// Registers the opening state with the engine
    pub fn on_start(&mut self, board: &Board, you: &Battlesnake, engine: &SearchEngine) {
        let scenario = self.build_scenario(board, you);
        engine.register_match(&self.match_id, self.dims, scenario);
    }

    /// Discards the match's tree and all of its pending work
    pub fn on_end(&self, engine: &SearchEngine) {
        if !engine.remove_match(&self.match_id) {
            debug!("Match {} was not tracked by the engine", self.match_id);
        }
    }

    /// Builds the scenario for an observed state.
    ///
    /// Agents whose head sits on last turn's food ate; their duplicated tail
    /// segment is collapsed because growth only shows in the tree next tick.
    pub fn build_scenario(&mut self, board: &Board, you: &Battlesnake) -> Scenario {
        let ate: Vec<String> = board
            .snakes
            .iter()
            .filter(|snake| {
                snake
                    .head()
                    .map_or(false, |head| self.previous_food.contains(&head))
            })
            .map(|snake| snake.id.clone())
            .collect();

        let (mut players, enemies): (Vec<Agent>, Vec<Agent>) = board
            .snakes
            .iter()
            .map(|snake| {
                let mut agent = Agent::from_snake(snake);
                if ate.contains(&agent.id) {
                    collapse_fed_tail(&mut agent.body);
                }
                agent
            })
            .filter(Agent::is_alive)
            .partition(|agent| agent.id == you.id);

        self.previous_food = board.food.clone();
        Scenario::new(players.pop(), enemies, board.food.clone(), ate, &self.dims)
    }

    /// Bumps the latency estimate when our last move evidently arrived too late
    fn adjust_latency(&mut self, you: &Battlesnake) {
        let (Some(sent), Some(head)) = (self.previous, you.head()) else {
            return;
        };

        if sent.direction.apply(&sent.head) != head {
            self.latency_ms = (self.latency_ms + self.config.timing.latency_increment_ms)
                .min(self.config.timing.max_latency_ms);
            warn!(
                "Match {}: sent {} but head is at ({}, {}), latency estimate now {}ms",
                self.match_id,
                sent.direction.as_str(),
                head.x,
                head.y,
                self.latency_ms
            );
        }
    }

    pub async fn on_move(
        &mut self,
        turn: i32,
        board: &Board,
        you: &Battlesnake,
        started: Instant,
        engine: &SearchEngine,
    ) -> TurnDecision {
        self.adjust_latency(you);

        let scenario = self.build_scenario(board, you);
        let Some(player) = scenario.player.clone() else {
            warn!("Turn {}: we are not on the board, sending default", turn);
            return TurnDecision {
                direction: Direction::default(),
                strategy: None,
                heuristic: None,
                vetoed: false,
                lose_odds: None,
                search_settled: false,
            };
        };

        let index = SafetyIndex::build(
            &player,
            &scenario.enemies,
            self.dims,
            self.config.strategy.dominance_margin,
        );
        let opponents = scenario.enemies.len();
        let food = scenario.food.clone();

        if engine
            .update_root_scenario(&self.match_id, scenario.clone())
            .is_none()
        {
            warn!(
                "Turn {}: engine does not have match {}, recreating",
                turn, self.match_id
            );
            engine.register_match(&self.match_id, self.dims, scenario);
        }

        let heuristic = strategies::choose(&player, &food, &index, &self.config.strategy);

        let budget = self.max_response_time().saturating_sub(started.elapsed());
        let search_settled = tokio::time::timeout(budget, engine.wait_until_idle())
            .await
            .is_ok();

        let odds = engine.move_odds(&self.match_id).unwrap_or_default();
        let tolerance = self.config.risk.tolerance_for(opponents);
        let (direction, vetoed) = resolve_move(heuristic.map(|(_, dir)| dir), &odds, tolerance);
        let lose_odds = odds
            .iter()
            .find(|o| o.direction == direction)
            .map(|o| o.lose);

        let (queued, work_done) = engine.with_state(|state| {
            (state.work_queue().len(), state.statistics().total_work_done)
        });
        info!(
            "Turn {}: {} via {} ({}, {} queued, {} expanded, {}ms) odds {:?}",
            turn,
            direction.as_str(),
            heuristic.map_or("none", |(kind, _)| kind.as_str()),
            if search_settled { "search settled" } else { "deadline reached" },
            queued,
            work_done,
            started.elapsed().as_millis(),
            odds
        );
        if vetoed {
            info!(
                "Turn {}: oracle intercepted {:?}, sending {}",
                turn,
                heuristic.map(|(_, dir)| dir),
                direction.as_str()
            );
        }

        self.previous = Some(SentMove {
            head: player.head(),
            direction,
        });

        TurnDecision {
            direction,
            strategy: heuristic.map(|(kind, _)| kind),
            heuristic: heuristic.map(|(_, dir)| dir),
            vetoed,
            lose_odds,
            search_settled,
        }
    }
}

/// Drops one trailing duplicate left by the referee's feeding rule
fn collapse_fed_tail(body: &mut Vec<Coord>) {
    let n = body.len();
    if n >= 2 && body[n - 1] == body[n - 2] {
        body.pop();
    }
}
