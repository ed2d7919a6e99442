// Scenario: one node of the speculative game tree
//
// A scenario is a joint board state plus its win/lose/undetermined estimate.
// Construction decides terminality and the per-agent candidate heads;
// `create_children` applies the movement, feeding and collision rules to
// every combination of candidates.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::agent::{Agent, BoardDims};
use crate::config::GameRulesConfig;
use crate::types::{Coord, Direction};

/// Content hash of a scenario, used to match a real state against a prediction
pub type ScenarioId = u64;

/// Probability split of a scenario. The three parts always sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub win: f64,
    pub lose: f64,
    pub undetermined: f64,
}

impl Outcome {
    pub const WIN: Outcome = Outcome {
        win: 1.0,
        lose: 0.0,
        undetermined: 0.0,
    };
    pub const LOSE: Outcome = Outcome {
        win: 0.0,
        lose: 1.0,
        undetermined: 0.0,
    };
    pub const UNDETERMINED: Outcome = Outcome {
        win: 0.0,
        lose: 0.0,
        undetermined: 1.0,
    };

    pub fn total(&self) -> f64 {
        self.win + self.lose + self.undetermined
    }

    /// Unweighted element-wise mean, `None` for an empty input
    pub fn mean<'a, I>(outcomes: I) -> Option<Outcome>
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut sum = Outcome {
            win: 0.0,
            lose: 0.0,
            undetermined: 0.0,
        };
        let mut count = 0usize;
        for outcome in outcomes {
            sum.win += outcome.win;
            sum.lose += outcome.lose;
            sum.undetermined += outcome.undetermined;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(Outcome {
            win: sum.win / n,
            lose: sum.lose / n,
            undetermined: sum.undetermined / n,
        })
    }
}

/// Estimate for one of the controlled agent's moves out of a scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOdds {
    pub direction: Direction,
    pub win: f64,
    pub lose: f64,
}

/// A joint board state in the game tree
#[derive(Debug, Clone)]
pub struct Scenario {
    pub id: ScenarioId,
    /// `None` once the controlled agent has died
    pub player: Option<Agent>,
    /// Sorted by id so equal states hash equally
    pub enemies: Vec<Agent>,
    pub food: Vec<Coord>,
    /// Agents that ate on the transition into this scenario; they grow next tick
    pub ate: Vec<String>,
    /// The controlled agent's move that produced this scenario from its parent
    pub player_move: Option<Direction>,
    pub outcome: Outcome,
    /// Survival-likely heads per agent, player first then enemies
    candidates: Vec<Vec<Coord>>,
    /// Some agent has exactly one candidate
    forced: bool,
}

impl Scenario {
    pub fn new(
        player: Option<Agent>,
        mut enemies: Vec<Agent>,
        mut food: Vec<Coord>,
        mut ate: Vec<String>,
        dims: &BoardDims,
    ) -> Self {
        enemies.sort_by(|a, b| a.id.cmp(&b.id));
        food.sort();
        food.dedup();
        ate.sort();
        ate.dedup();

        let id = Self::content_hash(player.as_ref(), &enemies, &food, &ate);

        let mut scenario = Scenario {
            id,
            player,
            enemies,
            food,
            ate,
            player_move: None,
            outcome: Outcome::UNDETERMINED,
            candidates: Vec::new(),
            forced: false,
        };

        match &scenario.player {
            None => scenario.outcome = Outcome::LOSE,
            Some(_) if scenario.enemies.is_empty() => scenario.outcome = Outcome::WIN,
            Some(_) => {
                scenario.candidates = scenario.survival_candidates(dims);
                scenario.forced = scenario.candidates.iter().any(|c| c.len() == 1);
            }
        }

        scenario
    }

    fn content_hash(
        player: Option<&Agent>,
        enemies: &[Agent],
        food: &[Coord],
        ate: &[String],
    ) -> ScenarioId {
        let mut hasher = DefaultHasher::new();
        player.map(|p| (&p.id, &p.body)).hash(&mut hasher);
        for enemy in enemies {
            (&enemy.id, &enemy.body).hash(&mut hasher);
        }
        food.hash(&mut hasher);
        ate.hash(&mut hasher);
        hasher.finish()
    }

    /// Player first, then enemies
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.player.iter().chain(self.enemies.iter())
    }

    fn grows(&self, agent: &Agent) -> bool {
        self.ate.iter().any(|id| *id == agent.id)
    }

    fn survival_candidates(&self, dims: &BoardDims) -> Vec<Vec<Coord>> {
        self.agents()
            .map(|agent| {
                let mut heads: Vec<Coord> = agent
                    .legal_next_heads(dims, self.grows(agent))
                    .into_iter()
                    .filter(|point| {
                        self.agents()
                            .all(|other| !other.blocking_segments(self.grows(other)).contains(point))
                    })
                    .collect();

                // Never stall expansion: a boxed-in agent takes a forced, likely fatal step
                if heads.is_empty() {
                    heads.push(Direction::default().apply(&agent.head()));
                }
                heads
            })
            .collect()
    }

    /// Neither side is decided yet
    pub fn is_terminal(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Number of children `create_children` will produce
    pub fn branching(&self) -> usize {
        if self.candidates.is_empty() {
            0
        } else {
            self.candidates.iter().map(Vec::len).product()
        }
    }

    /// Every joint combination of candidate heads, in agent order
    fn combinations(&self) -> Vec<Vec<Coord>> {
        let mut combos: Vec<Vec<Coord>> = vec![Vec::with_capacity(self.candidates.len())];
        for options in &self.candidates {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    options.iter().map(move |head| {
                        let mut next = prefix.clone();
                        next.push(*head);
                        next
                    })
                })
                .collect();
        }
        combos
    }

    /// Builds one child per combination of candidate heads.
    ///
    /// Terminal scenarios have no children.
    pub fn create_children(&self, dims: &BoardDims, rules: &GameRulesConfig) -> Vec<Scenario> {
        if self.is_terminal() {
            return Vec::new();
        }

        let agents: Vec<&Agent> = self.agents().collect();
        let player_id = self.player.as_ref().map(|p| p.id.as_str());
        let player_head = self.player.as_ref().map(Agent::head);

        self.combinations()
            .into_iter()
            .map(|combo| {
                let moved: Vec<Agent> = agents
                    .iter()
                    .zip(combo.iter())
                    .map(|(agent, head)| {
                        let mut next = agent.moved(*head, self.grows(agent));
                        if self.food.contains(head) {
                            next.health = rules.health_on_food.min(rules.max_health);
                        } else {
                            next.health -= rules.health_loss_per_turn;
                        }
                        next
                    })
                    .collect();

                let new_ate: Vec<String> = moved
                    .iter()
                    .filter(|agent| self.food.contains(&agent.head()))
                    .map(|agent| agent.id.clone())
                    .collect();

                let new_food: Vec<Coord> = self
                    .food
                    .iter()
                    .filter(|food| !moved.iter().any(|agent| agent.head() == **food))
                    .copied()
                    .collect();

                let mut player = None;
                let mut enemies = Vec::with_capacity(moved.len());
                for agent in moved.iter().filter(|agent| survives(agent, &moved, dims)) {
                    if Some(agent.id.as_str()) == player_id {
                        player = Some(agent.clone());
                    } else {
                        enemies.push(agent.clone());
                    }
                }

                let mut child = Scenario::new(player, enemies, new_food, new_ate, dims);
                child.player_move = player_head
                    .zip(combo.first())
                    .and_then(|(from, to)| Direction::between(&from, to));
                child
            })
            .collect()
    }
}

/// Collision resolution against every agent's post-move position
fn survives(agent: &Agent, moved: &[Agent], dims: &BoardDims) -> bool {
    let head = agent.head();

    if !dims.contains(&head) || agent.health <= 0 {
        return false;
    }

    // A forced fallback step can run into the agent's own body
    if agent.body[1..].contains(&head) {
        return false;
    }

    moved
        .iter()
        .filter(|other| other.id != agent.id)
        .all(|other| {
            if other.head() == head {
                // Ties are mutually fatal
                agent.len() > other.len()
            } else {
                !other.body.contains(&head)
            }
        })
}

/// Groups per-move estimates from a scenario's children
pub fn move_odds(children: &[&Scenario]) -> Vec<MoveOdds> {
    let mut odds = Vec::new();
    for direction in Direction::all() {
        let outcomes: Vec<&Outcome> = children
            .iter()
            .filter(|child| child.player_move == Some(direction))
            .map(|child| &child.outcome)
            .collect();

        if let Some(mean) = Outcome::mean(outcomes) {
            odds.push(MoveOdds {
                direction,
                win: mean.win,
                lose: mean.lose,
            });
        }
    }
    odds
}

/// Lowest loss odds, `up` when nothing is known
pub fn safest_move(odds: &[MoveOdds]) -> Direction {
    odds.iter()
        .min_by(|a, b| a.lose.total_cmp(&b.lose))
        .map(|o| o.direction)
        .unwrap_or_default()
}
