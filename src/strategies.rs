// Heuristic move proposers
//
// Cheap pathfinding guesses made while the search engine works. The match
// controller checks whatever these return against the engine's loss odds.

use rand::seq::IndexedRandom;

use crate::agent::Agent;
use crate::config::StrategyConfig;
use crate::pathfinding::{self, WalkGrid};
use crate::safety::SafetyIndex;
use crate::types::{Coord, Direction};

/// Which heuristic produced a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Pressure,
    Eat,
    Delay,
    Safe,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Pressure => "pressure",
            StrategyKind::Eat => "eat",
            StrategyKind::Delay => "delay",
            StrategyKind::Safe => "safe",
        }
    }
}

fn first_step(head: &Coord, path: &[Coord]) -> Option<Direction> {
    path.get(1).and_then(|next| Direction::between(head, next))
}

/// Tries pressure, eat, delay and finally any safe move, in that order
pub fn choose(
    player: &Agent,
    food: &[Coord],
    index: &SafetyIndex,
    config: &StrategyConfig,
) -> Option<(StrategyKind, Direction)> {
    if index.dominant && player.health >= config.pressure_min_health {
        if let Some(dir) = pressure(player, index) {
            return Some((StrategyKind::Pressure, dir));
        }
    }

    if let Some(dir) = eat(player, food, index, config) {
        return Some((StrategyKind::Eat, dir));
    }

    if let Some(dir) = delay(player, index) {
        return Some((StrategyKind::Delay, dir));
    }

    any_safe(player, index).map(|dir| (StrategyKind::Safe, dir))
}

/// Head for the closest cell a shorter enemy could move into
pub fn pressure(player: &Agent, index: &SafetyIndex) -> Option<Direction> {
    let head = player.head();
    let dims = index.dims();

    index
        .smaller
        .iter()
        .flat_map(|enemy| enemy.legal_next_heads(&dims, false))
        .map(|target| pathfinding::find(head, target, index.grid()))
        .filter(|path| path.len() > 1)
        .min_by_key(Vec::len)
        .and_then(|path| first_step(&head, &path))
}

/// Whether, after following `path` to food, the snake can still reach its tail
fn can_return(player: &Agent, path: &[Coord], grid: &WalkGrid) -> bool {
    if path.is_empty() {
        return false;
    }

    // Body after walking the path: the path reversed (minus the current head)
    // followed by the current body, cut to the current length
    let future_body: Vec<Coord> = path
        .iter()
        .rev()
        .take(path.len() - 1)
        .chain(player.body.iter())
        .take(player.len())
        .copied()
        .collect();

    let (Some(&future_head), Some(&future_tail)) = (future_body.first(), future_body.last()) else {
        return false;
    };

    let mut probe = grid.clone();
    for segment in &player.body {
        probe.set_walkable(segment, true);
    }
    for segment in &future_body {
        probe.set_walkable(segment, false);
    }

    !pathfinding::find(future_head, future_tail, &probe).is_empty()
}

/// Path to the nearest food we can come back from, or any food when starving
pub fn eat(
    player: &Agent,
    food: &[Coord],
    index: &SafetyIndex,
    config: &StrategyConfig,
) -> Option<Direction> {
    let head = player.head();

    let mut paths: Vec<Vec<Coord>> = food
        .iter()
        .map(|target| pathfinding::find(head, *target, index.grid()))
        .filter(|path| !path.is_empty())
        .collect();
    paths.sort_by_key(Vec::len);

    let mut selected = paths.iter().find(|path| can_return(player, path, index.grid()));

    let too_far = selected.map_or(true, |path| {
        path.len() as i32 > player.health - config.starving_path_buffer
    });
    if too_far && player.health < config.starving_health {
        selected = paths.first();
    }

    selected.and_then(|path| first_step(&head, path))
}

/// Stall by chasing our own tail
pub fn delay(player: &Agent, index: &SafetyIndex) -> Option<Direction> {
    let head = player.head();
    let path = pathfinding::find(head, player.tail(), index.grid());
    first_step(&head, &path)
}

/// Any direction whose next cell is currently safe
pub fn any_safe(player: &Agent, index: &SafetyIndex) -> Option<Direction> {
    let head = player.head();
    let safe: Vec<Direction> = Direction::all()
        .into_iter()
        .filter(|dir| index.is_safe(&dir.apply(&head)))
        .collect();

    safe.choose(&mut rand::rng()).copied()
}
