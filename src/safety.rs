// Board Safety Index
//
// Built once per root scenario: classifies every cell as safe or unsafe for
// the controlled agent and keeps the enemy groupings the strategies reuse.

use crate::agent::{Agent, BoardDims};
use crate::pathfinding::WalkGrid;
use crate::types::Coord;

/// Per-root snapshot of cell safety for the controlled agent
#[derive(Debug, Clone)]
pub struct SafetyIndex {
    dims: BoardDims,
    grid: WalkGrid,
    /// Enemies at least as long as the player
    pub threats: Vec<Agent>,
    /// Enemies strictly shorter than the player
    pub smaller: Vec<Agent>,
    /// Player length minus the largest enemy length reaches the margin
    pub dominant: bool,
}

impl SafetyIndex {
    pub fn build(player: &Agent, enemies: &[Agent], dims: BoardDims, dominance_margin: i32) -> Self {
        let (threats, smaller): (Vec<Agent>, Vec<Agent>) = enemies
            .iter()
            .cloned()
            .partition(|enemy| enemy.len() >= player.len());

        let dominant = enemies
            .iter()
            .map(Agent::len)
            .max()
            .map_or(true, |largest| {
                player.len() as i32 - largest as i32 >= dominance_margin
            });

        let mut grid = WalkGrid::new(dims.width, dims.height);
        for cell in dims.cells() {
            let unsafe_cell = player.intersects(&cell, &dims, false, false)
                || smaller
                    .iter()
                    .any(|enemy| enemy.intersects(&cell, &dims, true, false))
                || threats
                    .iter()
                    .any(|enemy| enemy.intersects(&cell, &dims, true, true));

            if unsafe_cell {
                grid.set_walkable(&cell, false);
            }
        }

        SafetyIndex {
            dims,
            grid,
            threats,
            smaller,
            dominant,
        }
    }

    pub fn dims(&self) -> BoardDims {
        self.dims
    }

    /// On-board and not claimed by any body or threatening head
    pub fn is_safe(&self, point: &Coord) -> bool {
        self.grid.is_walkable(point)
    }

    /// The cached grid. Callers clone it before mutating.
    pub fn grid(&self) -> &WalkGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, body: &[(i32, i32)]) -> Agent {
        Agent::new(id, 100, body.iter().map(|&(x, y)| Coord::new(x, y)).collect())
    }

    #[test]
    fn test_threat_next_heads_are_unsafe_but_smaller_ones_are_not() {
        let dims = BoardDims::new(7, 7);
        let player = agent("me", &[(3, 3), (3, 2), (3, 1)]);
        let threat = agent("big", &[(0, 6), (1, 6), (2, 6)]);
        let small = agent("small", &[(6, 0), (6, 1)]);

        let index = SafetyIndex::build(&player, &[threat, small], dims, 2);

        assert!(!index.is_safe(&Coord::new(0, 5)), "threat's next head");
        assert!(!index.is_safe(&Coord::new(2, 6)), "threat's tail");
        assert!(!index.is_safe(&Coord::new(6, 1)), "small snake's body");
        assert!(index.is_safe(&Coord::new(5, 0)), "small snake's next head");
        assert_eq!(index.threats.len(), 1);
        assert_eq!(index.smaller.len(), 1);
        assert!(!index.dominant);
    }

    #[test]
    fn test_own_tail_stays_safe() {
        let dims = BoardDims::new(5, 5);
        let player = agent("me", &[(2, 2), (2, 1), (2, 0)]);
        let enemy = agent("e", &[(4, 4)]);

        let index = SafetyIndex::build(&player, &[enemy], dims, 2);

        assert!(!index.is_safe(&Coord::new(2, 2)));
        assert!(!index.is_safe(&Coord::new(2, 1)));
        assert!(index.is_safe(&Coord::new(2, 0)));
        assert!(!index.is_safe(&Coord::new(-1, 0)));
    }

    #[test]
    fn test_dominance_requires_margin() {
        let dims = BoardDims::new(9, 9);
        let player = agent("me", &[(4, 4), (4, 3), (4, 2), (4, 1), (4, 0)]);

        let close = agent("e", &[(0, 8), (1, 8), (2, 8), (3, 8)]);
        assert!(!SafetyIndex::build(&player, &[close], dims, 2).dominant);

        let far = agent("e", &[(0, 8), (1, 8), (2, 8)]);
        assert!(SafetyIndex::build(&player, &[far], dims, 2).dominant);
    }
}
