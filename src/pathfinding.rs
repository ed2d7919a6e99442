// Grid pathfinding used by the heuristic strategies
//
// Four-way A* with a Manhattan heuristic over a boolean walkability grid.
// Callers clone a grid to probe speculative layouts.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::agent::BoardDims;
use crate::types::{Coord, Direction};

/// Walkability grid, row-major from the bottom-left corner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkGrid {
    dims: BoardDims,
    walkable: Vec<bool>,
}

impl WalkGrid {
    /// Creates a grid where every cell is walkable
    pub fn new(width: i32, height: i32) -> Self {
        let dims = BoardDims::new(width, height);
        let cells = (width.max(0) * height.max(0)) as usize;
        WalkGrid {
            dims,
            walkable: vec![true; cells],
        }
    }

    pub fn dims(&self) -> BoardDims {
        self.dims
    }

    fn index(&self, point: &Coord) -> Option<usize> {
        if self.dims.contains(point) {
            Some((point.y * self.dims.width + point.x) as usize)
        } else {
            None
        }
    }

    /// Off-board cells are never walkable
    pub fn is_walkable(&self, point: &Coord) -> bool {
        self.index(point).map_or(false, |i| self.walkable[i])
    }

    /// Off-board writes are ignored
    pub fn set_walkable(&mut self, point: &Coord, walkable: bool) {
        if let Some(i) = self.index(point) {
            self.walkable[i] = walkable;
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
struct AStarNode {
    pos: Coord,
    g_cost: i32,
    h_cost: i32,
}

impl AStarNode {
    fn f_cost(&self) -> i32 {
        self.g_cost + self.h_cost
    }
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, ties broken toward the goal
        other
            .f_cost()
            .cmp(&self.f_cost())
            .then_with(|| other.h_cost.cmp(&self.h_cost))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest four-way path from `from` to `to`, both ends included.
///
/// The endpoints are treated as walkable regardless of the grid, so a path
/// may start on the snake's own head and end on a tail or an enemy's next
/// head. Returns an empty path when the goal is unreachable or off board.
pub fn find(from: Coord, to: Coord, grid: &WalkGrid) -> Vec<Coord> {
    let dims = grid.dims();
    if !dims.contains(&from) || !dims.contains(&to) {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut closed_set = HashSet::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut best_g: HashMap<Coord, i32> = HashMap::new();

    open_set.push(AStarNode {
        pos: from,
        g_cost: 0,
        h_cost: from.manhattan(&to),
    });
    best_g.insert(from, 0);

    while let Some(current) = open_set.pop() {
        if current.pos == to {
            let mut path = vec![current.pos];
            let mut pos = current.pos;
            while let Some(parent) = came_from.get(&pos) {
                path.push(*parent);
                pos = *parent;
            }
            path.reverse();
            return path;
        }

        if !closed_set.insert(current.pos) {
            continue;
        }

        for dir in Direction::all() {
            let neighbor = dir.apply(&current.pos);
            if closed_set.contains(&neighbor) {
                continue;
            }
            if neighbor != to && !grid.is_walkable(&neighbor) {
                continue;
            }
            if !dims.contains(&neighbor) {
                continue;
            }

            let g_cost = current.g_cost + 1;
            if best_g.get(&neighbor).map_or(false, |&g| g <= g_cost) {
                continue;
            }

            best_g.insert(neighbor, g_cost);
            came_from.insert(neighbor, current.pos);
            open_set.push(AStarNode {
                pos: neighbor,
                g_cost,
                h_cost: neighbor.manhattan(&to),
            });
        }
    }

    Vec::new()
}
