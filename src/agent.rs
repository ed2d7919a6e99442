// One competitor at one tick.
//
// Agents are values: every transition builds a new Agent through `moved`,
// nothing is mutated in place once a scenario owns it.

use crate::types::{Battlesnake, Coord, Direction};

/// Board bounds shared by every agent of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardDims {
    pub width: i32,
    pub height: i32,
}

impl BoardDims {
    pub fn new(width: i32, height: i32) -> Self {
        BoardDims { width, height }
    }

    /// Whether a coordinate lies within [0, width) x [0, height)
    pub fn contains(&self, point: &Coord) -> bool {
        point.x >= 0 && point.x < self.width && point.y >= 0 && point.y < self.height
    }

    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }
}

/// Snake state at a single tick. `body[0]` is the head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Agent {
    pub id: String,
    pub health: i32,
    pub body: Vec<Coord>,
}

impl Agent {
    pub fn new(id: impl Into<String>, health: i32, body: Vec<Coord>) -> Self {
        Agent {
            id: id.into(),
            health,
            body,
        }
    }

    pub fn from_snake(snake: &Battlesnake) -> Self {
        Agent::new(snake.id.clone(), snake.health, snake.body.clone())
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn tail(&self) -> Coord {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0 && !self.body.is_empty()
    }

    /// Body segments still occupied next tick. The tail vacates unless the
    /// agent is growing.
    pub fn blocking_segments(&self, grows: bool) -> &[Coord] {
        if grows {
            &self.body
        } else {
            &self.body[..self.body.len().saturating_sub(1)]
        }
    }

    /// On-board heads that do not run into this agent's own body.
    pub fn legal_next_heads(&self, dims: &BoardDims, grows: bool) -> Vec<Coord> {
        let head = self.head();
        let blocking = self.blocking_segments(grows);

        Direction::all()
            .iter()
            .map(|dir| dir.apply(&head))
            .filter(|next| dims.contains(next))
            .filter(|next| !blocking.contains(next))
            .collect()
    }

    /// Returns a new agent whose head is `next_head`. The tail is kept when
    /// `grew` is set. Health is copied unchanged.
    pub fn moved(&self, next_head: Coord, grew: bool) -> Agent {
        let mut body = Vec::with_capacity(self.body.len() + 1);
        body.push(next_head);
        body.extend_from_slice(&self.body);
        if !grew {
            body.pop();
        }

        Agent {
            id: self.id.clone(),
            health: self.health,
            body,
        }
    }

    /// Whether `point` is covered by this agent, optionally counting the tail
    /// and the cells it could move into next.
    pub fn intersects(
        &self,
        point: &Coord,
        dims: &BoardDims,
        include_tail: bool,
        include_future_heads: bool,
    ) -> bool {
        let body = if include_tail {
            &self.body[..]
        } else {
            &self.body[..self.body.len().saturating_sub(1)]
        };

        if body.contains(point) {
            return true;
        }

        include_future_heads && self.legal_next_heads(dims, false).contains(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake(body: &[(i32, i32)]) -> Agent {
        Agent::new(
            "s",
            100,
            body.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
        )
    }

    #[test]
    fn test_corner_agent_never_proposes_off_board_heads() {
        let dims = BoardDims::new(11, 11);
        for body in [
            vec![(0, 0), (1, 0), (2, 0)],
            vec![(10, 10), (9, 10), (8, 10)],
            vec![(0, 10), (0, 9)],
            vec![(10, 0)],
        ] {
            let agent = snake(&body);
            for head in agent.legal_next_heads(&dims, false) {
                assert!(dims.contains(&head), "{:?} is off board", head);
            }
        }
    }

    #[test]
    fn test_legal_heads_exclude_neck_but_allow_vacating_tail() {
        let dims = BoardDims::new(5, 5);
        // Curled so that the tail sits next to the head
        let agent = snake(&[(1, 1), (1, 2), (2, 2), (2, 1)]);
        let heads = agent.legal_next_heads(&dims, false);

        assert!(!heads.contains(&Coord::new(1, 2)));
        assert!(heads.contains(&Coord::new(2, 1)));
        assert_eq!(heads.len(), 3);
    }

    #[test]
    fn test_growing_agent_treats_tail_as_occupied() {
        let dims = BoardDims::new(5, 5);
        let agent = snake(&[(1, 1), (1, 2), (2, 2), (2, 1)]);
        let heads = agent.legal_next_heads(&dims, true);

        assert!(!heads.contains(&Coord::new(2, 1)));
        assert_eq!(heads.len(), 2);
    }

    #[test]
    fn test_moved_pops_tail_unless_grew() {
        let agent = snake(&[(2, 2), (2, 1), (2, 0)]);

        let plain = agent.moved(Coord::new(2, 3), false);
        assert_eq!(
            plain.body,
            vec![Coord::new(2, 3), Coord::new(2, 2), Coord::new(2, 1)]
        );

        let grown = agent.moved(Coord::new(2, 3), true);
        assert_eq!(grown.len(), 4);
        assert_eq!(grown.tail(), Coord::new(2, 0));
        assert_eq!(grown.health, agent.health);
        // Source agent is untouched
        assert_eq!(agent.len(), 3);
    }

    #[test]
    fn test_intersects_flags() {
        let dims = BoardDims::new(5, 5);
        let agent = snake(&[(2, 2), (2, 1), (2, 0)]);

        assert!(agent.intersects(&Coord::new(2, 0), &dims, true, false));
        assert!(!agent.intersects(&Coord::new(2, 0), &dims, false, false));
        assert!(!agent.intersects(&Coord::new(2, 3), &dims, true, false));
        assert!(agent.intersects(&Coord::new(2, 3), &dims, true, true));
    }
}
