use ::rand as external_rand;
use external_rand::Rng;
use std::collections::VecDeque;

use crate::error::SimError;
use crate::grid::Grid;
use crate::types::Position;

const AXIS_X: usize = 0;
const AXIS_Y: usize = 1;

/// A food tile a frontier is walking back to, with its own cached route.
#[derive(Clone, Debug, PartialEq)]
pub struct FoodTarget {
    pub pos: Position,
    pub path: VecDeque<Position>,
}

/// An active growth head.
///
/// A frontier never owns its tile: it is keyed by `head` and lives only while
/// the grid still holds mould there.
#[derive(Clone, Debug)]
pub struct Frontier {
    pub head: Position,
    /// Remaining steps toward the current expansion goal; empty means the
    /// next pass has to pick a new goal.
    pub path: VecDeque<Position>,
    /// Memory of the food being eaten, if any.
    pub food: Option<FoodTarget>,
    // Direction (+1/-1) the target walk pushes along each axis.
    orientation: [isize; 2],
    // Samples drawn along each axis, used to pick the less explored one.
    explored: [u32; 2],
}

impl Frontier {
    pub fn new<R: Rng>(head: Position, rng: &mut R) -> Self {
        let mut sign = || if rng.gen::<bool>() { 1 } else { -1 };
        let orientation = [sign(), sign()];
        Self {
            head,
            path: VecDeque::new(),
            food: None,
            orientation,
            explored: [0, 0],
        }
    }

    /// Remember `food` so later passes route straight back to it. Abandons the
    /// current expansion route.
    pub fn pursue(&mut self, food: Position) {
        if self.food.as_ref().is_some_and(|t| t.pos == food) {
            return;
        }
        self.food = Some(FoodTarget {
            pos: food,
            path: VecDeque::new(),
        });
        self.path.clear();
    }

    /// Drop the memory of `food` if this frontier holds it.
    pub fn forget_food(&mut self, food: Position) -> bool {
        if self.food.as_ref().is_some_and(|t| t.pos == food) {
            self.food = None;
            true
        } else {
            false
        }
    }

    /// Pick where undirected growth should head next.
    ///
    /// Starting from the head, repeatedly step along the less explored axis in
    /// this frontier's orientation, by a random distance in
    /// `0..step_max`. Steps off the grid flip the orientation on that axis and
    /// are retried; landing on mould makes that tile the new pivot, so the
    /// walk crosses the colony until it reaches its edge. Every sample counts
    /// toward `max_hops`.
    pub fn choose_expansion_goal<R: Rng>(
        &mut self,
        grid: &Grid,
        rng: &mut R,
        step_max: usize,
        max_hops: usize,
    ) -> Result<Position, SimError> {
        let step_max = step_max.max(1);
        let mut pivot = self.head;

        for _ in 0..max_hops {
            let axis = self.less_explored_axis(rng);
            self.explored[axis] = self.explored[axis].saturating_add(1);

            let distance = rng.gen_range(0..step_max) as isize * self.orientation[axis];
            let (dx, dy) = if axis == AXIS_X {
                (distance, 0)
            } else {
                (0, distance)
            };

            let Some(candidate) = grid.offset(pivot, dx, dy) else {
                self.orientation[axis] = -self.orientation[axis];
                continue;
            };

            if grid[candidate].is_mould() {
                pivot = candidate;
                continue;
            }
            return Ok(candidate);
        }

        Err(SimError::NoExpansionTarget(self.head))
    }

    fn less_explored_axis<R: Rng>(&self, rng: &mut R) -> usize {
        match self.explored[AXIS_X].cmp(&self.explored[AXIS_Y]) {
            std::cmp::Ordering::Less => AXIS_X,
            std::cmp::Ordering::Greater => AXIS_Y,
            std::cmp::Ordering::Equal => {
                if rng.gen::<bool>() {
                    AXIS_X
                } else {
                    AXIS_Y
                }
            }
        }
    }
}
