use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{Debug, Display},
    ops::{Deref, DerefMut},
};

use log::{debug, trace};

use crate::config::TIE_BREAK_EPS;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, totally ordered (used as the last tie-break in the frontier) and not references
/// (hence 'static)
pub trait NodeReference: Copy + Ord + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if a path may start, pass through or end at the node
    fn is_traversable(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the reachable neighbors of the provided node and the cost required
    /// to go there
    fn neighbors_of(&self, node: Self::Reference)
        -> impl Iterator<Item = (Self::Reference, f64)>;

    /// Estimated cost from `from` to `to`, must never overestimate
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> f64;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    /// g + h + eps * h
    priority: f64,
    heuristic: f64,
    /// g at the time the entry was pushed, used to recognize stale entries
    cost: f64,
    point: R,
}

impl<R: Ord> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.heuristic.total_cmp(&other.heuristic))
            .then_with(|| self.point.cmp(&other.point))
            .reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl<R: Ord> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: Ord> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R: Ord> Eq for ToVisit<R> {}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisitedItem<R> {
    /// Best known cost from the start
    pub cost: f64,
    /// Predecessor on the best known path, `None` for the start
    pub from: Option<R>,
    /// Set once the node has been popped from the frontier; its cost is final from then on
    pub expanded: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Visited<R>(Option<VisitedItem<R>>);

impl<R> Default for Visited<R> {
    fn default() -> Self {
        Visited(None)
    }
}
impl<R> Deref for Visited<R> {
    type Target = Option<VisitedItem<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<R> DerefMut for Visited<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
impl<R> Display for Visited<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(item) => write!(f, "{:5.1} ", item.cost),
            None => write!(f, "{:5} ", ""),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PathResult<R> {
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: f64,
    /// Number of nodes expanded by the search
    pub expanded: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// Weighted A* search driven one frontier pop at a time.
///
/// Relaxing an already queued node pushes a second entry instead of updating the first one; the
/// outdated entry is recognized on pop because its stored cost is higher than the node's best
/// known cost (or the node is already expanded) and is dropped.
#[derive(Debug)]
pub struct PathFinder<
    R: NodeReference,
    S: MapStorage<Visited<R>, Reference = R>,
    M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
> {
    start: R,
    goal: R,
    tie_break_eps: f64,
    visited: S,
    visit_list: BinaryHeap<ToVisit<R>>,
    expanded: usize,
    state: PathFinderState<R>,
    _map: std::marker::PhantomData<M>,
}

impl<
        R: NodeReference,
        S: MapStorage<Visited<R>, Reference = R>,
        M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
    > PathFinder<R, S, M>
{
    /// `visited` must come from `create_storage` of the map that is later passed to `step`, and
    /// `start` must be valid in that map.
    pub fn new(start: R, goal: R, mut visited: S) -> Self {
        *visited.get_mut(start) = Visited(Some(VisitedItem {
            cost: 0.0,
            from: None,
            expanded: false,
        }));

        Self {
            start,
            goal,
            tie_break_eps: TIE_BREAK_EPS,
            visited,
            visit_list: BinaryHeap::from([ToVisit {
                priority: 0.0,
                heuristic: 0.0,
                cost: 0.0,
                point: start,
            }]),
            expanded: 0,
            state: PathFinderState::Computing,
            _map: std::marker::PhantomData,
        }
    }

    pub fn with_tie_break(mut self, eps: f64) -> Self {
        self.tie_break_eps = eps;
        self
    }

    pub fn finish(mut self, map: &M) -> (PathFinderState<R>, S) {
        loop {
            match self.step(map) {
                PathFinderState::Computing => {}
                s => return (s, self.visited),
            }
        }
    }

    pub fn step(&mut self, map: &M) -> PathFinderState<R> {
        if self.state.is_done() {
            return self.state.clone();
        }

        // a blocked endpoint ends the search before anything is expanded, even when start == goal
        if self.expanded == 0 && !(map.is_traversable(self.start) && map.is_traversable(self.goal))
        {
            debug!(
                "start {:?} or goal {:?} is not traversable",
                self.start, self.goal
            );
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        }

        let Some(visit) = self.visit_list.pop() else {
            debug!(
                "frontier exhausted after {} expansions, no path from {:?} to {:?}",
                self.expanded, self.start, self.goal
            );
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        };

        let Visited(Some(mut current)) = self.visited.get(visit.point) else {
            // every queued node has been recorded in visited before it was pushed
            return self.state.clone();
        };

        // stale entry, a cheaper one for the same node was pushed later
        if current.expanded || visit.cost > current.cost {
            return self.state.clone();
        }

        current.expanded = true;
        *self.visited.get_mut(visit.point) = Visited(Some(current));
        self.expanded += 1;

        trace!(
            "expanding {:?}: g={:.3} f={:.3}",
            visit.point,
            current.cost,
            visit.priority
        );

        if visit.point == self.goal {
            let path = self.backtrack();

            debug!(
                "found path from {:?} to {:?}: cost={:.3} cells={} expanded={}",
                self.start,
                self.goal,
                current.cost,
                path.len(),
                self.expanded
            );

            self.state = PathFinderState::PathFound(PathResult {
                path,
                start: self.start,
                goal: self.goal,
                total_cost: current.cost,
                expanded: self.expanded,
            });

            return self.state.clone();
        }

        for (point, move_cost) in map.neighbors_of(visit.point) {
            let cost = current.cost + move_cost;

            let improves = match *self.visited.get(point) {
                Some(VisitedItem { expanded: true, .. }) => false,
                Some(known) => cost < known.cost,
                None => true,
            };

            if improves {
                *self.visited.get_mut(point) = Visited(Some(VisitedItem {
                    cost,
                    from: Some(visit.point),
                    expanded: false,
                }));

                let heuristic = map.heuristic(point, self.goal);
                self.visit_list.push(ToVisit {
                    priority: cost + heuristic + self.tie_break_eps * heuristic,
                    heuristic,
                    cost,
                    point,
                });
            }
        }

        self.state.clone()
    }

    /// Follow the back-pointers from the goal to the start
    fn backtrack(&self) -> Vec<R> {
        let mut path = vec![self.goal];
        let mut current = self.goal;

        while let Visited(Some(VisitedItem {
            from: Some(from), ..
        })) = self.visited.get(current)
        {
            path.push(from);
            current = from;
        }

        path.reverse();
        path
    }

    pub fn state(&self) -> &PathFinderState<R> {
        &self.state
    }

    pub fn get_visited(&self) -> &S {
        &self.visited
    }

    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn start(&self) -> R {
        self.start
    }

    pub fn goal(&self) -> R {
        self.goal
    }
}

#[cfg(test)]
mod test {

    use super::*;

    /// A tiny weighted graph over node ids, enough to drive the search without a grid
    struct LineMap {
        costs: Vec<f64>,
        blocked: Vec<bool>,
    }

    #[derive(Debug)]
    struct VecStorage<T>(Vec<T>);

    impl<T: Copy + 'static> MapStorage<T> for VecStorage<T> {
        type Reference = usize;

        fn get(&self, node: usize) -> T {
            self.0[node]
        }

        fn get_mut(&mut self, node: usize) -> &mut T {
            &mut self.0[node]
        }
    }

    impl NodeReference for usize {}

    impl MapTrait for LineMap {
        type Reference = usize;
        type Storage<T: Default + Copy + Clone + 'static> = VecStorage<T>;

        fn is_traversable(&self, node: usize) -> bool {
            !self.blocked[node]
        }

        fn neighbors_of(&self, node: usize) -> impl Iterator<Item = (usize, f64)> {
            // edges to the next node and a skip edge two nodes ahead
            let mut points = Vec::new();
            for next in [node + 1, node + 2] {
                if next < self.costs.len() && self.is_traversable(next) {
                    points.push((next, self.costs[next] * (next - node) as f64));
                }
            }
            points.into_iter()
        }

        fn heuristic(&self, _from: usize, _to: usize) -> f64 {
            0.0
        }

        fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
            VecStorage(vec![Default::default(); self.costs.len()])
        }
    }

    #[test]
    fn test_cheapest_route() {
        let mut map = LineMap {
            costs: vec![1.0; 5],
            blocked: vec![false; 5],
        };
        // skipping over node 1 costs 2 either way, make node 2 expensive instead
        map.costs[2] = 5.0;

        let finder = PathFinder::new(0, 4, map.create_storage());
        let PathFinderState::PathFound(result) = finder.finish(&map).0 else {
            panic!("expected a path");
        };

        assert_eq!(result.path, vec![0, 1, 3, 4]);
        assert_eq!(result.total_cost, 4.0);
    }

    #[test]
    fn test_relaxed_node_uses_cheaper_predecessor() {
        // node 2 is first queued from 0 over the skip edge (g=6), then relaxed through 1 (g=4);
        // its first entry is popped after the node was expanded and must be dropped
        let map = LineMap {
            costs: vec![1.0, 1.0, 3.0, 10.0],
            blocked: vec![false; 4],
        };

        let (state, visited) = PathFinder::new(0, 3, map.create_storage()).finish(&map);
        let PathFinderState::PathFound(result) = state else {
            panic!("expected a path");
        };

        assert_eq!(result.path, vec![0, 1, 2, 3]);
        assert_eq!(result.total_cost, 14.0);
        assert_eq!(result.expanded, 4);
        assert_eq!(visited.get(2).unwrap().cost, 4.0);
        assert_eq!(visited.get(2).unwrap().from, Some(1));
    }

    #[test]
    fn test_blocked_goal() {
        let map = LineMap {
            costs: vec![1.0; 3],
            blocked: vec![false, false, true],
        };

        let finder = PathFinder::new(0, 2, map.create_storage());
        assert_eq!(finder.finish(&map).0, PathFinderState::NoPathFound);
    }

    #[test]
    fn test_blocked_start_equal_goal() {
        let map = LineMap {
            costs: vec![1.0],
            blocked: vec![true],
        };

        let finder = PathFinder::new(0, 0, map.create_storage());
        assert_eq!(finder.finish(&map).0, PathFinderState::NoPathFound);
    }

    #[test]
    fn test_unreachable() {
        let map = LineMap {
            costs: vec![1.0; 4],
            blocked: vec![false, true, true, false],
        };

        let mut finder = PathFinder::new(0, 3, map.create_storage());

        // first step expands the start, second one finds the frontier empty
        assert_eq!(finder.step(&map), PathFinderState::Computing);
        assert_eq!(finder.expanded(), 1);
        assert_eq!(finder.step(&map), PathFinderState::NoPathFound);
        assert_eq!(finder.state(), &PathFinderState::NoPathFound);
    }

    #[test]
    fn test_start_is_goal() {
        let map = LineMap {
            costs: vec![1.0; 2],
            blocked: vec![false; 2],
        };

        let finder = PathFinder::new(1, 1, map.create_storage());
        let PathFinderState::PathFound(result) = finder.finish(&map).0 else {
            panic!("expected a path");
        };
        assert_eq!(result.path, vec![1]);
        assert_eq!(result.total_cost, 0.0);
    }

    #[test]
    fn test_frontier_order() {
        let mut heap = BinaryHeap::new();
        let entry = |priority, heuristic, point| ToVisit {
            priority,
            heuristic,
            cost: 0.0,
            point,
        };
        heap.push(entry(2.0, 1.0, 0usize));
        heap.push(entry(1.0, 1.0, 5));
        heap.push(entry(1.0, 0.5, 7));
        heap.push(entry(1.0, 0.5, 3));

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|v| v.point)).collect();
        assert_eq!(order, vec![3, 7, 5, 0]);
    }
}
