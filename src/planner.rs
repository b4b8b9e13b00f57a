//! Pickup-order planning over a small set of waypoints.
//!
//! The planner is exhaustive: it measures every permutation of the waypoint
//! indices in lexicographic order and keeps the first one with a strictly
//! shorter total length. Cost is O(n!), so it is only meant for the handful
//! of pickup locations a single order touches.

use crate::types::Coordinates2D;

/// Total length of `start -> waypoints[order[0]] -> ... -> end`.
///
/// An empty `order` measures the direct leg from `start` to `end`.
pub fn path_length(
    start: &Coordinates2D,
    waypoints: &[Coordinates2D],
    end: &Coordinates2D,
    order: &[usize],
) -> f64 {
    let mut length = 0.0;
    let mut current = start;
    for &index in order {
        let next = &waypoints[index];
        length += current.distance_to(next);
        current = next;
    }
    length + current.distance_to(end)
}

/// Visiting order over `waypoints` that minimizes the total path length from
/// `start` to `end`. Ties resolve to the lexicographically earliest order.
pub fn plan(start: &Coordinates2D, waypoints: &[Coordinates2D], end: &Coordinates2D) -> Vec<usize> {
    if waypoints.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..waypoints.len()).collect();
    let mut best = order.clone();
    let mut best_length = f64::INFINITY;
    loop {
        let length = path_length(start, waypoints, end, &order);
        if length < best_length {
            best_length = length;
            best.copy_from_slice(&order);
        }
        if !next_permutation(&mut order) {
            break;
        }
    }
    best
}

/// Rearrange `values` into the next lexicographically greater permutation.
/// Returns `false` (leaving `values` sorted ascending) once the last
/// permutation has been passed.
fn next_permutation<T: Ord>(values: &mut [T]) -> bool {
    if values.len() < 2 {
        return false;
    }
    let mut pivot = values.len() - 1;
    while pivot > 0 && values[pivot - 1] >= values[pivot] {
        pivot -= 1;
    }
    if pivot == 0 {
        values.reverse();
        return false;
    }
    let mut successor = values.len() - 1;
    while values[successor] <= values[pivot - 1] {
        successor -= 1;
    }
    values.swap(pivot - 1, successor);
    values[pivot..].reverse();
    true
}
