use std::collections::VecDeque;

use super::model::Candidate;
use super::neighborhood::Move;

/// Picks the best-scoring move from `candidates` (sorted ascending by
/// cost), skipping tabu moves unless the aspiration criterion is met: the
/// candidate's cost is within `aspiration_threshold` of `best_so_far` and
/// it doesn't overlap the immediately preceding move (prevents the search
/// from flapping between two moves).
pub fn choose_best_candidate(
    candidates: &[(f64, Move)],
    tabu_list: &VecDeque<(usize, usize)>,
    best_so_far_cost: f64,
    aspiration_threshold: f64,
    parent_key: Option<(usize, usize)>,
    current: &Candidate,
) -> Option<(f64, Move)> {
    if candidates.is_empty() {
        return None;
    }

    let top = candidates[0];
    let top_key = top.1.key(current);

    if !tabu_list.contains(&top_key) {
        return Some(top);
    }

    let within_aspiration = (best_so_far_cost - aspiration_threshold..=best_so_far_cost + aspiration_threshold)
        .contains(&top.0);
    let overlaps_parent = parent_key.map(|p| keys_overlap(&top_key, &p)).unwrap_or(false);

    if within_aspiration && !overlaps_parent {
        return Some(top);
    }

    candidates
        .iter()
        .find(|(_, mv)| {
            let key = mv.key(current);
            !tabu_list.contains(&key) && !parent_key.map(|p| keys_overlap(&key, &p)).unwrap_or(false)
        })
        .copied()
        .or(Some(top))
}

fn keys_overlap(a: &(usize, usize), b: &(usize, usize)) -> bool {
    a.0 == b.0 || a.0 == b.1 || a.1 == b.0 || a.1 == b.1
}

/// Inserts `key` at the front of `tabu_list`, evicting from the back until
/// the list is no longer than `max_len`.
pub fn insert_and_adjust_tabu_list(tabu_list: &mut VecDeque<(usize, usize)>, key: (usize, usize), max_len: usize) {
    tabu_list.push_front(key);
    while tabu_list.len() > max_len {
        tabu_list.pop_back();
    }
}
