//! The best-path selection cascade. Each stage keeps only its own winners
//! and is never emptying: a stage that would leave nothing is skipped and
//! the previous set is kept.

use crate::addr;
use crate::message::Origin;
use crate::rib::RouteEntry;

/// Narrow a non-empty candidate set down to the single winning route.
/// Returns `None` only if `candidates` was empty.
pub fn select_best<'a>(candidates: Vec<&'a RouteEntry>) -> Option<&'a RouteEntry> {
    if candidates.is_empty() {
        return None;
    }

    let by_localpref = keep_max_by(candidates, |e| e.localpref);
    let by_self_origin = keep_self_originated(by_localpref);
    let by_as_path = keep_min_by(by_self_origin, |e| e.as_path.len());
    let by_origin = keep_best_origin(by_as_path);
    let by_lowest_ip = keep_min_by(by_origin, |e| addr::to_u32(&e.peer).unwrap_or(u32::MAX));

    by_lowest_ip.into_iter().next()
}

fn keep_max_by<'a, K: Ord>(
    items: Vec<&'a RouteEntry>,
    key: impl Fn(&RouteEntry) -> K,
) -> Vec<&'a RouteEntry> {
    let max = items.iter().map(|e| key(e)).max().expect("non-empty");
    items.into_iter().filter(|e| key(e) == max).collect()
}

fn keep_min_by<'a, K: Ord>(
    items: Vec<&'a RouteEntry>,
    key: impl Fn(&RouteEntry) -> K,
) -> Vec<&'a RouteEntry> {
    let min = items.iter().map(|e| key(e)).min().expect("non-empty");
    items.into_iter().filter(|e| key(e) == min).collect()
}

fn keep_self_originated(items: Vec<&RouteEntry>) -> Vec<&RouteEntry> {
    let self_originated: Vec<&RouteEntry> = items.iter().copied().filter(|e| e.self_origin).collect();
    if self_originated.is_empty() {
        items
    } else {
        self_originated
    }
}

fn keep_best_origin(items: Vec<&RouteEntry>) -> Vec<&RouteEntry> {
    for preferred in [Origin::Igp, Origin::Egp, Origin::Unk] {
        let matching: Vec<&RouteEntry> = items.iter().copied().filter(|e| e.origin == preferred).collect();
        if !matching.is_empty() {
            return matching;
        }
    }
    items
}
