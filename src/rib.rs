//! The router's forwarding table: longest-prefix lookup and the coalescing
//! fixed point.

use itertools::Itertools;

use crate::addr::{self, AddrError};
use crate::message::{Origin, UpdateBody};

#[derive(Clone, Debug, PartialEq)]
pub struct RouteEntry {
    pub network: u32,
    pub netmask: u32,
    pub peer: String,
    pub localpref: u32,
    pub self_origin: bool,
    pub as_path: Vec<u32>,
    pub origin: Origin,
}

impl RouteEntry {
    /// Build the entry this router stores for its own table from an inbound
    /// `update` body. The local ASN is *appended*, not prepended -- the
    /// forwarded copy (built separately in `router::handle_update`) prepends
    /// it instead, so the two augmentations never compound.
    pub fn from_update(body: &UpdateBody, peer: String, local_asn: u32) -> Result<Self, AddrError> {
        let network = addr::to_u32(&body.network)?;
        let netmask = addr::to_u32(&body.netmask)?;
        addr::prefix_len(netmask)?; // rejects non-contiguous masks here, at ingestion
        let mut as_path = body.as_path.clone();
        as_path.push(local_asn);
        Ok(Self {
            network: network & netmask,
            netmask,
            peer,
            localpref: body.localpref,
            self_origin: body.self_origin,
            as_path,
            origin: body.origin,
        })
    }

    fn attrs_eq(&self, other: &Self) -> bool {
        self.localpref == other.localpref
            && self.self_origin == other.self_origin
            && self.as_path == other.as_path
            && self.peer == other.peer
            && self.origin == other.origin
    }
}

/// Unordered collection of route entries, fed exclusively by history replay.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append without deduplication -- callers feed the table from history,
    /// so duplicate resistance is `coalesce`'s concern.
    pub fn insert(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn remove_matching(&mut self, network: u32, netmask: u32, peer: &str) {
        self.entries
            .retain(|e| !(e.network == network && e.netmask == netmask && e.peer == peer));
    }

    /// All entries tied for the longest prefix matching `dest`; empty if
    /// none match.
    pub fn lookup(&self, dest: u32) -> Vec<&RouteEntry> {
        let matching: Vec<&RouteEntry> = self
            .entries
            .iter()
            .filter(|e| addr::matches(dest, e.network, e.netmask))
            .collect();
        let longest = match matching.iter().map(|e| e.netmask.count_ones()).max() {
            Some(longest) => longest,
            None => return Vec::new(),
        };
        matching
            .into_iter()
            .filter(|e| e.netmask.count_ones() == longest)
            .collect()
    }

    /// Exhaustively merge adjacent pairs until no mergeable pair remains.
    /// Rebuilds the entry list each pass rather than mutating the vector
    /// being iterated, since removing a merged pair by index while also
    /// scanning for the next pair would invalidate those same indices.
    pub fn coalesce(&mut self) {
        while let Some((i, j, merged)) = self.find_adjacent_pair() {
            let mut next = Vec::with_capacity(self.entries.len() - 1);
            for (idx, entry) in self.entries.drain(..).enumerate() {
                if idx != i && idx != j {
                    next.push(entry);
                }
            }
            next.push(merged);
            self.entries = next;
        }
    }

    fn find_adjacent_pair(&self) -> Option<(usize, usize, RouteEntry)> {
        for (i, a) in self.entries.iter().enumerate() {
            for (j, b) in self.entries.iter().enumerate().skip(i + 1) {
                if let Some(merged) = adjacent_merge(a, b) {
                    return Some((i, j, merged));
                }
            }
        }
        None
    }

    /// Current entries in a deterministic order, for `table` replies and
    /// tests.
    pub fn snapshot(&self) -> Vec<&RouteEntry> {
        self.entries
            .iter()
            .sorted_by_key(|e| (e.network, e.netmask, e.peer.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// If `a` and `b` are adjacent -- same mask, same other attributes, and
/// networks equal under the shortened mask but not under the full mask --
/// return their merger. Both networks are assumed already canonicalized
/// (masked by their own netmask) by `RouteEntry::from_update`.
fn adjacent_merge(a: &RouteEntry, b: &RouteEntry) -> Option<RouteEntry> {
    if a.netmask != b.netmask || a.network == b.network || !a.attrs_eq(b) {
        return None;
    }
    let prefix_len = addr::prefix_len(a.netmask).ok()?;
    if prefix_len == 0 {
        return None; // already /0, nothing shorter to merge into
    }
    let shortened = addr::shorten(a.netmask);
    if (a.network & shortened) != (b.network & shortened) {
        return None;
    }
    Some(RouteEntry {
        network: a.network & shortened,
        netmask: shortened,
        peer: a.peer.clone(),
        localpref: a.localpref,
        self_origin: a.self_origin,
        as_path: a.as_path.clone(),
        origin: a.origin,
    })
}
