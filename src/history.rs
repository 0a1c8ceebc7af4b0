//! Append-only log of every `update`/`revoke` this router has processed, and
//! the replay that rebuilds a route table from it.
//!
//! Rebuilding on revoke is the canonical way to undo an announcement here:
//! coalescing merges entries, so a single withdrawal may correspond to a
//! fragment of a coalesced prefix, and replaying history is how that
//! disaggregation happens without inverse-merge bookkeeping.

use chrono::{DateTime, Utc};

use crate::addr::{self, AddrError};
use crate::message::{RevokeBody, UpdateBody};
use crate::rib::{RouteEntry, RouteTable};

#[derive(Clone, Debug)]
enum Announcement {
    Update { from: String, body: UpdateBody },
    Revoke { from: String, body: RevokeBody },
}

#[derive(Clone, Debug)]
struct Record {
    #[allow(dead_code)] // carried for diagnostics only, not read by replay
    arrived: DateTime<Utc>,
    announcement: Announcement,
}

#[derive(Debug, Default)]
pub struct History {
    records: Vec<Record>,
}

impl History {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push_update(&mut self, from: String, body: UpdateBody) {
        self.records.push(Record {
            arrived: Utc::now(),
            announcement: Announcement::Update { from, body },
        });
    }

    pub fn push_revoke(&mut self, from: String, body: RevokeBody) {
        self.records.push(Record {
            arrived: Utc::now(),
            announcement: Announcement::Revoke { from, body },
        });
    }

    /// Rebuild a route table from scratch by replaying every recorded
    /// announcement in arrival order, then coalescing. Each `update` is
    /// reinserted from its pristine, pre-augmentation body so that
    /// replaying is idempotent -- the local ASN is appended exactly once
    /// per reconstruction, never accumulating across replays.
    pub fn replay(&self, local_asn: u32) -> Result<RouteTable, AddrError> {
        let mut table = RouteTable::new();
        for record in &self.records {
            match &record.announcement {
                Announcement::Update { from, body } => {
                    table.insert(RouteEntry::from_update(body, from.clone(), local_asn)?);
                }
                Announcement::Revoke { from, body } => {
                    for withdrawal in body {
                        let network = addr::to_u32(&withdrawal.network)?;
                        let netmask = addr::to_u32(&withdrawal.netmask)?;
                        table.remove_matching(network, netmask, from);
                    }
                }
            }
        }
        table.coalesce();
        Ok(table)
    }
}
