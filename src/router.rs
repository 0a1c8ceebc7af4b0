//! Mutates the route table from incoming `update`/`revoke` messages, fans
//! out advertisements, replies to `dump`, and forwards `data` packets. One
//! `Router` owns all mutable state; the dispatcher is its only caller, so
//! no locking is needed.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::json;

use crate::addr::{self, AddrError};
use crate::error::RouterError;
use crate::forwarder;
use crate::history::History;
use crate::message::{Envelope, RevokeBody, TableEntry, UpdateBody, Withdrawal};
use crate::neighbor::NeighborConfig;
use crate::policy;
use crate::rib::{RouteEntry, RouteTable};

pub struct Router {
    asn: u32,
    neighbors: HashMap<String, NeighborConfig>,
    history: History,
    table: RouteTable,
}

impl Router {
    pub fn new(asn: u32, neighbors: Vec<NeighborConfig>) -> Self {
        let neighbors = neighbors.into_iter().map(|n| (n.name.clone(), n)).collect();
        Self {
            asn,
            neighbors,
            history: History::new(),
            table: RouteTable::new(),
        }
    }

    /// This router's autonomous system number.
    pub fn asn(&self) -> u32 {
        self.asn
    }

    /// Dispatch one inbound frame, identified by the ingress channel `from`
    /// (never the envelope's `src` field, which is just message payload and
    /// not a reliable channel identity). Returns the set of (destination
    /// neighbor, envelope) pairs to send out.
    pub fn handle(
        &mut self,
        from: &str,
        envelope: Envelope,
    ) -> Result<Vec<(String, Envelope)>, RouterError> {
        match envelope.kind.as_str() {
            "update" => self.handle_update(from, envelope),
            "revoke" => self.handle_revoke(from, envelope),
            "data" => self.handle_data(from, envelope),
            "dump" => self.handle_dump(from, envelope),
            other => {
                warn!("dropping message of unknown type '{}' from {}", other, from);
                Ok(Vec::new())
            }
        }
    }

    fn neighbor(&self, name: &str) -> Result<&NeighborConfig, RouterError> {
        self.neighbors
            .get(name)
            .ok_or_else(|| RouterError::UnknownNeighbor(name.to_string()))
    }

    /// Neighbors an announcement from `from` should be re-advertised to, or
    /// a data packet from `from` may cross to: everyone but `from` itself,
    /// filtered by `policy::permits`.
    fn propagation_targets(&self, from: &str) -> Vec<String> {
        let ingress = match self.neighbors.get(from) {
            Some(n) => n.relation,
            None => return Vec::new(),
        };
        self.neighbors
            .values()
            .filter(|n| n.name != from && policy::permits(ingress, n.relation))
            .map(|n| n.name.clone())
            .collect()
    }

    fn handle_update(
        &mut self,
        from: &str,
        envelope: Envelope,
    ) -> Result<Vec<(String, Envelope)>, RouterError> {
        let body: UpdateBody = serde_json::from_value(envelope.msg)?;
        let entry = match RouteEntry::from_update(&body, from.to_string(), self.asn) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("rejecting update from {}: {}", from, err);
                return Ok(Vec::new());
            }
        };

        self.history.push_update(from.to_string(), body.clone());
        self.table.insert(entry);
        self.table.coalesce();
        debug!(
            "table has {} entries after update from {}",
            self.table.len(),
            from
        );

        let mut forwarded_as_path = vec![self.asn];
        forwarded_as_path.extend(body.as_path.iter().copied());
        let forwarded_body = UpdateBody {
            as_path: forwarded_as_path,
            ..body
        };
        let msg = serde_json::to_value(&forwarded_body)?;

        let router_addr = self.neighbor(from)?.router_addr_dotted();
        let targets = self.propagation_targets(from);
        debug!("propagating update from {} to {} neighbors", from, targets.len());
        Ok(targets
            .into_iter()
            .map(|target| (target.clone(), Envelope::new(router_addr.clone(), target, "update", msg.clone())))
            .collect())
    }

    fn handle_revoke(
        &mut self,
        from: &str,
        envelope: Envelope,
    ) -> Result<Vec<(String, Envelope)>, RouterError> {
        let body: RevokeBody = serde_json::from_value(envelope.msg)?;
        if let Err(err) = validate_withdrawals(&body) {
            warn!("rejecting revoke from {}: {}", from, err);
            return Ok(Vec::new());
        }

        self.history.push_revoke(from.to_string(), body.clone());
        self.table = self
            .history
            .replay(self.asn)
            .expect("history only ever contains announcements already validated on arrival");
        debug!(
            "table has {} entries after revoke from {}",
            self.table.len(),
            from
        );

        let router_addr = self.neighbor(from)?.router_addr_dotted();
        let targets = self.propagation_targets(from);
        let msg = serde_json::to_value(&body)?;
        Ok(targets
            .into_iter()
            .map(|target| (target.clone(), Envelope::new(router_addr.clone(), target, "revoke", msg.clone())))
            .collect())
    }

    fn handle_dump(
        &mut self,
        from: &str,
        envelope: Envelope,
    ) -> Result<Vec<(String, Envelope)>, RouterError> {
        let entries: Vec<TableEntry> = self
            .table
            .snapshot()
            .into_iter()
            .map(|e| TableEntry {
                network: addr::to_dotted(e.network),
                netmask: addr::to_dotted(e.netmask),
                peer: e.peer.clone(),
            })
            .collect();
        let msg = serde_json::to_value(&entries)?;
        // Reply only to the requester, swapping src/dst of the request.
        Ok(vec![(
            from.to_string(),
            Envelope::new(envelope.dst, envelope.src, "table", msg),
        )])
    }

    fn handle_data(
        &mut self,
        from: &str,
        envelope: Envelope,
    ) -> Result<Vec<(String, Envelope)>, RouterError> {
        let dest = match addr::to_u32(&envelope.dst) {
            Ok(dest) => dest,
            Err(_) => return Ok(vec![self.no_route(from, &envelope)?]),
        };

        let candidates = self.table.lookup(dest);
        let best = match forwarder::select_best(candidates) {
            Some(entry) => entry,
            None => return Ok(vec![self.no_route(from, &envelope)?]),
        };

        let ingress_relation = self.neighbor(from)?.relation;
        let egress_relation = self.neighbor(&best.peer)?.relation;
        if !policy::permits(ingress_relation, egress_relation) {
            return Ok(vec![self.no_route(from, &envelope)?]);
        }

        debug!("forwarding data for {} via {}", envelope.dst, best.peer);
        let peer = best.peer.clone();
        Ok(vec![(peer, envelope)])
    }

    fn no_route(&self, from: &str, envelope: &Envelope) -> Result<(String, Envelope), RouterError> {
        warn!("no route to {} from {}", envelope.dst, from);
        let router_addr = self.neighbor(from)?.router_addr_dotted();
        Ok((
            from.to_string(),
            Envelope::new(router_addr, envelope.src.clone(), "no route", json!({})),
        ))
    }
}

fn validate_withdrawals(withdrawals: &[Withdrawal]) -> Result<(), AddrError> {
    for w in withdrawals {
        let netmask = addr::to_u32(&w.netmask)?;
        addr::prefix_len(netmask)?;
        addr::to_u32(&w.network)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Relation;

    fn router_with(neighbors: &[(&str, Relation)]) -> Router {
        let configs = neighbors
            .iter()
            .map(|(name, relation)| NeighborConfig::new(name.to_string(), *relation).unwrap())
            .collect();
        Router::new(1, configs)
    }

    fn update_envelope(src: &str, network: &str, netmask: &str, localpref: u32) -> Envelope {
        Envelope::new(
            src,
            "192.168.0.1",
            "update",
            json!({
                "network": network,
                "netmask": netmask,
                "localpref": localpref,
                "selfOrigin": true,
                "ASPath": [2],
                "origin": "EGP",
            }),
        )
    }

    #[test]
    fn test_scenario_basic_update_and_dump() {
        let mut router = router_with(&[("192.168.0.2", Relation::Customer)]);
        router
            .handle(
                "192.168.0.2",
                update_envelope("192.168.0.2", "10.0.0.0", "255.255.0.0", 100),
            )
            .unwrap();

        let dump = Envelope::new("192.168.0.2", "192.168.0.1", "dump", json!({}));
        let replies = router.handle("192.168.0.2", dump).unwrap();
        assert_eq!(replies.len(), 1);
        let (to, reply) = &replies[0];
        assert_eq!(to, "192.168.0.2");
        assert_eq!(reply.kind, "table");
        let entries: Vec<TableEntry> = serde_json::from_value(reply.msg.clone()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].network, "10.0.0.0");
        assert_eq!(entries[0].netmask, "255.255.0.0");
        assert_eq!(entries[0].peer, "192.168.0.2");
    }

    #[test]
    fn test_scenario_longest_prefix_forwarding() {
        let mut router = router_with(&[
            ("1.1.1.1", Relation::Customer),
            ("2.2.2.2", Relation::Customer),
            ("3.3.3.3", Relation::Customer),
        ]);
        router
            .handle("1.1.1.1", update_envelope("1.1.1.1", "10.0.0.0", "255.0.0.0", 100))
            .unwrap();
        router
            .handle("2.2.2.2", update_envelope("2.2.2.2", "10.1.0.0", "255.255.0.0", 100))
            .unwrap();

        let data = Envelope::new("3.3.3.3", "10.1.2.3", "data", json!({"payload": "x"}));
        let replies = router.handle("3.3.3.3", data).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, "2.2.2.2");
    }

    #[test]
    fn test_scenario_tie_break_by_localpref() {
        let mut router = router_with(&[
            ("1.1.1.1", Relation::Customer),
            ("2.2.2.2", Relation::Customer),
            ("3.3.3.3", Relation::Customer),
        ]);
        router
            .handle("1.1.1.1", update_envelope("1.1.1.1", "10.0.0.0", "255.0.0.0", 100))
            .unwrap();
        router
            .handle("2.2.2.2", update_envelope("2.2.2.2", "10.0.0.0", "255.0.0.0", 200))
            .unwrap();

        let data = Envelope::new("3.3.3.3", "10.5.5.5", "data", json!({}));
        let replies = router.handle("3.3.3.3", data).unwrap();
        assert_eq!(replies[0].0, "2.2.2.2");
    }

    #[test]
    fn test_scenario_policy_drop_yields_no_route() {
        let mut router = router_with(&[("1.1.1.1", Relation::Peer), ("2.2.2.2", Relation::Peer)]);
        router
            .handle("2.2.2.2", update_envelope("2.2.2.2", "10.0.0.0", "255.0.0.0", 100))
            .unwrap();

        let data = Envelope::new("1.1.1.1", "10.5.5.5", "data", json!({}));
        let replies = router.handle("1.1.1.1", data).unwrap();
        assert_eq!(replies.len(), 1);
        let (to, reply) = &replies[0];
        assert_eq!(to, "1.1.1.1");
        assert_eq!(reply.kind, "no route");
        assert_eq!(reply.dst, "1.1.1.1");
    }

    #[test]
    fn test_scenario_coalesce_and_revoke() {
        let mut router = router_with(&[("192.168.0.2", Relation::Customer)]);
        router
            .handle(
                "192.168.0.2",
                update_envelope("192.168.0.2", "192.0.0.0", "255.255.255.0", 100),
            )
            .unwrap();
        router
            .handle(
                "192.168.0.2",
                update_envelope("192.168.0.2", "192.0.1.0", "255.255.255.0", 100),
            )
            .unwrap();

        let dump = Envelope::new("192.168.0.2", "192.168.0.1", "dump", json!({}));
        let replies = router.handle("192.168.0.2", dump.clone()).unwrap();
        let entries: Vec<TableEntry> = serde_json::from_value(replies[0].1.msg.clone()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].netmask, "255.255.254.0");

        let revoke = Envelope::new(
            "192.168.0.2",
            "192.168.0.1",
            "revoke",
            json!([{"network": "192.0.1.0", "netmask": "255.255.255.0"}]),
        );
        router.handle("192.168.0.2", revoke).unwrap();

        let replies = router.handle("192.168.0.2", dump).unwrap();
        let entries: Vec<TableEntry> = serde_json::from_value(replies[0].1.msg.clone()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].network, "192.0.0.0");
        assert_eq!(entries[0].netmask, "255.255.255.0");
    }

    #[test]
    fn test_unknown_message_type_is_dropped() {
        let mut router = router_with(&[("1.1.1.1", Relation::Customer)]);
        let envelope = Envelope::new("1.1.1.1", "192.168.0.1", "keepalive", json!({}));
        let replies = router.handle("1.1.1.1", envelope).unwrap();
        assert!(replies.is_empty());
    }
}
