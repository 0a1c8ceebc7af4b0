//! Commercial relationships between this router and its neighbors, and the
//! single predicate that governs both data forwarding and announcement
//! propagation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Relation {
    Customer,
    Peer,
    Provider,
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cust" => Ok(Relation::Customer),
            "peer" => Ok(Relation::Peer),
            "prov" => Ok(Relation::Provider),
            other => Err(format!(
                "unknown relation '{}', expected cust/peer/prov",
                other
            )),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            Relation::Customer => "cust",
            Relation::Peer => "peer",
            Relation::Provider => "prov",
        };
        write!(f, "{}", word)
    }
}

/// Does an announcement or packet arriving on a link with relation
/// `ingress` cross to a link with relation `egress`?
///
/// Forward iff either side is a customer link.
pub fn permits(ingress: Relation, egress: Relation) -> bool {
    ingress == Relation::Customer || egress == Relation::Customer
}
