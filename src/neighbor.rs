//! Static, startup-derived metadata for one neighbor link. Neighbor entries
//! are fixed for the lifetime of the process.

use crate::addr::{self, AddrError};
use crate::policy::Relation;

#[derive(Clone, Debug)]
pub struct NeighborConfig {
    /// Dotted-quad channel name; doubles as the neighbor's address.
    pub name: String,
    pub addr: u32,
    pub relation: Relation,
    /// This router's address on that link: `addr` with its final octet
    /// replaced by `1`.
    pub router_addr: u32,
}

impl NeighborConfig {
    pub fn new(name: String, relation: Relation) -> Result<Self, AddrError> {
        let addr = addr::to_u32(&name)?;
        Ok(Self {
            name,
            addr,
            relation,
            router_addr: addr::router_side(addr),
        })
    }

    pub fn router_addr_dotted(&self) -> String {
        addr::to_dotted(self.router_addr)
    }
}
