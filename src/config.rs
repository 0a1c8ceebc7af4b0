//! Command-line configuration: a `clap`-derive CLI that parses the
//! `asn neighbor...` positional arguments into a validated `RouterConfig`.

use std::fmt;

use clap::Parser;

use crate::neighbor::NeighborConfig;
use crate::policy::Relation;

#[derive(Debug)]
pub enum ConfigError {
    BadNeighbor(String),
    BadRelation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::BadNeighbor(reason) => write!(f, "invalid neighbor argument: {}", reason),
            ConfigError::BadRelation(reason) => write!(f, "invalid relation: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Parser, Debug)]
#[clap(name = "bgpd", about = "A simplified inter-AS routing daemon")]
struct Cli {
    /// This router's autonomous system number.
    asn: u32,

    /// One entry per neighbor, formatted `addr-relation` (e.g.
    /// `192.168.0.2-cust`).
    #[clap(required = true)]
    neighbors: Vec<String>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,
}

pub struct RouterConfig {
    pub asn: u32,
    pub neighbors: Vec<NeighborConfig>,
}

/// Parse `std::env::args`, returning the router configuration and the log
/// level it implies.
pub fn from_args() -> Result<(RouterConfig, log::LevelFilter), ConfigError> {
    let cli = Cli::parse();
    let neighbors = cli
        .neighbors
        .iter()
        .map(|raw| parse_neighbor(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    Ok((
        RouterConfig {
            asn: cli.asn,
            neighbors,
        },
        level,
    ))
}

/// Parse one `addr-relation` argument, e.g. `192.168.0.2-cust`.
fn parse_neighbor(raw: &str) -> Result<NeighborConfig, ConfigError> {
    let (addr, relation) = raw
        .rsplit_once('-')
        .ok_or_else(|| ConfigError::BadNeighbor(raw.to_string()))?;
    let relation: Relation = relation
        .parse()
        .map_err(|err: String| ConfigError::BadRelation(err))?;
    NeighborConfig::new(addr.to_string(), relation)
        .map_err(|err| ConfigError::BadNeighbor(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_neighbor_valid() {
        let neighbor = parse_neighbor("192.168.0.2-cust").unwrap();
        assert_eq!(neighbor.name, "192.168.0.2");
        assert_eq!(neighbor.relation, Relation::Customer);
    }

    #[test]
    fn test_parse_neighbor_rejects_missing_relation() {
        assert!(parse_neighbor("192.168.0.2").is_err());
    }

    #[test]
    fn test_parse_neighbor_rejects_bad_relation() {
        assert!(parse_neighbor("192.168.0.2-bogus").is_err());
    }
}
