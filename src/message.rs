//! The JSON wire schema exchanged over neighbor channels.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outermost frame exchanged over every neighbor channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub msg: Value,
}

impl Envelope {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, kind: &str, msg: Value) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            kind: kind.to_string(),
            msg,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "IGP")]
    Igp,
    #[serde(rename = "EGP")]
    Egp,
    #[serde(rename = "UNK")]
    Unk,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateBody {
    pub network: String,
    pub netmask: String,
    pub localpref: u32,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    pub origin: Origin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Withdrawal {
    pub network: String,
    pub netmask: String,
}

pub type RevokeBody = Vec<Withdrawal>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableEntry {
    pub network: String,
    pub netmask: String,
    pub peer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_roundtrip() {
        let raw = r#"{"src":"192.168.0.2","dst":"192.168.0.1","type":"update","msg":{
            "network":"10.0.0.0","netmask":"255.255.0.0","localpref":100,
            "selfOrigin":true,"ASPath":[2],"origin":"EGP"
        }}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.kind, "update");
        let body: UpdateBody = serde_json::from_value(envelope.msg).unwrap();
        assert_eq!(body.network, "10.0.0.0");
        assert_eq!(body.origin, Origin::Egp);
        assert_eq!(body.as_path, vec![2]);
    }

    #[test]
    fn test_revoke_body_is_array() {
        let raw = r#"[{"network":"192.0.1.0","netmask":"255.255.255.0"}]"#;
        let body: RevokeBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].network, "192.0.1.0");
    }
}
