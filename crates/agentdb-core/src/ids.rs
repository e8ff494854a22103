use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an agent. Doubles as the file stem of the agent's database,
/// so only `[A-Za-z0-9_-]` is accepted.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid agent_id {raw:?}: only ASCII letters, digits, '-' and '_' are allowed")]
pub struct InvalidAgentId {
    pub raw: String,
}

impl AgentId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidAgentId> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw))
        } else {
            Err(InvalidAgentId { raw })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AgentId {
    type Err = InvalidAgentId;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AgentId {
    type Error = InvalidAgentId;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ids() {
        for raw in ["alice", "agent-7", "research_bot", "A1"] {
            let id = AgentId::parse(raw).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(AgentId::parse("../../").is_err());
        assert!(AgentId::parse("a/b").is_err());
        assert!(AgentId::parse("alice.db").is_err());
    }

    #[test]
    fn rejects_empty() {
        let err = AgentId::parse("").unwrap_err();
        assert_eq!(err.raw, "");
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id: AgentId = "bob".parse().unwrap();
        assert_eq!(id.to_string(), "bob");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let id: AgentId = serde_json::from_str(r#""carol""#).unwrap();
        assert_eq!(id.as_str(), "carol");
        assert!(serde_json::from_str::<AgentId>(r#""car ol""#).is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""carol""#);
    }
}
