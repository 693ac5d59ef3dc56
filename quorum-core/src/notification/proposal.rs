use rst_common::standard::serde::{self, Deserialize};
use rst_common::standard::serde_json::{self, Value};

use crate::codec::Ked;
use crate::relay::exchanging::routes;

use super::types::NotificationError;

/// A proposed group inception, `ked` is the inception event built by the proposer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(crate = "self::serde")]
pub struct InceptionProposal {
    pub smids: Vec<String>,

    #[serde(default)]
    pub rmids: Option<Vec<String>>,
    pub ked: Ked,

    /// The `exn` that carried the proposal, when there is one
    #[serde(default)]
    pub d: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(crate = "self::serde")]
pub struct InteractionProposal {
    pub gid: String,

    #[serde(alias = "aids")]
    pub smids: Vec<String>,

    #[serde(default)]
    pub rmids: Option<Vec<String>>,

    #[serde(default)]
    pub data: Vec<Value>,

    #[serde(default)]
    pub d: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RotationProposal {
    pub smids: Vec<String>,

    #[serde(default)]
    pub rmids: Option<Vec<String>>,
    pub ked: Ked,

    #[serde(default)]
    pub d: Option<String>,
}

/// Reference to a stored `exn` whose payload and embeds describe the proposal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ExchangeRef {
    pub d: String,
}

/// Every kind of proposal the confirmation loop knows how to handle
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Inception(InceptionProposal),
    Interaction(InteractionProposal),
    Rotation(RotationProposal),
    EndRole(ExchangeRef),
    RegistryInception(ExchangeRef),
    Issuance(ExchangeRef),
    Revocation(ExchangeRef),
    PeerExchange(ExchangeRef),

    /// Route without a handler, the notice is left alone
    Unhandled(String),
}

fn typed<T>(attrs: &Ked) -> Result<T, NotificationError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(Value::Object(attrs.clone()))
        .map_err(|err| NotificationError::InvalidProposal(err.to_string()))
}

impl Proposal {
    /// Parse the attributes of a notice, dispatching on the route `r`
    pub fn parse(attrs: &Ked) -> Result<Self, NotificationError> {
        let route = attrs
            .get("r")
            .and_then(|val| val.as_str())
            .ok_or(NotificationError::InvalidProposal("missing route".to_string()))?;

        let proposal = match route {
            routes::ICP => Proposal::Inception(typed(attrs)?),
            routes::IXN => Proposal::Interaction(typed(attrs)?),
            routes::ROT => Proposal::Rotation(typed(attrs)?),
            routes::RPY => Proposal::EndRole(typed(attrs)?),
            routes::VCP => Proposal::RegistryInception(typed(attrs)?),
            routes::ISS => Proposal::Issuance(typed(attrs)?),
            routes::REV => Proposal::Revocation(typed(attrs)?),
            routes::EXN => Proposal::PeerExchange(typed(attrs)?),
            other => Proposal::Unhandled(other.to_string()),
        };

        Ok(proposal)
    }

    pub fn route(&self) -> &str {
        match self {
            Proposal::Inception(_) => routes::ICP,
            Proposal::Interaction(_) => routes::IXN,
            Proposal::Rotation(_) => routes::ROT,
            Proposal::EndRole(_) => routes::RPY,
            Proposal::RegistryInception(_) => routes::VCP,
            Proposal::Issuance(_) => routes::ISS,
            Proposal::Revocation(_) => routes::REV,
            Proposal::PeerExchange(_) => routes::EXN,
            Proposal::Unhandled(route) => route,
        }
    }
}
