use serde::{Deserialize, Serialize};

use crate::connection::ConnectionId;
use crate::error::{Error, ErrorKind};

/// Sender id used on the wire for connections with no bound identity.
pub const ANONYMOUS_SENDER_ID: &str = "anonymous";
/// Display name used on the wire for connections with no bound identity.
pub const ANONYMOUS_SENDER_NAME: &str = "Anonymous";

/// An authenticated user identity as supplied by the identity source.
///
/// The chat core treats both fields as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Who a relayed message is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    User(Identity),
    Anonymous,
}

impl Sender {
    pub fn id(&self) -> &str {
        match self {
            Sender::User(identity) => &identity.id,
            Sender::Anonymous => ANONYMOUS_SENDER_ID,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Sender::User(identity) => &identity.username,
            Sender::Anonymous => ANONYMOUS_SENDER_NAME,
        }
    }
}

impl From<Option<Identity>> for Sender {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Sender::Anonymous, Sender::User)
    }
}

/// Per-connection identity state machine.
///
/// `Anonymous -> Authenticated` is the only legal transition. Logging out is
/// modeled as closing the connection and opening a new anonymous one, so there
/// is no way back to `Anonymous` here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityState {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl IdentityState {
    pub(crate) fn bind(&mut self, connection_id: &ConnectionId, identity: Identity) -> Result<(), Error> {
        match self {
            IdentityState::Anonymous => {
                *self = IdentityState::Authenticated(identity);
                Ok(())
            }
            IdentityState::Authenticated(_) => Err(Error::new(ErrorKind::IdentityAlreadyBound(
                connection_id.clone(),
            ))),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            IdentityState::Anonymous => None,
            IdentityState::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, IdentityState::Authenticated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_connection_binds_once() {
        let connection_id = ConnectionId::new();
        let mut state = IdentityState::default();
        assert!(!state.is_authenticated());

        state
            .bind(&connection_id, Identity::new("u1", "alice"))
            .unwrap();
        assert_eq!(state.identity(), Some(&Identity::new("u1", "alice")));
    }

    #[test]
    fn second_bind_is_rejected_and_keeps_first_identity() {
        let connection_id = ConnectionId::new();
        let mut state = IdentityState::default();
        state
            .bind(&connection_id, Identity::new("u1", "alice"))
            .unwrap();

        let err = state
            .bind(&connection_id, Identity::new("u2", "bob"))
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::IdentityAlreadyBound(connection_id.clone())
        );
        assert_eq!(state.identity().map(|i| i.id.as_str()), Some("u1"));
    }

    #[test]
    fn anonymous_sender_uses_fixed_marker() {
        let sender = Sender::from(None);
        assert_eq!(sender.id(), ANONYMOUS_SENDER_ID);
        assert_eq!(sender.display_name(), ANONYMOUS_SENDER_NAME);

        let sender = Sender::from(Some(Identity::new("u1", "alice")));
        assert_eq!(sender.id(), "u1");
        assert_eq!(sender.display_name(), "alice");
    }
}
