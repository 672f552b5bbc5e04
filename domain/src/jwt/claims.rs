//! Claims carried by the login tokens issued in `domain::jwt`.

use serde::{Deserialize, Serialize};

/// Claims for a login token.
///
/// `sub` is the user id and `username` is carried alongside so a verified
/// token is enough to attribute messages without a store lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: u64,
    pub exp: u64,
}
