use serde::{Deserialize, Serialize};

pub use crate::session::Role;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}
