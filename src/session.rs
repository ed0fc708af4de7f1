use std::{collections::HashSet, sync::Arc};

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config, filter,
    store::{
        ticket::{by_identifier, Collection, Snapshot, Ticket},
        RequestNum,
    },
};

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Sees every ticket.
    #[display("admin")]
    Admin,

    /// Sees tickets assigned to, or completed by, them.
    #[display("locator")]
    Locator,

    /// Sees tickets they requested as the excavator.
    #[display("contractor")]
    Contractor,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    pub role: Role,
    pub username: String,
}

#[derive(Clone, Copy, Debug, Display, Error, PartialEq)]
#[display("invalid login or password")]
pub struct InvalidCredentials;

/// Resolves a login to an [`Identity`].
///
/// The first rule that matches wins:
/// 1. the configured administrator pair;
/// 2. an `Assigned Name` among the open tickets, as a locator;
/// 3. an `Excavator` among the open tickets, as a contractor.
///
/// Locator and contractor passwords are not checked: the spreadsheet is the
/// only user directory there is.
pub fn authenticate(
    admin: &config::Admin,
    open: &[Ticket],
    username: &str,
    password: &str,
) -> Result<Identity, InvalidCredentials> {
    let role = if username == admin.login && password == admin.password {
        Role::Admin
    } else if distinct(open, |t| t.assigned_name.as_deref()).contains(username)
    {
        Role::Locator
    } else if distinct(open, |t| t.excavator.as_deref()).contains(username) {
        Role::Contractor
    } else {
        return Err(InvalidCredentials);
    };

    info!(username, %role, "signed in");
    Ok(Identity {
        role,
        username: username.to_owned(),
    })
}

fn distinct<'a>(
    tickets: &'a [Ticket],
    field: impl Fn(&'a Ticket) -> Option<&'a str>,
) -> HashSet<&'a str> {
    tickets.iter().filter_map(field).collect()
}

/// Everything one signed-in request works with.
#[derive(Clone, Debug)]
pub struct Session {
    pub identity: Identity,
    pub snapshot: Arc<Snapshot>,
}

impl Session {
    pub fn new(identity: Identity, snapshot: Arc<Snapshot>) -> Self {
        Self { identity, snapshot }
    }

    pub fn is_admin(&self) -> bool {
        self.identity.role == Role::Admin
    }

    pub fn visible(&self, collection: Collection) -> Vec<&Ticket> {
        filter::by_identity(
            self.snapshot.collection(collection),
            &self.identity,
        )
    }

    /// Finds a ticket the identity may see, open tickets first. Among
    /// duplicates only the visible ones are candidates.
    pub fn find(&self, id: &RequestNum) -> Option<&Ticket> {
        Collection::ALL
            .into_iter()
            .find_map(|collection| by_identifier(self.visible(collection), id))
    }

    pub fn can_access(&self, id: &RequestNum) -> bool {
        self.find(id).is_some()
    }
}
