//! Session identity as supplied by the session-authentication collaborator.

use serde::{Deserialize, Serialize};

use crate::{OrganisationId, UserId};

/// A resolved, signed-in user.
///
/// Produced by the session layer for the lifetime of a single request and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: UserId,
    organisation_id: OrganisationId,
}

impl Identity {
    pub fn new(user_id: UserId, organisation_id: OrganisationId) -> Self {
        Self {
            user_id,
            organisation_id,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn organisation_id(&self) -> &OrganisationId {
        &self.organisation_id
    }
}
