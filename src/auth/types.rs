//! Authenticated principal types.

use serde::Serialize;

use crate::db::Database;
use crate::jwt::PrincipalClaims;

/// Role a principal acts in, decided by which identity store matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Reviewer,
    Chair,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Chair => "chair",
        }
    }
}

/// An authenticated identity materialized from its identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// The identity stores a principal can be resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStore {
    /// Authors and reviewers
    Users,
    /// Conference chairs
    Chairs,
}

impl IdentityStore {
    /// Look up the principal for `email` in this store.
    pub async fn find(self, db: &Database, email: &str) -> Result<Option<Principal>, sqlx::Error> {
        match self {
            IdentityStore::Users => Ok(db.users().get_by_email(email).await?.map(Principal::from)),
            IdentityStore::Chairs => Ok(db.chairs().get_by_email(email).await?.map(Principal::from)),
        }
    }

    /// Try each store in order and return the first principal matching
    /// both the email and the ID of the token claims.
    pub async fn resolve(
        stores: &[IdentityStore],
        db: &Database,
        claims: &PrincipalClaims,
    ) -> Result<Option<Principal>, sqlx::Error> {
        for store in stores {
            let found = store.find(db, &claims.email).await?;
            // A reissued account under the same email is not the token's principal
            if let Some(principal) = found.filter(|p| p.id == claims.id) {
                return Ok(Some(principal));
            }
        }
        Ok(None)
    }
}
