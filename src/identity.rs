//! Mapping of federated identities to conference principals.
//!
//! One provider per role. Authors and reviewers are registered on their
//! first login; chairs must already exist in the chair store.

use serde::Deserialize;
use tracing::info;

use crate::auth::{Principal, Role};
use crate::db::{Database, UserRole, normalize_email};

/// Profile returned by an external identity provider after a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Provider-side account ID
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email address is not verified by the provider")]
    UnverifiedEmail,
    #[error("account is registered as {}", .registered.as_str())]
    RoleMismatch { registered: Role },
    #[error("{0} is not a conference chair")]
    NotProvisioned(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Login entry point for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    Author,
    Reviewer,
    Chair,
}

impl IdentityProvider {
    pub fn role(self) -> Role {
        match self {
            IdentityProvider::Author => Role::Author,
            IdentityProvider::Reviewer => Role::Reviewer,
            IdentityProvider::Chair => Role::Chair,
        }
    }

    /// Path segment used in the login routes.
    pub fn slug(self) -> &'static str {
        self.role().as_str()
    }

    /// Exchange an external profile for the internal principal of this role.
    pub async fn resolve(
        self,
        db: &Database,
        profile: &ExternalProfile,
    ) -> Result<Principal, IdentityError> {
        if !profile.email_verified {
            return Err(IdentityError::UnverifiedEmail);
        }

        let email = normalize_email(&profile.email);

        match self {
            IdentityProvider::Author => {
                find_or_register(db, &email, profile, UserRole::Author).await
            }
            IdentityProvider::Reviewer => {
                find_or_register(db, &email, profile, UserRole::Reviewer).await
            }
            IdentityProvider::Chair => db
                .chairs()
                .get_by_email(&email)
                .await?
                .map(Principal::from)
                .ok_or(IdentityError::NotProvisioned(email)),
        }
    }
}

async fn find_or_register(
    db: &Database,
    email: &str,
    profile: &ExternalProfile,
    role: UserRole,
) -> Result<Principal, IdentityError> {
    if let Some(user) = db.users().get_by_email(email).await? {
        return check_role(user.into(), role);
    }

    let name = profile.name.as_deref().unwrap_or_default();
    match db.users().create(email, name, role).await {
        Ok(id) => {
            info!(email = %email, role = role.as_str(), "Registered user on first login");
            Ok(Principal {
                id,
                email: email.to_string(),
                name: name.to_string(),
                role: role.into(),
            })
        }
        // Lost a race with a concurrent first login for the same email
        Err(e) => match db.users().get_by_email(email).await? {
            Some(user) => check_role(user.into(), role),
            None => Err(e.into()),
        },
    }
}

fn check_role(principal: Principal, expected: UserRole) -> Result<Principal, IdentityError> {
    if principal.role == Role::from(expected) {
        Ok(principal)
    } else {
        Err(IdentityError::RoleMismatch {
            registered: principal.role,
        })
    }
}
