use serde::Serialize;
use thiserror::Error;

use crate::policy::Rank;
use crate::{Permission, Profile, Role, RoleAuthority};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("role '{0}' can only be changed by a super_admin")]
    ProtectedRole(String),

    #[error("privilege escalation: cannot grant '{0}'")]
    PrivilegeEscalation(String),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// Action-side authorization contract (checked before an action is enabled).
///
/// Implement this on user actions that require permissions.
pub trait ActionAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize the signed-in profile for one permission.
///
/// - No IO
/// - No panics
/// - Fails closed: no profile, no role, or an unknown role is never allowed
pub fn authorize(
    authority: &RoleAuthority,
    profile: Option<&Profile>,
    required: &Permission,
) -> Result<(), AuthzError> {
    let role = profile
        .and_then(Profile::role)
        .ok_or(AuthzError::NotAuthenticated)?;

    if authority.has_permission(Some(role), required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Authorize every permission an action requires.
pub fn authorize_action<A: ActionAuthorization>(
    authority: &RoleAuthority,
    profile: Option<&Profile>,
    action: &A,
) -> Result<(), AuthzError> {
    for perm in action.required_permissions() {
        authorize(authority, profile, perm)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// This structure provides transparent, debuggable information about why
/// an action was allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// The permission that was being checked.
    pub required_permission: String,

    /// Whether the authorization was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub role: Option<String>,
    pub rank: Option<Rank>,
    pub effective_permissions: Vec<String>,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Detailed reason why authorization was denied.
#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NotAuthenticated,
    UnknownRole,
    MissingPermission,
}

/// Explain why an authorization decision was made (or would be made).
///
/// Answers "why is this button disabled?" for support and audit screens.
pub fn explain_authorization(
    authority: &RoleAuthority,
    role: Option<&Role>,
    required: &Permission,
) -> AuthorizationExplanation {
    let required_str = required.as_str().to_string();
    let granting: Vec<String> = authority
        .roles_granting(required)
        .into_iter()
        .map(|r| r.as_str().to_string())
        .collect();

    let Some(role) = role else {
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: false,
            reason: "No role is known for the current user".to_string(),
            role: None,
            rank: None,
            effective_permissions: Vec::new(),
            denial_reason: Some(DenialReason {
                kind: DenialKind::NotAuthenticated,
                message: "Profile has not been loaded or carries no role".to_string(),
                suggestions: vec!["Sign in again or wait for the profile to load".to_string()],
            }),
        };
    };

    let Ok(rank) = authority.rank(role) else {
        return AuthorizationExplanation {
            required_permission: required_str,
            granted: false,
            reason: format!("Role '{}' is not in the policy table", role),
            role: Some(role.as_str().to_string()),
            rank: None,
            effective_permissions: Vec::new(),
            denial_reason: Some(DenialReason {
                kind: DenialKind::UnknownRole,
                message: format!("Unknown role '{}' is treated as no privilege", role),
                suggestions: vec![format!(
                    "Assign one of the known roles: {:?}",
                    authority.roles().map(|r| r.as_str()).collect::<Vec<_>>()
                )],
            }),
        };
    };

    let effective_permissions: Vec<String> = authority
        .permissions_for(Some(role))
        .iter()
        .map(|p| p.as_str().to_string())
        .collect();

    if authority.has_permission(Some(role), required) {
        return AuthorizationExplanation {
            reason: format!("Role '{}' declares permission '{}'", role, required_str),
            required_permission: required_str,
            granted: true,
            role: Some(role.as_str().to_string()),
            rank: Some(rank),
            effective_permissions,
            denial_reason: None,
        };
    }

    let mut suggestions = vec![format!(
        "Assign a role that grants the '{}' permission",
        required_str
    )];
    if !granting.is_empty() {
        suggestions.insert(0, format!("Roles declaring this permission: {:?}", granting));
    }

    AuthorizationExplanation {
        reason: format!(
            "Role '{}' does not declare permission '{}'",
            role, required_str
        ),
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingPermission,
            message: format!("Missing required permission: '{}'", required_str),
            suggestions,
        }),
        required_permission: required_str,
        granted: false,
        role: Some(role.as_str().to_string()),
        rank: Some(rank),
        effective_permissions,
    }
}
