//! `crm-auth` — role authority and authorization gates for the CRM front end.
//!
//! This crate is intentionally decoupled from HTTP, storage, and rendering.

pub mod authority;
pub mod authorize;
pub mod membership;
pub mod permissions;
pub mod policy;
pub mod profile;
pub mod roles;

pub use authority::{AuthorityError, RoleAuthority, RoleCatalog, RoleDefinition};
pub use authorize::{
    ActionAuthorization, AuthorizationExplanation, AuthzError, DenialKind, DenialReason,
    authorize, authorize_action, explain_authorization,
};
pub use membership::{assignable_roles, check_role_change};
pub use permissions::{Permission, PermissionSet, perms};
pub use policy::{Rank, RoleEntry, RoleTable};
pub use profile::Profile;
pub use roles::{Role, RoleVocabulary};
