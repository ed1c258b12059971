//! Authorization module.
//!
//! Decides which senders may run admin-only commands.

mod permissions;

pub use permissions::PermissionManager;
