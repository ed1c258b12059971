//! Admin permission checks.

use std::collections::HashSet;

use crate::transport::Sender;

/// Decides whether a sender may run admin-only commands.
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    superusers: HashSet<String>,
}

impl PermissionManager {
    /// Create a manager with the given always-admin sender ids.
    pub fn new<I, S>(superusers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            superusers: superusers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the sender is a configured superuser.
    pub fn is_superuser(&self, sender: &Sender) -> bool {
        self.superusers.contains(&sender.id)
    }

    /// Whether the sender has admin rights.
    ///
    /// Anonymous senders never do.
    pub fn is_admin(&self, sender: Option<&Sender>) -> bool {
        match sender {
            Some(sender) => sender.admin || self.is_superuser(sender),
            None => false,
        }
    }
}
