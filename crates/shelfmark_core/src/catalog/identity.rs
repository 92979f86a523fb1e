//! Caller identity and entity identifiers.

use std::fmt;

/// Identifier of an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InventoryId(pub u64);

impl fmt::Display for InventoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an item within the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller on whose behalf an operation runs.
///
/// Authentication happens upstream; this type only carries the resolved
/// identity. An absent user id means the caller is anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    user_id: Option<String>,
    admin: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), admin: false }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self { user_id: Some(user_id.into()), admin: true }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Opaque optimistic-concurrency token attached to mutable records.
///
/// Clients must echo the token back unmodified; a mismatch on write means
/// the record changed underneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionToken(u64);

impl VersionToken {
    pub(crate) fn initial() -> Self {
        Self(1)
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn revision(self) -> u64 {
        self.0
    }

    pub fn from_revision(revision: u64) -> Self {
        Self(revision)
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        Self::initial()
    }
}
