//! Clinical roles
//!
//! Roles are owned by the ledger-backed role registry. This crate only
//! models them; it never decides who holds what.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A role an identity may hold in the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Nurse,
    Staff,
    None,
}

impl Role {
    /// Roles that make an identity authorized personnel, in the order the
    /// registry is queried
    pub const CLINICAL: [Role; 3] = [Role::Doctor, Role::Nurse, Role::Staff];

    /// Wire name used by the registry contract
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Staff => "staff",
            Role::None => "none",
        }
    }

    /// Parse a wire name, ignoring case. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Role> {
        match name.trim().to_ascii_lowercase().as_str() {
            "doctor" => Some(Role::Doctor),
            "nurse" => Some(Role::Nurse),
            "staff" => Some(Role::Staff),
            "none" => Some(Role::None),
            _ => None,
        }
    }

    /// Whether holding this role counts as authorized personnel
    pub fn is_clinical(&self) -> bool {
        !matches!(self, Role::None)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of roles one identity holds. An identity may hold several at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    pub doctor: bool,
    pub nurse: bool,
    pub staff: bool,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role. Adding `Role::None` changes nothing.
    pub fn insert(&mut self, role: Role) {
        match role {
            Role::Doctor => self.doctor = true,
            Role::Nurse => self.nurse = true,
            Role::Staff => self.staff = true,
            Role::None => {}
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        match role {
            Role::Doctor => self.doctor,
            Role::Nurse => self.nurse,
            Role::Staff => self.staff,
            Role::None => !self.is_authorized_personnel(),
        }
    }

    /// Holds at least one of Doctor, Nurse, Staff
    pub fn is_authorized_personnel(&self) -> bool {
        self.doctor || self.nurse || self.staff
    }

    /// Held clinical roles, in registry query order
    pub fn roles(&self) -> Vec<Role> {
        Role::CLINICAL
            .into_iter()
            .filter(|role| self.contains(*role))
            .collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}
