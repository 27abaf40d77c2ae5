//! Department → role visibility rules.
//!
//! The policy is configuration, not runtime state: it is built once from
//! [`AccessSettings`] and shared read-only (typically behind an `Arc`).

use std::collections::{BTreeMap, BTreeSet};

use crate::config::AccessSettings;
use crate::error::{Error, Result};
use crate::types::{Department, Document, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    full_access: Role,
    general: Department,
    departments: BTreeMap<Department, BTreeSet<Role>>,
    primary: BTreeMap<Role, Department>,
}

impl AccessPolicy {
    pub fn from_settings(settings: &AccessSettings) -> Result<Self> {
        let full_access = Role::new(settings.full_access_role.trim());
        if full_access.as_str().is_empty() {
            return Err(Error::InvalidConfig("full-access role must not be empty".into()));
        }

        let mut departments = BTreeMap::new();
        for (name, roles) in &settings.departments {
            let roles: BTreeSet<Role> = roles
                .iter()
                .map(|r| Role::new(r.trim()))
                .filter(|r| !r.as_str().is_empty() && *r != full_access)
                .collect();
            if roles.is_empty() {
                return Err(Error::InvalidConfig(format!("department '{name}' grants no roles")));
            }
            departments.insert(Department::new(name.as_str()), roles);
        }

        let general = Department::new(settings.general_department.as_str());
        if !departments.contains_key(&general) {
            return Err(Error::InvalidConfig(format!("general department '{general}' is not configured")));
        }

        let mut primary = BTreeMap::new();
        for (role, department) in &settings.primary_departments {
            let department = Department::new(department.as_str());
            if !departments.contains_key(&department) {
                return Err(Error::UnknownDepartment(department.to_string()));
            }
            primary.insert(Role::new(role.as_str()), department);
        }

        Ok(Self { full_access, general, departments, primary })
    }

    /// True iff `role` is the full-access role or listed on the document.
    /// Unknown roles fail closed.
    pub fn is_visible(&self, role: &Role, document: &Document) -> bool {
        self.is_full_access(role) || document.allowed_roles().contains(role)
    }

    pub fn is_full_access(&self, role: &Role) -> bool {
        *role == self.full_access
    }

    pub fn full_access_role(&self) -> &Role {
        &self.full_access
    }

    pub fn general_department(&self) -> &Department {
        &self.general
    }

    /// Roles that may read documents of `department`, including the
    /// full-access role. Never empty.
    pub fn allowed_roles_for(&self, department: &Department) -> Result<BTreeSet<Role>> {
        let mut roles = self
            .departments
            .get(department)
            .cloned()
            .ok_or_else(|| Error::UnknownDepartment(department.to_string()))?;
        roles.insert(self.full_access.clone());
        Ok(roles)
    }

    /// The single department a role has ranking affinity with, if any.
    ///
    /// The full-access role has none; neither does a role whose only match
    /// would be the general department. A role maps to at most one
    /// department; cross-functional affinity would need a set here.
    pub fn primary_department(&self, role: &Role) -> Option<&Department> {
        if self.is_full_access(role) {
            return None;
        }
        if let Some(department) = self.primary.get(role) {
            return (*department != self.general).then_some(department);
        }
        self.departments
            .get_key_value(role.as_str())
            .map(|(department, _)| department)
            .filter(|department| **department != self.general)
    }

    pub fn departments(&self) -> impl Iterator<Item = (&Department, &BTreeSet<Role>)> {
        self.departments.iter()
    }

    pub fn contains_department(&self, department: &Department) -> bool {
        self.departments.contains_key(department)
    }

    /// Every role the policy mentions, the full-access role included.
    pub fn roles(&self) -> BTreeSet<Role> {
        let mut roles: BTreeSet<Role> = self.departments.values().flatten().cloned().collect();
        roles.extend(self.primary.keys().cloned());
        roles.insert(self.full_access.clone());
        roles
    }
}
