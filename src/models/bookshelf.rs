use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, Result};

/// Custom permissions on shelf books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "can_view")]
    CanView,
    #[serde(rename = "can_create")]
    CanCreate,
    #[serde(rename = "can_edit")]
    CanEdit,
    #[serde(rename = "can_delete")]
    CanDelete,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::CanView,
        Permission::CanCreate,
        Permission::CanEdit,
        Permission::CanDelete,
    ];

    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanView => "can_view",
            Permission::CanCreate => "can_create",
            Permission::CanEdit => "can_edit",
            Permission::CanDelete => "can_delete",
        }
    }

    pub fn from_codename(codename: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.codename() == codename)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub name: String,
    pub permissions: Vec<Permission>,
}

/// Groups created at startup and the permissions each one grants.
pub fn default_groups() -> Vec<Group> {
    vec![
        Group { name: "Viewers".to_string(), permissions: vec![Permission::CanView] },
        Group {
            name: "Editors".to_string(),
            permissions: vec![Permission::CanView, Permission::CanCreate, Permission::CanEdit],
        },
        Group { name: "Admins".to_string(), permissions: Permission::ALL.to_vec() },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShelfBook {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: NaiveDate,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShelfBookRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub author: String,
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub isbn: String,
    pub publication_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShelfSearch {
    pub q: Option<String>,
}

pub fn validate_isbn(isbn: &str) -> Result<()> {
    if isbn.len() != 13 || !isbn.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::ValidationError("ISBN must be exactly 13 digits".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups_grant_expected_permissions() {
        let groups = default_groups();
        let viewers = groups.iter().find(|g| g.name == "Viewers").unwrap();
        assert_eq!(viewers.permissions, vec![Permission::CanView]);
        let editors = groups.iter().find(|g| g.name == "Editors").unwrap();
        assert!(!editors.permissions.contains(&Permission::CanDelete));
        let admins = groups.iter().find(|g| g.name == "Admins").unwrap();
        assert_eq!(admins.permissions.len(), 4);
    }

    #[test]
    fn test_isbn_validation() {
        assert!(validate_isbn("9780132350884").is_ok());
        assert!(validate_isbn("978013235088").is_err());
        assert!(validate_isbn("97801323508X4").is_err());
    }

    #[test]
    fn test_codename_lookup() {
        assert_eq!(Permission::from_codename("can_edit"), Some(Permission::CanEdit));
        assert_eq!(Permission::from_codename("can_fly"), None);
    }
}
