use std::fmt;

use chrono::{DateTime, Utc};
use entity::employees;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Mirrors the column widths of the `employees` table.
pub const NAME_MIN_LEN: u64 = 2;
pub const NAME_MAX_LEN: u64 = 100;
pub const EMAIL_MAX_LEN: u64 = 150;
pub const DEPARTMENT_MAX_LEN: u64 = 50;

/// Key that e-mail uniqueness is enforced on: trimmed, Unicode lowercase.
///
/// Folding happens here rather than in SQL because SQLite's `lower()` only
/// folds ASCII.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Detached copy of a persisted employee row. Mutating it never touches storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub department: String,
    pub created_date: DateTime<Utc>,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Optimistic-concurrency stamp as of the read that produced this copy.
    pub version: i32,
}

impl Employee {
    /// Everything after the `@`; empty when the address has none.
    pub fn email_domain(&self) -> &str {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("")
    }

    /// Whole days elapsed since creation, never negative.
    pub fn days_since_created(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_date).num_days().max(0)
    }

    pub fn status(&self) -> EmployeeStatus {
        if self.is_active {
            EmployeeStatus::Active
        } else {
            EmployeeStatus::Inactive
        }
    }
}

impl From<employees::Model> for Employee {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            department: model.department,
            created_date: model.created_date.with_timezone(&Utc),
            last_modified: model.last_modified.map(|ts| ts.with_timezone(&Utc)),
            is_active: model.is_active,
            version: model.version,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "Active",
            EmployeeStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated input for creating an employee.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmployeeDraft {
    #[validate(length(
        min = NAME_MIN_LEN,
        max = NAME_MAX_LEN,
        message = "name must be between {min} and {max} characters"
    ))]
    pub name: String,
    #[validate(
        email(message = "email is not a valid address"),
        length(max = EMAIL_MAX_LEN, message = "email must be at most {max} characters")
    )]
    pub email: String,
    #[validate(length(
        min = 1,
        max = DEPARTMENT_MAX_LEN,
        message = "department is required and must be at most {max} characters"
    ))]
    pub department: String,
}

impl EmployeeDraft {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            department: department.into(),
        }
    }

    /// Strip surrounding whitespace from every field.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            department: self.department.trim().to_string(),
        }
    }
}

/// A validated draft stamped with its creation time, ready for insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub department: String,
    pub created_date: DateTime<Utc>,
}

impl NewEmployee {
    pub fn from_draft(draft: EmployeeDraft, created_date: DateTime<Utc>) -> Self {
        Self {
            name: draft.name,
            email: draft.email,
            department: draft.department,
            created_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn sample() -> Employee {
        Employee {
            id: 7,
            name: "Grace Hopper".into(),
            email: "grace@navy.mil".into(),
            department: "Research".into(),
            created_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            last_modified: None,
            is_active: true,
            version: 0,
        }
    }

    #[test]
    fn derived_fields() {
        let mut employee = sample();
        assert_eq!(employee.email_domain(), "navy.mil");
        assert_eq!(employee.status().to_string(), "Active");
        let later = employee.created_date + Duration::days(3) + Duration::hours(23);
        assert_eq!(employee.days_since_created(later), 3);
        assert_eq!(
            employee.days_since_created(employee.created_date - Duration::days(1)),
            0
        );
        employee.is_active = false;
        assert_eq!(employee.status(), EmployeeStatus::Inactive);
        employee.email = "no-at-sign".into();
        assert_eq!(employee.email_domain(), "");
    }

    #[test]
    fn valid_draft_passes() {
        let draft = EmployeeDraft::new("John Doe", "john@x.com", "IT");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn name_length_bounds() {
        let short = EmployeeDraft::new("J", "j@x.com", "IT");
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let long = EmployeeDraft::new("n".repeat(101), "j@x.com", "IT");
        assert!(long.validate().is_err());

        let edge = EmployeeDraft::new("n".repeat(100), "j@x.com", "IT");
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn email_and_department_rules() {
        let bad_email = EmployeeDraft::new("Ann Lee", "not-an-email", "IT");
        assert!(bad_email.validate().unwrap_err().field_errors().contains_key("email"));

        let long_email = format!("{}@x.com", "a".repeat(150));
        let too_long = EmployeeDraft::new("Ann Lee", long_email, "IT");
        assert!(too_long.validate().is_err());

        let no_department = EmployeeDraft::new("Ann Lee", "ann@x.com", "");
        assert!(
            no_department
                .validate()
                .unwrap_err()
                .field_errors()
                .contains_key("department")
        );
        let wide_department = EmployeeDraft::new("Ann Lee", "ann@x.com", "d".repeat(51));
        assert!(wide_department.validate().is_err());
    }

    #[test]
    fn email_key_folds_unicode_case() {
        assert_eq!(normalize_email(" a@ÉX.com "), normalize_email("a@éx.com"));
        assert_eq!(normalize_email("John@X.COM"), "john@x.com");
    }

    #[test]
    fn normalization_trims_before_validation() {
        let draft = EmployeeDraft::new("  A  ", " a@x.com ", " IT ").normalized();
        assert_eq!(draft.email, "a@x.com");
        assert_eq!(draft.department, "IT");
        assert!(draft.validate().is_err());
    }
}
