//! Presentation-side list transforms over [`EmployeeService::load_all`](crate::EmployeeService::load_all).
//!
//! Nothing here is authoritative; it reorders and narrows an already loaded
//! snapshot.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use crate::model::{Employee, EmployeeStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    fn admits(&self, status: EmployeeStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == EmployeeStatus::Active,
            StatusFilter::Inactive => status == EmployeeStatus::Inactive,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFilter {
    /// Case-insensitive substring over name, e-mail and department.
    pub search: Option<String>,
    /// Exact department match, ignoring case.
    pub department: Option<String>,
    pub status: StatusFilter,
}

impl EmployeeFilter {
    fn matches(&self, employee: &Employee, needle: Option<&str>) -> bool {
        if !self.status.admits(employee.status()) {
            return false;
        }
        if let Some(department) = self.department.as_deref().map(str::trim) {
            if !department.is_empty() && !employee.department.eq_ignore_ascii_case(department) {
                return false;
            }
        }
        match needle {
            None => true,
            Some(needle) => [&employee.name, &employee.email, &employee.department]
                .iter()
                .any(|field| field.to_lowercase().contains(needle)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Name,
    Email,
    Department,
    #[default]
    CreatedDate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl EmployeeSort {
    fn compare(&self, a: &Employee, b: &Employee) -> Ordering {
        let primary = match self.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
            SortField::Department => a
                .department
                .to_lowercase()
                .cmp(&b.department.to_lowercase()),
            SortField::CreatedDate => a.created_date.cmp(&b.created_date),
        };
        let ordered = primary.then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordered,
            SortDirection::Desc => ordered.reverse(),
        }
    }
}

/// Narrow and reorder a loaded snapshot.
pub fn apply_view(
    employees: Vec<Employee>,
    filter: &EmployeeFilter,
    sort: EmployeeSort,
) -> Vec<Employee> {
    let needle = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let mut visible: Vec<Employee> = employees
        .into_iter()
        .filter(|e| filter.matches(e, needle.as_deref()))
        .collect();
    visible.sort_by(|a, b| sort.compare(a, b));
    visible
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepartmentSummary {
    pub department: String,
    pub total: usize,
    pub active: usize,
}

/// Headcount per department, alphabetical.
pub fn department_summary(employees: &[Employee]) -> Vec<DepartmentSummary> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for employee in employees {
        let entry = counts.entry(employee.department.as_str()).or_default();
        entry.0 += 1;
        if employee.is_active {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(department, (total, active))| DepartmentSummary {
            department: department.to_string(),
            total,
            active,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn roster() -> Vec<Employee> {
        let base = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let row = |id: i32, name: &str, email: &str, dept: &str, active: bool| Employee {
            id,
            name: name.into(),
            email: email.into(),
            department: dept.into(),
            created_date: base + Duration::days(id as i64),
            last_modified: None,
            is_active: active,
            version: 0,
        };
        vec![
            row(1, "Charlie Brown", "charlie@peanuts.com", "Sales", true),
            row(2, "alice Smith", "alice@corp.io", "IT", false),
            row(3, "Bob Stone", "bob@corp.io", "IT", true),
        ]
    }

    fn ids(employees: &[Employee]) -> Vec<i32> {
        employees.iter().map(|e| e.id).collect()
    }

    #[test]
    fn default_view_is_newest_first() {
        let view = apply_view(roster(), &EmployeeFilter::default(), EmployeeSort::default());
        assert_eq!(ids(&view), vec![3, 2, 1]);
    }

    #[test]
    fn search_spans_fields_case_insensitively() {
        let filter = EmployeeFilter {
            search: Some("  CORP ".into()),
            ..Default::default()
        };
        let sort = EmployeeSort {
            field: SortField::Name,
            direction: SortDirection::Asc,
        };
        assert_eq!(ids(&apply_view(roster(), &filter, sort)), vec![2, 3]);
    }

    #[test]
    fn department_and_status_narrow_together() {
        let filter = EmployeeFilter {
            department: Some("it".into()),
            status: StatusFilter::Active,
            ..Default::default()
        };
        assert_eq!(
            ids(&apply_view(roster(), &filter, EmployeeSort::default())),
            vec![3]
        );
        let inactive = EmployeeFilter {
            status: StatusFilter::Inactive,
            ..Default::default()
        };
        assert_eq!(
            ids(&apply_view(roster(), &inactive, EmployeeSort::default())),
            vec![2]
        );
    }

    #[test]
    fn summary_counts_active_per_department() {
        let summary = department_summary(&roster());
        assert_eq!(
            summary,
            vec![
                DepartmentSummary {
                    department: "IT".into(),
                    total: 2,
                    active: 1
                },
                DepartmentSummary {
                    department: "Sales".into(),
                    total: 1,
                    active: 1
                },
            ]
        );
    }
}
