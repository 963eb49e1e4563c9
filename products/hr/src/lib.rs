//! HR vertical slice: the employee record store and the service that mediates
//! every user-initiated change to it.
//!
//! The [`EmployeeStore`] owns persistence, identity assignment and uniqueness.
//! The [`EmployeeService`] validates drafts, re-reads before mutating and
//! translates store failures into [`ServiceError`] so that raw database errors
//! never reach the presentation layer.

pub mod error;
pub mod model;
pub mod service;
pub mod store;
pub mod view;

pub use error::{Constraint, ServiceError, ServiceResult, StoreError, StoreResult};
pub use model::{Employee, EmployeeDraft, EmployeeStatus, NewEmployee, normalize_email};
pub use service::{Clock, EmployeeService, LoadedEmployees, SystemClock};
pub use store::{EmployeeStore, SeaOrmEmployeeStore};
pub use view::{
    DepartmentSummary, EmployeeFilter, EmployeeSort, SortDirection, SortField, StatusFilter,
    apply_view, department_summary,
};
