use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

/// Which storage rule a rejected write broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    UniqueEmail,
    FieldBounds,
}

/// Low-level failures reported by an [`EmployeeStore`](crate::EmployeeStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("employee {0} not found")]
    NotFound(i32),
    #[error("constraint violated ({constraint:?}): {detail}")]
    ConstraintViolation {
        constraint: Constraint,
        detail: String,
    },
    #[error("employee {0} was modified since it was read")]
    ConcurrencyConflict(i32),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome taxonomy handed to the presentation layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid employee data: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("an employee with email {email} already exists")]
    Conflict { email: String },
    #[error("employee {id} no longer exists")]
    NotFound { id: i32 },
    #[error("employee {id} was changed by someone else")]
    Concurrency { id: i32 },
    #[error("employee data could not be accessed")]
    DataAccess(#[source] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Message safe to show to an end user. Never leaks storage details.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            ServiceError::Conflict { email } => {
                format!("An employee with email {email} already exists.")
            }
            ServiceError::NotFound { .. } => {
                "That employee no longer exists. Refresh the list.".to_string()
            }
            ServiceError::Concurrency { .. } => {
                "The employee was changed by someone else. Reload and try again.".to_string()
            }
            ServiceError::DataAccess(_) => {
                "Something went wrong while accessing employee data.".to_string()
            }
        }
    }

    /// `(field, message)` pairs for validation failures, sorted by field name.
    pub fn field_messages(&self) -> Vec<(String, String)> {
        let ServiceError::Validation(errors) = self else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (field, failures) in errors.field_errors() {
            for failure in failures.iter() {
                let mut message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                for (name, value) in &failure.params {
                    message = message.replace(&format!("{{{name}}}"), &value.to_string());
                }
                out.push((field.to_string(), message));
            }
        }
        out.sort();
        out
    }
}
