//! Persistence for employee records.

use std::future::Future;

use chrono::{DateTime, Utc};
use entity::employees;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    SqlErr,
    prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use tracing::debug;

use crate::{
    error::{Constraint, StoreError, StoreResult},
    model::{
        DEPARTMENT_MAX_LEN, EMAIL_MAX_LEN, Employee, NAME_MAX_LEN, NAME_MIN_LEN, NewEmployee,
        normalize_email,
    },
};

/// Storage contract for employee records.
///
/// Implementations are the sole authority on identity assignment and e-mail
/// uniqueness. Every method hands back detached copies; callers never hold a
/// live reference into storage.
pub trait EmployeeStore: Send + Sync {
    /// All employees, newest first.
    fn list(&self) -> impl Future<Output = StoreResult<Vec<Employee>>> + Send;

    fn find_by_id(&self, id: i32) -> impl Future<Output = StoreResult<Option<Employee>>> + Send;

    fn exists_by_email(
        &self,
        email: &str,
        case_insensitive: bool,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Persist a new record and return it with its assigned id.
    ///
    /// Fails with [`StoreError::ConstraintViolation`] when the e-mail is taken
    /// or a field is out of bounds.
    fn insert(&self, employee: NewEmployee) -> impl Future<Output = StoreResult<Employee>> + Send;

    /// Write back a record previously read from this store.
    ///
    /// The write only lands if the stored `version` still equals
    /// `employee.version`; on success the stored version is incremented by one.
    /// `created_date` is never rewritten.
    fn update(&self, employee: &Employee) -> impl Future<Output = StoreResult<()>> + Send;

    /// Hard delete. Deleting an absent id is reported as [`StoreError::NotFound`].
    fn delete(&self, id: i32) -> impl Future<Output = StoreResult<()>> + Send;
}

/// [`EmployeeStore`] over a SeaORM connection pool.
#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeStore {
    pool: DatabaseConnection,
}

impl SeaOrmEmployeeStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabaseConnection {
        &self.pool
    }
}

impl EmployeeStore for SeaOrmEmployeeStore {
    async fn list(&self) -> StoreResult<Vec<Employee>> {
        let rows = employees::Entity::find()
            .order_by_desc(employees::Column::CreatedDate)
            .order_by_desc(employees::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Employee>> {
        let row = employees::Entity::find_by_id(id).one(&self.pool).await?;
        Ok(row.map(Employee::from))
    }

    async fn exists_by_email(&self, email: &str, case_insensitive: bool) -> StoreResult<bool> {
        let query = if case_insensitive {
            employees::Entity::find()
                .filter(employees::Column::EmailNormalized.eq(normalize_email(email)))
        } else {
            employees::Entity::find().filter(employees::Column::Email.eq(email.trim()))
        };
        let matches = query.count(&self.pool).await?;
        Ok(matches > 0)
    }

    async fn insert(&self, employee: NewEmployee) -> StoreResult<Employee> {
        check_bounds(&employee.name, &employee.email, &employee.department)?;
        let model = employees::ActiveModel {
            id: NotSet,
            name: Set(employee.name),
            email_normalized: Set(normalize_email(&employee.email)),
            email: Set(employee.email),
            department: Set(employee.department),
            created_date: Set(employee.created_date.into()),
            last_modified: Set(None),
            is_active: Set(true),
            version: Set(0),
        };
        let saved = model.insert(&self.pool).await.map_err(classify)?;
        debug!(id = saved.id, "employee row inserted");
        Ok(Employee::from(saved))
    }

    async fn update(&self, employee: &Employee) -> StoreResult<()> {
        check_bounds(&employee.name, &employee.email, &employee.department)?;
        let result = employees::Entity::update_many()
            .col_expr(employees::Column::Name, Expr::value(employee.name.clone()))
            .col_expr(employees::Column::Email, Expr::value(employee.email.clone()))
            .col_expr(
                employees::Column::EmailNormalized,
                Expr::value(normalize_email(&employee.email)),
            )
            .col_expr(
                employees::Column::Department,
                Expr::value(employee.department.clone()),
            )
            .col_expr(employees::Column::IsActive, Expr::value(employee.is_active))
            .col_expr(
                employees::Column::LastModified,
                Expr::value(employee.last_modified.map(to_db_timestamp)),
            )
            .col_expr(
                employees::Column::Version,
                Expr::col(employees::Column::Version).add(1),
            )
            .filter(employees::Column::Id.eq(employee.id))
            .filter(employees::Column::Version.eq(employee.version))
            .exec(&self.pool)
            .await
            .map_err(classify)?;

        if result.rows_affected > 0 {
            return Ok(());
        }
        // Nothing matched: either the row is gone or its version moved on.
        let still_there = employees::Entity::find_by_id(employee.id)
            .one(&self.pool)
            .await?
            .is_some();
        if still_there {
            Err(StoreError::ConcurrencyConflict(employee.id))
        } else {
            Err(StoreError::NotFound(employee.id))
        }
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let result = employees::Entity::delete_by_id(id).exec(&self.pool).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn to_db_timestamp(ts: DateTime<Utc>) -> DateTimeWithTimeZone {
    ts.into()
}

fn check_bounds(name: &str, email: &str, department: &str) -> StoreResult<()> {
    let name_len = name.chars().count() as u64;
    let violation = if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
        Some(format!("name length {name_len} outside {NAME_MIN_LEN}..={NAME_MAX_LEN}"))
    } else if email.is_empty() || email.chars().count() as u64 > EMAIL_MAX_LEN {
        Some(format!("email must be 1..={EMAIL_MAX_LEN} characters"))
    } else if department.is_empty() || department.chars().count() as u64 > DEPARTMENT_MAX_LEN {
        Some(format!("department must be 1..={DEPARTMENT_MAX_LEN} characters"))
    } else {
        None
    };
    match violation {
        Some(detail) => Err(StoreError::ConstraintViolation {
            constraint: Constraint::FieldBounds,
            detail,
        }),
        None => Ok(()),
    }
}

/// The only unique index besides the primary key is the e-mail one, so any
/// uniqueness failure on this table is an e-mail collision.
fn classify(err: DbErr) -> StoreError {
    let unique = match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => true,
        _ => {
            let text = err.to_string();
            text.contains("UNIQUE constraint failed") || text.contains("duplicate key value")
        }
    };
    if unique {
        StoreError::ConstraintViolation {
            constraint: Constraint::UniqueEmail,
            detail: err.to_string(),
        }
    } else {
        StoreError::Database(err)
    }
}
