use async_graphql::{Context, Enum, Error, ErrorExtensions, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use platform_api::{ApiError, FieldViolation};
use products_hr::{
    DepartmentSummary, Employee, EmployeeDraft, EmployeeFilter, EmployeeSort, ServiceError,
    SortDirection, SortField, StatusFilter,
};

pub struct EmployeeNode(pub Employee);

#[Object(name = "Employee")]
impl EmployeeNode {
    async fn id(&self) -> i32 {
        self.0.id
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn department(&self) -> &str {
        &self.0.department
    }

    async fn created_date(&self) -> DateTime<Utc> {
        self.0.created_date
    }

    async fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.0.last_modified
    }

    async fn is_active(&self) -> bool {
        self.0.is_active
    }

    async fn version(&self) -> i32 {
        self.0.version
    }

    async fn email_domain(&self) -> &str {
        self.0.email_domain()
    }

    async fn days_since_created(&self, ctx: &Context<'_>) -> async_graphql::Result<i64> {
        Ok(self.0.days_since_created(super::hr(ctx)?.now()))
    }

    /// "Active" or "Inactive".
    async fn status(&self) -> &'static str {
        self.0.status().as_str()
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(SimpleObject)]
pub struct EmployeeListPayload {
    pub items: Vec<EmployeeNode>,
    pub total: usize,
    /// Set when the list could not be loaded; `items` is then empty.
    pub error: Option<ErrorPayload>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DepartmentNode {
    pub department: String,
    pub total: usize,
    pub active: usize,
}

impl From<DepartmentSummary> for DepartmentNode {
    fn from(value: DepartmentSummary) -> Self {
        Self {
            department: value.department,
            total: value.total,
            active: value.active,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct RemoveEmployeePayload {
    pub id: i32,
}

#[derive(InputObject)]
pub struct AddEmployeeInput {
    pub name: String,
    pub email: String,
    pub department: String,
}

impl From<AddEmployeeInput> for EmployeeDraft {
    fn from(input: AddEmployeeInput) -> Self {
        EmployeeDraft::new(input.name, input.email, input.department)
    }
}

#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum EmployeeStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum EmployeeSortField {
    Name,
    Email,
    Department,
    #[default]
    CreatedDate,
}

#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(InputObject, Default)]
pub struct EmployeeFilterInput {
    pub search: Option<String>,
    pub department: Option<String>,
    #[graphql(default)]
    pub status: EmployeeStatusFilter,
}

impl From<EmployeeFilterInput> for EmployeeFilter {
    fn from(input: EmployeeFilterInput) -> Self {
        EmployeeFilter {
            search: input.search,
            department: input.department,
            status: match input.status {
                EmployeeStatusFilter::All => StatusFilter::All,
                EmployeeStatusFilter::Active => StatusFilter::Active,
                EmployeeStatusFilter::Inactive => StatusFilter::Inactive,
            },
        }
    }
}

#[derive(InputObject, Default)]
pub struct EmployeeSortInput {
    #[graphql(default)]
    pub field: EmployeeSortField,
    #[graphql(default)]
    pub direction: SortOrder,
}

impl From<EmployeeSortInput> for EmployeeSort {
    fn from(input: EmployeeSortInput) -> Self {
        EmployeeSort {
            field: match input.field {
                EmployeeSortField::Name => SortField::Name,
                EmployeeSortField::Email => SortField::Email,
                EmployeeSortField::Department => SortField::Department,
                EmployeeSortField::CreatedDate => SortField::CreatedDate,
            },
            direction: match input.direction {
                SortOrder::Asc => SortDirection::Asc,
                SortOrder::Desc => SortDirection::Desc,
            },
        }
    }
}

pub fn to_api_error(err: ServiceError) -> ApiError {
    let message = err.user_message();
    match err {
        ServiceError::Validation(_) => ApiError::Validation(
            err.field_messages()
                .into_iter()
                .map(|(field, message)| FieldViolation { field, message })
                .collect(),
        ),
        ServiceError::Conflict { .. } => ApiError::Conflict(message),
        ServiceError::NotFound { .. } => ApiError::NotFound(message),
        ServiceError::Concurrency { .. } => ApiError::Concurrency(message),
        ServiceError::DataAccess(_) => ApiError::internal(anyhow::Error::new(err)),
    }
}

pub fn service_error(err: ServiceError) -> Error {
    to_api_error(err).extend()
}

/// List-level failures are reported inline so the client still gets a (empty) list.
pub fn error_payload(err: ServiceError) -> ErrorPayload {
    let message = err.user_message();
    let code = to_api_error(err).code().to_string();
    ErrorPayload { code, message }
}
