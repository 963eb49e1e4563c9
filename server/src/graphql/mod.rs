mod employees;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Object, Schema, SimpleObject};
use platform_api::{ApiResult, internal_error};
use platform_db::DbPool;
use products_hr::{
    Clock, EmployeeFilter, EmployeeService, EmployeeSort, SeaOrmEmployeeStore, SystemClock,
    apply_view, department_summary,
};
use serde::Serialize;
use tracing::instrument;

use employees::{
    AddEmployeeInput, DepartmentNode, EmployeeFilterInput, EmployeeListPayload, EmployeeNode,
    EmployeeSortInput, RemoveEmployeePayload, error_payload, service_error,
};

pub type HrService = EmployeeService<SeaOrmEmployeeStore, Arc<dyn Clock>>;

pub fn hr_service(pool: DbPool) -> HrService {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    EmployeeService::with_clock(SeaOrmEmployeeStore::new(pool), clock)
}

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(service: HrService) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}

/// SDL without any runtime data attached.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

fn hr<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a HrService> {
    ctx.data::<HrService>()
        .map_err(|_| internal_error(anyhow::anyhow!("employee service missing from schema data")))
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Employees, newest first unless `sort` says otherwise.
    #[instrument(name = "graphql.employees", skip_all)]
    async fn employees(
        &self,
        ctx: &Context<'_>,
        filter: Option<EmployeeFilterInput>,
        sort: Option<EmployeeSortInput>,
    ) -> async_graphql::Result<EmployeeListPayload> {
        let loaded = hr(ctx)?.load_all().await;
        let filter: EmployeeFilter = filter.unwrap_or_default().into();
        let sort: EmployeeSort = sort.unwrap_or_default().into();
        let items: Vec<EmployeeNode> = apply_view(loaded.employees, &filter, sort)
            .into_iter()
            .map(EmployeeNode)
            .collect();
        Ok(EmployeeListPayload {
            total: items.len(),
            items,
            error: loaded.error.map(error_payload),
        })
    }

    #[instrument(name = "graphql.employee", skip(self, ctx))]
    async fn employee(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<EmployeeNode> {
        let employee = hr(ctx)?.find(id).await.map_err(service_error)?;
        Ok(EmployeeNode(employee))
    }

    #[instrument(name = "graphql.departments", skip_all)]
    async fn departments(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<DepartmentNode>> {
        let employees = hr(ctx)?
            .load_all()
            .await
            .into_result()
            .map_err(service_error)?;
        Ok(department_summary(&employees)
            .into_iter()
            .map(DepartmentNode::from)
            .collect())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    #[instrument(name = "graphql.add_employee", skip_all)]
    async fn add_employee(
        &self,
        ctx: &Context<'_>,
        input: AddEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let employee = hr(ctx)?
            .add_employee(input.into())
            .await
            .map_err(service_error)?;
        Ok(EmployeeNode(employee))
    }

    #[instrument(name = "graphql.toggle_employee_status", skip(self, ctx))]
    async fn toggle_employee_status(
        &self,
        ctx: &Context<'_>,
        id: i32,
    ) -> async_graphql::Result<EmployeeNode> {
        let employee = hr(ctx)?.toggle_status(id).await.map_err(service_error)?;
        Ok(EmployeeNode(employee))
    }

    #[instrument(name = "graphql.remove_employee", skip(self, ctx))]
    async fn remove_employee(
        &self,
        ctx: &Context<'_>,
        id: i32,
    ) -> async_graphql::Result<RemoveEmployeePayload> {
        hr(ctx)?.remove_employee(id).await.map_err(service_error)?;
        Ok(RemoveEmployeePayload { id })
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}
