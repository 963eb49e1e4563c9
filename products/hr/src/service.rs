use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    error::{Constraint, ServiceError, ServiceResult, StoreError},
    model::{Employee, EmployeeDraft, NewEmployee},
    store::EmployeeStore,
};

/// Source of "now" for creation and modification stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to microseconds, the finest precision PostgreSQL keeps.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Result of [`EmployeeService::load_all`]. A failed load yields an empty list
/// and the error, so a view can still render.
#[derive(Debug, Default)]
pub struct LoadedEmployees {
    pub employees: Vec<Employee>,
    pub error: Option<ServiceError>,
}

impl LoadedEmployees {
    pub fn into_result(self) -> ServiceResult<Vec<Employee>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.employees),
        }
    }
}

/// Mediates every user-initiated change to employee records.
///
/// Holds no mutable state of its own; it is safe to share one instance across
/// concurrent requests.
#[derive(Clone, Debug)]
pub struct EmployeeService<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: EmployeeStore> EmployeeService<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S: EmployeeStore, C: Clock> EmployeeService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[instrument(name = "hr.employees.load_all", skip_all)]
    pub async fn load_all(&self) -> LoadedEmployees {
        match self.store.list().await {
            Ok(employees) => LoadedEmployees {
                employees,
                error: None,
            },
            Err(err) => {
                error!(error = %err, "failed to load employees");
                LoadedEmployees {
                    employees: Vec::new(),
                    error: Some(ServiceError::DataAccess(err)),
                }
            }
        }
    }

    #[instrument(name = "hr.employees.find", skip(self))]
    pub async fn find(&self, id: i32) -> ServiceResult<Employee> {
        self.store
            .find_by_id(id)
            .await
            .map_err(data_access)?
            .ok_or(ServiceError::NotFound { id })
    }

    #[instrument(name = "hr.employees.add", skip_all)]
    pub async fn add_employee(&self, draft: EmployeeDraft) -> ServiceResult<Employee> {
        let draft = draft.normalized();
        draft.validate()?;

        if self
            .store
            .exists_by_email(&draft.email, true)
            .await
            .map_err(data_access)?
        {
            warn!(email = %draft.email, "rejected duplicate email");
            return Err(ServiceError::Conflict { email: draft.email });
        }

        let email = draft.email.clone();
        let new = NewEmployee::from_draft(draft, self.clock.now());
        match self.store.insert(new).await {
            Ok(employee) => {
                info!(id = employee.id, department = %employee.department, "employee added");
                Ok(employee)
            }
            Err(StoreError::ConstraintViolation {
                constraint: Constraint::UniqueEmail,
                ..
            }) => {
                warn!(email = %email, "lost insert race on email");
                Err(ServiceError::Conflict { email })
            }
            Err(err) => Err(data_access(err)),
        }
    }

    #[instrument(name = "hr.employees.toggle_status", skip(self))]
    pub async fn toggle_status(&self, id: i32) -> ServiceResult<Employee> {
        // Always act on the stored row, never on a caller's cached copy.
        let current = self.find(id).await?;

        let mut next = current.clone();
        next.is_active = !current.is_active;
        next.last_modified = Some(self.next_modified_stamp(&current));

        match self.store.update(&next).await {
            Ok(()) => {
                next.version += 1;
                info!(id, is_active = next.is_active, "employee status toggled");
                Ok(next)
            }
            Err(StoreError::NotFound(_)) => {
                warn!(id, "employee vanished before toggle");
                Err(ServiceError::NotFound { id })
            }
            Err(StoreError::ConcurrencyConflict(_)) => {
                warn!(id, "concurrent modification during toggle");
                Err(ServiceError::Concurrency { id })
            }
            Err(err) => Err(data_access(err)),
        }
    }

    #[instrument(name = "hr.employees.remove", skip(self))]
    pub async fn remove_employee(&self, id: i32) -> ServiceResult<()> {
        self.find(id).await?;
        match self.store.delete(id).await {
            Ok(()) => {
                info!(id, "employee removed");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                warn!(id, "employee already removed");
                Err(ServiceError::NotFound { id })
            }
            Err(err) => Err(data_access(err)),
        }
    }

    /// `now`, unless the clock is behind a stamp already on the record.
    fn next_modified_stamp(&self, current: &Employee) -> DateTime<Utc> {
        let now = self.clock.now();
        [Some(now), current.last_modified, Some(current.created_date)]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(now)
    }
}

fn data_access(err: StoreError) -> ServiceError {
    error!(error = %err, "employee store failure");
    ServiceError::DataAccess(err)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicI64, Ordering},
    };

    use chrono::{Duration, TimeZone};
    use sea_orm::DbErr;

    use super::*;
    use crate::{StoreResult, store::tests::sqlite_store};

    /// Clock that advances one second per reading unless pinned.
    #[derive(Clone)]
    struct StepClock {
        base: DateTime<Utc>,
        ticks: Arc<AtomicI64>,
        step: i64,
    }

    impl StepClock {
        fn new(step: i64) -> Self {
            Self {
                base: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
                ticks: Arc::new(AtomicI64::new(0)),
                step,
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.base + Duration::seconds(tick * self.step)
        }
    }

    #[derive(Clone, Copy, Default)]
    enum Fault {
        #[default]
        None,
        ListFails,
        InsertLosesRace,
        UpdateConflicts,
        UpdateMissing,
        DeleteMissing,
    }

    /// In-memory store with switchable failure modes for the race paths.
    #[derive(Default)]
    struct ScriptedStore {
        rows: Mutex<Vec<Employee>>,
        fault: Mutex<Fault>,
    }

    impl ScriptedStore {
        fn with_fault(fault: Fault) -> Self {
            let store = Self::default();
            *store.fault.lock().unwrap() = fault;
            store
        }

        fn seed(&self, employee: Employee) {
            self.rows.lock().unwrap().push(employee);
        }

        fn fault(&self) -> Fault {
            *self.fault.lock().unwrap()
        }
    }

    impl EmployeeStore for ScriptedStore {
        async fn list(&self) -> StoreResult<Vec<Employee>> {
            if let Fault::ListFails = self.fault() {
                return Err(StoreError::Database(DbErr::Custom("connection reset".into())));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn find_by_id(&self, id: i32) -> StoreResult<Option<Employee>> {
            Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }

        async fn exists_by_email(&self, _email: &str, _case_insensitive: bool) -> StoreResult<bool> {
            Ok(false)
        }

        async fn insert(&self, employee: NewEmployee) -> StoreResult<Employee> {
            if let Fault::InsertLosesRace = self.fault() {
                return Err(StoreError::ConstraintViolation {
                    constraint: Constraint::UniqueEmail,
                    detail: "duplicate key value".into(),
                });
            }
            let mut rows = self.rows.lock().unwrap();
            let saved = Employee {
                id: rows.len() as i32 + 1,
                name: employee.name,
                email: employee.email,
                department: employee.department,
                created_date: employee.created_date,
                last_modified: None,
                is_active: true,
                version: 0,
            };
            rows.push(saved.clone());
            Ok(saved)
        }

        async fn update(&self, employee: &Employee) -> StoreResult<()> {
            match self.fault() {
                Fault::UpdateConflicts => Err(StoreError::ConcurrencyConflict(employee.id)),
                Fault::UpdateMissing => Err(StoreError::NotFound(employee.id)),
                _ => Ok(()),
            }
        }

        async fn delete(&self, id: i32) -> StoreResult<()> {
            match self.fault() {
                Fault::DeleteMissing => Err(StoreError::NotFound(id)),
                _ => Ok(()),
            }
        }
    }

    fn stored(id: i32) -> Employee {
        Employee {
            id,
            name: "Ada Lovelace".into(),
            email: format!("ada{id}@x.com"),
            department: "Math".into(),
            created_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            last_modified: None,
            is_active: true,
            version: 0,
        }
    }

    #[tokio::test]
    async fn add_then_load_contains_the_record() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        let added = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap();
        assert!(added.is_active);
        assert_eq!(added.last_modified, None);

        let loaded = service.load_all().await.into_result().unwrap();
        let matching: Vec<_> = loaded.iter().filter(|e| e.email == "john@x.com").collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, added.id);
        assert_eq!(matching[0].created_date, added.created_date);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        service
            .add_employee(EmployeeDraft::new("John Doe", "a@x.com", "IT"))
            .await
            .unwrap();
        let err = service
            .add_employee(EmployeeDraft::new("Jane Roe", "A@X.com", "Sales"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { ref email } if email == "A@X.com"));
        assert_eq!(service.load_all().await.employees.len(), 1);
    }

    #[tokio::test]
    async fn accented_case_variant_is_a_conflict() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        service
            .add_employee(EmployeeDraft::new("Ana Ruiz", "a@ÉX.com", "IT"))
            .await
            .unwrap();
        let err = service
            .add_employee(EmployeeDraft::new("Ana Other", "a@éx.com", "IT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
        assert_eq!(service.load_all().await.employees.len(), 1);
    }

    #[tokio::test]
    async fn invalid_name_creates_nothing() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        for name in ["J".to_string(), "x".repeat(101)] {
            let err = service
                .add_employee(EmployeeDraft::new(name, "j@x.com", "IT"))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        assert!(service.load_all().await.employees.is_empty());
    }

    #[tokio::test]
    async fn double_toggle_restores_status_with_later_stamps() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        let added = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap();

        let first = service.toggle_status(added.id).await.unwrap();
        assert!(!first.is_active);
        let first_stamp = first.last_modified.unwrap();
        assert!(first_stamp >= added.created_date);

        let second = service.toggle_status(added.id).await.unwrap();
        assert!(second.is_active);
        assert!(second.last_modified.unwrap() >= first_stamp);

        let stored = service.find(added.id).await.unwrap();
        assert_eq!(stored.last_modified, second.last_modified);
        assert_eq!(stored.version, 2);
        assert_eq!(stored.created_date, added.created_date);
    }

    #[tokio::test]
    async fn toggle_stamp_never_goes_backwards() {
        // A clock that runs backwards one minute per reading.
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(-60));
        let added = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap();
        let first = service.toggle_status(added.id).await.unwrap();
        let second = service.toggle_status(added.id).await.unwrap();
        assert_eq!(first.last_modified, Some(added.created_date));
        assert!(second.last_modified >= first.last_modified);
    }

    #[tokio::test]
    async fn remove_then_remove_again_is_not_found() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        let added = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap();
        service.remove_employee(added.id).await.unwrap();
        assert!(service.store().find_by_id(added.id).await.unwrap().is_none());
        let err = service.remove_employee(added.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id } if id == added.id));
    }

    #[tokio::test]
    async fn toggle_of_unknown_id_is_not_found() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        let err = service.toggle_status(404).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id: 404 }));
    }

    #[tokio::test]
    async fn failed_load_yields_empty_list_and_error() {
        let service = EmployeeService::new(ScriptedStore::with_fault(Fault::ListFails));
        let loaded = service.load_all().await;
        assert!(loaded.employees.is_empty());
        assert!(matches!(loaded.error, Some(ServiceError::DataAccess(_))));
    }

    #[tokio::test]
    async fn lost_insert_race_surfaces_as_conflict() {
        let service = EmployeeService::new(ScriptedStore::with_fault(Fault::InsertLosesRace));
        let err = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_conflict_surfaces_as_concurrency_error() {
        let store = ScriptedStore::with_fault(Fault::UpdateConflicts);
        store.seed(stored(1));
        let service = EmployeeService::new(store);
        let err = service.toggle_status(1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Concurrency { id: 1 }));
    }

    #[tokio::test]
    async fn row_deleted_between_read_and_write() {
        let store = ScriptedStore::with_fault(Fault::UpdateMissing);
        store.seed(stored(1));
        let service = EmployeeService::new(store);
        assert!(matches!(
            service.toggle_status(1).await.unwrap_err(),
            ServiceError::NotFound { id: 1 }
        ));

        let store = ScriptedStore::with_fault(Fault::DeleteMissing);
        store.seed(stored(2));
        let service = EmployeeService::new(store);
        assert!(matches!(
            service.remove_employee(2).await.unwrap_err(),
            ServiceError::NotFound { id: 2 }
        ));
    }

    #[tokio::test]
    async fn stale_toggle_from_second_actor_is_rejected() {
        let service = EmployeeService::with_clock(sqlite_store().await, StepClock::new(1));
        let added = service
            .add_employee(EmployeeDraft::new("John Doe", "john@x.com", "IT"))
            .await
            .unwrap();

        // Another actor read the row before our toggle landed.
        let stale = service.store().find_by_id(added.id).await.unwrap().unwrap();
        service.toggle_status(added.id).await.unwrap();

        let mut competing = stale.clone();
        competing.is_active = !stale.is_active;
        competing.last_modified = Some(service.now());
        let err = service.store().update(&competing).await.unwrap_err();
        assert!(matches!(err, StoreError::ConcurrencyConflict(_)));
    }
}
