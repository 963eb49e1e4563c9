use sea_orm::prelude::{DateTimeWithTimeZone, *};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: String,
    /// Trimmed, Unicode-lowercased `email`; carries the uniqueness constraint.
    #[sea_orm(unique)]
    pub email_normalized: String,
    pub department: String,
    pub created_date: DateTimeWithTimeZone,
    pub last_modified: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    /// Bumped on every successful update; writers compare it to detect lost updates.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}
