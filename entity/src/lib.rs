pub mod employees;

pub use employees::Entity as Employees;
