pub mod catalog;
pub mod company;
pub mod company_user;
pub mod permission;
pub mod role;
pub mod user;
pub mod user_role;

pub use catalog::{Module, ModuleAction};
pub use company::{Company, CompanyUpdate, NewCompany};
pub use company_user::CompanyUser;
pub use permission::Permission;
pub use role::{Role, RoleWithPermissions};
pub use user::{NewUser, User};
pub use user_role::UserRole;
