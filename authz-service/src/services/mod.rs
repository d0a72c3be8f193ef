//! Service layer: persistence, access validation and the authorization /
//! company workflows built on top of them.

pub mod authorization;
pub mod catalog;
pub mod company;
pub mod store;
pub mod validator;

pub use authorization::AuthorizationService;
pub use company::CompanyService;
pub use store::AuthzStore;
pub use validator::{AccessValidator, ActorContext};
