//! 业务服务层

pub mod auth_service;

pub use auth_service::{AuthService, IssuedToken};
