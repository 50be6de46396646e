pub mod auth_service;
pub use auth_service::{AuthError, AuthService, GmLogin, UserLogin};

pub mod auth_service_impl;
pub use auth_service_impl::CredentialAuthService;

pub mod password;
pub use password::{HashAlgorithm, PasswordError};
