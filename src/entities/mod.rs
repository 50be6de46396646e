pub mod gm_accounts;
pub mod users;
