pub mod gm;
pub mod user;
