//! Sign-up/sign-in, bearer-token sessions and role-gated navigation.

pub mod handlers;
pub mod memory;
pub mod models;
pub mod navigation;
pub mod password;
pub mod postgres;
pub mod provider;
pub mod session;
