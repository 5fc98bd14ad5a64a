//! Document upload, review and live listing.

pub mod handlers;
pub mod memory;
pub mod postgres;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod upload;
pub mod validation;
