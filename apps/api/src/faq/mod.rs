//! Assistant chat backed by a static FAQ knowledge base.

pub mod chat;
pub mod handlers;
pub mod knowledge_base;
pub mod matcher;
