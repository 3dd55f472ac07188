//! Conversation messages and structured model responses

pub mod entities;
pub mod response;
