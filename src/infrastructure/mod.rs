//! Infrastructure layer - collaborator implementations and application services

pub mod document;
pub mod email;
pub mod events;
pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
