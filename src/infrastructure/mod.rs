//! Infrastructure layer - external service implementations

pub mod http;
pub mod logging;
pub mod storage;
pub mod usage;
