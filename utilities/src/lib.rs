pub mod backoff;
pub mod logger;
pub mod result;
