pub mod audit_context;

pub use audit_context::*;
