//! Runtime module — process lifecycle: boot and serve.

pub mod boot;
pub mod serve;
