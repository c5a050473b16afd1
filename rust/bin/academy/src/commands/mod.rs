pub mod batch;
pub mod context;
pub mod records;
pub mod workflow;
