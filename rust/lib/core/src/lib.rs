pub mod auth;
pub mod config;
pub mod error;
pub mod types;

pub use auth::{Role, Session};
pub use config::AcademyConfig;
pub use error::ServiceError;
pub use types::{merge_fields, new_id, now_rfc3339, parse_date};
