pub mod csv_export;
pub mod database; // Driver seam: PostgreSQL and MySQL sessions
pub mod error_classifier;
pub mod formatter;
pub mod query_service;
pub mod result_transformer;

pub use csv_export::*;
pub use error_classifier::*;
pub use formatter::*;
pub use query_service::*;
pub use result_transformer::*;
