pub mod connection;
pub mod metadata;
pub mod query;
pub mod result;

pub use connection::*;
pub use metadata::*;
pub use query::*;
pub use result::*;
