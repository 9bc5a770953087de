//! Database initialization, write transactions and user records

pub mod init;
pub mod transaction;
pub mod users;

pub use init::*;
pub use transaction::begin_write;
pub use users::record_user;
