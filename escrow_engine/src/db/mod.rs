pub mod common;
pub mod sqlite;
pub mod traits;
