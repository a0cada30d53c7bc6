pub mod models;
pub mod pick_log;

pub use pick_log::{DurableLog, SqlitePickLog};
