pub mod posted_store;

pub use posted_store::{PendingLogStore, PostedStore};
