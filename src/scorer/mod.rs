pub mod pick_scorer;

pub use pick_scorer::evaluate;
