pub mod defs;

pub use defs::{headline_of, Comment, Item, ItemStatus, MetricSnapshot, Metrics, NewItem, Settings};
