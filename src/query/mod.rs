pub mod service;

pub use service::{LocatorStrategy, QueryService};
