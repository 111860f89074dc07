mod codec;
mod error;
mod lttb;
pub mod prometheus;
mod sample;

pub use codec::*;
pub use error::*;
pub use lttb::*;
pub use prometheus::{Client, QueryRange, Series};
pub use sample::*;
