//! Price source tiers.

mod http;
mod traits;

pub mod twse_day;
pub mod twse_mis;
pub mod yahoo;

pub(crate) use http::HttpSession;
pub use traits::PriceProvider;
