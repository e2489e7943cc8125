//! Recovers every record behind a catalog API that filters by price, reports how many
//! records matched, and silently truncates the page at a limit it never discloses.
//!
//! The limit is never read or assumed. Truncation is inferred from `count < total`
//! and the price range is carved up until every window comes back whole.

mod cache;
mod catalog;
pub mod config;
mod domain;
mod error;
mod macros;
mod parse;
pub mod partition;
pub mod process;
mod request;

pub use cache::OverflowCache;
pub use catalog::{CatalogClient, InMemoryCatalog, ProbeResult, Record};
pub use domain::{Domain, RangeQuery};
pub use error::{Error, Result};
pub use request::HttpCatalogClient;

pub const API_URL: &str = "https://api.ecommerce.com/products";
pub const MIN_PRICE: f64 = 0.0;
pub const MAX_PRICE: f64 = 100_000.0;
pub const PRICE_STEP: f64 = 0.01;
const MIN_PRICE_PARAM: &str = "minPrice";
const MAX_PRICE_PARAM: &str = "maxPrice";
