//! Price data: provider trait, concrete sources, and the fetch cache.

pub mod cache;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use cache::{CacheKey, CachedProvider, FetchCache};
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, RawBar, RawSeries};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
