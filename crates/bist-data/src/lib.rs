pub mod documents;
pub mod error;
pub mod macro_data;
pub mod portfolios;
pub mod snapshot;
pub mod technicals;
pub mod text;

pub use documents::{Document, DocumentStore};
pub use error::DataError;
pub use snapshot::{MarketSnapshot, StockRecord};
pub use technicals::TechnicalIndicators;
