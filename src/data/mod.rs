pub mod loader;
pub mod types;

pub use loader::{LoaderError, PriceLoader, PRICE_COLUMNS};
pub use types::{volatility_samples, PricePoint, ReturnObservation, VolatilitySample};
