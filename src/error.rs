use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("series {symbol} has no ticks")]
    EmptySeries { symbol: String },

    #[error("series {symbol} is not sorted by timestamp at index {index}")]
    UnsortedSeries { symbol: String, index: usize },

    #[error("series {symbol} has non-positive price {price} at index {index}")]
    NonPositivePrice {
        symbol: String,
        index: usize,
        price: f64,
    },

    #[error("high-water mark for {symbol} is non-positive ({hwm})")]
    NonPositiveHighWaterMark { symbol: String, hwm: f64 },

    #[error("percent change base price must be positive, got {price}")]
    NonPositiveBase { price: f64 },
}
