use chrono::NaiveDate;

/// Result type of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engine, its tick sources and strategies.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The tick source cannot produce data for the given date.
    #[error("No tick data for {0}: {1}")]
    DataUnavailable(NaiveDate, String),

    /// A strategy callback failed. The whole run is aborted.
    #[error("Strategy fault in {runner}: {reason}")]
    StrategyFault {
        /// Identifier of the failing runner (`algo::symbol`).
        runner: String,
        /// The error raised by the callback.
        reason: String,
    },

    /// An algorithm with the same name is already registered.
    #[error("Algorithm already registered: {0}")]
    DuplicateAlgo(String),

    /// The engine was started without any registered algorithm.
    #[error("No algorithm registered")]
    NoAlgoRegistered,

    /// The candle period must be strictly positive.
    #[error("Candle period must be positive (got: {0})")]
    InvalidPeriod(u32),

    /// The engine configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker thread pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Custom error message, typically raised from strategy code.
    #[error("{0}")]
    Msg(String),

    /// An unreachable context was encountered. This is likely a bug.
    #[error("Unreachable context (internal error): {0}")]
    Unreachable(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration could not be parsed.
    #[cfg(feature = "serde")]
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}
