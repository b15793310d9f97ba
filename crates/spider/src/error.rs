use thiserror::Error;

/// Failure kinds of the scrape-cache-refresh pipeline.
///
/// The roster refresh aborts the cycle on `Fetch`, `EmptyEnvelope` and
/// `NoTable`; a sweep logs `Provider` and moves on to the next symbol.
#[derive(Debug, Error)]
pub enum Error {
    /// The wiki request failed, or its JSON envelope could not be read.
    #[error("page fetch failed, error({0})")]
    Fetch(#[from] reqwest::Error),

    /// The envelope parsed, but the rendered page text was missing.
    #[error("wiki envelope missing parse.text for page '{page}'")]
    EmptyEnvelope { page: String },

    /// Neither the constituents table nor any fallback table was found.
    ///
    /// A hard failure: the source page structure has changed and every
    /// row-count-derived result would be garbage.
    #[error("no symbol table found in page HTML")]
    NoTable,

    /// A required cache field has never been written.
    #[error("cache field '{0}' is not populated")]
    CacheEmpty(&'static str),

    /// The cache snapshot could not be read or written.
    #[error("cache snapshot io, error({0})")]
    Store(#[from] std::io::Error),

    /// Snapshot or payload (de)serialization failed.
    #[error("serialization, error({0})")]
    Serde(#[from] serde_json::Error),

    /// A financial-data provider failed for one symbol.
    #[error("{provider} fetch failed for {symbol}, error({reason})")]
    Provider {
        provider: &'static str,
        symbol: String,
        reason: String,
    },
}
