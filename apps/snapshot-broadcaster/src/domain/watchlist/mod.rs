//! Watchlists
//!
//! Read-only symbol lists shared by every connection. Defaults mirror the
//! dashboard's headline Indian indices, a handful of regional benchmarks and
//! a large-cap movers universe.

/// A headline index shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSeries {
    /// Payload key (e.g. `nifty50`).
    pub key: String,
    /// Display name (e.g. `NIFTY 50`).
    pub name: String,
    /// Provider symbol (e.g. `^NSEI`).
    pub symbol: String,
}

impl IndexSeries {
    /// Create a series.
    #[must_use]
    pub fn new(key: &str, name: &str, symbol: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// A stock considered when ranking gainers and losers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mover {
    /// Display name.
    pub name: String,
    /// Provider symbol.
    pub symbol: String,
}

impl Mover {
    /// Create a mover.
    #[must_use]
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Index symbols for one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountrySeries {
    /// Payload key (e.g. `southKorea`).
    pub key: String,
    /// Provider symbols, in display order.
    pub symbols: Vec<String>,
}

impl CountrySeries {
    /// Create a country series.
    #[must_use]
    pub fn new(key: &str, symbols: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Default headline indices.
#[must_use]
pub fn default_dashboard_indices() -> Vec<IndexSeries> {
    vec![
        IndexSeries::new("nifty50", "NIFTY 50", "^NSEI"),
        IndexSeries::new("sensex", "SENSEX", "^BSESN"),
        IndexSeries::new("niftyBank", "NIFTY BANK", "^NSEBANK"),
        IndexSeries::new("niftyIT", "NIFTY IT", "^CNXIT"),
        IndexSeries::new("niftyMidcap50", "NIFTY MIDCAP 50", "^NSEMDCP50"),
        IndexSeries::new("niftyNext50", "NIFTY NEXT 50", "^NSMIDCP"),
        IndexSeries::new("niftyMidcap100", "NIFTY MIDCAP 100", "^CRSMID"),
        IndexSeries::new("indiaVix", "INDIA VIX", "^INDIAVIX"),
        IndexSeries::new(
            "niftyFinancialServices",
            "NIFTY FINANCIAL SERVICES",
            "NIFTY_FIN_SERVICE.NS",
        ),
    ]
}

/// Default movers universe.
#[must_use]
pub fn default_movers() -> Vec<Mover> {
    vec![
        Mover::new("Reliance", "RELIANCE.NS"),
        Mover::new("HDFC Bank", "HDFCBANK.NS"),
        Mover::new("Infosys", "INFY.NS"),
        Mover::new("TCS", "TCS.NS"),
        Mover::new("Wipro", "WIPRO.NS"),
        Mover::new("ICICI Bank", "ICICIBANK.NS"),
    ]
}

/// Default country benchmarks.
#[must_use]
pub fn default_country_indices() -> Vec<CountrySeries> {
    vec![
        CountrySeries::new("india", &["^NSEI", "^BSESN", "^NSEBANK", "^CNXIT"]),
        CountrySeries::new("us", &["^GSPC", "^DJI", "^IXIC", "^RUT"]),
        CountrySeries::new("china", &["000001.SS", "399001.SZ", "399006.SZ"]),
        CountrySeries::new("singapore", &["^STI", "WISGP.SI"]),
        CountrySeries::new("uk", &["^FTSE", "^FTMC"]),
        CountrySeries::new("southKorea", &["^KS11", "^KQ11"]),
    ]
}
