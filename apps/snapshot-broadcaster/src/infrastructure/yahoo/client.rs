//! Yahoo Finance quote and candle provider adapter.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use super::chart::ChartEnvelope;
use crate::application::ports::{CandleProvider, ProviderError, QuoteProvider};
use crate::domain::candle::{Candle, CandleRequest};
use crate::domain::quote::ProviderQuote;
use crate::infrastructure::config::ProviderSettings;
use crate::infrastructure::metrics;

const USER_AGENT: &str = concat!("snapshot-broadcaster/", env!("CARGO_PKG_VERSION"));

/// Quote provider backed by the Yahoo Finance v8 chart API.
///
/// Implements `QuoteProvider` and `CandleProvider` with one HTTP request
/// per call. Every request outcome is counted in
/// `snapshot_broadcaster_provider_calls_total`.
#[derive(Debug, Clone)]
pub struct YahooQuoteProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Transport` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| ProviderError::Transport {
            message: format!("invalid base url {}: {e}", settings.base_url),
        })?;

        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Transport {
                message: format!("base url cannot carry a path: {}", settings.base_url),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    fn chart_url(&self, symbol: &str, query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Transport {
                message: format!("base url cannot carry a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn fetch_chart(&self, symbol: &str, url: Url) -> Result<ChartEnvelope, ProviderError> {
        let result = self.send(symbol, url).await;
        match &result {
            Ok(_) => metrics::record_provider_call("ok"),
            Err(e) => metrics::record_provider_call(e.label()),
        }
        result
    }

    async fn send(&self, symbol: &str, url: Url) -> Result<ChartEnvelope, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Decode {
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    async fn quote(&self, symbol: &str) -> Result<ProviderQuote, ProviderError> {
        let url = self.chart_url(symbol, &[("range", "1d"), ("interval", "1d")])?;
        self.fetch_chart(symbol, url).await?.into_quote(symbol)
    }
}

#[async_trait]
impl CandleProvider for YahooQuoteProvider {
    async fn candles(
        &self,
        symbol: &str,
        request: &CandleRequest,
    ) -> Result<Vec<Candle>, ProviderError> {
        let period1 = request.from.timestamp().to_string();
        let period2 = request.to.timestamp().to_string();
        let url = self.chart_url(
            symbol,
            &[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", request.interval.as_str()),
            ],
        )?;
        self.fetch_chart(symbol, url).await?.into_candles(symbol)
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport {
            message: e.to_string(),
        }
    }
}
