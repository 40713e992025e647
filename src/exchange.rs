use anyhow::{bail, Context};
use axum::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Currency conversion for USD-priced products. Every call fetches a fresh
/// rate; converted amounts must reflect the rate at the moment of the call.
#[async_trait]
pub trait ExchangeRates: Send + Sync {
    async fn usd_to_uyu(&self, amount: Decimal) -> anyhow::Result<Decimal>;
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    conversion_rate: f64,
}

pub struct ExchangeRateApi {
    http: reqwest::Client,
    api_key: String,
}

impl ExchangeRateApi {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ExchangeRates for ExchangeRateApi {
    async fn usd_to_uyu(&self, amount: Decimal) -> anyhow::Result<Decimal> {
        let url = format!(
            "https://v6.exchangerate-api.com/v6/{}/pair/USD/UYU",
            self.api_key
        );
        let response: PairResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("exchange rate request")?
            .json()
            .await
            .context("exchange rate response body")?;
        if response.result != "success" {
            bail!("exchange rate API returned {}", response.result);
        }
        let rate = Decimal::try_from(response.conversion_rate)
            .context("conversion rate out of range")?;
        debug!(%rate, "fetched USD/UYU rate");
        Ok((amount * rate).round_dp(2))
    }
}
