use crate::data::RawBar;
use crate::fetch::{AggregatesSource, DataError};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

const PAGE_LIMIT: u32 = 50_000;

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<AggBar>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    t: i64,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

impl AggBar {
    fn to_raw(&self) -> Result<RawBar, DataError> {
        let timestamp = DateTime::from_timestamp_millis(self.t).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("invalid timestamp: {}", self.t))
        })?;
        Ok(RawBar::new(
            timestamp,
            self.o.unwrap_or(f64::NAN),
            self.h.unwrap_or(f64::NAN),
            self.l.unwrap_or(f64::NAN),
            self.c.unwrap_or(f64::NAN),
            self.v.unwrap_or(f64::NAN),
        ))
    }
}

//polygon.io v2 aggregates endpoint, one-minute bars
pub struct PolygonClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl PolygonClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        Ok(PolygonClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn range_url(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/range/1/minute/{}/{}?adjusted=true&sort=asc&limit={}",
            self.base_url,
            ticker,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
            PAGE_LIMIT
        )
    }

    //the key is appended here only, urls are logged without it
    fn with_key(&self, url: &str) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{}{}apiKey={}", url, sep, self.api_key)
    }

    fn get_page(&self, ticker: &str, url: &str) -> Result<AggsResponse, DataError> {
        tracing::debug!(ticker, url, "requesting aggregates page");

        let resp = self.client.get(self.with_key(url)).send().map_err(|e| {
            //strip the request url so the key never reaches a log line
            DataError::NetworkUnreachable(e.without_url().to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "HTTP {} for {}",
                status.as_u16(),
                ticker
            )));
        }
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                ticker: ticker.to_string(),
            });
        }

        resp.json::<AggsResponse>()
            .map_err(|e| body_error(ticker, e.without_url()))
    }
}

//a body cut off by a timeout or a dropped connection is retried, malformed json is not
fn body_error(ticker: &str, e: reqwest::Error) -> DataError {
    if e.is_timeout() || e.is_body() || e.is_connect() || e.is_request() {
        DataError::NetworkUnreachable(format!("failed to read response for {}: {}", ticker, e))
    } else {
        DataError::ResponseFormatChanged(format!("failed to parse response for {}: {}", ticker, e))
    }
}

impl AggregatesSource for PolygonClient {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let mut bars = Vec::new();
        let mut url = Some(self.range_url(ticker, from, to));

        while let Some(page_url) = url {
            let page = self.get_page(ticker, &page_url)?;
            for agg in &page.results {
                bars.push(agg.to_raw()?);
            }
            url = page.next_url;
        }

        Ok(bars)
    }
}
