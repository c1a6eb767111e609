//! REST client for the Pendle v2 API.
//!
//! Pagination walks a forward cursor (`resumeToken`) when the API supplies
//! one, falling back to a numeric `skip` offset. A seen-id set is threaded
//! through the whole walk for one market so overlapping pages never yield
//! duplicate transactions.

use crate::{MarketSource, UpstreamError};
use async_trait::async_trait;
use pendle_core::{Chain, Market, Transaction};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://api-v2.pendle.finance/core";

/// Worst-case pagination cost per market, regardless of upstream size.
const MAX_PAGES: usize = 8;
const PAGE_LIMIT: usize = 500;
/// Swap actions relevant to decline-rate analysis.
const ACTION_FILTER: &str = "SWAP_PT,SWAP_PY,SWAP_YT";
const ORIGIN_FILTER: &str = "PENDLE_MARKET,YT";

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 300;
const RETRY_JITTER_MS: u64 = 300;
/// Brief pause between cursor-following page requests.
const CURSOR_PAUSE_MS: u64 = 50;

#[derive(Debug, Deserialize)]
struct ActiveMarketsResponse {
    #[serde(default)]
    markets: Vec<Market>,
}

#[derive(Debug, Deserialize)]
struct TransactionsPage {
    #[serde(default)]
    results: Vec<Transaction>,
    #[serde(default, rename = "resumeToken")]
    resume_token: Option<String>,
}

enum PageCursor {
    Skip(usize),
    Token(String),
}

/// Pendle API client bound to one chain. Stateless across calls.
pub struct PendleClient {
    http: reqwest::Client,
    base_url: String,
    chain: Chain,
}

impl PendleClient {
    pub fn new(chain: Chain) -> Self {
        Self::with_base_url(chain, BASE_URL)
    }

    pub fn with_base_url(chain: Chain, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            chain,
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    fn retry_delay() -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=RETRY_JITTER_MS);
        Duration::from_millis(RETRY_DELAY_MS + jitter)
    }

    /// GET with bounded retry on transient failures (network, 5xx, 429).
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.http.get(url).query(params).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .await
                            .map_err(|e| UpstreamError::Parse(e.to_string()));
                    }
                    if status.as_u16() == 429 {
                        UpstreamError::RateLimited {
                            endpoint: url.to_string(),
                        }
                    } else {
                        UpstreamError::Http {
                            status: status.as_u16(),
                            endpoint: url.to_string(),
                        }
                    }
                }
                Err(e) => UpstreamError::Network(e.to_string()),
            };

            if !err.is_transient() || attempt >= MAX_ATTEMPTS {
                return Err(err);
            }
            let delay = Self::retry_delay();
            debug!(url, attempt, delay_ms = delay.as_millis() as u64, error = %err,
                "transient upstream failure, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Walk up to `MAX_PAGES` pages, deduplicating by transaction id and
/// dropping immaterial records. A page failure after retries stops the walk:
/// whatever accumulated so far is returned, unless nothing was, in which
/// case retrieval failed entirely.
async fn walk_pages<F, Fut>(mut fetch: F) -> Result<Vec<Transaction>, UpstreamError>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<TransactionsPage, UpstreamError>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected: Vec<Transaction> = Vec::new();
    let mut skip = 0usize;
    let mut resume_token: Option<String> = None;

    for page_no in 0..MAX_PAGES {
        let cursor = match resume_token.take() {
            Some(token) => PageCursor::Token(token),
            None => PageCursor::Skip(skip),
        };

        let page = match fetch(cursor).await {
            Ok(page) => page,
            Err(err) if collected.is_empty() => return Err(err),
            Err(err) => {
                warn!(page = page_no + 1, error = %err,
                    "page fetch failed, returning partial history");
                break;
            }
        };

        if page.results.is_empty() {
            break;
        }

        for tx in page.results {
            if !seen.insert(tx.id.clone()) {
                continue;
            }
            if !tx.is_material() {
                continue;
            }
            collected.push(tx);
        }

        resume_token = page.resume_token;
        if resume_token.is_some() {
            tokio::time::sleep(Duration::from_millis(CURSOR_PAUSE_MS)).await;
        } else {
            skip += PAGE_LIMIT;
        }
    }

    Ok(collected)
}

#[async_trait]
impl MarketSource for PendleClient {
    async fn list_active_markets(&self) -> Result<Vec<Market>, UpstreamError> {
        let url = format!("{}/v1/{}/markets/active", self.base_url, self.chain.id());
        let resp: ActiveMarketsResponse = self.fetch_json(&url, &[]).await?;
        info!(chain = %self.chain, markets = resp.markets.len(), "fetched active markets");
        Ok(resp.markets)
    }

    async fn list_transactions(
        &self,
        market_address: &str,
    ) -> Result<Vec<Transaction>, UpstreamError> {
        let url = format!("{}/v4/{}/transactions", self.base_url, self.chain.id());
        let market = market_address.to_lowercase();

        let transactions = walk_pages(|cursor| {
            let url = url.clone();
            let market = market.clone();
            async move {
                let mut params = vec![
                    ("market", market),
                    ("action", ACTION_FILTER.to_string()),
                    ("origin", ORIGIN_FILTER.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("minValue", "0".to_string()),
                ];
                match cursor {
                    PageCursor::Skip(n) => params.push(("skip", n.to_string())),
                    PageCursor::Token(t) => params.push(("resumeToken", t)),
                }
                self.fetch_json::<TransactionsPage>(&url, &params).await
            }
        })
        .await?;

        debug!(market = market_address, count = transactions.len(),
            "collected unique transactions");
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tx(id: &str, apy: f64) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "timestamp": "2025-06-01T12:00:00Z",
            "action": "SWAP_YT",
            "impliedApy": apy,
        }))
        .unwrap()
    }

    fn immaterial(id: &str) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "timestamp": "2025-06-01T12:00:00Z",
            "action": "SWAP_YT",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_overlapping_pages_dedup_by_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = Arc::clone(&calls);

        let result = walk_pages(move |_| {
            let n = calls_inner.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Ok(TransactionsPage {
                        results: vec![tx("a", 0.1), tx("b", 0.2)],
                        resume_token: None,
                    }),
                    // "b" overlaps with the first page
                    1 => Ok(TransactionsPage {
                        results: vec![tx("b", 0.2), tx("c", 0.3)],
                        resume_token: None,
                    }),
                    _ => Ok(TransactionsPage {
                        results: vec![],
                        resume_token: None,
                    }),
                }
            }
        })
        .await
        .unwrap();

        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_page_budget_caps_unlimited_upstream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = Arc::clone(&calls);

        // Upstream that never runs out of fresh pages.
        let result = walk_pages(move |_| {
            let n = calls_inner.fetch_add(1, Ordering::SeqCst);
            async move {
                let results = (0..3).map(|i| tx(&format!("p{n}-{i}"), 0.1)).collect();
                Ok(TransactionsPage {
                    results,
                    resume_token: None,
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), MAX_PAGES);
        assert_eq!(result.len(), MAX_PAGES * 3);
    }

    #[tokio::test]
    async fn test_immaterial_transactions_dropped() {
        let result = walk_pages(|cursor| async move {
            match cursor {
                PageCursor::Skip(0) => Ok(TransactionsPage {
                    results: vec![tx("a", 0.1), immaterial("b")],
                    resume_token: None,
                }),
                _ => Ok(TransactionsPage {
                    results: vec![],
                    resume_token: None,
                }),
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[tokio::test]
    async fn test_first_page_failure_is_an_error() {
        let result = walk_pages(|_| async {
            Err(UpstreamError::Http {
                status: 500,
                endpoint: "test".into(),
            })
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_later_page_failure_returns_partial() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_inner = Arc::clone(&calls);

        let result = walk_pages(move |_| {
            let n = calls_inner.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(TransactionsPage {
                        results: vec![tx("a", 0.1)],
                        resume_token: None,
                    })
                } else {
                    Err(UpstreamError::Network("connection reset".into()))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_resume_token_forwarded_to_next_page() {
        let result = walk_pages(|cursor| async move {
            match cursor {
                PageCursor::Skip(0) => Ok(TransactionsPage {
                    results: vec![tx("a", 0.1)],
                    resume_token: Some("next".to_string()),
                }),
                PageCursor::Token(t) => {
                    assert_eq!(t, "next");
                    Ok(TransactionsPage {
                        results: vec![tx("b", 0.2)],
                        resume_token: None,
                    })
                }
                PageCursor::Skip(_) => Ok(TransactionsPage {
                    results: vec![],
                    resume_token: None,
                }),
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 2);
    }
}
