//! Recording mocks for the ports, used by unit and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::jito::{BundleEndpoint, BundleStatus, JitoError};
use crate::domain::{Quote, QuoteRequest, RouteLeg, RoutingError, Venue};
use crate::ports::price_source::{PriceError, PriceSource};
use crate::ports::quote_source::QuoteSource;

/// How a mock quote source answers
#[derive(Debug, Clone)]
enum QuoteBehaviour {
    /// Output = amount * rate
    Rate(f64),
    /// Fixed output regardless of amount
    Fixed(u64),
    Fail,
}

/// Mock venue that records requests and answers with a configured quote
#[derive(Debug)]
pub struct MockQuoteSource {
    venue: Venue,
    behaviour: Mutex<QuoteBehaviour>,
    price_impact_pct: f64,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<QuoteRequest>>>,
}

impl MockQuoteSource {
    /// Quotes `amount * rate` output
    pub fn with_rate(venue: Venue, rate: f64) -> Self {
        Self::build(venue, QuoteBehaviour::Rate(rate))
    }

    /// Always quotes `out_amount`
    pub fn with_out_amount(venue: Venue, out_amount: u64) -> Self {
        Self::build(venue, QuoteBehaviour::Fixed(out_amount))
    }

    /// Always fails
    pub fn failing(venue: Venue) -> Self {
        Self::build(venue, QuoteBehaviour::Fail)
    }

    fn build(venue: Venue, behaviour: QuoteBehaviour) -> Self {
        Self {
            venue,
            behaviour: Mutex::new(behaviour),
            price_impact_pct: 0.1,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builder method to delay every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_price_impact(mut self, price_impact_pct: f64) -> Self {
        self.price_impact_pct = price_impact_pct;
        self
    }

    /// Switch to failing from now on
    pub fn start_failing(&self) {
        *self.behaviour.lock().unwrap() = QuoteBehaviour::Fail;
    }

    /// Get all recorded requests
    pub fn get_calls(&self) -> Vec<QuoteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RoutingError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behaviour = self.behaviour.lock().unwrap().clone();
        let out_amount = match behaviour {
            QuoteBehaviour::Rate(rate) => (request.amount as f64 * rate) as u64,
            QuoteBehaviour::Fixed(out) => out,
            QuoteBehaviour::Fail => {
                return Err(RoutingError::source_unavailable(self.venue.name(), "mock failure"))
            }
        };

        Ok(Quote {
            input_mint: request.input_mint.clone(),
            output_mint: request.output_mint.clone(),
            in_amount: request.amount,
            out_amount,
            other_amount_threshold: out_amount,
            price_impact_pct: self.price_impact_pct,
            route_plan: vec![RouteLeg {
                venue: self.venue,
                label: format!("mock-{}", self.venue),
                in_amount: request.amount,
                out_amount,
            }],
            context_slot: None,
            time_taken_ms: self.delay.map(|d| d.as_millis() as u64).unwrap_or(0),
        })
    }
}

/// Mock USD price feed
#[derive(Debug, Default)]
pub struct MockPriceSource {
    name: String,
    prices: Mutex<HashMap<String, f64>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPriceSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Builder method to set a price for a mint
    pub fn with_price(self, mint: &str, price: f64) -> Self {
        self.prices.lock().unwrap().insert(mint.to_string(), price);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_usd_price(&self, mint: &str) -> Result<f64, PriceError> {
        self.calls.lock().unwrap().push(mint.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PriceError::NoPriceData(mint.to_string()));
        }
        self.prices
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| PriceError::NoPriceData(mint.to_string()))
    }
}

/// Mock block engine that records submissions
#[derive(Debug)]
pub struct MockBundleEndpoint {
    url: String,
    /// Bundle id to return, or None to fail every submission
    bundle_id: Option<String>,
    /// Statuses returned in order; the last one repeats
    statuses: Mutex<Vec<BundleStatus>>,
    delay: Option<Duration>,
    status_delay: Option<Duration>,
    submissions: Arc<Mutex<Vec<Vec<String>>>>,
    status_calls: Arc<Mutex<Vec<String>>>,
}

impl MockBundleEndpoint {
    pub fn accepting(url: &str, bundle_id: &str) -> Self {
        Self::build(url, Some(bundle_id.to_string()))
    }

    pub fn failing(url: &str) -> Self {
        Self::build(url, None)
    }

    fn build(url: &str, bundle_id: Option<String>) -> Self {
        Self {
            url: url.to_string(),
            bundle_id,
            statuses: Mutex::new(Vec::new()),
            delay: None,
            status_delay: None,
            submissions: Arc::new(Mutex::new(Vec::new())),
            status_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builder method to script status answers
    pub fn with_statuses(self, statuses: Vec<BundleStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Builder method to delay every status answer
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn get_submissions(&self) -> Vec<Vec<String>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BundleEndpoint for MockBundleEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn send_bundle(&self, transactions: &[String]) -> Result<String, JitoError> {
        self.submissions.lock().unwrap().push(transactions.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.bundle_id
            .clone()
            .ok_or_else(|| JitoError::NetworkError(format!("{} unreachable", self.url)))
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<BundleStatus, JitoError> {
        self.status_calls.lock().unwrap().push(bundle_id.to_string());
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        if self.bundle_id.is_none() {
            return Err(JitoError::StatusCheckFailed(format!("{} unreachable", self.url)));
        }
        let mut statuses = self.statuses.lock().unwrap();
        let status = match statuses.len() {
            0 => BundleStatus::Pending,
            1 => statuses[0],
            _ => statuses.remove(0),
        };
        Ok(status)
    }
}
