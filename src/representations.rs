//! Representation producers.
//!
//! A producer turns request parameters into the payload of one versioned
//! representation. Producers are looked up by the descriptor's
//! representation id after negotiation; the dispatcher never sees them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Inputs available to a producer.
#[derive(Debug, Clone)]
pub struct RepresentationRequest<'a> {
    pub params: &'a HashMap<String, String>,
    pub now: DateTime<Utc>,
}

impl<'a> RepresentationRequest<'a> {
    pub fn new(params: &'a HashMap<String, String>) -> Self {
        Self {
            params,
            now: Utc::now(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Produces the payload of one representation version.
pub trait RepresentationProducer: Send + Sync {
    fn produce(&self, request: &RepresentationRequest<'_>) -> Result<serde_json::Value, serde_json::Error>;
}

/// Producers keyed by representation id.
#[derive(Clone, Default)]
pub struct ProducerSet {
    producers: HashMap<String, Arc<dyn RepresentationProducer>>,
}

impl ProducerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producers for the built-in greeting and departing resources.
    pub fn builtin() -> Self {
        let counter = Arc::new(AtomicU64::new(0));
        let mut set = Self::new();
        set.register("greeting.v1", GreetingV1Producer::new(counter.clone()));
        set.register("greeting.v2", GreetingV2Producer::new(counter));
        set.register("departing.v1", DepartingV1Producer);
        set
    }

    pub fn register(
        &mut self,
        representation: impl Into<String>,
        producer: impl RepresentationProducer + 'static,
    ) {
        self.producers
            .insert(representation.into(), Arc::new(producer));
    }

    pub fn get(&self, representation: &str) -> Option<&dyn RepresentationProducer> {
        self.producers.get(representation).map(|p| p.as_ref())
    }

    pub fn contains(&self, representation: &str) -> bool {
        self.producers.contains_key(representation)
    }
}

fn greeting_content(request: &RepresentationRequest<'_>) -> String {
    format!("Hello, {}!", request.param("name").unwrap_or("World"))
}

#[derive(Debug, Serialize)]
struct GreetingV1 {
    id: u64,
    content: String,
}

/// `greeting.v1`: an id and a content line.
pub struct GreetingV1Producer {
    counter: Arc<AtomicU64>,
}

impl GreetingV1Producer {
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self { counter }
    }
}

impl RepresentationProducer for GreetingV1Producer {
    fn produce(&self, request: &RepresentationRequest<'_>) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(GreetingV1 {
            id: self.counter.fetch_add(1, Ordering::Relaxed) + 1,
            content: greeting_content(request),
        })
    }
}

#[derive(Debug, Serialize)]
struct GreetingV2 {
    id: u64,
    content: String,
    timestamp: String,
}

/// `greeting.v2`: v1 plus the time the greeting was produced.
pub struct GreetingV2Producer {
    counter: Arc<AtomicU64>,
}

impl GreetingV2Producer {
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self { counter }
    }
}

impl RepresentationProducer for GreetingV2Producer {
    fn produce(&self, request: &RepresentationRequest<'_>) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(GreetingV2 {
            id: self.counter.fetch_add(1, Ordering::Relaxed) + 1,
            content: greeting_content(request),
            timestamp: request.now.to_rfc3339(),
        })
    }
}

#[derive(Debug, Serialize)]
struct DepartingV1 {
    content: String,
    date: String,
}

/// `departing.v1`: a goodbye message and the departure date.
pub struct DepartingV1Producer;

impl RepresentationProducer for DepartingV1Producer {
    fn produce(&self, request: &RepresentationRequest<'_>) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(DepartingV1 {
            content: "Goodbye".to_string(),
            // Milliseconds are not zero-padded: 13:45:07.005 is `13:45:07:5`
            date: format!(
                "{}:{}",
                request.now.format("%m/%d/%Y %H:%M:%S"),
                request.now.timestamp_subsec_millis()
            ),
        })
    }
}
