//! The asynchronous data source the strategies consume.
//!
//! Strategies only see the [`AsyncDataSource`] capability. [`SimulatedSource`]
//! stands in for a remote service: each lookup is served by a timer after the
//! resource's configured latency, and goes through the same
//! fetch, decode body, read name steps a real client would.

use async_runtime::{Deferred, EventLoop};
use core_types::AsyncError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Looks up the name of a resource by id.
///
/// The returned value always settles eventually: fulfilled with the name, or
/// rejected with a [`core_types::ErrorKind::TransportFailure`] or
/// [`core_types::ErrorKind::DecodeFailure`]. No ordering across ids may be
/// assumed.
pub trait AsyncDataSource {
    /// Starts a lookup for `id`.
    fn fetch_named(&self, id: u32) -> Deferred<String>;
}

/// How the simulated service answers for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    /// Resource id
    pub id: u32,
    /// Name returned in the response body
    pub name: String,
    /// Simulated latency
    pub latency_ms: u64,
    /// Reject with a transport failure instead of answering
    #[serde(default)]
    pub fail: bool,
    /// Raw body served instead of the generated JSON document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ResourceSpec {
    /// A resource that answers with `name` after `latency_ms`.
    pub fn new(id: u32, name: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            id,
            name: name.into(),
            latency_ms,
            fail: false,
            body: None,
        }
    }

    /// Marks the resource as unreachable.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Serves `body` verbatim.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn render_body(&self) -> String {
        match &self.body {
            Some(raw) => raw.clone(),
            None => serde_json::json!({ "id": self.id, "name": self.name }).to_string(),
        }
    }
}

/// The decoded body of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource id
    pub id: u32,
    /// Resource name
    pub name: String,
}

/// A raw response from the simulated service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Which resource was requested
    pub resource_id: u32,
    /// Undecoded body
    pub body: String,
}

impl Response {
    /// Decodes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AsyncError> {
        serde_json::from_str(&self.body).map_err(|error| {
            AsyncError::decode(format!("resource {}: {error}", self.resource_id))
        })
    }
}

/// Data source answering from an in-memory table after simulated latency.
///
/// # Examples
///
/// ```
/// use async_patterns::{AsyncDataSource, ResourceSpec, SimulatedSource};
/// use async_runtime::EventLoop;
///
/// let event_loop = EventLoop::new();
/// let source = SimulatedSource::new(&event_loop, [ResourceSpec::new(1, "stench", 100)]);
/// let name = source.fetch_named(1);
///
/// event_loop.run().unwrap();
/// assert_eq!(name.value().as_deref(), Some("stench"));
/// assert_eq!(event_loop.now().as_millis(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    event_loop: EventLoop,
    resources: BTreeMap<u32, ResourceSpec>,
}

impl SimulatedSource {
    /// Creates a source serving `resources` on `event_loop`.
    pub fn new(event_loop: &EventLoop, resources: impl IntoIterator<Item = ResourceSpec>) -> Self {
        Self {
            event_loop: event_loop.clone(),
            resources: resources.into_iter().map(|spec| (spec.id, spec)).collect(),
        }
    }

    /// The configured resource for `id`.
    pub fn resource(&self, id: u32) -> Option<&ResourceSpec> {
        self.resources.get(&id)
    }

    /// Requests the raw response for `id`.
    ///
    /// Unknown ids are rejected on a zero-delay timer, so even that failure
    /// is never observed synchronously.
    pub fn fetch(&self, id: u32) -> Deferred<Response> {
        let (response, resolver) = self.event_loop.create_deferred();
        match self.resources.get(&id).cloned() {
            None => {
                tracing::debug!(id, "request for unknown resource");
                self.event_loop.schedule_timer(0, move || {
                    resolver.reject(AsyncError::transport(format!("no resource with id {id}")));
                    Ok(())
                });
            }
            Some(spec) => {
                tracing::debug!(id, latency_ms = spec.latency_ms, "request issued");
                self.event_loop.schedule_timer(spec.latency_ms, move || {
                    if spec.fail {
                        tracing::debug!(id, "request failed");
                        resolver.reject(AsyncError::transport(format!(
                            "resource {id} ({}) is unreachable",
                            spec.name
                        )));
                    } else {
                        tracing::debug!(id, "response delivered");
                        resolver.fulfill(Response {
                            resource_id: id,
                            body: spec.render_body(),
                        });
                    }
                    Ok(())
                });
            }
        }
        response
    }
}

impl AsyncDataSource for SimulatedSource {
    fn fetch_named(&self, id: u32) -> Deferred<String> {
        self.fetch(id)
            .then(|response| response.json::<Resource>())
            .then(|resource| Ok(resource.name))
    }
}
