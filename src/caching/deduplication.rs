//! # Request Coalescing Module
//!
//! Single-flight suppression of concurrent cache misses. The first caller for
//! a key becomes the leader and performs the upstream fetch; callers arriving
//! while it is in flight wait for the leader's result instead of issuing
//! their own request.
//!
//! A leader that is cancelled or times out publishes nothing. Its followers
//! then race again for leadership, so one client's disconnect never fails
//! another client's request. A follower still waits under its own context:
//! its cancellation or deadline ends the wait without touching the leader.

use crate::core::context::RequestContext;
use crate::core::error::CmsResult;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

type Outcome = Option<CmsResult<Bytes>>;
type InFlight = Arc<watch::Sender<Outcome>>;

/// Per-key in-flight request tracker
#[derive(Debug, Clone, Default)]
pub struct RequestCoalescer {
    in_flight: Arc<DashMap<String, InFlight>>,
}

enum Role {
    Leader(InFlight),
    Follower(watch::Receiver<Outcome>),
}

/// Removes the leader's entry however the leader exits
struct LeaderGuard<'a> {
    in_flight: &'a DashMap<String, InFlight>,
    key: &'a str,
    sender: InFlight,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(self.key, |_, current| Arc::ptr_eq(current, &self.sender));
    }
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently being fetched
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run `fetch` unless another caller is already fetching `key`, in which
    /// case wait for and share that caller's result. The wait is bounded by
    /// `ctx`, the fetch itself is expected to carry its own guard.
    pub async fn run<F>(&self, ctx: &RequestContext, key: &str, fetch: F) -> CmsResult<Bytes>
    where
        F: Future<Output = CmsResult<Bytes>>,
    {
        loop {
            let role = match self.in_flight.entry(key.to_string()) {
                Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
                Entry::Vacant(entry) => {
                    let (sender, _) = watch::channel(None);
                    let sender = Arc::new(sender);
                    entry.insert(sender.clone());
                    Role::Leader(sender)
                }
            };

            match role {
                Role::Leader(sender) => {
                    let _guard = LeaderGuard {
                        in_flight: &self.in_flight,
                        key,
                        sender: sender.clone(),
                    };

                    let result = fetch.await;
                    if !matches!(&result, Err(e) if e.is_interruption()) {
                        sender.send_replace(Some(result.clone()));
                    }
                    return result;
                }
                Role::Follower(mut receiver) => {
                    metrics::counter!("cms_coalesced_requests_total").increment(1);
                    debug!("Waiting for in-flight fetch of key: {}", key);

                    let shared = ctx
                        .guard(async {
                            receiver
                                .wait_for(Option::is_some)
                                .await
                                .ok()
                                .and_then(|outcome| (*outcome).clone())
                        })
                        .await?;

                    match shared {
                        Some(result) => return result,
                        None => debug!("Leader for key {} gave up, retrying", key),
                    }
                }
            }
        }
    }
}
