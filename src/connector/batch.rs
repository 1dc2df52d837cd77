//! In-flight read coalescing
//!
//! A ticket table keyed by [`Address`]. While a fetch for an address is
//! outstanding, every `load` of that address joins the same pending result
//! instead of issuing a new request. Settled results are not retained: the
//! next `load` after settlement fetches again.
//!
//! # Ordering
//!
//! The fetch runs in its own task, and that task removes its ticket *before*
//! its outcome becomes observable. A `load` that starts after any caller has
//! seen a result therefore never joins the stale ticket.
//!
//! Tickets carry a sequence id; a settling fetch only removes the ticket it
//! created, so a ticket issued after [`BatchingCache::invalidate_all`] is
//! never removed by an older fetch finishing late.
//!
//! Fetches cannot be cancelled. Dropping every waiting caller leaves the
//! spawned fetch running to completion.

use crate::github::{Address, ResourceEnvelope, ResourceFetcher};
use crate::{FollowGraphError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

type SharedLoad = Shared<BoxFuture<'static, Result<ResourceEnvelope>>>;

struct Ticket {
    id: u64,
    load: SharedLoad,
}

#[derive(Default)]
struct TicketTable {
    next_id: u64,
    in_flight: HashMap<Address, Ticket>,
}

/// Read-coalescing layer over a [`ResourceFetcher`]
pub struct BatchingCache {
    fetcher: Arc<dyn ResourceFetcher>,
    tickets: Arc<Mutex<TicketTable>>,
}

impl BatchingCache {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            tickets: Arc::new(Mutex::new(TicketTable::default())),
        }
    }

    /// Load `address`, joining an in-flight fetch for it if one exists
    ///
    /// Every caller coalesced on one ticket observes the same outcome,
    /// failures included. Failures are not retried here.
    pub async fn load(&self, address: &Address) -> Result<ResourceEnvelope> {
        let load = {
            let mut table = lock(&self.tickets);
            match table.in_flight.get(address) {
                Some(ticket) => {
                    debug!(address = %address, ticket = ticket.id, "Joining in-flight ticket");
                    ticket.load.clone()
                }
                None => {
                    let id = table.next_id;
                    table.next_id += 1;
                    let load = self.issue(id, address.clone());
                    table.in_flight.insert(
                        address.clone(),
                        Ticket {
                            id,
                            load: load.clone(),
                        },
                    );
                    debug!(address = %address, ticket = id, "Issued ticket");
                    load
                }
            }
        };

        load.await
    }

    /// Issue a write through the fetcher, then drop every ticket on success
    pub async fn write(&self, address: &Address) -> Result<()> {
        self.fetcher.put(address).await?;
        self.invalidate_all();
        Ok(())
    }

    /// Forget every in-flight ticket so the next `load` of any address fetches fresh
    ///
    /// Callers already waiting on a dropped ticket still receive its outcome.
    pub fn invalidate_all(&self) {
        let mut table = lock(&self.tickets);
        let dropped = table.in_flight.len();
        table.in_flight.clear();
        info!(dropped, "Invalidated in-flight tickets");
    }

    /// Number of addresses with an outstanding fetch
    pub fn in_flight(&self) -> usize {
        lock(&self.tickets).in_flight.len()
    }

    fn issue(&self, id: u64, address: Address) -> SharedLoad {
        let fetcher = Arc::clone(&self.fetcher);
        let tickets = Arc::clone(&self.tickets);

        let task = tokio::spawn(async move {
            let outcome = fetcher.fetch(&address).await;
            settle(&tickets, &address, id);
            outcome
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(FollowGraphError::Transport(format!(
                    "fetch task for ticket {} did not complete: {}",
                    id, e
                ))),
            }
        }
        .boxed()
        .shared()
    }
}

/// Remove ticket `id` for `address` if it is still the current one
fn settle(tickets: &Mutex<TicketTable>, address: &Address, id: u64) {
    let mut table = lock(tickets);
    if table.in_flight.get(address).map(|t| t.id) == Some(id) {
        table.in_flight.remove(address);
        debug!(address = %address, ticket = id, "Settled ticket");
    }
}

fn lock(tickets: &Mutex<TicketTable>) -> MutexGuard<'_, TicketTable> {
    tickets.lock().unwrap_or_else(PoisonError::into_inner)
}
