//! # Ledger Service
//!
//! Hosts the single [`TierMintContract`] instance behind a `parking_lot`
//! read/write lock. Every mutating call holds the write lock from the first
//! contract check until its snapshot has been flushed to the store, so calls
//! are strictly serialized and the persisted snapshot always matches a
//! prefix of the accepted call sequence.
//!
//! A call runs against a copy of the contract. The copy replaces the live
//! contract only once its snapshot and events are on disk, so a failed
//! write leaves memory and store in agreement.
//!
//! Accepted calls publish their events on the node's broadcast channel and
//! update the Prometheus gauges. Rejected calls are logged at `warn` and
//! counted by error kind.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

use tiermint_contracts::{LedgerError, LedgerEvent, MintCosts, MintReceipt, TierMintContract};
use tiermint_protocol::storage::{DbError, LedgerStore};
use tiermint_protocol::types::{Address, CallContext, Tier};

use crate::metrics::SharedMetrics;

/// Snapshot name under which the contract is persisted.
pub const LEDGER_SNAPSHOT: &str = "ledger";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The contract rejected the call. Nothing changed.
    #[error(transparent)]
    Rejected(#[from] LedgerError),

    /// The contract accepted the call but its snapshot could not be
    /// written. The call was rolled back.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// A ledger event, numbered by its position in the persisted event log.
    #[serde(rename = "ledger_event")]
    Ledger { seq: u64, event: LedgerEvent },
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct LedgerService {
    contract: RwLock<TierMintContract>,
    store: LedgerStore,
    metrics: SharedMetrics,
    event_tx: broadcast::Sender<NodeEvent>,
}

impl LedgerService {
    /// Wraps an existing contract. The contract is not persisted until the
    /// first accepted call; use [`persist`](Self::persist) to write it now.
    pub fn new(
        contract: TierMintContract,
        store: LedgerStore,
        metrics: SharedMetrics,
        event_tx: broadcast::Sender<NodeEvent>,
    ) -> Self {
        metrics.observe_ledger(&contract);
        Self {
            contract: RwLock::new(contract),
            store,
            metrics,
            event_tx,
        }
    }

    /// Loads the persisted ledger from `store`, or returns `None` if the
    /// store has never held one.
    pub fn load(
        store: LedgerStore,
        metrics: SharedMetrics,
        event_tx: broadcast::Sender<NodeEvent>,
    ) -> Result<Option<Self>, DbError> {
        let contract: Option<TierMintContract> = store.get_snapshot(LEDGER_SNAPSHOT)?;
        Ok(contract.map(|c| Self::new(c, store, metrics, event_tx)))
    }

    /// Loads the persisted ledger or deploys and persists a fresh one.
    pub fn load_or_deploy(
        store: LedgerStore,
        deployer: Address,
        nonce: u64,
        costs: MintCosts,
        metrics: SharedMetrics,
        event_tx: broadcast::Sender<NodeEvent>,
    ) -> Result<Self, ServiceError> {
        let contract = match store.get_snapshot::<TierMintContract>(LEDGER_SNAPSHOT)? {
            Some(contract) => {
                tracing::info!(
                    address = %contract.ledger_address(),
                    events = contract.event_count(),
                    "ledger loaded from store"
                );
                contract
            }
            None => {
                let contract = TierMintContract::deploy(deployer, nonce, costs)?;
                tracing::info!(
                    address = %contract.ledger_address(),
                    %deployer,
                    "deployed fresh ledger"
                );
                contract
            }
        };
        let service = Self::new(contract, store, metrics, event_tx);
        service.persist()?;
        Ok(service)
    }

    /// Writes the current contract snapshot.
    pub fn persist(&self) -> Result<(), DbError> {
        let contract = self.contract.read();
        self.store.put_snapshot(LEDGER_SNAPSHOT, &*contract)
    }

    /// Dispatches a mint call for `tier`.
    pub fn mint(
        &self,
        tier: Tier,
        ctx: &CallContext,
        qty: u64,
    ) -> Result<MintReceipt, ServiceError> {
        let started = Instant::now();
        let call = format!("mint_token_{}", tier.to_string().to_lowercase());
        let mut contract = self.contract.write();
        let first_seq = contract.event_count();

        let result = commit(
            &mut contract,
            |c| match tier {
                Tier::F => c.mint_token_f(ctx, qty),
                Tier::N => c.mint_token_n(ctx, qty),
                Tier::T => c.mint_token_t(ctx, qty),
            },
            |next, receipt: &MintReceipt| {
                self.store.put_snapshot_with_events(
                    LEDGER_SNAPSHOT,
                    next,
                    first_seq,
                    &receipt.events,
                )
            },
        );
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.failed(ctx, &call, e)),
        };
        self.metrics.observe_ledger(&contract);
        drop(contract);

        let label = tier.to_string();
        self.metrics
            .mint_calls_total
            .with_label_values(&[label.as_str()])
            .inc();
        self.metrics
            .call_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        self.publish(first_seq, &receipt.events);

        tracing::info!(
            caller = %ctx.caller,
            %tier,
            qty,
            paid = %receipt.paid,
            receipt = %receipt.receipt_id,
            "mint accepted"
        );
        Ok(receipt)
    }

    /// Sets the caller's approval flag for `operator`.
    pub fn set_approval_for_all(
        &self,
        ctx: &CallContext,
        operator: Address,
        approved: bool,
    ) -> Result<LedgerEvent, ServiceError> {
        let started = Instant::now();
        let mut contract = self.contract.write();
        let seq = contract.event_count();

        let result = commit(
            &mut contract,
            |c| c.set_approval_for_all(ctx, operator, approved),
            |next, event: &LedgerEvent| {
                self.store.put_snapshot_with_events(
                    LEDGER_SNAPSHOT,
                    next,
                    seq,
                    std::slice::from_ref(event),
                )
            },
        );
        let event = match result {
            Ok(event) => event,
            Err(e) => return Err(self.failed(ctx, "set_approval_for_all", e)),
        };
        drop(contract);

        self.metrics
            .approvals_total
            .with_label_values(&[if approved { "true" } else { "false" }])
            .inc();
        self.metrics
            .call_latency_seconds
            .observe(started.elapsed().as_secs_f64());
        self.publish(seq, std::slice::from_ref(&event));

        tracing::info!(owner = %ctx.caller, %operator, approved, "approval updated");
        Ok(event)
    }

    /// Runs `f` against the contract under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&TierMintContract) -> R) -> R {
        f(&self.contract.read())
    }

    /// Reads up to `limit` persisted events starting at sequence `from`,
    /// paired with their sequence numbers.
    pub fn events(&self, from: u64, limit: usize) -> Result<Vec<(u64, LedgerEvent)>, DbError> {
        let events: Vec<LedgerEvent> = self.store.events_from(from, limit)?;
        Ok((from..).zip(events).collect())
    }

    fn failed(&self, ctx: &CallContext, call: &str, err: ServiceError) -> ServiceError {
        match err {
            ServiceError::Rejected(e) => self.rejected(ctx, call, e),
            ServiceError::Storage(e) => {
                tracing::error!(
                    caller = %ctx.caller,
                    call,
                    error = %e,
                    "snapshot write failed, call rolled back"
                );
                ServiceError::Storage(e)
            }
        }
    }

    fn rejected(&self, ctx: &CallContext, call: &str, err: LedgerError) -> ServiceError {
        self.metrics
            .rejections_total
            .with_label_values(&[err.kind()])
            .inc();
        if err.is_fatal() {
            tracing::error!(
                caller = %ctx.caller,
                call,
                kind = err.kind(),
                "ledger invariant violated"
            );
        } else {
            tracing::warn!(
                caller = %ctx.caller,
                origin = %ctx.kind,
                call,
                kind = err.kind(),
                reason = %err,
                "call rejected"
            );
        }
        ServiceError::Rejected(err)
    }

    fn publish(&self, first_seq: u64, events: &[LedgerEvent]) {
        for (offset, event) in events.iter().enumerate() {
            // No subscribers is not an error.
            let _ = self.event_tx.send(NodeEvent::Ledger {
                seq: first_seq + offset as u64,
                event: event.clone(),
            });
        }
    }
}

/// Runs `call` on a copy of `current` and hands the result to `persist`.
/// `current` is replaced by the copy only if both succeed.
fn commit<T>(
    current: &mut TierMintContract,
    call: impl FnOnce(&mut TierMintContract) -> Result<T, LedgerError>,
    persist: impl FnOnce(&TierMintContract, &T) -> Result<(), DbError>,
) -> Result<T, ServiceError> {
    let mut next = current.clone();
    let output = call(&mut next)?;
    persist(&next, &output)?;
    *current = next;
    Ok(output)
}
