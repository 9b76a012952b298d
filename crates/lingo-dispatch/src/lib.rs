//! Translation dispatch and worker-coordination core.
//!
//! Accepts translation requests, routes them to a pool of model-backed
//! workers, serializes access to shared non-reentrant inference models, and
//! bridges synchronous callers to asynchronous completions.
//!
//! # Architecture
//!
//! ```text
//! caller → DispatchGateway → BatchAccumulator → WorkerPool → ModelLockRegistry
//!                                                    │
//!                                              ResultStore ← WaitBridge ← caller
//! ```
//!
//! The gateway validates and short-circuits; the accumulator groups requests
//! arriving within a short window into one model invocation; workers hold a
//! per-tier lock while the model runs; results land in a keyed store that
//! the wait bridge watches on behalf of the original caller.

pub mod batch;
pub mod cache;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod locks;
pub mod pool;
pub mod state;
pub mod store;
pub mod types;
pub mod wait;

pub use batch::{BatchAccumulator, BatchConfig, BatchKey, BatchState, PendingItem};
pub use cache::{CachedTranslation, TranslationCache};
pub use engine::{EngineError, EngineOutput, EngineRegistry, TranslationEngine};
pub use error::{DispatchError, Result};
pub use events::DispatchEvent;
pub use gateway::{DispatchGateway, GatewayConfig, Submission, MAX_TEXT_LEN};
pub use locks::ModelLockRegistry;
pub use pool::{PoolConfig, WorkerJob, WorkerPool};
pub use state::DispatchStats;
pub use store::ResultStore;
pub use types::{EncryptionMode, FailureKind, FailureRecord, InflightTicket, ModelTier, ResultKey, SourcePayload, StoredOutcome, TicketStatus, TranslationRequest, TranslationResult};
pub use wait::{WaitBridge, WaitConfig};
