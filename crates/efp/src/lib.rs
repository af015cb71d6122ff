//! Off-chain EFP runtime: rebuilds the follow graph from ListRecords, AccountMetadata and
//! ListRegistry events across Ethereum, Optimism and Base.
//!
//! - **Codec**: fixed-offset decoding of list ops and list storage locations.
//! - **Normalizer**: JSON-RPC logs → typed [Event]s (one variant per event kind).
//! - **Resolver / Reconciler**: last-writer-wins indirection (slot → list user,
//!   account → primary list, token → storage location) joined against list ops to produce the
//!   canonical log.
//! - **Graph**: replays the canonical log into follow edges and tags, pruning orphaned tags.
//! - **Fetcher / Pipeline**: batched, concurrent `eth_getLogs` backfill and end-to-end runs.

pub mod abi;
pub mod codec;
pub mod config;
pub mod contract;
pub mod event;
pub mod fetcher;
pub mod graph;
pub mod output;
pub mod pipeline;
pub mod range;
pub mod reconcile;
pub mod resolver;
pub mod rpc;

pub use codec::{
    decode_operation, decode_storage_location, CodecError, ListStorageLocation, Opcode, Operation,
};
pub use config::{Chain, ChainConfig, ConfigError, FetchConfig, RetryConfig, SyncConfig};
pub use contract::ListReader;
pub use event::{normalize_logs, Event, EventKind, ListOperation, ListStorageLocationToken};
pub use fetcher::{LogFetcher, LogSource};
pub use graph::{replay, Direction, GraphState, GraphView, TagEntry};
pub use output::{read_canonical_log, write_canonical_log, CanonicalRecord, GraphViewRecord};
pub use pipeline::{build_state, collect_events, following_from_contract, PipelineError};
pub use range::BlockRange;
pub use reconcile::{reconcile_events, CanonicalOperation, Reconciler, ReconcileStats};
pub use resolver::{
    resolve_list_users, resolve_primary_lists, resolve_storage_locations, ListLocation,
    ResolvedListUser,
};
