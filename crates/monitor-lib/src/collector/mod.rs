//! Periodic usage collection
//!
//! The collection loop lists workloads through an [`InventorySource`](crate::sources::InventorySource),
//! samples running ones through a [`UsageSource`](crate::sources::UsageSource) with bounded retry
//! and appends every tick's samples to the record log.

mod r#loop;
mod retry;


pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder, TickSummary};
pub use retry::{fetch_with_retry, RetryPolicy};
