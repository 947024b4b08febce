//! Test utilities and mock types for Tessera development.
//!
//! Provides [`TrackingVar`], a descriptor that counts live allocations so
//! tests can assert that every buffer handed out was released, and patch
//! fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tessera_core::{AllocError, SharedVar, VarBuffer, VarDescriptor};

/// Descriptor that records every allocate/release pair.
///
/// Clone the `Arc<TrackingVar>` before converting to [`SharedVar`] to keep
/// access to the counters.
#[derive(Debug)]
pub struct TrackingVar {
    name: String,
    element_size: usize,
    padded: bool,
    live: AtomicUsize,
    live_bytes: AtomicU64,
    total_allocations: AtomicUsize,
    fail_after: Option<usize>,
}

impl TrackingVar {
    pub fn new(name: impl Into<String>, element_size: usize) -> Arc<Self> {
        Arc::new(Self::build(name.into(), element_size, false, None))
    }

    /// Same as [`TrackingVar::new`] but with the padding flag set.
    pub fn padded(name: impl Into<String>, element_size: usize) -> Arc<Self> {
        Arc::new(Self::build(name.into(), element_size, true, None))
    }

    /// A descriptor whose allocations start failing once `successes`
    /// buffers have been handed out in total.
    pub fn failing_after(name: impl Into<String>, element_size: usize, successes: usize) -> Arc<Self> {
        Arc::new(Self::build(name.into(), element_size, false, Some(successes)))
    }

    fn build(name: String, element_size: usize, padded: bool, fail_after: Option<usize>) -> Self {
        Self {
            name,
            element_size,
            padded,
            live: AtomicUsize::new(0),
            live_bytes: AtomicU64::new(0),
            total_allocations: AtomicUsize::new(0),
            fail_after,
        }
    }

    /// Buffers allocated and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Bytes held by live buffers.
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Successful allocations over the descriptor's lifetime.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.load(Ordering::SeqCst)
    }
}

impl VarDescriptor for TrackingVar {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_per_element(&self) -> usize {
        self.element_size
    }

    fn is_padding_required(&self) -> bool {
        self.padded
    }

    fn allocate(&self, element_count: u64) -> Result<VarBuffer, AllocError> {
        if let Some(limit) = self.fail_after {
            if self.total_allocations() >= limit {
                return Err(AllocError {
                    requested_bytes: element_count.saturating_mul(self.element_size as u64),
                    reason: format!("'{}' allocation budget of {limit} exhausted", self.name),
                });
            }
        }
        let buf = VarBuffer::zeroed(element_count, self.element_size)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.live_bytes
            .fetch_add(buf.byte_len() as u64, Ordering::SeqCst);
        self.total_allocations.fetch_add(1, Ordering::SeqCst);
        Ok(buf)
    }

    fn release(&self, buffer: VarBuffer) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.live_bytes
            .fetch_sub(buffer.byte_len() as u64, Ordering::SeqCst);
    }
}

/// Erase a tracking descriptor into the shared form a patch attaches.
pub fn shared(var: &Arc<TrackingVar>) -> SharedVar {
    Arc::clone(var) as SharedVar
}
