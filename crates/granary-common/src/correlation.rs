//! Correlation ids for following one piece of work through the pipeline
//!
//! A processing job crosses three boundaries (event handler, durable queue,
//! processor) and the queue may deliver it more than once. Job correlation
//! ids are therefore derived from `(document_id, attempt)` rather than
//! random: every log line for the same delivery carries the same id, no
//! matter which service wrote it, without any id being passed on the wire.
//! Query-side work has no such key and gets a random id per call.

use uuid::Uuid;

/// Namespace for derived job correlation ids. Changing it orphans nothing
/// at runtime but breaks log joins across deploys, so it stays fixed.
const JOB_NAMESPACE: Uuid = Uuid::from_u128(0x9ad3_0c5e_41f7_4c2b_8e6a_d4b1_27f0_553c);

/// Identifier stamped on every log line belonging to one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Random id for work with no natural key (searches, ad-hoc calls)
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id for one delivery of a processing job
    ///
    /// The same `(document_id, attempt)` always maps to the same id, so the
    /// dispatcher's enqueue line and the processor's pipeline lines join up
    /// in log search. A queue re-attempt gets a fresh id because `attempt`
    /// differs.
    pub fn for_job(document_id: Uuid, attempt: u32) -> Self {
        let mut name = [0u8; 20];
        if let Some(head) = name.get_mut(..16) {
            head.copy_from_slice(document_id.as_bytes());
        }
        if let Some(tail) = name.get_mut(16..) {
            tail.copy_from_slice(&attempt.to_be_bytes());
        }
        Self(Uuid::new_v5(&JOB_NAMESPACE, &name))
    }

    /// The underlying UUID
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_delivery_same_id_across_services() {
        let document_id = Uuid::new_v4();
        assert_eq!(
            CorrelationId::for_job(document_id, 0),
            CorrelationId::for_job(document_id, 0)
        );
    }

    #[test]
    fn redeliveries_get_distinct_ids() {
        let document_id = Uuid::new_v4();
        assert_ne!(
            CorrelationId::for_job(document_id, 0),
            CorrelationId::for_job(document_id, 1)
        );
        assert_ne!(
            CorrelationId::for_job(document_id, 0),
            CorrelationId::for_job(Uuid::new_v4(), 0)
        );
    }

    #[test]
    fn random_ids_do_not_collide_with_job_ids() {
        let random = CorrelationId::new();
        let derived = CorrelationId::for_job(Uuid::new_v4(), 0);
        assert_ne!(random, derived);
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
