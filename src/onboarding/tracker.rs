//! Progress tracker — per-participant onboarding bookkeeping.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::Selection;
use super::state::ProgressRecord;
use crate::platform::UserId;

/// Key-value store of in-flight onboarding progress.
///
/// The bundled implementation is in-memory and forgets everything on restart.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Create (or reset) the record for a participant entering step 1.
    async fn begin(&self, user: UserId) -> ProgressRecord;

    /// Apply a granted selection. Returns `None` when no record exists.
    async fn update(&self, user: UserId, selection: Selection) -> Option<ProgressRecord>;

    /// Delete a record, returning it if it existed.
    async fn remove(&self, user: UserId) -> Option<ProgressRecord>;

    async fn get(&self, user: UserId) -> Option<ProgressRecord>;
}

/// Process-local progress map.
#[derive(Default)]
pub struct InMemoryProgressStore {
    records: RwLock<HashMap<UserId, ProgressRecord>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of participants currently mid-flow.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn begin(&self, user: UserId) -> ProgressRecord {
        let record = ProgressRecord::default();
        self.records.write().await.insert(user, record.clone());
        record
    }

    async fn update(&self, user: UserId, selection: Selection) -> Option<ProgressRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&user)?;
        record.apply(selection);
        Some(record.clone())
    }

    async fn remove(&self, user: UserId) -> Option<ProgressRecord> {
        self.records.write().await.remove(&user)
    }

    async fn get(&self, user: UserId) -> Option<ProgressRecord> {
        self.records.read().await.get(&user).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{Domain, ResearcherType};
    use crate::onboarding::state::OnboardingStep;

    #[tokio::test]
    async fn begin_creates_step_one_record() {
        let store = InMemoryProgressStore::new();
        let record = store.begin(UserId(1)).await;
        assert_eq!(record.step, OnboardingStep::MemberGranted);
        assert_eq!(store.get(UserId(1)).await, Some(record));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn begin_resets_existing_record() {
        let store = InMemoryProgressStore::new();
        store.begin(UserId(1)).await;
        store.update(UserId(1), Selection::Domain(Domain::Management)).await;

        let record = store.begin(UserId(1)).await;
        assert!(record.domain.is_none());
        assert_eq!(store.get(UserId(1)).await.unwrap().step.number(), 1);
    }

    #[tokio::test]
    async fn update_without_record_is_none_and_creates_nothing() {
        let store = InMemoryProgressStore::new();
        let updated = store
            .update(UserId(9), Selection::Domain(Domain::CsMath))
            .await;
        assert!(updated.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_sets_field_and_step() {
        let store = InMemoryProgressStore::new();
        store.begin(UserId(1)).await;

        let r = store
            .update(UserId(1), Selection::Domain(Domain::CsMath))
            .await
            .unwrap();
        assert_eq!(r.step.number(), 2);
        assert_eq!(r.domain, Some(Domain::CsMath));

        let r = store
            .update(UserId(1), Selection::Researcher(ResearcherType::Casual))
            .await
            .unwrap();
        assert_eq!(r.step.number(), 3);
        assert_eq!(r.researcher_type, Some(ResearcherType::Casual));
    }

    #[tokio::test]
    async fn remove_returns_record_once() {
        let store = InMemoryProgressStore::new();
        store.begin(UserId(1)).await;
        assert!(store.remove(UserId(1)).await.is_some());
        assert!(store.remove(UserId(1)).await.is_none());
        assert!(store.get(UserId(1)).await.is_none());
    }

    #[tokio::test]
    async fn records_are_per_participant() {
        let store = InMemoryProgressStore::new();
        store.begin(UserId(1)).await;
        store.begin(UserId(2)).await;
        store
            .update(UserId(2), Selection::Domain(Domain::SocialScience))
            .await;

        assert!(store.get(UserId(1)).await.unwrap().domain.is_none());
        assert_eq!(
            store.get(UserId(2)).await.unwrap().domain,
            Some(Domain::SocialScience)
        );
    }
}
