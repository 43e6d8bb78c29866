//! Integration tests for the aggregate repository.
//!
//! These tests run the order aggregate through save and load cycles against
//! the in-memory store, including conflicting writers and interrupted saves.

use std::time::Duration;

use async_trait::async_trait;
use common::AggregateId;
use domain::{
    Aggregate, AggregateRepository, DeliveryDetails, DomainError, OrderDetails, OrderStatus,
    PayloadRegistryExt, PaymentInformation, ProductQuantity,
};
use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, PayloadRegistry, StoredChange, Version,
};

fn registry() -> PayloadRegistry {
    PayloadRegistry::new().register_aggregate::<OrderDetails>()
}

fn create_repository() -> AggregateRepository<InMemoryEventStore, OrderDetails> {
    AggregateRepository::new(InMemoryEventStore::new(registry()))
}

fn new_order() -> OrderDetails {
    OrderDetails::create(
        AggregateId::new(),
        DeliveryDetails::new("1 Main St", "Springfield", "US"),
        PaymentInformation::new("4111111111111111", "12/30", "123"),
        vec![ProductQuantity::new(7, 2)],
    )
    .unwrap()
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn order_survives_save_and_reload() {
        let repo = create_repository();
        let mut order = new_order();
        let order_id = order.id();

        repo.save(&mut order).await.unwrap();

        let mut loaded = repo.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Created);
        assert_eq!(loaded.version(), Version::new(1));
        assert_eq!(loaded.products(), &[ProductQuantity::new(7, 2)]);
        assert_eq!(
            loaded.payment_information().unwrap().last_four(),
            "1111"
        );

        loaded.mark_paid().unwrap();
        loaded.mark_dispatched().unwrap();
        repo.save(&mut loaded).await.unwrap();

        let mut loaded = repo.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Dispatched);
        assert_eq!(loaded.version(), Version::new(3));

        loaded.mark_completed().unwrap();
        repo.save(&mut loaded).await.unwrap();

        let loaded = repo.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Completed);
        assert_eq!(loaded.version(), Version::new(4));
        assert!(loaded.uncommitted_changes().is_empty());
    }

    #[tokio::test]
    async fn saved_records_carry_derived_transaction_ids() {
        let repo = create_repository();
        let mut order = new_order();
        order.mark_paid().unwrap();
        let order_id = order.id();

        repo.save(&mut order).await.unwrap();

        let stored = repo.store().fetch("OrderDetails", order_id).await.unwrap();
        let ids: Vec<_> = stored.iter().map(|c| c.transaction_id.to_string()).collect();
        assert_eq!(ids, vec![format!("{order_id}:1"), format!("{order_id}:2")]);

        let types: Vec<_> = stored.iter().map(|c| c.payload_type.as_str()).collect();
        assert_eq!(types, vec!["OrderCreated", "OrderPaid"]);
        assert!(stored.iter().all(|c| c.aggregate_type == "OrderDetails"));
    }

    #[tokio::test]
    async fn unknown_id_loads_as_none() {
        let repo = create_repository();
        let result = repo.get_by_id(AggregateId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn saving_twice_writes_once() {
        let repo = create_repository();
        let mut order = new_order();

        repo.save(&mut order).await.unwrap();
        repo.save(&mut order).await.unwrap();

        assert_eq!(repo.store().change_count().await, 1);
        assert_eq!(order.version(), Version::new(1));
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn stale_copy_gets_conflict_and_keeps_pending() {
        let repo = create_repository();
        let mut order = new_order();
        let order_id = order.id();
        repo.save(&mut order).await.unwrap();

        let mut first = repo.get_by_id(order_id).await.unwrap().unwrap();
        let mut second = repo.get_by_id(order_id).await.unwrap().unwrap();

        first.mark_paid().unwrap();
        repo.save(&mut first).await.unwrap();

        second.mark_paid().unwrap();
        let err = repo.save(&mut second).await.unwrap_err();

        assert!(err.is_concurrency_conflict());
        assert!(matches!(
            err,
            DomainError::ConcurrencyConflict(EventStoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(second.uncommitted_changes().len(), 1);
        assert_eq!(repo.store().change_count().await, 2);
    }

    #[tokio::test]
    async fn retry_after_reload_succeeds() {
        let repo = create_repository();
        let mut order = new_order();
        let order_id = order.id();
        repo.save(&mut order).await.unwrap();

        let mut stale = repo.get_by_id(order_id).await.unwrap().unwrap();
        let mut fresh = repo.get_by_id(order_id).await.unwrap().unwrap();
        fresh.mark_paid().unwrap();
        repo.save(&mut fresh).await.unwrap();

        stale.mark_paid().unwrap();
        assert!(repo.save(&mut stale).await.is_err());

        // Retry on current state: the order is already paid, so dispatch it.
        let mut current = repo.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(current.status(), OrderStatus::Paid);
        current.mark_dispatched().unwrap();
        repo.save(&mut current).await.unwrap();

        let loaded = repo.get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(loaded.status(), OrderStatus::Dispatched);
        assert_eq!(loaded.version(), Version::new(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_saves_admit_exactly_one() {
        let store = InMemoryEventStore::new(registry());
        let repo = AggregateRepository::<_, OrderDetails>::new(store.clone());
        let mut order = new_order();
        let order_id = order.id();
        repo.save(&mut order).await.unwrap();

        let mut copies = Vec::new();
        for _ in 0..8 {
            let mut copy = repo.get_by_id(order_id).await.unwrap().unwrap();
            copy.mark_paid().unwrap();
            copies.push(copy);
        }

        let handles: Vec<_> = copies
            .into_iter()
            .map(|mut copy| {
                let store = store.clone();
                tokio::spawn(async move {
                    let repo = AggregateRepository::<_, OrderDetails>::new(store);
                    repo.save(&mut copy).await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => succeeded += 1,
                Err(err) => assert!(err.is_concurrency_conflict(), "unexpected error: {err}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(store.change_count().await, 2);
    }
}

mod history_errors {
    use super::*;

    #[tokio::test]
    async fn unknown_payload_in_history_is_a_type_mismatch() {
        let store = InMemoryEventStore::new(
            registry().register("OrderDetails", ["OrderRefunded"]),
        );
        let repo = AggregateRepository::<_, OrderDetails>::new(store.clone());
        let mut order = new_order();
        let order_id = order.id();
        repo.save(&mut order).await.unwrap();

        store
            .append(
                "OrderDetails",
                order_id,
                vec![StoredChange::new(
                    "OrderDetails",
                    order_id,
                    Version::new(2),
                    "OrderRefunded",
                    serde_json::json!({}),
                )],
                Version::new(2),
            )
            .await
            .unwrap();

        match repo.get_by_id(order_id).await {
            Err(DomainError::TypeMismatch { payload_type, .. }) => {
                assert_eq!(payload_type, "OrderRefunded");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_payload_in_history_is_an_invalid_argument() {
        let store = InMemoryEventStore::new(registry());
        let repo = AggregateRepository::<_, OrderDetails>::new(store.clone());
        let order_id = AggregateId::new();

        store
            .append(
                "OrderDetails",
                order_id,
                vec![StoredChange::new(
                    "OrderDetails",
                    order_id,
                    Version::first(),
                    "OrderCreated",
                    serde_json::Value::Null,
                )],
                Version::first(),
            )
            .await
            .unwrap();

        let result = repo.get_by_id(order_id).await;
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn unregistered_aggregate_cannot_save() {
        let repo = AggregateRepository::<_, OrderDetails>::new(InMemoryEventStore::new(
            PayloadRegistry::new(),
        ));
        let mut order = new_order();

        let err = repo.save(&mut order).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Backend(EventStoreError::UnregisteredPayload { .. })
        ));
        assert_eq!(order.uncommitted_changes().len(), 1);
    }
}

/// Store whose appends never complete.
#[derive(Clone)]
struct StalledStore {
    inner: InMemoryEventStore,
}

#[async_trait]
impl EventStore for StalledStore {
    async fn append(
        &self,
        _aggregate_type: &str,
        _aggregate_id: AggregateId,
        _changes: Vec<StoredChange>,
        _expected_version: Version,
    ) -> event_store::Result<Version> {
        std::future::pending().await
    }

    async fn fetch(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> event_store::Result<Vec<StoredChange>> {
        self.inner.fetch(aggregate_type, aggregate_id).await
    }

    async fn latest_version(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> event_store::Result<Option<Version>> {
        self.inner.latest_version(aggregate_type, aggregate_id).await
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn abandoned_save_keeps_pending_changes() {
        let inner = InMemoryEventStore::new(registry());
        let stalled = AggregateRepository::<_, OrderDetails>::new(StalledStore {
            inner: inner.clone(),
        });
        let mut order = new_order();
        order.mark_paid().unwrap();

        let result = tokio::time::timeout(Duration::from_millis(50), stalled.save(&mut order)).await;

        assert!(result.is_err(), "save should not have completed");
        assert_eq!(order.uncommitted_changes().len(), 2);
        assert_eq!(inner.change_count().await, 0);

        // The same pending changes go through once a working store is used.
        let repo = AggregateRepository::<_, OrderDetails>::new(inner.clone());
        repo.save(&mut order).await.unwrap();
        assert!(order.uncommitted_changes().is_empty());
        assert_eq!(inner.change_count().await, 2);
    }
}
