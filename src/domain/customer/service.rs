use std::sync::Arc;
use uuid::Uuid;

use super::commands::{CreateCustomerInput, CustomerQuery, EventCustomerData, Page, Pagination, UpdateCustomerInput};
use super::errors::{ConflictError, CustomerError};
use super::events::{StatusChange, StatusChangeNotifier};
use super::model::{Customer, CustomerChanges};
use super::transitions::allowed_successors;
use super::value_objects::CustomerStatus;
use crate::metrics::Metrics;
use crate::store::{CustomerFilter, CustomerStore};

// ============================================================================
// Customer Lifecycle Service
// ============================================================================
//
// Single authority for every customer mutation, whether it arrives over
// HTTP or from the bus:
//
//   API   → create / update          (uniqueness pre-checks, transition table,
//                                     outbound notification on status change)
//   Event → create_or_update_from_event / update_status_from_event
//                                    (upstream is trusted, nothing is published)
//
// Uniqueness pre-checks are racy by nature. The store's unique indexes are
// the backstop and surface as the same `Conflict` variant.
//
// ============================================================================

const SOURCE_API: &str = "api";
const SOURCE_EVENT: &str = "event";

pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
    notifier: Arc<dyn StatusChangeNotifier>,
    metrics: Arc<Metrics>,
}

impl CustomerService {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        notifier: Arc<dyn StatusChangeNotifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            notifier,
            metrics,
        }
    }

    /// Register a customer through the direct API. Status is always ACTIVE.
    pub async fn create(&self, input: CreateCustomerInput) -> Result<Customer, CustomerError> {
        if self.store.find_by_email(&input.email).await?.is_some() {
            return Err(ConflictError::duplicate_email(&input.email).into());
        }

        if self
            .store
            .find_by_document(input.document_type, &input.document_number)
            .await?
            .is_some()
        {
            return Err(
                ConflictError::duplicate_document(input.document_type, &input.document_number).into(),
            );
        }

        let customer = self
            .store
            .insert(input.into_new_customer(CustomerStatus::Active, None))
            .await?;

        self.metrics.record_customer_created(SOURCE_API);
        tracing::info!(customer_id = %customer.id, email = %customer.email, "Customer created");

        Ok(customer)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Customer, CustomerError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(CustomerError::NotFound { id })
    }

    pub async fn find_all(&self, query: CustomerQuery) -> Result<Page<Customer>, CustomerError> {
        let filter = CustomerFilter {
            status: query.status,
            email: query.email.clone(),
            name: query.name.clone(),
        };

        let (data, total) = self
            .store
            .list(&filter, query.offset(), query.size as i64)
            .await?;

        Ok(Page {
            data,
            pagination: Pagination::new(query.page, query.size, total),
        })
    }

    /// Partial update through the direct API.
    ///
    /// A status change is checked against the transition table, and a
    /// committed one is handed to the notifier. The notifier never blocks
    /// or fails this call.
    pub async fn update(&self, id: Uuid, input: UpdateCustomerInput) -> Result<Customer, CustomerError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CustomerError::NotFound { id })?;

        if let Some(target) = input.status {
            if target != existing.status && !existing.status.can_transition_to(target) {
                return Err(CustomerError::InvalidTransition {
                    from: existing.status,
                    to: target,
                    allowed: allowed_successors(existing.status).to_vec(),
                });
            }
        }

        if let Some(email) = input.email.as_deref() {
            if email != existing.email && self.store.find_by_email(email).await?.is_some() {
                return Err(ConflictError::duplicate_email(email).into());
            }
        }

        let updated = self
            .store
            .update_by_id(id, CustomerChanges::from(input))
            .await?;

        tracing::info!(customer_id = %updated.id, "Customer updated");

        if updated.status != existing.status {
            self.metrics.record_status_transition(
                existing.status.as_str(),
                updated.status.as_str(),
                SOURCE_API,
            );
            self.notifier.notify(StatusChange::by_service(
                updated.id,
                existing.status,
                updated.status,
            ));
        }

        Ok(updated)
    }

    /// Upsert keyed by email for "customer registered" events.
    ///
    /// Skips the document pre-check and the transition table: the upstream
    /// producer is the system of record for this data.
    pub async fn create_or_update_from_event(
        &self,
        data: EventCustomerData,
    ) -> Result<Customer, CustomerError> {
        if let Some(existing) = self.store.find_by_email(&data.customer.email).await? {
            let updated = self.store.update_by_id(existing.id, data.to_changes()).await?;

            if updated.status != existing.status {
                self.metrics.record_status_transition(
                    existing.status.as_str(),
                    updated.status.as_str(),
                    SOURCE_EVENT,
                );
            }
            tracing::info!(
                customer_id = %updated.id,
                source_event = ?updated.source_event,
                "Customer updated from event"
            );
            return Ok(updated);
        }

        let status = data.status.unwrap_or_default();
        let customer = self
            .store
            .insert(data.customer.into_new_customer(status, data.source_event))
            .await?;

        self.metrics.record_customer_created(SOURCE_EVENT);
        tracing::info!(
            customer_id = %customer.id,
            source_event = ?customer.source_event,
            "Customer created from event"
        );

        Ok(customer)
    }

    /// Status update keyed by email for "customer status changed" events.
    ///
    /// - unknown email: `Ok(None)`, nothing written
    /// - same status or illegal transition: the existing record, nothing written
    /// - legal transition: status and source event written
    pub async fn update_status_from_event(
        &self,
        email: &str,
        status: CustomerStatus,
        source_event: &str,
    ) -> Result<Option<Customer>, CustomerError> {
        let Some(existing) = self.store.find_by_email(email).await? else {
            tracing::warn!(email = %email, status = %status, "Status changed event for unknown customer");
            return Ok(None);
        };

        if existing.status == status {
            tracing::debug!(customer_id = %existing.id, status = %status, "Status unchanged, skipping");
            return Ok(Some(existing));
        }

        if !existing.status.can_transition_to(status) {
            tracing::warn!(
                customer_id = %existing.id,
                from = %existing.status,
                to = %status,
                terminal = existing.status.is_terminal(),
                "Illegal status transition from event, dropping"
            );
            return Ok(Some(existing));
        }

        let updated = self
            .store
            .update_by_id(
                existing.id,
                CustomerChanges::status(status).with_source_event(source_event),
            )
            .await?;

        self.metrics.record_status_transition(
            existing.status.as_str(),
            updated.status.as_str(),
            SOURCE_EVENT,
        );
        tracing::info!(
            customer_id = %updated.id,
            from = %existing.status,
            to = %updated.status,
            "Customer status updated from event"
        );

        Ok(Some(updated))
    }

    /// Whether some record already carries `key` as its source event
    pub async fn already_processed(&self, key: &str) -> Result<bool, CustomerError> {
        Ok(self.store.find_by_source_event(key).await?.is_some())
    }

    pub async fn ping_store(&self) -> Result<(), CustomerError> {
        Ok(self.store.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::customer::{ConflictKind, DocumentType, NewCustomer};
    use crate::store::memory::InMemoryCustomerStore;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        changes: Mutex<Vec<StatusChange>>,
    }

    impl RecordingNotifier {
        fn recorded(&self) -> Vec<StatusChange> {
            self.changes.lock().unwrap().clone()
        }
    }

    impl StatusChangeNotifier for RecordingNotifier {
        fn notify(&self, change: StatusChange) {
            self.changes.lock().unwrap().push(change);
        }
    }

    /// Store whose lookups never see existing rows, so every pre-check passes
    /// and the unique index is the only defense (a lost check-then-insert race).
    struct RacingStore {
        inner: InMemoryCustomerStore,
    }

    #[async_trait]
    impl CustomerStore for RacingStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_email(&self, _email: &str) -> Result<Option<Customer>, StoreError> {
            Ok(None)
        }
        async fn find_by_document(
            &self,
            _document_type: DocumentType,
            _document_number: &str,
        ) -> Result<Option<Customer>, StoreError> {
            Ok(None)
        }
        async fn find_by_source_event(&self, key: &str) -> Result<Option<Customer>, StoreError> {
            self.inner.find_by_source_event(key).await
        }
        async fn list(
            &self,
            filter: &CustomerFilter,
            offset: i64,
            limit: i64,
        ) -> Result<(Vec<Customer>, i64), StoreError> {
            self.inner.list(filter, offset, limit).await
        }
        async fn insert(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
            self.inner.insert(customer).await
        }
        async fn update_by_id(&self, id: Uuid, changes: CustomerChanges) -> Result<Customer, StoreError> {
            self.inner.update_by_id(id, changes).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Store that counts document lookups
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryCustomerStore,
        document_lookups: AtomicUsize,
    }

    #[async_trait]
    impl CustomerStore for CountingStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, StoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
            self.inner.find_by_email(email).await
        }
        async fn find_by_document(
            &self,
            document_type: DocumentType,
            document_number: &str,
        ) -> Result<Option<Customer>, StoreError> {
            self.document_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_document(document_type, document_number).await
        }
        async fn find_by_source_event(&self, key: &str) -> Result<Option<Customer>, StoreError> {
            self.inner.find_by_source_event(key).await
        }
        async fn list(
            &self,
            filter: &CustomerFilter,
            offset: i64,
            limit: i64,
        ) -> Result<(Vec<Customer>, i64), StoreError> {
            self.inner.list(filter, offset, limit).await
        }
        async fn insert(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
            self.inner.insert(customer).await
        }
        async fn update_by_id(&self, id: Uuid, changes: CustomerChanges) -> Result<Customer, StoreError> {
            self.inner.update_by_id(id, changes).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    struct Fixture {
        service: CustomerService,
        store: Arc<InMemoryCustomerStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCustomerStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = CustomerService::new(
            store.clone(),
            notifier.clone(),
            Arc::new(Metrics::new().unwrap()),
        );
        Fixture {
            service,
            store,
            notifier,
        }
    }

    fn input(email: &str, document_number: &str) -> CreateCustomerInput {
        CreateCustomerInput {
            first_name: "Juan".into(),
            last_name: "Perez".into(),
            email: email.into(),
            phone: None,
            document_type: DocumentType::Rfc,
            document_number: document_number.into(),
            street: None,
            city: None,
            state: None,
            zip_code: None,
            country: None,
        }
    }

    fn status_patch(status: CustomerStatus) -> UpdateCustomerInput {
        UpdateCustomerInput {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_active() {
        let f = fixture();
        let customer = f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        assert_eq!(customer.status, CustomerStatus::Active);
        assert_eq!(customer.country, "MX");
        assert_eq!(customer.source_event, None);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let f = fixture();
        f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let err = f.service.create(input("a@x.com", "XYZ999")).await.unwrap_err();
        match err {
            CustomerError::Conflict(c) => {
                assert_eq!(c.kind, ConflictKind::DuplicateEmail);
                assert_eq!(c.message, "Customer with email 'a@x.com' already exists");
                assert_eq!(c.fields, None);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_document() {
        let f = fixture();
        f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let err = f.service.create(input("b@x.com", "ABC123")).await.unwrap_err();
        assert!(matches!(
            err,
            CustomerError::Conflict(ConflictError { kind: ConflictKind::DuplicateDocument, .. })
        ));
    }

    #[tokio::test]
    async fn test_store_level_conflict_is_a_conflict() {
        let service = CustomerService::new(
            Arc::new(RacingStore {
                inner: InMemoryCustomerStore::new(),
            }),
            Arc::new(RecordingNotifier::default()),
            Arc::new(Metrics::new().unwrap()),
        );
        service.create(input("a@x.com", "ABC123")).await.unwrap();

        let err = service.create(input("a@x.com", "OTHER1")).await.unwrap_err();
        match err {
            CustomerError::Conflict(c) => {
                assert_eq!(c.kind, ConflictKind::DuplicateEmail);
                assert_eq!(c.fields, Some(vec!["email".to_string()]));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let f = fixture();
        let id = Uuid::new_v4();
        let err = f.service.find_by_id(id).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Customer with id '{id}' not found"));
    }

    #[tokio::test]
    async fn test_lifecycle_scenario() {
        let f = fixture();
        let a = f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let a1 = f.service.update(a.id, status_patch(CustomerStatus::Suspended)).await.unwrap();
        assert_eq!(a1.status, CustomerStatus::Suspended);
        assert_eq!(
            f.notifier.recorded(),
            vec![StatusChange::by_service(a.id, CustomerStatus::Active, CustomerStatus::Suspended)]
        );

        f.service.update(a.id, status_patch(CustomerStatus::Active)).await.unwrap();
        f.service.update(a.id, status_patch(CustomerStatus::Blocked)).await.unwrap();

        let err = f.service.update(a.id, status_patch(CustomerStatus::Active)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid status transition from 'BLOCKED' to 'ACTIVE'. Allowed: []"
        );

        let changes = f.notifier.recorded();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[2].previous_status, CustomerStatus::Active);
        assert_eq!(changes[2].new_status, CustomerStatus::Blocked);
        assert_eq!(changes[2].changed_by, "customers-service");
        assert_eq!(changes[2].reason, None);
    }

    #[tokio::test]
    async fn test_update_respects_transition_table_for_every_pair() {
        for from in CustomerStatus::ALL {
            for to in CustomerStatus::ALL {
                let f = fixture();
                let created = f.service.create(input("t@x.com", "DOC1")).await.unwrap();
                // Seed the starting status straight into the store
                f.store
                    .update_by_id(created.id, CustomerChanges::status(from))
                    .await
                    .unwrap();

                let result = f.service.update(created.id, status_patch(to)).await;
                let legal = from == to || from.can_transition_to(to);
                assert_eq!(result.is_ok(), legal, "{from} -> {to}");

                if let Err(CustomerError::InvalidTransition { allowed, .. }) = result {
                    assert_eq!(allowed, allowed_successors(from).to_vec());
                }

                let expected_notifications = usize::from(from != to && legal);
                assert_eq!(f.notifier.recorded().len(), expected_notifications, "{from} -> {to}");
            }
        }
    }

    #[tokio::test]
    async fn test_blocked_is_terminal() {
        let f = fixture();
        let c = f.service.create(input("a@x.com", "ABC123")).await.unwrap();
        f.service.update(c.id, status_patch(CustomerStatus::Blocked)).await.unwrap();

        for to in [CustomerStatus::Active, CustomerStatus::Inactive, CustomerStatus::Suspended] {
            let err = f.service.update(c.id, status_patch(to)).await.unwrap_err();
            assert!(matches!(err, CustomerError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn test_update_without_status_change_does_not_notify() {
        let f = fixture();
        let c = f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let patch = UpdateCustomerInput {
            city: Some("Monterrey".into()),
            status: Some(CustomerStatus::Active),
            ..Default::default()
        };
        let updated = f.service.update(c.id, patch).await.unwrap();

        assert_eq!(updated.city.as_deref(), Some("Monterrey"));
        assert!(f.notifier.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_update_email_uniqueness() {
        let f = fixture();
        let a = f.service.create(input("a@x.com", "ABC123")).await.unwrap();
        f.service.create(input("b@x.com", "XYZ999")).await.unwrap();

        let same = UpdateCustomerInput {
            email: Some("a@x.com".into()),
            ..Default::default()
        };
        assert!(f.service.update(a.id, same).await.is_ok());

        let taken = UpdateCustomerInput {
            email: Some("b@x.com".into()),
            ..Default::default()
        };
        let err = f.service.update(a.id, taken).await.unwrap_err();
        assert!(matches!(
            err,
            CustomerError::Conflict(ConflictError { kind: ConflictKind::DuplicateEmail, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_customer() {
        let f = fixture();
        let err = f
            .service
            .update(Uuid::new_v4(), status_patch(CustomerStatus::Inactive))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_all_empty_page() {
        let f = fixture();
        let page = f
            .service
            .find_all(CustomerQuery::default().with_status(CustomerStatus::Active))
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.pagination, Pagination::new(1, 20, 0));
        assert_eq!(page.pagination.total_pages, 0);
    }

    #[tokio::test]
    async fn test_find_all_newest_first_with_filters() {
        let f = fixture();
        f.service.create(input("first@x.com", "D1")).await.unwrap();
        let second = f.service.create(input("second@x.com", "D2")).await.unwrap();
        let third = f.service.create(input("third@x.com", "D3")).await.unwrap();
        f.service.update(second.id, status_patch(CustomerStatus::Suspended)).await.unwrap();

        let page = f.service.find_all(CustomerQuery::new(1, 2)).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].id, third.id);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);

        let suspended = f
            .service
            .find_all(CustomerQuery::default().with_status(CustomerStatus::Suspended))
            .await
            .unwrap();
        assert_eq!(suspended.data.len(), 1);
        assert_eq!(suspended.data[0].id, second.id);

        let mut by_email = CustomerQuery::default();
        by_email.email = Some("THIRD".into());
        let found = f.service.find_all(by_email).await.unwrap();
        assert_eq!(found.data.len(), 1);
        assert_eq!(found.data[0].email, "third@x.com");
    }

    #[tokio::test]
    async fn test_create_from_event_inserts_with_override_and_source() {
        let f = fixture();
        let data = EventCustomerData {
            customer: input("e@x.com", "EV1"),
            status: Some(CustomerStatus::Inactive),
            source_event: Some("customer-registered:k1".into()),
        };

        let c = f.service.create_or_update_from_event(data).await.unwrap();
        assert_eq!(c.status, CustomerStatus::Inactive);
        assert_eq!(c.source_event.as_deref(), Some("customer-registered:k1"));
        assert!(f.service.already_processed("customer-registered:k1").await.unwrap());
        assert!(f.notifier.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_update_from_event_skips_document_check_and_transition_table() {
        let store = Arc::new(CountingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = CustomerService::new(
            store.clone(),
            notifier.clone(),
            Arc::new(Metrics::new().unwrap()),
        );
        let existing = service.create(input("e@x.com", "EV1")).await.unwrap();
        service.update(existing.id, status_patch(CustomerStatus::Blocked)).await.unwrap();
        store.document_lookups.store(0, Ordering::SeqCst);

        let mut customer = input("e@x.com", "EV1-B");
        customer.first_name = "Juana".into();
        let data = EventCustomerData {
            customer,
            status: Some(CustomerStatus::Active),
            source_event: Some("customer-registered:k2".into()),
        };

        let updated = service.create_or_update_from_event(data).await.unwrap();
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.first_name, "Juana");
        assert_eq!(updated.document_number, "EV1-B");
        // BLOCKED -> ACTIVE is not a legal API transition
        assert_eq!(updated.status, CustomerStatus::Active);
        assert_eq!(updated.source_event.as_deref(), Some("customer-registered:k2"));
        assert_eq!(store.document_lookups.load(Ordering::SeqCst), 0);

        let data = EventCustomerData {
            customer: input("fresh@x.com", "EV3"),
            status: None,
            source_event: Some("customer-registered:k3".into()),
        };
        service.create_or_update_from_event(data).await.unwrap();
        assert_eq!(store.document_lookups.load(Ordering::SeqCst), 0);

        // Only the API transition to BLOCKED was announced
        assert_eq!(notifier.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_status_from_event_unknown_email() {
        let f = fixture();
        let result = f
            .service
            .update_status_from_event("ghost@x.com", CustomerStatus::Suspended, "k")
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(f.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_status_from_event_illegal_transition_is_unchanged() {
        let f = fixture();
        let c = f.service.create(input("a@x.com", "ABC123")).await.unwrap();
        f.service.update(c.id, status_patch(CustomerStatus::Blocked)).await.unwrap();
        let before = f.service.find_by_id(c.id).await.unwrap();

        let result = f
            .service
            .update_status_from_event("a@x.com", CustomerStatus::Active, "customer-status-changed:k")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result, before);
        assert_eq!(f.service.find_by_id(c.id).await.unwrap(), before);
        assert!(!f.service.already_processed("customer-status-changed:k").await.unwrap());
    }

    #[tokio::test]
    async fn test_status_from_event_legal_transition() {
        let f = fixture();
        let c = f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let updated = f
            .service
            .update_status_from_event("a@x.com", CustomerStatus::Suspended, "customer-status-changed:k")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, c.id);
        assert_eq!(updated.status, CustomerStatus::Suspended);
        assert_eq!(updated.source_event.as_deref(), Some("customer-status-changed:k"));
        assert!(f.notifier.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_status_from_event_same_status_does_not_write() {
        let f = fixture();
        let c = f.service.create(input("a@x.com", "ABC123")).await.unwrap();

        let result = f
            .service
            .update_status_from_event("a@x.com", CustomerStatus::Active, "customer-status-changed:k")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result, c);
        assert!(!f.service.already_processed("customer-status-changed:k").await.unwrap());
    }
}
