#![allow(clippy::unwrap_used)]

use super::*;
use crate::storage::MemoryStorage;

fn registry() -> PayoutMethodRegistry {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    PayoutMethodRegistry::new(storage, Arc::new(EventBus::new(16)))
}

#[tokio::test]
async fn test_add_method_validates_provider_number() {
    let registry = registry();

    let method = registry
        .add_method("doc_123", Provider::Mtn, "0241234567", false, None)
        .await
        .unwrap();
    assert_eq!(method.provider, Provider::Mtn);
    assert_eq!(method.number, "0241234567");
    assert!(!method.is_default);

    // Vodafone-prefixed number under MTN
    let err = registry
        .add_method("doc_123", Provider::Mtn, "0201234567", false, None)
        .await
        .unwrap_err();
    assert_eq!(err.category.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_add_method_strips_whitespace() {
    let registry = registry();
    let method = registry
        .add_method("doc_123", Provider::Airtel, "026 987 6543", false, None)
        .await
        .unwrap();
    assert_eq!(method.number, "0269876543");
}

#[tokio::test]
async fn test_single_default_invariant() {
    let registry = registry();

    let first = registry
        .add_method("doc_123", Provider::Mtn, "0241234567", true, None)
        .await
        .unwrap();
    assert!(first.is_default);

    let second = registry
        .add_method("doc_123", Provider::Airtel, "0269876543", true, None)
        .await
        .unwrap();
    assert!(second.is_default);

    let methods = registry.list_methods("doc_123").await;
    assert_eq!(methods.len(), 2);
    assert_eq!(methods.iter().filter(|m| m.is_default).count(), 1);
    assert!(!methods.iter().find(|m| m.id == first.id).unwrap().is_default);
}

#[tokio::test]
async fn test_set_default_flips_previous() {
    let registry = registry();

    let first = registry
        .add_method("doc_123", Provider::Mtn, "0241234567", true, None)
        .await
        .unwrap();
    let second = registry
        .add_method("doc_123", Provider::Vodafone, "0205555555", false, None)
        .await
        .unwrap();

    let updated = registry
        .set_default("doc_123", &second.id, None)
        .await
        .unwrap();
    assert!(updated.is_default);

    let methods = registry.list_methods("doc_123").await;
    assert_eq!(methods.iter().filter(|m| m.is_default).count(), 1);
    assert!(!methods.iter().find(|m| m.id == first.id).unwrap().is_default);
}

#[tokio::test]
async fn test_set_default_requires_ownership() {
    let registry = registry();

    let foreign = registry
        .add_method("doc_456", Provider::Mtn, "0541234567", false, None)
        .await
        .unwrap();

    // doc_123 cannot claim doc_456's method
    let err = registry
        .set_default("doc_123", &foreign.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.category.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_default_sets_are_isolated_per_doctor() {
    let registry = registry();

    registry
        .add_method("doc_123", Provider::Mtn, "0241234567", true, None)
        .await
        .unwrap();
    registry
        .add_method("doc_456", Provider::Mtn, "0541234567", true, None)
        .await
        .unwrap();

    assert!(registry.list_methods("doc_123").await[0].is_default);
    assert!(registry.list_methods("doc_456").await[0].is_default);
}

#[tokio::test]
async fn test_delete_method() {
    let registry = registry();

    let method = registry
        .add_method("doc_123", Provider::Mtn, "0241234567", false, None)
        .await
        .unwrap();

    registry.delete_method(&method.id, None).await.unwrap();
    assert!(registry.list_methods("doc_123").await.is_empty());

    let err = registry.delete_method(&method.id, None).await.unwrap_err();
    assert_eq!(err.category.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_concurrent_default_sets_leave_one_default() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let registry = Arc::new(PayoutMethodRegistry::new(
        storage,
        Arc::new(EventBus::new(64)),
    ));

    let a = registry
        .add_method("doc_123", Provider::Mtn, "0241234567", false, None)
        .await
        .unwrap();
    let b = registry
        .add_method("doc_123", Provider::Airtel, "0269876543", false, None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for id in [a.id.clone(), b.id.clone(), a.id, b.id] {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.set_default("doc_123", &id, None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let methods = registry.list_methods("doc_123").await;
    assert_eq!(methods.iter().filter(|m| m.is_default).count(), 1);
}

#[tokio::test]
async fn test_registry_reloads_from_storage() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let bus = Arc::new(EventBus::new(16));

    let first = PayoutMethodRegistry::new(storage.clone(), bus.clone());
    first
        .add_method("doc_123", Provider::Mtn, "0241234567", true, None)
        .await
        .unwrap();

    let second = PayoutMethodRegistry::new(storage, bus);
    second.load().await.unwrap();
    let methods = second.list_methods("doc_123").await;
    assert_eq!(methods.len(), 1);
    assert!(methods[0].is_default);
}
