use cabinet::{CabinetConfig, CabinetError, CascadeMode, Query, StoreError};
use pretty_assertions::assert_eq;

use super::models::{Invoice, LineItem, Payment};
use super::support::{faulty_cabinet, memory_cabinet};

#[tokio::test]
async fn deleting_an_invoice_removes_its_line_items_only() {
    let cabinet = memory_cabinet();
    let a = Invoice::new("A", "acme", 10);
    let b = Invoice::new("B", "acme", 20);
    let x = LineItem::new(a.id, "x", 1);
    let y = LineItem::new(b.id, "y", 1);

    cabinet.insert(a.clone()).await.unwrap();
    cabinet.insert(x).await.unwrap();
    cabinet.insert(y.clone()).await.unwrap();
    cabinet.save().await.unwrap();

    assert!(cabinet.delete(vec![a]).await.unwrap());

    let invoices: Vec<Invoice> = cabinet.fetch_all().await.unwrap();
    assert!(invoices.is_empty());
    let items: Vec<LineItem> = cabinet.fetch_all().await.unwrap();
    assert_eq!(items, vec![y]);
}

#[tokio::test]
async fn every_cascade_entity_is_purged() {
    let cabinet = memory_cabinet();
    let doomed = Invoice::new("A", "acme", 10);
    let kept = Invoice::new("B", "acme", 20);
    for invoice in [&doomed, &kept] {
        cabinet.insert(invoice.clone()).await.unwrap();
        cabinet.insert(LineItem::new(invoice.id, "sku", 1)).await.unwrap();
        cabinet.insert(Payment::new(invoice.id, 5)).await.unwrap();
    }
    cabinet.save().await.unwrap();

    cabinet.delete(vec![doomed.clone()]).await.unwrap();

    let invoices: Vec<Invoice> = cabinet.fetch_all().await.unwrap();
    assert_eq!(invoices, vec![kept.clone()]);
    let items: Vec<LineItem> = cabinet.fetch_all().await.unwrap();
    assert!(items.iter().all(|i| i.invoice_id == kept.id));
    assert_eq!(items.len(), 1);
    let payments: Vec<Payment> = cabinet.fetch_all().await.unwrap();
    assert!(payments.iter().all(|p| p.invoice_id == kept.id));
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn delete_uses_caller_supplied_identifiers() {
    let cabinet = memory_cabinet();
    let stored = Invoice::new("A", "acme", 10);
    cabinet.insert(stored.clone()).await.unwrap();
    cabinet.save().await.unwrap();

    // Same identifier, stale field values: still deletes the stored row.
    let stale = Invoice {
        total: -1,
        ..stored.clone()
    };
    cabinet.delete(vec![stale]).await.unwrap();
    assert!(cabinet.fetch_all::<Invoice>().await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_child_step_reports_partial_cascade() {
    let (cabinet, store) = faulty_cabinet(CabinetConfig::default());
    let invoice = Invoice::new("A", "acme", 10);
    cabinet.insert(invoice.clone()).await.unwrap();
    cabinet.insert(LineItem::new(invoice.id, "x", 1)).await.unwrap();
    cabinet.insert(Payment::new(invoice.id, 5)).await.unwrap();
    cabinet.save().await.unwrap();

    store.fail_batch_delete_of(Some("Payment"));
    let err = cabinet.delete(vec![invoice]).await.unwrap_err();
    assert!(matches!(
        err,
        CabinetError::PartialCascadeFailure { ref entity, source: StoreError::Backend(_) } if entity == "Payment"
    ));

    // Steps before the failure stay applied; the failed one and later do not.
    assert_eq!(store.inner.len("Invoice").unwrap(), 0);
    assert_eq!(store.inner.len("LineItem").unwrap(), 0);
    assert_eq!(store.inner.len("Payment").unwrap(), 1);
}

#[tokio::test]
async fn failing_parent_step_is_commit_failed() {
    let (cabinet, store) = faulty_cabinet(CabinetConfig::default());
    let invoice = Invoice::new("A", "acme", 10);
    cabinet.insert(invoice.clone()).await.unwrap();
    cabinet.insert(LineItem::new(invoice.id, "x", 1)).await.unwrap();
    cabinet.save().await.unwrap();

    store.fail_batch_delete_of(Some("Invoice"));
    let err = cabinet.delete(vec![invoice]).await.unwrap_err();
    assert!(matches!(err, CabinetError::CommitFailed(_)));
    assert_eq!(store.inner.len("Invoice").unwrap(), 1);
    assert_eq!(store.inner.len("LineItem").unwrap(), 1);
}

#[tokio::test]
async fn atomic_cascade_is_all_or_nothing() {
    let config = CabinetConfig::default().with_cascade_mode(CascadeMode::Atomic);
    let (cabinet, store) = faulty_cabinet(config);
    let invoice = Invoice::new("A", "acme", 10);
    cabinet.insert(invoice.clone()).await.unwrap();
    cabinet.insert(LineItem::new(invoice.id, "x", 1)).await.unwrap();
    cabinet.insert(Payment::new(invoice.id, 5)).await.unwrap();
    cabinet.save().await.unwrap();

    store.fail_commits(true);
    let err = cabinet.delete(vec![invoice.clone()]).await.unwrap_err();
    assert!(matches!(err, CabinetError::CommitFailed(_)));
    assert_eq!(store.inner.len("Invoice").unwrap(), 1);
    assert_eq!(store.inner.len("LineItem").unwrap(), 1);
    assert_eq!(store.inner.len("Payment").unwrap(), 1);

    store.fail_commits(false);
    assert!(cabinet.delete(vec![invoice]).await.unwrap());
    assert_eq!(store.inner.len("Invoice").unwrap(), 0);
    assert_eq!(store.inner.len("LineItem").unwrap(), 0);
    assert_eq!(store.inner.len("Payment").unwrap(), 0);
    assert!(cabinet.rows("Payment", Query::all()).await.unwrap().is_empty());
}
