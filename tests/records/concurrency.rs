use std::collections::HashSet;
use std::time::Duration;

use cabinet::{CabinetConfig, CabinetError, Uuid};
use pretty_assertions::assert_eq;

use super::models::Invoice;
use super::support::{faulty_cabinet, memory_cabinet};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_then_one_save_keep_everything() {
    let cabinet = memory_cabinet();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let cabinet = cabinet.clone();
            tokio::spawn(async move {
                let invoice = Invoice::new(&format!("INV-{i}"), "acme", i);
                let id = invoice.id;
                cabinet.insert(invoice).await.unwrap();
                id
            })
        })
        .collect();

    let mut expected = HashSet::new();
    for handle in handles {
        expected.insert(handle.await.unwrap());
    }

    assert!(cabinet.save().await.unwrap());
    let stored: HashSet<Uuid> = cabinet
        .fetch_all::<Invoice>()
        .await
        .unwrap()
        .into_iter()
        .map(|invoice| invoice.id)
        .collect();
    assert_eq!(stored, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_interleave_with_a_writer() {
    let cabinet = memory_cabinet();
    let batch: Vec<Invoice> = (0..10).map(|i| Invoice::new(&format!("INV-{i}"), "acme", i)).collect();

    let writer = {
        let cabinet = cabinet.clone();
        let batch = batch.clone();
        tokio::spawn(async move {
            for invoice in batch {
                cabinet.insert(invoice).await.unwrap();
            }
            cabinet.save().await.unwrap();
        })
    };

    for _ in 0..20 {
        let seen = cabinet.fetch_all::<Invoice>().await.unwrap();
        assert!(seen.len() <= batch.len());
    }

    writer.await.unwrap();
    assert_eq!(cabinet.fetch_all::<Invoice>().await.unwrap().len(), batch.len());
    assert!(!cabinet.has_changes().await.unwrap());
}

#[tokio::test]
async fn slow_store_times_out() {
    let (cabinet, store) = faulty_cabinet(CabinetConfig::default());
    store.delay_queries(Duration::from_millis(300));

    let impatient = cabinet.with_timeout(Duration::from_millis(20));
    let err = impatient.fetch_all::<Invoice>().await.unwrap_err();
    assert!(matches!(err, CabinetError::TimedOut(limit) if limit == Duration::from_millis(20)));
}

#[tokio::test]
async fn configured_timeout_applies_to_every_operation() {
    let config = CabinetConfig::default().with_timeout(Duration::from_millis(100));
    let (cabinet, store) = faulty_cabinet(config);
    store.delay_queries(Duration::from_millis(600));

    let err = cabinet.fetch_all::<Invoice>().await.unwrap_err();
    assert!(matches!(err, CabinetError::TimedOut(_)));

    // Operations that never query the store finish well inside the limit.
    assert!(cabinet.insert(Invoice::new("INV-1", "acme", 1)).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_read_does_not_hold_up_staging() {
    let (cabinet, store) = faulty_cabinet(CabinetConfig::default());
    store.delay_queries(Duration::from_millis(800));

    let slow = {
        let cabinet = cabinet.clone();
        tokio::spawn(async move { cabinet.fetch_all::<Invoice>().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let quick = cabinet.with_timeout(Duration::from_millis(200));
    assert!(quick.insert(Invoice::new("INV-1", "acme", 1)).await.unwrap());
    assert!(quick.has_changes().await.unwrap());

    assert!(slow.await.unwrap().unwrap().is_empty());
}
