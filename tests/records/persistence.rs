use cabinet::{Cabinet, CabinetConfig, CabinetError, FileStore, Query, SortOrder};
use pretty_assertions::assert_eq;

use super::models::{Invoice, LineItem};
use super::support::{faulty_cabinet, registry};

fn file_cabinet(dir: &std::path::Path) -> Cabinet<FileStore> {
    let config = CabinetConfig::new("Books").with_data_dir(dir);
    Cabinet::new(config, registry())
}

fn by_number() -> Query {
    Query::all().sort_by("number", SortOrder::Ascending)
}

#[tokio::test]
async fn saved_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let before: Vec<Invoice> = {
        let cabinet = file_cabinet(dir.path());
        for (number, total) in [("INV-2", 20), ("INV-1", 10), ("INV-3", 30)] {
            cabinet.insert(Invoice::new(number, "acme", total)).await.unwrap();
        }
        assert!(cabinet.save().await.unwrap());
        cabinet.fetch(by_number()).await.unwrap()
    };

    let restarted = file_cabinet(dir.path());
    let after: Vec<Invoice> = restarted.fetch(by_number()).await.unwrap();
    assert_eq!(after, before);
    assert!(dir.path().join("Books.json").exists());
}

#[tokio::test]
async fn unsaved_changes_are_not_durable() {
    let dir = tempfile::tempdir().unwrap();

    {
        let cabinet = file_cabinet(dir.path());
        cabinet.insert(Invoice::new("INV-1", "acme", 10)).await.unwrap();
        cabinet.save().await.unwrap();
        cabinet.insert(Invoice::new("INV-2", "acme", 20)).await.unwrap();
    }

    let restarted = file_cabinet(dir.path());
    let invoices: Vec<Invoice> = restarted.fetch_all().await.unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].number, "INV-1");
}

#[tokio::test]
async fn cascade_delete_is_durable_without_save() {
    let dir = tempfile::tempdir().unwrap();
    let invoice = Invoice::new("INV-1", "acme", 10);

    {
        let cabinet = file_cabinet(dir.path());
        cabinet.insert(invoice.clone()).await.unwrap();
        cabinet.insert(LineItem::new(invoice.id, "x", 1)).await.unwrap();
        cabinet.save().await.unwrap();
        cabinet.delete(vec![invoice.clone()]).await.unwrap();
    }

    let restarted = file_cabinet(dir.path());
    assert!(restarted.fetch_all::<Invoice>().await.unwrap().is_empty());
    assert!(restarted.fetch_all::<LineItem>().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_commit_keeps_changes_for_retry() {
    let (cabinet, store) = faulty_cabinet(CabinetConfig::default());
    cabinet.insert(Invoice::new("INV-1", "acme", 10)).await.unwrap();

    store.fail_commits(true);
    let err = cabinet.save().await.unwrap_err();
    assert!(matches!(err, CabinetError::CommitFailed(_)));
    assert!(cabinet.has_changes().await.unwrap());
    assert_eq!(store.inner.len("Invoice").unwrap(), 0);

    store.fail_commits(false);
    assert!(cabinet.save().await.unwrap());
    assert_eq!(store.inner.len("Invoice").unwrap(), 1);
}

#[tokio::test]
async fn replication_is_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = CabinetConfig::new("Books")
        .with_data_dir(dir.path())
        .with_replication(true);
    let cabinet: Cabinet<FileStore> = Cabinet::new(config, registry());

    let err = cabinet.open().await.unwrap_err();
    assert!(matches!(err, CabinetError::StoreUnavailable(_)));
    assert_eq!(cabinet.state(), cabinet::ContextState::Failed);
}
