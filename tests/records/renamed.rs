use cabinet::{Query, Storable};
use pretty_assertions::assert_eq;

use super::models::{Comment, Ticket};
use super::support::ticket_cabinet;

#[test]
fn primary_key_follows_serde_names() {
    assert_eq!(Ticket::schema().primary_key(), "ticketId");
    assert_eq!(Comment::schema().primary_key(), "commentId");
}

#[tokio::test]
async fn renamed_identifier_is_updated_in_place() {
    let cabinet = ticket_cabinet();
    let mut ticket = Ticket::new("printer on fire");
    cabinet.insert(ticket.clone()).await.unwrap();
    cabinet.save().await.unwrap();

    ticket.title = "printer no longer on fire".into();
    assert!(cabinet.update(vec![ticket.clone()]).await.unwrap());

    let stored: Vec<Ticket> = cabinet.fetch_all().await.unwrap();
    assert_eq!(stored, vec![ticket]);
}

#[tokio::test]
async fn renamed_identifier_is_deleted_with_cascade() {
    let cabinet = ticket_cabinet();
    let (doomed, kept) = (Ticket::new("a"), Ticket::new("b"));
    let kept_comment = Comment::new(kept.ticket_id, "still here");
    cabinet.insert(doomed.clone()).await.unwrap();
    cabinet.insert(kept.clone()).await.unwrap();
    cabinet.insert(Comment::new(doomed.ticket_id, "gone")).await.unwrap();
    cabinet.insert(kept_comment.clone()).await.unwrap();
    cabinet.save().await.unwrap();

    assert!(cabinet.delete(vec![doomed]).await.unwrap());

    assert_eq!(cabinet.fetch_all::<Ticket>().await.unwrap(), vec![kept]);
    assert_eq!(cabinet.fetch_all::<Comment>().await.unwrap(), vec![kept_comment]);
    assert_eq!(cabinet.rows("Ticket", Query::all()).await.unwrap().len(), 1);
}
