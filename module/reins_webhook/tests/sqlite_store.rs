//! Claim semantics of the SQLite delivery store

use reins_test_db::TestDatabaseBuilder;
use reins_types::{ AgentId, DeliveryId };
use reins_webhook::{ DeliveryStatus, DeliveryStore, SqliteDeliveryStore, WebhookDelivery };

async fn store() -> ( reins_test_db::TestDatabase, SqliteDeliveryStore )
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.unwrap();
  SqliteDeliveryStore::apply_schema( db.pool() ).await.unwrap();
  let store = SqliteDeliveryStore::from_pool( db.pool().clone() );
  ( db, store )
}

fn delivery_due_at( due_ms: i64 ) -> WebhookDelivery
{
  WebhookDelivery
  {
    id: DeliveryId::generate(),
    agent_id: AgentId::generate(),
    event_type: "payment.executed".into(),
    payload: "{\"event\":\"payment.executed\"}".into(),
    status: DeliveryStatus::Pending,
    attempts: 0,
    last_attempt_at: None,
    next_retry_at: Some( due_ms ),
    response_status: None,
    error_message: None,
    created_at: due_ms,
    updated_at: due_ms,
  }
}

#[ tokio::test ]
async fn claim_is_exclusive_until_resolved()
{
  let ( _db, store ) = store().await;
  let delivery = delivery_due_at( 1_000 );
  store.insert( &delivery ).await.unwrap();

  assert_eq!( store.due_ids( 1_000, 10 ).await.unwrap(), vec![ delivery.id.clone() ] );

  // First claim wins, second loses while the attempt is unresolved
  assert!( store.claim( &delivery.id, 1_000 ).await.unwrap() );
  assert!( !store.claim( &delivery.id, 1_000 ).await.unwrap() );

  let claimed = store.get( &delivery.id ).await.unwrap().unwrap();
  assert_eq!( claimed.status, DeliveryStatus::Delivering );
  assert_eq!( claimed.attempts, 1 );
  assert_eq!( claimed.last_attempt_at, Some( 1_000 ) );

  // A delivering row is invisible to the due scan
  assert!( store.due_ids( 2_000, 10 ).await.unwrap().is_empty() );

  // After the attempt resolves to retrying, the row becomes claimable again
  store.mark_retrying( &delivery.id, 61_000, Some( 500 ), "endpoint returned 500", 1_000 )
    .await.unwrap();
  assert!( store.due_ids( 60_000, 10 ).await.unwrap().is_empty(), "not due before the delay" );
  assert!( store.claim( &delivery.id, 61_000 ).await.unwrap() );
}

#[ tokio::test ]
async fn undue_rows_cannot_be_claimed()
{
  let ( _db, store ) = store().await;
  let delivery = delivery_due_at( 5_000 );
  store.insert( &delivery ).await.unwrap();

  assert!( !store.claim( &delivery.id, 4_999 ).await.unwrap() );
  assert!( store.claim( &delivery.id, 5_000 ).await.unwrap() );
}

#[ tokio::test ]
async fn terminal_rows_stay_terminal()
{
  let ( _db, store ) = store().await;
  let delivery = delivery_due_at( 1_000 );
  store.insert( &delivery ).await.unwrap();

  store.claim( &delivery.id, 1_000 ).await.unwrap();
  store.mark_delivered( &delivery.id, 200, 1_100 ).await.unwrap();

  let done = store.get( &delivery.id ).await.unwrap().unwrap();
  assert_eq!( done.status, DeliveryStatus::Delivered );
  assert_eq!( done.response_status, Some( 200 ) );
  assert!( done.next_retry_at.is_none() );

  assert!( !store.claim( &delivery.id, 9_999 ).await.unwrap() );
  assert!( store.due_ids( 9_999, 10 ).await.unwrap().is_empty() );
}
