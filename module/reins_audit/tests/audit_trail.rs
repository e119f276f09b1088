//! Integration tests for the activity/audit trail over SQLite

use reins_audit::{
  action, ActivitySink, ActivitySummary, AuditSink, NewActivity, NewAudit, SqliteAuditStore,
};
use reins_test_db::TestDatabaseBuilder;
use reins_types::{ Actor, AgentId, OwnerId, SystemClock };
use std::sync::Arc;

async fn store() -> ( reins_test_db::TestDatabase, SqliteAuditStore )
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.unwrap();
  SqliteAuditStore::apply_schema( db.pool() ).await.unwrap();
  let store = SqliteAuditStore::from_pool( db.pool().clone(), Arc::new( SystemClock ) );
  ( db, store )
}

#[ tokio::test ]
async fn activities_are_ordered_and_scoped()
{
  let ( _db, store ) = store().await;
  let agent_a = AgentId::generate();
  let agent_b = AgentId::generate();
  let owner = OwnerId::parse( "acct_1" ).unwrap();

  store.record_activity( NewActivity::new( agent_a.clone(), owner.clone(), action::PROPOSAL_CREATED ) )
    .await.unwrap();
  store.record_activity( NewActivity::new( agent_a.clone(), owner.clone(), action::PAYMENT_EXECUTED ) )
    .await.unwrap();
  store.record_activity( NewActivity::new( agent_b.clone(), owner.clone(), action::PROPOSAL_CREATED ) )
    .await.unwrap();

  let for_a = store.list_for_agent( &agent_a, 10 ).await.unwrap();
  assert_eq!( for_a.len(), 2 );
  // Newest first
  assert_eq!( for_a[ 0 ].action, action::PAYMENT_EXECUTED );
  assert_eq!( for_a[ 1 ].action, action::PROPOSAL_CREATED );

  let for_owner = store.list_for_owner( &owner, 10 ).await.unwrap();
  assert_eq!( for_owner.len(), 3 );
}

#[ tokio::test ]
async fn monotonic_ids_within_agent()
{
  let ( _db, store ) = store().await;
  let agent = AgentId::generate();
  let owner = OwnerId::parse( "acct_2" ).unwrap();

  for _ in 0..5
  {
    store.record_activity( NewActivity::new( agent.clone(), owner.clone(), action::PROPOSAL_CREATED ) )
      .await.unwrap();
  }

  let entries = store.list_for_agent( &agent, 10 ).await.unwrap();
  let ids: Vec< i64 > = entries.iter().map( |e| e.id ).collect();
  let mut sorted = ids.clone();
  sorted.sort_by( |a, b| b.cmp( a ) );
  assert_eq!( ids, sorted, "feed must be newest-first by row id" );
}

#[ tokio::test ]
async fn audit_records_actor_and_resource()
{
  let ( _db, store ) = store().await;
  let proposal_id = "prop_550e8400-e29b-41d4-a716-446655440000";

  store.record_audit(
    NewAudit::new( Actor::System, "proposal", proposal_id, "approved" )
      .with_details( serde_json::json!( { "auto": true } ) )
  ).await.unwrap();

  store.record_audit(
    NewAudit::new( Actor::Owner, "proposal", proposal_id, "noted" ).by( "acct_1" )
  ).await.unwrap();

  let entries = store.list_for_resource( "proposal", proposal_id ).await.unwrap();
  assert_eq!( entries.len(), 2 );
  assert_eq!( entries[ 0 ].actor, Actor::System );
  assert_eq!( entries[ 1 ].actor, Actor::Owner );
  assert_eq!( entries[ 1 ].actor_id.as_deref(), Some( "acct_1" ) );
  assert!( entries[ 0 ].created_at <= entries[ 1 ].created_at );
}

#[ tokio::test ]
async fn summary_counts_by_action()
{
  let ( _db, store ) = store().await;
  let agent = AgentId::generate();
  let owner = OwnerId::parse( "acct_3" ).unwrap();

  for _ in 0..3
  {
    store.record_activity( NewActivity::new( agent.clone(), owner.clone(), action::PAYMENT_EXECUTED ) )
      .await.unwrap();
  }
  store.record_activity( NewActivity::new( agent.clone(), owner.clone(), action::PAYMENT_FAILED ) )
    .await.unwrap();

  let summary = ActivitySummary::build( &store, &agent ).await.unwrap();
  assert_eq!( summary.total, 4 );
  assert_eq!( summary.payments_executed, 3 );
  assert_eq!( summary.payments_failed, 1 );
  assert_eq!( summary.proposals_created, 0 );
}
