//! Integration tests for the agent registry over SQLite

use reins_registry::{
  AgentRegistry, AgentStatus, AgentUpdate, AutoExecuteRules, CreateAgentInput,
  MemoryAgentStore, SqliteAgentStore,
};
use reins_test_db::TestDatabaseBuilder;
use reins_types::{ OwnerId, SystemClock };
use std::sync::Arc;

async fn sqlite_registry() -> ( reins_test_db::TestDatabase, AgentRegistry )
{
  let db = TestDatabaseBuilder::new().in_memory().build().await.unwrap();
  SqliteAgentStore::apply_schema( db.pool() ).await.unwrap();
  let store = Arc::new( SqliteAgentStore::from_pool( db.pool().clone() ) );
  let registry = AgentRegistry::new( store, Arc::new( SystemClock ) );
  ( db, registry )
}

fn owner( s: &str ) -> OwnerId
{
  OwnerId::parse( s ).unwrap()
}

fn input( owner_id: &OwnerId, name: &str ) -> CreateAgentInput
{
  CreateAgentInput
  {
    owner: owner_id.clone(),
    name: name.into(),
    webhook_url: None,
    auto_execute_enabled: false,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  }
}

#[ tokio::test ]
async fn create_then_validate_round_trips()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let created = registry.create( input( &owner, "payroll-bot" ) ).await.unwrap();
  assert!( created.api_key.starts_with( "agent_" ) );
  assert_eq!( created.agent.api_key_prefix, &created.api_key[ ..12 ] );

  let validated = registry.validate_api_key( &created.api_key ).await.unwrap();
  assert_eq!( validated.id, created.agent.id );
}

#[ tokio::test ]
async fn cleartext_never_persisted()
{
  let ( db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let created = registry.create( input( &owner, "bot" ) ).await.unwrap();

  // Nothing in the agents table may contain the cleartext key
  let row: ( String, String ) = sqlx::query_as(
    "SELECT api_key_hash, api_key_prefix FROM agents WHERE id = ?"
  )
  .bind( created.agent.id.as_str() )
  .fetch_one( db.pool() )
  .await
  .unwrap();

  assert_ne!( row.0, created.api_key );
  assert_eq!( row.0.len(), 64 );
  assert_eq!( row.1.len(), 12 );
}

#[ tokio::test ]
async fn malformed_key_rejected_without_lookup()
{
  let ( _db, registry ) = sqlite_registry().await;

  let err = registry.validate_api_key( "sk-not-an-agent-key" ).await.unwrap_err();
  assert_eq!( err.code(), "AUTHORIZATION" );
}

#[ tokio::test ]
async fn validate_after_deactivation_fails()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let created = registry.create( input( &owner, "bot" ) ).await.unwrap();
  registry.deactivate( &created.agent.id, &owner ).await.unwrap();

  let err = registry.validate_api_key( &created.api_key ).await.unwrap_err();
  match err
  {
    reins_types::Error::Authorization { reason } => assert_eq!( reason, "deactivated" ),
    other => panic!( "expected authorization error, got {other:?}" ),
  }
}

#[ tokio::test ]
async fn deactivate_is_terminal()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let created = registry.create( input( &owner, "bot" ) ).await.unwrap();
  registry.deactivate( &created.agent.id, &owner ).await.unwrap();

  let err = registry.deactivate( &created.agent.id, &owner ).await.unwrap_err();
  assert_eq!( err.code(), "STATE" );

  let err = registry
    .update( &created.agent.id, &owner, AgentUpdate { name: Some( "x".into() ), ..Default::default() } )
    .await
    .unwrap_err();
  assert_eq!( err.code(), "STATE" );
}

#[ tokio::test ]
async fn owner_mismatch_is_authorization_error()
{
  let ( _db, registry ) = sqlite_registry().await;
  let alice = owner( "acct_alice" );
  let mallory = owner( "acct_mallory" );

  let created = registry.create( input( &alice, "bot" ) ).await.unwrap();
  let err = registry.deactivate( &created.agent.id, &mallory ).await.unwrap_err();
  assert_eq!( err.code(), "AUTHORIZATION" );
}

#[ tokio::test ]
async fn pause_all_disables_auto_execute_and_resume_keeps_it_off()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let mut create = input( &owner, "bot" );
  create.auto_execute_enabled = true;
  let created = registry.create( create ).await.unwrap();

  let paused = registry.pause_all( &owner ).await.unwrap();
  assert_eq!( paused, 1 );

  // API key stops validating with reason "paused"
  let err = registry.validate_api_key( &created.api_key ).await.unwrap_err();
  match err
  {
    reins_types::Error::Authorization { reason } => assert_eq!( reason, "paused" ),
    other => panic!( "expected authorization error, got {other:?}" ),
  }

  let resumed = registry.resume_all( &owner ).await.unwrap();
  assert_eq!( resumed, 1 );

  let agent = registry.get( &created.agent.id ).await.unwrap().unwrap();
  assert_eq!( agent.status, AgentStatus::Active );
  assert!( !agent.auto_execute_enabled, "resume must not re-enable auto-execute" );

  // Validation works again after resume
  registry.validate_api_key( &created.api_key ).await.unwrap();
}

#[ tokio::test ]
async fn pause_all_skips_deactivated_agents()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let a = registry.create( input( &owner, "a" ) ).await.unwrap();
  let _b = registry.create( input( &owner, "b" ) ).await.unwrap();
  registry.deactivate( &a.agent.id, &owner ).await.unwrap();

  let paused = registry.pause_all( &owner ).await.unwrap();
  assert_eq!( paused, 1 );

  let agent = registry.get( &a.agent.id ).await.unwrap().unwrap();
  assert_eq!( agent.status, AgentStatus::Deactivated );
}

#[ tokio::test ]
async fn rotate_webhook_issues_fresh_secret()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );

  let mut create = input( &owner, "bot" );
  create.webhook_url = Some( "https://hooks.example.com/a".into() );
  let created = registry.create( create ).await.unwrap();
  let first_secret = created.webhook_secret.clone().unwrap();
  assert!( first_secret.starts_with( "whsec_" ) );

  let ( agent, second_secret ) = registry
    .rotate_webhook( &created.agent.id, &owner, "https://hooks.example.com/b".into() )
    .await
    .unwrap();

  assert_ne!( first_secret, second_secret );
  assert_eq!( agent.webhook_url.as_deref(), Some( "https://hooks.example.com/b" ) );
  assert_eq!( agent.webhook_secret.as_deref(), Some( second_secret.as_str() ) );
}

#[ tokio::test ]
async fn rotate_webhook_rejects_bad_url()
{
  let ( _db, registry ) = sqlite_registry().await;
  let owner = owner( "acct_1" );
  let created = registry.create( input( &owner, "bot" ) ).await.unwrap();

  let err = registry
    .rotate_webhook( &created.agent.id, &owner, "ftp://nope".into() )
    .await
    .unwrap_err();
  assert_eq!( err.code(), "VALIDATION" );
}

#[ tokio::test ]
async fn list_and_count_are_owner_scoped()
{
  let ( _db, registry ) = sqlite_registry().await;
  let alice = owner( "acct_alice" );
  let bob = owner( "acct_bob" );

  registry.create( input( &alice, "a1" ) ).await.unwrap();
  registry.create( input( &alice, "a2" ) ).await.unwrap();
  registry.create( input( &bob, "b1" ) ).await.unwrap();

  assert_eq!( registry.count( &alice ).await.unwrap(), 2 );
  assert_eq!( registry.count( &bob ).await.unwrap(), 1 );
  assert_eq!( registry.list( &alice ).await.unwrap().len(), 2 );
}

#[ tokio::test ]
async fn memory_store_behaves_like_sqlite()
{
  let store = Arc::new( MemoryAgentStore::new() );
  let registry = AgentRegistry::new( store, Arc::new( SystemClock ) );
  let owner = owner( "acct_1" );

  let mut create = input( &owner, "bot" );
  create.auto_execute_rules = Some( AutoExecuteRules
  {
    allowed_tokens: Some( vec![ "USDC".into() ] ),
    ..Default::default()
  } );
  let created = registry.create( create ).await.unwrap();

  let validated = registry.validate_api_key( &created.api_key ).await.unwrap();
  assert_eq!( validated.auto_execute_rules, created.agent.auto_execute_rules );

  registry.pause_all( &owner ).await.unwrap();
  assert!( registry.validate_api_key( &created.api_key ).await.is_err() );
}
