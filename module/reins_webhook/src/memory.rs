//! In-memory delivery store for tests

use crate::delivery::{ DeliveryStatus, WebhookDelivery };
use crate::store::DeliveryStore;
use reins_types::{ AgentId, DeliveryId, Result };
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory delivery store
#[ derive( Debug, Default ) ]
pub struct MemoryDeliveryStore
{
  inner: Mutex< Inner >,
}

#[ derive( Debug, Default ) ]
struct Inner
{
  by_id: HashMap< DeliveryId, WebhookDelivery >,
  insertion_order: Vec< DeliveryId >,
}

impl MemoryDeliveryStore
{
  /// Create empty store
  pub fn new() -> Self
  {
    Self::default()
  }
}

#[ async_trait::async_trait ]
impl DeliveryStore for MemoryDeliveryStore
{
  async fn insert( &self, delivery: &WebhookDelivery ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.insertion_order.push( delivery.id.clone() );
    inner.by_id.insert( delivery.id.clone(), delivery.clone() );
    Ok( () )
  }

  async fn get( &self, id: &DeliveryId ) -> Result< Option< WebhookDelivery > >
  {
    Ok( self.inner.lock().await.by_id.get( id ).cloned() )
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< WebhookDelivery > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.insertion_order.iter()
        .rev()
        .filter_map( |id| inner.by_id.get( id ) )
        .filter( |delivery| &delivery.agent_id == agent_id )
        .take( limit as usize )
        .cloned()
        .collect()
    )
  }

  async fn due_ids( &self, now_ms: i64, limit: u32 ) -> Result< Vec< DeliveryId > >
  {
    let inner = self.inner.lock().await;
    let mut due: Vec< &WebhookDelivery > = inner.by_id.values()
      .filter( |d|
        matches!( d.status, DeliveryStatus::Pending | DeliveryStatus::Retrying )
          && d.next_retry_at.is_some_and( |at| at <= now_ms ) )
      .collect();
    due.sort_by_key( |d| d.next_retry_at );

    Ok( due.into_iter().take( limit as usize ).map( |d| d.id.clone() ).collect() )
  }

  async fn claim( &self, id: &DeliveryId, now_ms: i64 ) -> Result< bool >
  {
    let mut inner = self.inner.lock().await;
    let Some( delivery ) = inner.by_id.get_mut( id ) else
    {
      return Ok( false );
    };

    let claimable =
      matches!( delivery.status, DeliveryStatus::Pending | DeliveryStatus::Retrying )
        && delivery.next_retry_at.is_some_and( |at| at <= now_ms );
    if !claimable
    {
      return Ok( false );
    }

    delivery.status = DeliveryStatus::Delivering;
    delivery.attempts += 1;
    delivery.last_attempt_at = Some( now_ms );
    delivery.updated_at = now_ms;
    Ok( true )
  }

  async fn mark_delivered( &self, id: &DeliveryId, response_status: u16, at_ms: i64 ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    if let Some( delivery ) = inner.by_id.get_mut( id )
    {
      delivery.status = DeliveryStatus::Delivered;
      delivery.response_status = Some( response_status );
      delivery.next_retry_at = None;
      delivery.error_message = None;
      delivery.updated_at = at_ms;
    }
    Ok( () )
  }

  async fn mark_retrying(
    &self,
    id: &DeliveryId,
    next_retry_at: i64,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    if let Some( delivery ) = inner.by_id.get_mut( id )
    {
      delivery.status = DeliveryStatus::Retrying;
      delivery.next_retry_at = Some( next_retry_at );
      delivery.response_status = response_status;
      delivery.error_message = Some( error.to_string() );
      delivery.updated_at = at_ms;
    }
    Ok( () )
  }

  async fn mark_failed(
    &self,
    id: &DeliveryId,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    if let Some( delivery ) = inner.by_id.get_mut( id )
    {
      delivery.status = DeliveryStatus::Failed;
      delivery.next_retry_at = None;
      delivery.response_status = response_status;
      delivery.error_message = Some( error.to_string() );
      delivery.updated_at = at_ms;
    }
    Ok( () )
  }

  async fn defer( &self, id: &DeliveryId, next_retry_at: i64, at_ms: i64 ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    if let Some( delivery ) = inner.by_id.get_mut( id )
    {
      if matches!( delivery.status, DeliveryStatus::Pending | DeliveryStatus::Retrying )
      {
        delivery.status = DeliveryStatus::Retrying;
        delivery.next_retry_at = Some( next_retry_at );
        delivery.updated_at = at_ms;
      }
    }
    Ok( () )
  }
}
