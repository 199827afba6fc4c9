use async_trait::async_trait;

use crate::{error::Result, message::message_models::MessageEvent};

/// Delivery of committed message events to interested users.
///
/// Callers run `publish` detached from the request; an error is logged and
/// never undoes the write that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: MessageEvent) -> Result<()>;
}
