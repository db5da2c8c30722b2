//! Channel plumbing built on tokio broadcast.

use crate::error::{BusError, Result};
use crate::message::{CommandEnvelope, StatusEvent};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// The two logical channels of the system.
///
/// Cloning is cheap; all clones publish into and subscribe to the same
/// channels. Messages are delivered to subscribers that exist at publish
/// time; a late subscriber sees nothing that came before it.
#[derive(Clone)]
pub struct MessageBus {
    commands: broadcast::Sender<CommandEnvelope>,
    status: broadcast::Sender<StatusEvent>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (commands, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self { commands, status }
    }

    /// Publish a command. Fails loudly when nothing is listening; the
    /// caller decides whether to retry or abort.
    pub fn publish_command(&self, envelope: CommandEnvelope) -> Result<usize> {
        self.commands.send(envelope).map_err(|_| BusError::NoListeners)
    }

    /// Publish a status event. Fire-and-forget: with no subscribers the
    /// event is dropped, which is fine: downstream recovers by re-reading
    /// persisted state, not by replay.
    pub fn publish_status(&self, event: StatusEvent) -> usize {
        match self.status.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::trace!("status event dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscribe_commands(&self) -> CommandStream {
        CommandStream(self.commands.subscribe())
    }

    pub fn subscribe_status(&self) -> StatusStream {
        StatusStream(self.status.subscribe())
    }

    pub fn command_listener_count(&self) -> usize {
        self.commands.receiver_count()
    }

    pub fn status_listener_count(&self) -> usize {
        self.status.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("command_listeners", &self.command_listener_count())
            .field("status_listeners", &self.status_listener_count())
            .finish()
    }
}

async fn recv_skipping_lag<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    channel: &'static str,
) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(message) => return Some(message),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Gap is acceptable: subscribers resynchronise from
                // persisted state, never from message replay.
                tracing::warn!(channel, skipped, "subscriber lagged, messages skipped");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Subscription to the command channel.
pub struct CommandStream(broadcast::Receiver<CommandEnvelope>);

impl CommandStream {
    /// Next command, or `None` once the bus shuts down. Overruns are skipped
    /// transparently.
    pub async fn recv(&mut self) -> Option<CommandEnvelope> {
        recv_skipping_lag(&mut self.0, "commands").await
    }
}

/// Subscription to the status channel.
pub struct StatusStream(broadcast::Receiver<StatusEvent>);

impl StatusStream {
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        recv_skipping_lag(&mut self.0, "status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Command;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_command_publish_subscribe() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe_commands();

        let envelope = CommandEnvelope::new(Command::Deploy {
            project_slug: "demo".into(),
        });
        let delivered = bus.publish_command(envelope.clone()).unwrap();
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.request_id, envelope.request_id);
    }

    #[tokio::test]
    async fn test_command_publish_without_listeners_fails() {
        let bus = MessageBus::new();
        let envelope = CommandEnvelope::new(Command::Scan { regions: vec![] });
        assert!(matches!(
            bus.publish_command(envelope),
            Err(BusError::NoListeners)
        ));
    }

    #[tokio::test]
    async fn test_status_is_fire_and_forget() {
        let bus = MessageBus::new();
        // No subscribers: dropped, not an error.
        assert_eq!(bus.publish_status(StatusEvent::progress(Uuid::new_v4(), "x")), 0);

        let mut rx = bus.subscribe_status();
        assert_eq!(bus.publish_status(StatusEvent::progress(Uuid::new_v4(), "y")), 1);
        assert_eq!(rx.recv().await.unwrap().message, "y");
    }

    #[tokio::test]
    async fn test_multiple_status_subscribers() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe_status();
        let mut rx2 = bus.subscribe_status();

        let event = StatusEvent::completed(Uuid::new_v4(), "done");
        assert_eq!(bus.publish_status(event.clone()), 2);

        assert_eq!(rx1.recv().await.unwrap().request_id, event.request_id);
        assert_eq!(rx2.recv().await.unwrap().request_id, event.request_id);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_gap() {
        let bus = MessageBus::with_capacity(2);
        let mut rx = bus.subscribe_status();

        for i in 0..5 {
            bus.publish_status(StatusEvent::progress(Uuid::new_v4(), format!("event-{}", i)));
        }

        // The oldest events were overwritten; recv skips the lag marker and
        // yields what is still buffered instead of erroring.
        let first = rx.recv().await.unwrap();
        assert_eq!(first.message, "event-3");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.message, "event-4");
    }
}
