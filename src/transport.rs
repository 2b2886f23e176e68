use futures::stream::BoxStream;

use crate::data::{WorkspaceEvent, WorkspaceReply};

pub type EventStream = BoxStream<'static, anyhow::Result<WorkspaceEvent>>;

/// Connection to the window manager.
///
/// The mirror only ever asks for full workspace listings. Event streams end
/// when the connection to the window manager is lost.
pub trait Transport: Send + Sync + 'static {
    fn fetch_workspaces(
        &self,
    ) -> impl Future<Output = anyhow::Result<Vec<WorkspaceReply>>> + Send;

    fn run_command(&self, command: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn subscribe(&self) -> impl Future<Output = anyhow::Result<EventStream>> + Send;
}
