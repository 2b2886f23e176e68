use std::{cmp::Ordering, sync::Arc};

use anyhow::Context as _;
use futures::StreamExt as _;

use crate::data::{Change, Workspace, WorkspaceEvent, WorkspaceReply};
use crate::error::{Error, Result};
use crate::order::compare_names;
use crate::observers::{Callback, Observers, WorkspaceSignal};
use crate::store::MirrorStore;
use crate::transport::{EventStream, Transport};
use crate::utils::ResultExt as _;

/// Local, ordered copy of the window manager's workspaces.
///
/// The window manager only says *that* something changed. Each notification
/// is reconciled by fetching the full workspace list and diffing it against
/// the mirror by name.
pub struct WorkspaceMirror<T> {
    transport: Arc<T>,
    events: Option<EventStream>,
    store: MirrorStore,
    observers: Observers,
}

impl<T: Transport> WorkspaceMirror<T> {
    /// Fetches the initial workspace list and subscribes to workspace events.
    pub async fn connect(transport: T) -> Result<Self> {
        Self::connect_shared(Arc::new(transport)).await
    }

    pub async fn connect_shared(transport: Arc<T>) -> Result<Self> {
        let replies = transport
            .fetch_workspaces()
            .await
            .map_err(Error::SnapshotFetch)?;
        let store = MirrorStore::from_unsorted(replies.iter().map(Workspace::from));
        log::info!("Mirroring {} workspaces", store.len());

        let events = transport
            .subscribe()
            .await
            .context("Failed to subscribe to workspace events")
            .map_err(Error::Connection)?;

        Ok(Self {
            transport,
            events: Some(events),
            store,
            observers: Observers::default(),
        })
    }

    pub fn workspaces(&self) -> &[Workspace] {
        self.store.all()
    }

    pub fn store(&self) -> &MirrorStore {
        &self.store
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn set_on_created(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Created, callback);
    }
    pub fn set_on_destroyed(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Destroyed, callback);
    }
    pub fn set_on_blurred(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Blurred, callback);
    }
    pub fn set_on_focused(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Focused, callback);
    }
    pub fn set_on_urgent(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Urgent, callback);
    }
    /// Renames are reported through the created and destroyed callbacks, so this never fires.
    pub fn set_on_renamed(&mut self, callback: impl Into<Callback<Workspace>>) {
        self.observers.register(WorkspaceSignal::Renamed, callback);
    }
    pub fn set_on_connection_lost(&mut self, callback: impl Into<Callback<()>>) {
        self.observers.register_connection_lost(callback);
    }
    pub fn set_on_error(&mut self, callback: impl Into<Callback<Error>>) {
        self.observers.register_error(callback);
    }

    /// Asks the window manager to switch to `ws`.
    ///
    /// The focus flags change once the resulting `focus` event arrives.
    pub async fn goto(&self, ws: &Workspace) -> Result<()> {
        goto_name(&*self.transport, &ws.name).await
    }

    /// Reconciles notifications until the event stream ends.
    ///
    /// Per-event failures are logged and passed to the error callback.
    /// The mirror is left as is once the connection is lost.
    pub async fn run(&mut self) {
        let Some(mut events) = self.events.take() else {
            log::warn!("Workspace event stream already consumed");
            return;
        };

        while let Some(ev) = events.next().await {
            let res = match ev {
                Ok(ev) => self.handle_event(&ev).await,
                Err(err) => Err(Error::Connection(err)),
            };
            if let Err(err) = &res {
                self.observers.invoke_error(err);
            }
            res.context("Failed to reconcile workspace event").ok_or_log();
        }

        log::warn!("Window manager connection lost");
        self.observers.invoke_connection_lost();
    }

    /// Applies the one change implied by `ev` to the mirror.
    pub async fn handle_event(&mut self, ev: &WorkspaceEvent) -> Result<()> {
        log::debug!("Workspace event: {:?}", ev.change);
        match &ev.change {
            Change::Focus => self.on_focus(ev.current_name(), ev.old_name()),
            Change::Init => self.on_init().await,
            Change::Empty => self.on_empty().await,
            Change::Urgent => self.on_urgent().await,
            Change::Rename => self.on_rename().await,
            Change::Move => self.on_move().await,
            Change::Other(change) => {
                log::warn!("Unknown workspace event: {change}");
                Ok(())
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<WorkspaceReply>> {
        self.transport
            .fetch_workspaces()
            .await
            .map_err(Error::SnapshotFetch)
    }

    fn on_focus(&mut self, current: Option<&str>, old: Option<&str>) -> Result<()> {
        let current = current.ok_or_else(|| {
            Error::Inconsistency("focus event without a current workspace".into())
        })?;
        if !self.store.contains(current) {
            return Err(Error::Inconsistency(format!(
                "focused workspace `{current}` is not mirrored"
            )));
        }

        // Absent when leaving the scratchpad
        if let Some(blurred) = old.and_then(|old| self.store.find_by_name_mut(old)) {
            blurred.focused = false;
            self.observers.invoke(WorkspaceSignal::Blurred, blurred);
        }

        if let Some(focused) = self.store.find_by_name_mut(current) {
            focused.focused = true;
            self.observers.invoke(WorkspaceSignal::Focused, focused);
        }
        Ok(())
    }

    async fn on_init(&mut self) -> Result<()> {
        let replies = self.fetch().await?;

        let Some(reply) = replies.iter().find(|it| !self.store.contains(&it.name)) else {
            log::warn!("Got a workspace init event, but no new workspace was found");
            return Ok(());
        };

        let created = self.store.insert_sorted(Workspace::from(reply))?;
        self.observers.invoke(WorkspaceSignal::Created, created);
        Ok(())
    }

    async fn on_empty(&mut self) -> Result<()> {
        let replies = self.fetch().await?;

        let Some(name) = self
            .store
            .all()
            .iter()
            .find(|ws| {
                !replies
                    .iter()
                    .any(|it| compare_names(&it.name, &ws.name) == Ordering::Equal)
            })
            .map(|ws| ws.name.clone())
        else {
            log::debug!("Got a workspace empty event, but no workspace was removed");
            return Ok(());
        };

        let destroyed = self.store.remove_by_name(&name)?;
        self.observers.invoke(WorkspaceSignal::Destroyed, &destroyed);
        Ok(())
    }

    // Only the first changed flag is applied. If several flags changed
    // without an event each, the rest is picked up by the next urgent event.
    async fn on_urgent(&mut self) -> Result<()> {
        let replies = self.fetch().await?;

        for reply in &replies {
            let Some(ws) = self.store.find_by_name_mut(&reply.name) else {
                continue;
            };
            if ws.urgent != reply.urgent {
                ws.urgent = reply.urgent;
                self.observers.invoke(WorkspaceSignal::Urgent, ws);
                return Ok(());
            }
        }
        log::debug!("Got a workspace urgent event, but no urgency changed");
        Ok(())
    }

    // The old name disappears and the new one appears.
    async fn on_rename(&mut self) -> Result<()> {
        self.on_init().await?;
        self.on_empty().await
    }

    async fn on_move(&mut self) -> Result<()> {
        let replies = self.fetch().await?;

        let Some(reply) = replies.iter().find(|reply| {
            self.store
                .find_by_name(&reply.name)
                .is_some_and(|ws| ws.output != reply.output)
        }) else {
            log::debug!("Got a workspace move event, but no output changed");
            return Ok(());
        };

        let destroyed = self.store.remove_by_name(&reply.name)?;
        self.observers.invoke(WorkspaceSignal::Destroyed, &destroyed);
        drop(destroyed);

        let created = self.store.insert_sorted(Workspace::from(reply))?;
        self.observers.invoke(WorkspaceSignal::Created, created);
        Ok(())
    }
}

/// Asks the window manager to switch to the workspace called `name`.
pub async fn goto_name<T: Transport>(transport: &T, name: &str) -> Result<()> {
    let command = workspace_command(name);
    transport
        .run_command(&command)
        .await
        .map_err(|source| Error::Command { command, source })
}

fn workspace_command(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("workspace \"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_command_quotes_name() {
        assert_eq!(workspace_command("1"), r#"workspace "1""#);
        assert_eq!(workspace_command("2: web"), r#"workspace "2: web""#);
        assert_eq!(workspace_command(r#"a"b\c"#), r#"workspace "a\"b\\c""#);
    }
}
