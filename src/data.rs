use std::{cmp::Ordering, sync::Arc};

use serde::Deserialize;

/// A workspace as reported by a `GET_WORKSPACES` reply.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WorkspaceReply {
    #[serde(default = "no_num")]
    pub num: i64,
    pub name: Arc<str>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub urgent: bool,
    pub output: Arc<str>,
}
fn no_num() -> i64 {
    -1
}

/// The local record of a mirrored workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    pub name: Arc<str>,
    /// Informational only, never used for ordering. `None` for named workspaces.
    pub num: Option<i64>,
    pub focused: bool,
    pub urgent: bool,
    pub output: Arc<str>,
}
impl Workspace {
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        crate::order::compare_names(&self.name, &other.name)
    }
}
impl From<&WorkspaceReply> for Workspace {
    fn from(reply: &WorkspaceReply) -> Self {
        let WorkspaceReply {
            num,
            name,
            focused,
            urgent,
            output,
        } = reply;
        Self {
            name: name.clone(),
            num: (*num >= 0).then_some(*num),
            focused: *focused,
            urgent: *urgent,
            output: output.clone(),
        }
    }
}

/// The `change` field of a workspace event.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(from = "String")]
pub enum Change {
    Focus,
    Init,
    Empty,
    Urgent,
    Rename,
    Move,
    Other(String),
}
impl From<String> for Change {
    fn from(value: String) -> Self {
        match value.as_str() {
            "focus" => Self::Focus,
            "init" => Self::Init,
            "empty" => Self::Empty,
            "urgent" => Self::Urgent,
            "rename" => Self::Rename,
            "move" => Self::Move,
            _ => Self::Other(value),
        }
    }
}

/// The part of an i3 container we care about.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Node {
    #[serde(default)]
    pub name: Option<Arc<str>>,
}

/// Payload of a `workspace` event. Carries no diff, only the kind of change.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WorkspaceEvent {
    pub change: Change,
    #[serde(default)]
    pub current: Option<Node>,
    #[serde(default)]
    pub old: Option<Node>,
}
impl WorkspaceEvent {
    pub fn new(change: Change) -> Self {
        Self {
            change,
            current: None,
            old: None,
        }
    }
    pub fn focus(current: &str, old: Option<&str>) -> Self {
        let node = |name: &str| Node {
            name: Some(name.into()),
        };
        Self {
            change: Change::Focus,
            current: Some(node(current)),
            old: old.map(node),
        }
    }
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref()?.name.as_deref()
    }
    pub fn old_name(&self) -> Option<&str> {
        self.old.as_ref()?.name.as_deref()
    }
}
