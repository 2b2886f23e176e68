use std::cmp::Ordering;

use crate::data::Workspace;
use crate::error::{Error, Result};
use crate::order::compare_names;

/// Workspaces kept sorted by [`compare_names`], unique by name.
#[derive(Debug, Default, Clone)]
pub struct MirrorStore {
    workspaces: Vec<Workspace>,
}
impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from an unordered set of workspaces. Later duplicates are dropped.
    pub fn from_unsorted(workspaces: impl IntoIterator<Item = Workspace>) -> Self {
        let mut store = Self::new();
        for ws in workspaces {
            if let Err(err) = store.insert_sorted(ws) {
                log::warn!("{err}");
            }
        }
        store
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.workspaces
            .iter()
            .position(|ws| compare_names(&ws.name, name) == Ordering::Equal)
    }

    pub fn insert_sorted(&mut self, ws: Workspace) -> Result<&Workspace> {
        if self.contains(&ws.name) {
            return Err(Error::DuplicateWorkspace(ws.name));
        }
        let idx = self
            .workspaces
            .partition_point(|other| other.cmp_order(&ws) == Ordering::Less);
        self.workspaces.insert(idx, ws);
        Ok(&self.workspaces[idx])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Workspace> {
        self.position(name).map(|idx| &self.workspaces[idx])
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Workspace> {
        self.position(name).map(|idx| &mut self.workspaces[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<Workspace> {
        match self.position(name) {
            Some(idx) => Ok(self.workspaces.remove(idx)),
            None => Err(Error::MissingWorkspace(name.into())),
        }
    }

    pub fn all(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}
