//! Sort order of workspaces.
//!
//! Names that start with a number are ordered by that number, highest first.
//! All other names are ordered reverse-lexicographically and come after every
//! numbered workspace.

use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkspaceKey<'a> {
    Numeric(i64),
    Named(&'a str),
}

/// Classifies a workspace name by its leading run of decimal digits.
///
/// `"3"` and `"3:web"` are both `Numeric(3)`. A name without leading digits,
/// or whose digits overflow an `i64`, is `Named`.
pub fn classify(name: &str) -> WorkspaceKey<'_> {
    let digits = name
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(name.len());

    if digits == 0 {
        return WorkspaceKey::Named(name);
    }

    match name[..digits].parse::<i64>() {
        Ok(num) => WorkspaceKey::Numeric(num),
        Err(_) => WorkspaceKey::Named(name),
    }
}

/// Total order over workspace names. `Ordering::Equal` only for equal names.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (classify(a), classify(b)) {
        (WorkspaceKey::Numeric(na), WorkspaceKey::Numeric(nb)) => {
            nb.cmp(&na).then_with(|| b.cmp(a))
        }
        (WorkspaceKey::Named(a), WorkspaceKey::Named(b)) => b.cmp(a),
        (WorkspaceKey::Numeric(_), WorkspaceKey::Named(_)) => Ordering::Less,
        (WorkspaceKey::Named(_), WorkspaceKey::Numeric(_)) => Ordering::Greater,
    }
}
