use std::collections::BTreeMap;
use std::fmt;

use settler_ai_model::View;
use tracing::debug;

use crate::requests::{Action, GroupKind};

/// Stable handle of an action in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(u64);

impl ActionId {
    /// Raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created, never executed.
    New,
    /// Work was issued and the outcome is pending.
    Waiting,
    /// Rolled back.
    Undone,
    /// Failed once and gets one more attempt.
    Retry,
    /// Finished as requested.
    Success,
    /// Finished without the requested outcome.
    Failed,
    /// Cancelled before finishing.
    Aborted,
}

impl Status {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(
            self,
            Status::Success | Status::Failed | Status::Undone | Status::Aborted
        )
    }
}

/// Runs once when an action leaves the arena, with its final status.
pub type DeletionCallback = Box<dyn FnOnce(Status, &mut View)>;

pub(crate) struct Node {
    pub(crate) action: Action,
    pub(crate) status: Status,
    pub(crate) parent: Option<ActionId>,
    pub(crate) children: Vec<ActionId>,
    outstanding: usize,
    pub(crate) retired: bool,
    pub(crate) undone: bool,
    retried: bool,
    on_delete: Vec<DeletionCallback>,
}

/// Owns every live action and enforces the status rules.
#[derive(Default)]
pub(crate) struct Arena {
    nodes: BTreeMap<ActionId, Node>,
    next: u64,
}

impl Arena {
    pub(crate) fn insert(&mut self, action: Action, status: Status) -> ActionId {
        let id = ActionId(self.next);
        self.next += 1;
        let _ = self.nodes.insert(
            id,
            Node {
                action,
                status,
                parent: None,
                children: Vec::new(),
                outstanding: 0,
                retired: false,
                undone: false,
                retried: false,
                on_delete: Vec::new(),
            },
        );
        id
    }

    pub(crate) fn get(&self, id: ActionId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ActionId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: ActionId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn status(&self, id: ActionId) -> Option<Status> {
        self.nodes.get(&id).map(|node| node.status)
    }

    pub(crate) fn is_finished(&self, id: ActionId) -> bool {
        self.status(id).is_some_and(Status::is_finished)
    }

    pub(crate) fn children(&self, id: ActionId) -> Vec<ActionId> {
        self.nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub(crate) fn parent(&self, id: ActionId) -> Option<ActionId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub(crate) fn add_child(&mut self, parent: ActionId, child: ActionId) {
        let Some(node) = self.nodes.get_mut(&child) else {
            return;
        };
        debug_assert!(node.parent.is_none(), "action {child} already has a parent");
        debug_assert_eq!(node.status, Status::New);
        node.parent = Some(parent);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
            node.outstanding += 1;
        }
    }

    pub(crate) fn on_delete(&mut self, id: ActionId, callback: DeletionCallback) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.on_delete.push(callback);
        }
    }

    /// Moves an action to a new status.
    ///
    /// Success with children still running becomes Waiting. Failure spreads
    /// to every child. Terminal states never revert.
    pub(crate) fn set_status(&mut self, id: ActionId, status: Status) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.status == status {
            return;
        }
        let status = match status {
            Status::Success if node.outstanding > 0 => Status::Waiting,
            // One retry per action; the next failure is final.
            Status::Retry if node.retried => Status::Failed,
            status => status,
        };
        if status == Status::Retry {
            node.retried = true;
        }
        debug_assert_ne!(status, Status::New);
        let was_finished = node.status.is_finished();
        if was_finished && !status.is_finished() {
            return;
        }
        debug!(action = %id, from = ?node.status, to = ?status, "status changed");
        node.status = status;
        let parent = node.parent;
        let children = node.children.clone();

        if status == Status::Failed {
            for child in children {
                self.set_status(child, Status::Failed);
            }
        }
        if let Some(parent) = parent {
            if status.is_finished() {
                self.child_finished(parent, id, !was_finished);
            }
        }
    }

    fn child_finished(&mut self, parent: ActionId, child: ActionId, just_finished: bool) {
        let parent_kind = self.nodes.get(&parent).map(|node| &node.action);
        let absorbs_failure = matches!(
            parent_kind,
            Some(Action::Group(group)) if group.kind == GroupKind::Any
        );
        if absorbs_failure && self.status(child) == Some(Status::Failed) {
            self.set_status(child, Status::Aborted);
        }
        if self.status(child) == Some(Status::Failed) {
            self.set_status(parent, Status::Failed);
        }
        if !just_finished {
            return;
        }
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        debug_assert!(node.outstanding > 0, "action {parent} has no running children");
        node.outstanding = node.outstanding.saturating_sub(1);
        if node.outstanding == 0 && node.status == Status::Waiting {
            self.set_status(parent, Status::Success);
        }
    }

    /// Removes an action with all of its descendants and returns their
    /// deletion callbacks paired with the final statuses.
    pub(crate) fn remove_subtree(&mut self, id: ActionId) -> Vec<(Status, DeletionCallback)> {
        let mut callbacks = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(&current) else {
                continue;
            };
            stack.extend(node.children.iter().copied());
            let status = node.status;
            callbacks.extend(node.on_delete.into_iter().map(|callback| (status, callback)));
        }
        callbacks
    }

    pub(crate) fn depth(&self, id: ActionId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{DestroyRequest, GroupAction};
    use settler_ai_core::MapPoint;

    fn leaf(arena: &mut Arena) -> ActionId {
        arena.insert(
            Action::Destroy(DestroyRequest::new(MapPoint::new(1, 1))),
            Status::New,
        )
    }

    fn group(arena: &mut Arena, kind: GroupKind) -> ActionId {
        arena.insert(Action::Group(GroupAction::new(kind)), Status::New)
    }

    #[test]
    fn success_waits_for_children() {
        let mut arena = Arena::default();
        let parent = leaf(&mut arena);
        let child = leaf(&mut arena);
        arena.add_child(parent, child);

        arena.set_status(parent, Status::Success);
        assert_eq!(arena.status(parent), Some(Status::Waiting));

        arena.set_status(child, Status::Success);
        assert_eq!(
            arena.status(parent),
            Some(Status::Success),
            "the last finished child completes a waiting parent"
        );
    }

    #[test]
    fn second_retry_fails() {
        let mut arena = Arena::default();
        let id = leaf(&mut arena);

        arena.set_status(id, Status::Retry);
        assert_eq!(arena.status(id), Some(Status::Retry));
        arena.set_status(id, Status::Waiting);
        arena.set_status(id, Status::Retry);
        assert_eq!(arena.status(id), Some(Status::Failed));
    }

    #[test]
    fn failure_spreads_down_and_up() {
        let mut arena = Arena::default();
        let root = group(&mut arena, GroupKind::Execute);
        let first = leaf(&mut arena);
        let second = leaf(&mut arena);
        arena.add_child(root, first);
        arena.add_child(root, second);
        arena.set_status(root, Status::Waiting);

        arena.set_status(first, Status::Failed);

        assert_eq!(arena.status(root), Some(Status::Failed));
        assert_eq!(arena.status(second), Some(Status::Failed));
    }

    #[test]
    fn any_groups_turn_failed_children_into_aborted() {
        let mut arena = Arena::default();
        let root = group(&mut arena, GroupKind::Any);
        let first = leaf(&mut arena);
        let second = leaf(&mut arena);
        arena.add_child(root, first);
        arena.add_child(root, second);
        arena.set_status(root, Status::Waiting);

        arena.set_status(first, Status::Failed);

        assert_eq!(arena.status(first), Some(Status::Aborted));
        assert_eq!(arena.status(root), Some(Status::Waiting));
        assert_eq!(arena.status(second), Some(Status::New));
    }

    #[test]
    fn finished_actions_never_restart() {
        let mut arena = Arena::default();
        let action = leaf(&mut arena);
        arena.set_status(action, Status::Success);
        arena.set_status(action, Status::Waiting);
        arena.set_status(action, Status::Retry);
        assert_eq!(arena.status(action), Some(Status::Success));
    }

    #[test]
    fn removing_a_root_releases_the_subtree() {
        let mut arena = Arena::default();
        let root = leaf(&mut arena);
        let child = leaf(&mut arena);
        arena.add_child(root, child);
        arena.on_delete(child, Box::new(|_, _| {}));
        arena.on_delete(root, Box::new(|_, _| {}));
        arena.set_status(root, Status::Failed);

        let callbacks = arena.remove_subtree(root);

        assert_eq!(callbacks.len(), 2);
        assert!(callbacks.iter().all(|(status, _)| *status == Status::Failed));
        assert_eq!(arena.len(), 0);
        assert!(!arena.contains(child));
    }
}
