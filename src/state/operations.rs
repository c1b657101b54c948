//! State mutation application.

use crate::error::{Result, SyncError};
use crate::types::{entity_id, OperationKind, Path};
use crate::value::StateValue;
use std::sync::Arc;

/// A change to apply to a store's state.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Replace the whole state.
    ReplaceRoot(StateValue),

    /// Append to the sequence at `path`, creating it if absent.
    Append { path: Path, value: StateValue },

    /// Overwrite the value at `path`, creating the slot if absent.
    Update { path: Path, value: StateValue },

    /// Remove the entity (numeric final segment) or property at `path`.
    Delete { path: Path },
}

impl Mutation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Mutation::ReplaceRoot(_) => OperationKind::Replace,
            Mutation::Append { .. } => OperationKind::Append,
            Mutation::Update { .. } => OperationKind::Update,
            Mutation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Mutation::ReplaceRoot(_) => None,
            Mutation::Append { path, .. }
            | Mutation::Update { path, .. }
            | Mutation::Delete { path } => Some(path),
        }
    }
}

/// Apply a mutation to a state value.
///
/// The input is never modified. When the mutation has no effect the returned
/// value is a clone of `state` and therefore [`StateValue::same_ref`] to it.
/// Shape mismatches are reported as [`SyncError::ShapeMismatch`]; no partial
/// result escapes.
pub fn apply_mutation(state: &StateValue, mutation: &Mutation) -> Result<StateValue> {
    match mutation {
        Mutation::ReplaceRoot(value) => Ok(value.clone()),
        Mutation::Append { path, value } => append(state, path, value),
        Mutation::Update { path, value } => update(state, path, value),
        Mutation::Delete { path } => delete(state, path),
    }
}

fn append(state: &StateValue, path: &Path, item: &StateValue) -> Result<StateValue> {
    let mut root = state.clone();
    match path.split_leaf() {
        None => push_onto(&mut root, item, path)?,
        Some((ancestors, leaf)) => {
            let parent = walk_mut(&mut root, ancestors, path)?;
            push_onto(child_slot(parent, leaf, path)?, item, path)?;
        }
    }
    Ok(root)
}

fn update(state: &StateValue, path: &Path, value: &StateValue) -> Result<StateValue> {
    let (ancestors, leaf) = match path.split_leaf() {
        Some(split) => split,
        None => return Ok(value.clone()),
    };

    let mut root = state.clone();
    let parent = walk_mut(&mut root, ancestors, path)?;
    *child_slot(parent, leaf, path)? = value.clone();
    Ok(root)
}

fn delete(state: &StateValue, path: &Path) -> Result<StateValue> {
    let (ancestors, leaf) = match path.split_leaf() {
        Some(split) => split,
        None => return Ok(StateValue::empty_object()),
    };

    // Nothing to delete below a missing ancestor.
    let parent = match state.pointer(ancestors) {
        Some(parent) if !parent.is_null() => parent,
        _ => return Ok(state.clone()),
    };

    match entity_id(leaf) {
        Some(id) => {
            let items = parent
                .as_array()
                .ok_or_else(|| SyncError::shape(&path.to_string(), "array", parent.kind()))?;
            if !items.iter().any(|item| has_id(item, id)) {
                return Ok(state.clone());
            }

            let mut root = state.clone();
            if let StateValue::Array(items) = walk_mut(&mut root, ancestors, path)? {
                Arc::make_mut(items).retain(|item| !has_id(item, id));
            }
            Ok(root)
        }
        None => {
            let map = parent
                .as_object()
                .ok_or_else(|| SyncError::shape(&path.to_string(), "object", parent.kind()))?;
            if !map.contains_key(leaf) {
                return Ok(state.clone());
            }

            let mut root = state.clone();
            if let StateValue::Object(map) = walk_mut(&mut root, ancestors, path)? {
                Arc::make_mut(map).remove(leaf);
            }
            Ok(root)
        }
    }
}

/// Walk `segments` from `root`, copying each container on the way and
/// turning missing or null nodes into empty objects.
fn walk_mut<'a>(
    root: &'a mut StateValue,
    segments: &[String],
    path: &Path,
) -> Result<&'a mut StateValue> {
    let mut cursor = root;
    for segment in segments {
        cursor = child_slot(vivify(cursor), segment, path)?;
    }
    Ok(vivify(cursor))
}

fn vivify(node: &mut StateValue) -> &mut StateValue {
    if node.is_null() {
        *node = StateValue::empty_object();
    }
    node
}

/// Mutable slot for `segment` inside `node`. Missing object keys are inserted
/// as null; array segments must be in-bounds indices.
fn child_slot<'a>(
    node: &'a mut StateValue,
    segment: &str,
    path: &Path,
) -> Result<&'a mut StateValue> {
    match node {
        StateValue::Object(map) => Ok(Arc::make_mut(map).entry(segment.to_string()).or_default()),
        StateValue::Array(items) => match segment.parse::<usize>() {
            Ok(index) if index < items.len() => Ok(&mut Arc::make_mut(items)[index]),
            _ => Err(SyncError::shape(
                &path.to_string(),
                "index within array",
                "invalid index",
            )),
        },
        other => Err(SyncError::shape(&path.to_string(), "object", other.kind())),
    }
}

fn push_onto(node: &mut StateValue, item: &StateValue, path: &Path) -> Result<()> {
    if node.is_null() {
        *node = StateValue::from(vec![item.clone()]);
        return Ok(());
    }
    match node {
        StateValue::Array(items) => {
            Arc::make_mut(items).push(item.clone());
            Ok(())
        }
        other => Err(SyncError::shape(&path.to_string(), "array", other.kind())),
    }
}

fn has_id(item: &StateValue, id: i64) -> bool {
    match item.as_object().and_then(|map| map.get("id")) {
        Some(StateValue::Number(n)) => match n.as_i64() {
            Some(value) => value == id,
            // u64 beyond i64 range never matches; floats compare numerically.
            None => n.as_u64().is_none() && n.as_f64() == Some(id as f64),
        },
        _ => false,
    }
}
