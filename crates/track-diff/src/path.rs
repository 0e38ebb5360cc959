//! Get/set/remove by [`FieldPath`] over a snapshot.
//!
//! Missing segments are errors (`PathError::NotFound`); nothing here creates
//! intermediate structure. Array segments must be decimal indices.

use serde_json::Value;
use track_types::{FieldPath, PathError, Snapshot};

/// Value at `path`. Fails when any segment, including the last, is absent.
pub fn get<'a>(root: &'a Snapshot, path: &FieldPath) -> Result<&'a Value, PathError> {
    path.validate()?;
    let (first, rest) = path.tokens().split_first().ok_or(PathError::Empty)?;
    let mut current = root.get(first).ok_or_else(|| not_found(path, first))?;
    for token in rest {
        current = child(current, token, path)?;
    }
    Ok(current)
}

/// Assign `value` at `path`, returning the value it replaced.
///
/// On arrays, an index equal to the length appends and a larger index pads
/// with nulls.
pub fn set(root: &mut Snapshot, path: &FieldPath, value: Value) -> Result<Option<Value>, PathError> {
    let (parent, last) = parent_mut(root, path)?;
    match parent {
        Parent::Root(map) => Ok(map.insert(last.to_string(), value)),
        Parent::Nested(Value::Object(map)) => Ok(map.insert(last.to_string(), value)),
        Parent::Nested(Value::Array(items)) => {
            let index = parse_index(last, path)?;
            if let Some(slot) = items.get_mut(index) {
                return Ok(Some(std::mem::replace(slot, value)));
            }
            items.resize(index, Value::Null);
            items.push(value);
            Ok(None)
        }
        Parent::Nested(_) => Err(not_found(path, last)),
    }
}

/// Remove the value at `path`. A missing final segment is not an error.
pub fn remove(root: &mut Snapshot, path: &FieldPath) -> Result<Option<Value>, PathError> {
    let (parent, last) = parent_mut(root, path)?;
    match parent {
        Parent::Root(map) => Ok(map.remove(last)),
        Parent::Nested(Value::Object(map)) => Ok(map.remove(last)),
        Parent::Nested(Value::Array(items)) => {
            let index = parse_index(last, path)?;
            Ok((index < items.len()).then(|| items.remove(index)))
        }
        Parent::Nested(_) => Err(not_found(path, last)),
    }
}

enum Parent<'a> {
    Root(&'a mut Snapshot),
    Nested(&'a mut Value),
}

/// Container holding the last segment of `path`, plus that segment.
fn parent_mut<'a, 'p>(
    root: &'a mut Snapshot,
    path: &'p FieldPath,
) -> Result<(Parent<'a>, &'p str), PathError> {
    path.validate()?;
    let (last, parents) = path.tokens().split_last().ok_or(PathError::Empty)?;
    let Some((first, middle)) = parents.split_first() else {
        return Ok((Parent::Root(root), last));
    };
    let mut current = root.get_mut(first).ok_or_else(|| not_found(path, first))?;
    for token in middle {
        current = child_mut(current, token, path)?;
    }
    Ok((Parent::Nested(current), last))
}

fn child<'a>(value: &'a Value, token: &str, path: &FieldPath) -> Result<&'a Value, PathError> {
    match value {
        Value::Object(map) => map.get(token).ok_or_else(|| not_found(path, token)),
        Value::Array(items) => {
            let index = parse_index(token, path)?;
            items.get(index).ok_or_else(|| not_found(path, token))
        }
        _ => Err(not_found(path, token)),
    }
}

fn child_mut<'a>(
    value: &'a mut Value,
    token: &str,
    path: &FieldPath,
) -> Result<&'a mut Value, PathError> {
    match value {
        Value::Object(map) => map.get_mut(token).ok_or_else(|| not_found(path, token)),
        Value::Array(items) => {
            let index = parse_index(token, path)?;
            items.get_mut(index).ok_or_else(|| not_found(path, token))
        }
        _ => Err(not_found(path, token)),
    }
}

fn parse_index(token: &str, path: &FieldPath) -> Result<usize, PathError> {
    token.parse::<usize>().map_err(|_| PathError::InvalidIndex {
        path: path.to_string(),
        token: token.to_string(),
    })
}

fn not_found(path: &FieldPath, segment: &str) -> PathError {
    PathError::NotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}
