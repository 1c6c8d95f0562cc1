//! Tree traversal shared by both UI paradigms.
//!
//! Both walkers use explicit work-lists so deep trees never grow the call stack.

use std::collections::{HashMap, VecDeque};

pub type NodeId = usize;

pub const PATH_SEPARATOR: char = '/';

/// Hands out `#n` suffixes (n >= 2) for repeated paths. One counter spans a
/// whole inspection, so paths stay unique across paradigms as well as within
/// one tree.
#[derive(Debug, Default)]
pub struct PathCounter {
    seen: HashMap<String, usize>,
}

impl PathCounter {
    pub fn unique(&mut self, base: String) -> String {
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{base}#{count}")
        }
    }
}

/// A node reached by the depth-first walk, with its accumulated path and
/// whatever state the caller inherits down the tree.
#[derive(Debug, Clone)]
pub struct Visit<S> {
    pub id: NodeId,
    pub path: String,
    pub inherited: S,
}

/// Pre-order depth-first walk over every node under `roots`.
///
/// `inherit(id, parent_state)` computes the node's effective state from its
/// parent's. Named nodes append a path segment; unnamed nodes reuse their
/// parent's path. Repeated paths are suffixed through `paths`.
pub fn depth_first<'a, S, C, N, I>(
    roots: &[NodeId],
    paths: &mut PathCounter,
    children: C,
    name: N,
    inherit: I,
) -> Vec<Visit<S>>
where
    S: Clone,
    C: Fn(NodeId) -> &'a [NodeId],
    N: Fn(NodeId) -> Option<&'a str>,
    I: Fn(NodeId, Option<&S>) -> S,
{
    let mut out = Vec::new();
    // (node, parent path without suffix, parent state)
    let mut stack: Vec<(NodeId, String, Option<S>)> =
        roots.iter().rev().map(|&r| (r, String::new(), None)).collect();

    while let Some((id, parent_path, parent_state)) = stack.pop() {
        let base = match name(id).filter(|n| !n.is_empty()) {
            Some(segment) if parent_path.is_empty() => segment.to_string(),
            Some(segment) => format!("{parent_path}{PATH_SEPARATOR}{segment}"),
            None => parent_path,
        };
        let state = inherit(id, parent_state.as_ref());

        for &child in children(id).iter().rev() {
            stack.push((child, base.clone(), Some(state.clone())));
        }

        out.push(Visit {
            id,
            path: paths.unique(base),
            inherited: state,
        });
    }
    out
}

/// Trailing name segment of a path, without any `#n` suffix.
pub fn trailing_segment(path: &str) -> &str {
    let last = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path);
    match last.rsplit_once('#') {
        Some((name, n)) if !name.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => name,
        _ => last,
    }
}

/// First node, in breadth-first order across all roots, whose name equals `target`.
pub fn breadth_first_by_name<'a, C, N>(roots: &[NodeId], children: C, name: N, target: &str) -> Option<NodeId>
where
    C: Fn(NodeId) -> &'a [NodeId],
    N: Fn(NodeId) -> Option<&'a str>,
{
    if target.is_empty() {
        return None;
    }
    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if name(id) == Some(target) {
            return Some(id);
        }
        queue.extend(children(id).iter().copied());
    }
    None
}
