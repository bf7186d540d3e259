//! Structural-sharing updates for nested keyed maps
//!
//! Persistent selections are stored as maps of maps (`context -> provider ->
//! mode_set -> mode`, `context -> tag_set -> {tag}`, ...). Every level is an
//! `Arc`, so a snapshot can be copied by bumping reference counts.
//!
//! [`update_in`] rewrites a single leaf: each container on the path is copied
//! (one level, shallow), every sibling subtree is reused by pointer. When an
//! update leaves a container empty, the container is removed from its parent,
//! recursively, so the tree never accumulates empty maps or sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One level of a nested keyed structure
pub type SharedMap<V> = Arc<BTreeMap<String, V>>;

/// Leaf set (e.g. the active tags of one tag-set)
pub type SharedSet = Arc<BTreeSet<String>>;

/// A node of a nested keyed structure: either a leaf or a map of nodes
///
/// `update_path` takes the current node (`None` if absent) and returns the
/// replacement (`None` to delete it). Paths must be exactly as long as the
/// tree is deep; a path of the wrong length leaves the tree unchanged.
pub trait Node: Clone {
    type Leaf;

    fn update_path<F>(this: Option<&Self>, path: &[&str], f: F) -> Option<Self>
    where
        F: FnOnce(Option<&Self::Leaf>) -> Option<Self::Leaf>;

    fn get_path(&self, path: &[&str]) -> Option<&Self::Leaf>;
}

impl Node for String {
    type Leaf = String;

    fn update_path<F>(this: Option<&Self>, path: &[&str], f: F) -> Option<Self>
    where
        F: FnOnce(Option<&Self::Leaf>) -> Option<Self::Leaf>,
    {
        if !path.is_empty() {
            tracing::error!("path {:?} is deeper than the tree", path);
            return this.cloned();
        }
        f(this)
    }

    fn get_path(&self, path: &[&str]) -> Option<&Self::Leaf> {
        path.is_empty().then_some(self)
    }
}

impl Node for SharedSet {
    type Leaf = SharedSet;

    fn update_path<F>(this: Option<&Self>, path: &[&str], f: F) -> Option<Self>
    where
        F: FnOnce(Option<&Self::Leaf>) -> Option<Self::Leaf>,
    {
        if !path.is_empty() {
            tracing::error!("path {:?} is deeper than the tree", path);
            return this.cloned();
        }
        f(this).filter(|set| !set.is_empty())
    }

    fn get_path(&self, path: &[&str]) -> Option<&Self::Leaf> {
        path.is_empty().then_some(self)
    }
}

impl<T: Node> Node for SharedMap<T> {
    type Leaf = T::Leaf;

    fn update_path<F>(this: Option<&Self>, path: &[&str], f: F) -> Option<Self>
    where
        F: FnOnce(Option<&Self::Leaf>) -> Option<Self::Leaf>,
    {
        let Some((head, rest)) = path.split_first() else {
            tracing::error!("path ends at a map level; leaf update ignored");
            return this.cloned();
        };

        let child = this.and_then(|map| map.get(*head));
        let had_child = child.is_some();

        match T::update_path(child, rest, f) {
            Some(next_child) => {
                let mut level = this.map(|map| (**map).clone()).unwrap_or_default();
                level.insert((*head).to_string(), next_child);
                Some(Arc::new(level))
            }
            None if had_child => {
                let mut level = this.map(|map| (**map).clone()).unwrap_or_default();
                level.remove(*head);
                (!level.is_empty()).then(|| Arc::new(level))
            }
            // Nothing there and nothing to write: keep the container as is.
            None => this.cloned(),
        }
    }

    fn get_path(&self, path: &[&str]) -> Option<&Self::Leaf> {
        let (head, rest) = path.split_first()?;
        self.get(*head)?.get_path(rest)
    }
}

/// Rewrite the leaf at `path` with `f(current)`; `None` deletes it and prunes
/// any container the deletion empties. The root itself is never pruned.
pub fn update_in<T, F>(root: &SharedMap<T>, path: &[&str], f: F) -> SharedMap<T>
where
    T: Node,
    F: FnOnce(Option<&T::Leaf>) -> Option<T::Leaf>,
{
    SharedMap::<T>::update_path(Some(root), path, f).unwrap_or_default()
}

pub fn set_in<T: Node>(root: &SharedMap<T>, path: &[&str], leaf: T::Leaf) -> SharedMap<T> {
    update_in(root, path, move |_| Some(leaf))
}

pub fn remove_in<T: Node>(root: &SharedMap<T>, path: &[&str]) -> SharedMap<T> {
    update_in(root, path, |_| None)
}

pub fn get_in<'a, T: Node>(root: &'a SharedMap<T>, path: &[&str]) -> Option<&'a T::Leaf> {
    root.get_path(path)
}

/// Add `member` if absent, remove it if present. An emptied set becomes `None`.
pub fn toggle_member(set: Option<&SharedSet>, member: &str) -> Option<SharedSet> {
    let mut next = set.map(|s| (**s).clone()).unwrap_or_default();
    if !next.remove(member) {
        next.insert(member.to_string());
    }
    (!next.is_empty()).then(|| Arc::new(next))
}
