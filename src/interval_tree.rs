//! Augmented AVL tree of half-open intervals.
//!
//! Entries are ordered by `(interval.start, interval.end, payload)` and every
//! node caches the largest `end` in its subtree. An overlap query skips any
//! subtree whose cached end is at or before the query start, and stops walking
//! right once node starts reach the query end, giving `O(log n + k)` lookups.
//!
//! The tree is a pure index: it stores overlapping entries without complaint.
//! Conflict rules belong to the caller.

use std::cmp::Ordering;

use crate::model::{Interval, Secs};

type Link<P> = Option<Box<Node<P>>>;

#[derive(Debug, Clone)]
struct Node<P> {
    interval: Interval,
    payload: P,
    max_end: Secs,
    height: u32,
    left: Link<P>,
    right: Link<P>,
}

impl<P: Ord> Node<P> {
    fn leaf(interval: Interval, payload: P) -> Box<Self> {
        Box::new(Self {
            interval,
            payload,
            max_end: interval.end,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn cmp_key(&self, interval: &Interval, payload: &P) -> Ordering {
        interval
            .cmp(&self.interval)
            .then_with(|| payload.cmp(&self.payload))
    }

    /// Recompute height and max_end from the children.
    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        let mut max_end = self.interval.end;
        if let Some(l) = &self.left {
            max_end = max_end.max(l.max_end);
        }
        if let Some(r) = &self.right {
            max_end = max_end.max(r.max_end);
        }
        self.max_end = max_end;
    }

    fn balance_factor(&self) -> i64 {
        height(&self.left) as i64 - height(&self.right) as i64
    }
}

fn height<P>(link: &Link<P>) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

fn rotate_right<P: Ord>(mut node: Box<Node<P>>) -> Box<Node<P>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update();
    pivot.right = Some(node);
    pivot.update();
    pivot
}

fn rotate_left<P: Ord>(mut node: Box<Node<P>>) -> Box<Node<P>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update();
    pivot.left = Some(node);
    pivot.update();
    pivot
}

fn rebalance<P: Ord>(mut node: Box<Node<P>>) -> Box<Node<P>> {
    node.update();
    let bf = node.balance_factor();
    if bf > 1 {
        if node.left.as_ref().is_some_and(|l| l.balance_factor() < 0) {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if bf < -1 {
        if node.right.as_ref().is_some_and(|r| r.balance_factor() > 0) {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn insert_node<P: Ord>(link: Link<P>, interval: Interval, payload: P) -> Box<Node<P>> {
    let Some(mut node) = link else {
        return Node::leaf(interval, payload);
    };
    // Equal keys go right so duplicates keep insertion order.
    if node.cmp_key(&interval, &payload) == Ordering::Less {
        node.left = Some(insert_node(node.left.take(), interval, payload));
    } else {
        node.right = Some(insert_node(node.right.take(), interval, payload));
    }
    rebalance(node)
}

/// Detach the leftmost node of a subtree. Returns `(rest, min)`.
fn take_min<P: Ord>(mut node: Box<Node<P>>) -> (Link<P>, Box<Node<P>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove_node<P: Ord>(
    link: Link<P>,
    interval: &Interval,
    payload: &P,
    removed: &mut Option<P>,
) -> Link<P> {
    let mut node = link?;
    match node.cmp_key(interval, payload) {
        Ordering::Less => {
            node.left = remove_node(node.left.take(), interval, payload, removed);
        }
        Ordering::Greater => {
            node.right = remove_node(node.right.take(), interval, payload, removed);
        }
        Ordering::Equal => {
            let left = node.left.take();
            let right = node.right.take();
            let replacement = match (left, right) {
                (None, None) => None,
                (Some(l), None) => Some(l),
                (None, Some(r)) => Some(r),
                (Some(l), Some(r)) => {
                    let (rest, mut successor) = take_min(r);
                    successor.left = Some(l);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
            *removed = Some(node.payload);
            return replacement;
        }
    }
    Some(rebalance(node))
}

fn collect_overlaps<'a, P>(link: &'a Link<P>, query: &Interval, out: &mut Vec<(Interval, &'a P)>) {
    let Some(node) = link else { return };
    if node.max_end <= query.start {
        return;
    }
    collect_overlaps(&node.left, query, out);
    if node.interval.overlaps(query) {
        out.push((node.interval, &node.payload));
    }
    // Right subtree starts no earlier than this node.
    if node.interval.start < query.end {
        collect_overlaps(&node.right, query, out);
    }
}

/// Interval index for a single resource.
#[derive(Debug, Clone)]
pub struct IntervalTree<P> {
    root: Link<P>,
    len: usize,
}

impl<P> Default for IntervalTree<P> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<P: Ord> IntervalTree<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert unconditionally. Overlapping and duplicate entries are allowed.
    pub fn insert(&mut self, interval: Interval, payload: P) {
        self.root = Some(insert_node(self.root.take(), interval, payload));
        self.len += 1;
    }

    /// Remove one entry equal to `(interval, payload)`. Returns the stored
    /// payload, or `None` when no such entry exists.
    pub fn remove(&mut self, interval: &Interval, payload: &P) -> Option<P> {
        let mut removed = None;
        self.root = remove_node(self.root.take(), interval, payload, &mut removed);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Every entry overlapping `query`, in key order.
    pub fn query_overlaps(&self, query: &Interval) -> Vec<(Interval, &P)> {
        let mut out = Vec::new();
        collect_overlaps(&self.root, query, &mut out);
        out
    }

    /// First overlapping entry found on a single root-to-leaf walk.
    pub fn find_overlap(&self, query: &Interval) -> Option<(Interval, &P)> {
        let mut cur = &self.root;
        while let Some(node) = cur {
            if node.interval.overlaps(query) {
                return Some((node.interval, &node.payload));
            }
            // If the left subtree reaches past query.start and still holds no
            // overlap, its latest-ending entry starts at or after query.end,
            // and so does everything to the right.
            cur = match &node.left {
                Some(l) if l.max_end > query.start => &node.left,
                _ => &node.right,
            };
        }
        None
    }

    pub fn any_overlap(&self, query: &Interval) -> bool {
        self.find_overlap(query).is_some()
    }

    /// In-order iterator over all entries.
    pub fn iter(&self) -> Iter<'_, P> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(&self.root);
        iter
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    #[cfg(test)]
    fn height(&self) -> u32 {
        height(&self.root)
    }
}

pub struct Iter<'a, P> {
    stack: Vec<&'a Node<P>>,
}

impl<'a, P> Iter<'a, P> {
    fn push_left(&mut self, mut link: &'a Link<P>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, P> Iterator for Iter<'a, P> {
    type Item = (Interval, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        Some((node.interval, &node.payload))
    }
}

impl<'a, P: Ord> IntoIterator for &'a IntervalTree<P> {
    type Item = (Interval, &'a P);
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
