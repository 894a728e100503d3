use std::fmt;

use crate::error::TreeError;

/// Handle to a node stored in a [`Tree`].
///
/// Handles are only meaningful for the tree that issued them; passing a
/// foreign handle panics on out-of-range access like slice indexing does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Ordered multi-way tree stored as an arena.
///
/// Nodes are allocated detached and linked afterwards. Every link is checked:
/// a node can have a single parent and can never become its own descendant,
/// so the arena always holds a forest of proper trees. Several roots may
/// coexist while a tree is being assembled bottom-up.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree { slots: Vec::new() }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocates a detached node with no children.
    pub fn leaf(&mut self, value: T) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            value,
            children: Vec::new(),
            parent: None,
        });
        id
    }

    /// Allocates a node and attaches `children` to it in order.
    pub fn node(&mut self, value: T, children: &[NodeId]) -> Result<NodeId, TreeError> {
        self.check_children(None, children)?;
        let id = self.leaf(value);
        self.link_all(id, children);
        Ok(id)
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.slots[id.0].value
    }

    /// Replaces the value of `id`, returning the old one.
    pub fn set_value(&mut self, id: NodeId, value: T) -> T {
        std::mem::replace(&mut self.slots[id.0].value, value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// True if `node` is `root` or lies anywhere below it.
    pub fn contains(&self, root: NodeId, node: NodeId) -> bool {
        let mut pending = vec![root];
        while let Some(current) = pending.pop() {
            if current == node {
                return true;
            }
            pending.extend_from_slice(self.children(current));
        }
        false
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_children(Some(parent), &[child])?;
        self.link(parent, child, None);
        Ok(())
    }

    /// Attaches `child` so that it ends up at position `index` among the
    /// children of `parent`. `index` may equal the current child count.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        let len = self.child_count(parent);
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        self.check_children(Some(parent), &[child])?;
        self.link(parent, child, Some(index));
        Ok(())
    }

    /// Appends every node of `children`, or none of them if any is rejected.
    pub fn add_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), TreeError> {
        self.check_children(Some(parent), children)?;
        self.link_all(parent, children);
        Ok(())
    }

    /// Detaches the child at `index` and returns it as a new root.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let children = &mut self.slots[parent.0].children;
        if index >= children.len() {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: children.len(),
            });
        }
        let child = children.remove(index);
        self.slots[child.0].parent = None;
        Ok(child)
    }

    /// Borrowed view of the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> SubTree<'_, T> {
        SubTree { tree: self, id }
    }

    /// Converts every value, keeping the shape and the node handles.
    pub fn map<U, F>(&self, mut f: F) -> Tree<U>
    where
        F: FnMut(&T) -> U,
    {
        Tree {
            slots: self
                .slots
                .iter()
                .map(|slot| Slot {
                    value: f(&slot.value),
                    children: slot.children.clone(),
                    parent: slot.parent,
                })
                .collect(),
        }
    }

    fn check_children(&self, parent: Option<NodeId>, children: &[NodeId]) -> Result<(), TreeError> {
        for (i, &child) in children.iter().enumerate() {
            if let Some(parent) = parent {
                if self.contains(child, parent) {
                    return Err(TreeError::Cycle {
                        parent: parent.0,
                        child: child.0,
                    });
                }
            }
            if self.slots[child.0].parent.is_some() || children[..i].contains(&child) {
                return Err(TreeError::AlreadyAttached(child.0));
            }
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, at: Option<usize>) {
        let siblings = &mut self.slots[parent.0].children;
        match at {
            Some(index) => siblings.insert(index, child),
            None => siblings.push(child),
        }
        self.slots[child.0].parent = Some(parent);
    }

    fn link_all(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.link(parent, child, None);
        }
    }
}

impl Tree<String> {
    /// Builds a tree from a description such as `"+(a, *(b c))"`.
    ///
    /// A value may be followed by a parenthesised list of children separated
    /// by spaces or commas. Returns the tree together with its root.
    pub fn parse(description: &str) -> Result<(Tree<String>, NodeId), TreeError> {
        let words = split_description(description);
        let mut pos = 0;
        let mut tree = Tree::new();
        let root = match parse_described(&words, &mut pos, &mut tree)? {
            Some(root) => root,
            None => return Err(TreeError::Description("empty description".into())),
        };
        if pos < words.len() {
            return Err(TreeError::Description(format!(
                "leftover input: {}",
                words[pos..].join(" ")
            )));
        }
        Ok((tree, root))
    }
}

fn split_description(description: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in description.chars() {
        if ch == '(' || ch == ')' || ch == ',' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            if ch == '(' || ch == ')' {
                words.push(ch.to_string());
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Returns `None` at a closing parenthesis or at end of input. A child list
/// must be closed before the input ends.
fn parse_described(
    words: &[String],
    pos: &mut usize,
    tree: &mut Tree<String>,
) -> Result<Option<NodeId>, TreeError> {
    let Some(word) = words.get(*pos) else {
        return Ok(None);
    };
    *pos += 1;
    match word.as_str() {
        "(" => Err(TreeError::Description(format!(
            "unexpected `(` before {}",
            words[*pos..].join(" ")
        ))),
        ")" => Ok(None),
        _ => {
            let mut children = Vec::new();
            if words.get(*pos).map(String::as_str) == Some("(") {
                *pos += 1;
                loop {
                    if *pos == words.len() {
                        return Err(TreeError::Description("unclosed '('".into()));
                    }
                    match parse_described(words, pos, tree)? {
                        Some(child) => children.push(child),
                        None => break,
                    }
                }
            }
            tree.node(word.clone(), &children).map(Some)
        }
    }
}

/// A node of a [`Tree`] viewed together with everything below it.
///
/// Equality is structural: equal values and pairwise equal children in order,
/// regardless of which arena or which handles are involved.
pub struct SubTree<'a, T> {
    tree: &'a Tree<T>,
    id: NodeId,
}

impl<T> Clone for SubTree<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SubTree<'_, T> {}

impl<'a, T> SubTree<'a, T> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn value(&self) -> &'a T {
        self.tree.value(self.id)
    }

    pub fn children(&self) -> impl Iterator<Item = SubTree<'a, T>> + use<'a, T> {
        let tree = self.tree;
        tree.children(self.id)
            .iter()
            .map(move |&id| SubTree { tree, id })
    }

    /// Single-line form in the syntax accepted by [`Tree::parse`].
    pub fn describe(&self) -> String
    where
        T: fmt::Display,
    {
        let mut out = self.value().to_string();
        if !self.tree.is_leaf(self.id) {
            let children: Vec<String> = self.children().map(|c| c.describe()).collect();
            out.push('(');
            out.push_str(&children.join(" "));
            out.push(')');
        }
        out
    }

    fn write_preorder(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result
    where
        T: fmt::Display,
    {
        writeln!(f, "{}", self.value())?;
        for child in self.children() {
            write!(f, "{:width$}", "", width = level * 2)?;
            child.write_preorder(f, level + 1)?;
        }
        Ok(())
    }
}

impl<T: PartialEq> PartialEq for SubTree<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
            && self.tree.child_count(self.id) == other.tree.child_count(other.id)
            && self.children().zip(other.children()).all(|(a, b)| a == b)
    }
}

impl<T: fmt::Debug> fmt::Debug for SubTree<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value())?;
        if !self.tree.is_leaf(self.id) {
            let mut list = f.debug_list();
            list.entries(self.children());
            list.finish()?;
        }
        Ok(())
    }
}

/// One node per line in pre-order, children indented two spaces per level.
impl<T: fmt::Display> fmt::Display for SubTree<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_preorder(f, 1)
    }
}
