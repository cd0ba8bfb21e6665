//! Browsable tree of connections, catalogs, schemas, objects and columns.
//!
//! Nodes live in an arena and are addressed by index. The visible nodes form
//! one cyclic chain through `next` in depth-first order: expanding a node
//! splices its children in right after it, collapsing splices them out again.
//! Moving the selection is a walk along that chain.
//!
//! Children are fetched once, on a background thread, and kept when the
//! node is collapsed. [`ObjectTree::refresh`] forgets them.

mod populate;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::connection::{RedrawHook, Session};
use crate::metadata::ObjectType;
use populate::{ChildSpec, NodePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Connection,
    Catalog,
    Schema,
    Table,
    Function,
    Column,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Connection => "connection",
            NodeKind::Catalog => "catalog",
            NodeKind::Schema => "schema",
            NodeKind::Table => "table",
            NodeKind::Function => "function",
            NodeKind::Column => "column",
        };
        write!(f, "{label}")
    }
}

pub type NodeId = usize;

struct Node {
    kind: NodeKind,
    name: String,
    otype: String,
    level: usize,
    parent: Option<NodeId>,
    next: NodeId,
    /// `None` until fetched.
    children: Option<Vec<NodeId>>,
    expanded: bool,
    session: Arc<Session>,
}

/// What a renderer needs to draw one row.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub otype: String,
    pub level: usize,
    pub expanded: bool,
    pub selected: bool,
}

#[derive(Default)]
struct TreeState {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    selected: Option<NodeId>,
    expanding: HashSet<NodeId>,
    /// Slots released by refresh, reused before the arena grows.
    free: Vec<NodeId>,
}

impl TreeState {
    fn path(&self, id: NodeId) -> NodePath {
        let mut path = NodePath::default();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current];
            match node.kind {
                NodeKind::Catalog => path.catalog = node.name.clone(),
                NodeKind::Schema => path.schema = node.name.clone(),
                NodeKind::Table => {
                    path.object = node.name.clone();
                    path.object_type = Some(ObjectType::from_table_kind(&node.otype));
                }
                NodeKind::Function => {
                    path.object = node.name.clone();
                    path.object_type = Some(ObjectType::Function);
                }
                NodeKind::Connection | NodeKind::Column => {}
            }
            cursor = node.parent;
        }
        path
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn is_live(&self, id: NodeId) -> bool {
        id < self.nodes.len() && !self.free.contains(&id)
    }

    /// Create child nodes of `id` in chain order.
    fn attach(&mut self, id: NodeId, specs: Vec<ChildSpec>) {
        let level = self.nodes[id].level + 1;
        let session = Arc::clone(&self.nodes[id].session);
        let ids: Vec<NodeId> = specs
            .into_iter()
            .map(|spec| {
                self.alloc(Node {
                    kind: spec.kind,
                    name: spec.name,
                    otype: spec.otype,
                    level,
                    parent: Some(id),
                    next: id,
                    children: if spec.kind == NodeKind::Column { Some(Vec::new()) } else { None },
                    expanded: false,
                    session: Arc::clone(&session),
                })
            })
            .collect();
        for pair in ids.windows(2) {
            self.nodes[pair[0]].next = pair[1];
        }
        if let Some(&last) = ids.last() {
            self.nodes[last].next = last;
        }
        self.nodes[id].children = Some(ids);
    }

    /// Every node below `id` that was ever fetched, visible or not.
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.clone().unwrap_or_default();
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(children) = &self.nodes[current].children {
                stack.extend(children.iter().copied());
            }
        }
        out
    }

    /// Last node of the visible subtree rooted at `id`.
    fn last_visible(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let node = &self.nodes[current];
            match (&node.children, node.expanded) {
                (Some(children), true) if !children.is_empty() => {
                    current = children[children.len() - 1];
                }
                _ => return current,
            }
        }
    }

    fn splice_in(&mut self, id: NodeId) {
        let children = self.nodes[id].children.clone().unwrap_or_default();
        self.nodes[id].expanded = true;
        let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
            return;
        };
        let tail = self.last_visible(last);
        self.nodes[tail].next = self.nodes[id].next;
        self.nodes[id].next = first;
    }

    fn splice_out(&mut self, id: NodeId) {
        let level = self.nodes[id].level;
        let mut after = self.nodes[id].next;
        while after != id && self.nodes[after].level > level {
            after = self.nodes[after].next;
        }
        self.nodes[id].next = after;
        self.nodes[id].expanded = false;
    }

    fn has_visible_children(&self, id: NodeId) -> bool {
        let node = &self.nodes[id];
        node.expanded && node.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn visible(&self) -> Vec<NodeId> {
        let Some(&start) = self.roots.first() else {
            return Vec::new();
        };
        let mut out = vec![start];
        let mut current = self.nodes[start].next;
        while current != start && out.len() <= self.nodes.len() {
            out.push(current);
            current = self.nodes[current].next;
        }
        out
    }
}

/// The object browser.
#[derive(Clone)]
pub struct ObjectTree {
    state: Arc<Mutex<TreeState>>,
    redraw: Option<RedrawHook>,
}

impl fmt::Debug for ObjectTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTree")
            .field("nodes", &self.state.lock().unwrap().nodes.len())
            .finish_non_exhaustive()
    }
}

impl ObjectTree {
    /// One root per session, the first one selected.
    pub fn new(sessions: &[Arc<Session>]) -> Self {
        let mut state = TreeState::default();
        let count = sessions.len();
        for (i, session) in sessions.iter().enumerate() {
            state.nodes.push(Node {
                kind: NodeKind::Connection,
                name: session.dsn().to_string(),
                otype: "connection".to_string(),
                level: 0,
                parent: None,
                next: (i + 1) % count,
                children: None,
                expanded: false,
                session: Arc::clone(session),
            });
            state.roots.push(i);
        }
        state.selected = state.roots.first().copied();
        Self {
            state: Arc::new(Mutex::new(state)),
            redraw: None,
        }
    }

    pub fn with_redraw_hook(mut self, hook: RedrawHook) -> Self {
        self.redraw = Some(hook);
        self
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.state.lock().unwrap().selected
    }

    pub fn root(&self) -> Option<NodeId> {
        self.state.lock().unwrap().roots.first().copied()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeView> {
        let state = self.state.lock().unwrap();
        if !state.is_live(id) {
            return None;
        }
        let node = &state.nodes[id];
        Some(NodeView {
            id,
            kind: node.kind,
            name: node.name.clone(),
            otype: node.otype.clone(),
            level: node.level,
            expanded: node.expanded,
            selected: state.selected == Some(id),
        })
    }

    pub fn session_of(&self, id: NodeId) -> Option<Arc<Session>> {
        let state = self.state.lock().unwrap();
        state.nodes.get(id).map(|n| Arc::clone(&n.session))
    }

    /// Escaped `catalog.schema.object` name of an object node, with its type.
    pub fn qualified_name(&self, id: NodeId) -> Option<(String, ObjectType)> {
        let state = self.state.lock().unwrap();
        let node = state.nodes.get(id)?;
        if !matches!(node.kind, NodeKind::Table | NodeKind::Function) {
            return None;
        }
        let path = state.path(id);
        let name = [&path.catalog, &path.schema, &path.object]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(|part| node.session.escape_name(part))
            .collect::<Vec<_>>()
            .join(".");
        Some((name, path.object_type?))
    }

    /// Select the root node of `dsn`.
    pub fn select_connection(&self, dsn: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let found = state
            .roots
            .iter()
            .copied()
            .find(|&r| state.nodes[r].name.eq_ignore_ascii_case(dsn));
        if let Some(root) = found {
            state.selected = Some(root);
        }
        found.is_some()
    }

    pub fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.state.lock().unwrap().nodes.get(id).map(|n| n.next)
    }

    pub fn is_expanding(&self, id: NodeId) -> bool {
        self.state.lock().unwrap().expanding.contains(&id)
    }

    /// Visible nodes from the first root, in chain order.
    pub fn visible(&self) -> Vec<NodeView> {
        let state = self.state.lock().unwrap();
        state
            .visible()
            .into_iter()
            .map(|id| {
                let node = &state.nodes[id];
                NodeView {
                    id,
                    kind: node.kind,
                    name: node.name.clone(),
                    otype: node.otype.clone(),
                    level: node.level,
                    expanded: node.expanded,
                    selected: state.selected == Some(id),
                }
            })
            .collect()
    }

    pub fn select_next(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(current) = state.selected {
            state.selected = Some(state.nodes[current].next);
        }
    }

    pub fn select_previous(&self) {
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.selected else {
            return;
        };
        let Some(start) = state.nodes[current].parent.or(state.roots.first().copied()) else {
            return;
        };
        let mut probe = start;
        for _ in 0..=state.nodes.len() {
            if state.nodes[probe].next == current {
                state.selected = Some(probe);
                return;
            }
            probe = state.nodes[probe].next;
        }
        warn!("selected node {current} is not on the visible chain");
    }

    /// Expand `id`.
    ///
    /// Cached children are spliced in at once. Otherwise they are fetched on
    /// a background thread whose handle is returned; they appear when it
    /// finishes. Nothing happens for expanded or leaf nodes, nodes already
    /// being fetched, or disconnected sessions.
    pub fn expand(&self, id: NodeId) -> Option<JoinHandle<()>> {
        let (session, kind, path) = {
            let mut state = self.state.lock().unwrap();
            let node = state.nodes.get(id)?;
            if node.expanded || node.kind == NodeKind::Column || state.expanding.contains(&id) {
                return None;
            }
            if node.children.is_some() {
                state.splice_in(id);
                return None;
            }
            if !node.session.is_connected() {
                debug!("not expanding {}: session disconnected", node.name);
                return None;
            }
            let session = Arc::clone(&node.session);
            let kind = node.kind;
            state.expanding.insert(id);
            (session, kind, state.path(id))
        };

        let state = Arc::clone(&self.state);
        let redraw = self.redraw.clone();
        let spawned = thread::Builder::new()
            .name("sqlnav-expand".to_string())
            .spawn(move || {
                let specs = populate::children(&session, kind, &path);
                debug!("expanded {kind} into {} children", specs.len());
                {
                    let mut state = state.lock().unwrap();
                    state.expanding.remove(&id);
                    state.attach(id, specs);
                    state.splice_in(id);
                }
                if let Some(redraw) = redraw {
                    redraw();
                }
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("could not start expand worker: {e}");
                self.state.lock().unwrap().expanding.remove(&id);
                None
            }
        }
    }

    /// Expand and wait for the children.
    pub fn expand_blocking(&self, id: NodeId) {
        if let Some(handle) = self.expand(id) {
            let _ = handle.join();
        }
    }

    pub fn expand_selected(&self) -> Option<JoinHandle<()>> {
        let selected = self.selected()?;
        self.expand(selected)
    }

    /// Collapse the selected node, or step out to its parent when it shows
    /// no children.
    pub fn collapse(&self) {
        let mut state = self.state.lock().unwrap();
        let Some(mut current) = state.selected else {
            return;
        };
        loop {
            if state.has_visible_children(current) {
                state.splice_out(current);
                return;
            }
            state.nodes[current].expanded = false;
            match state.nodes[current].parent {
                Some(parent) => {
                    state.selected = Some(parent);
                    current = parent;
                }
                None => return,
            }
        }
    }

    /// Forget the selected node's children so the next expand fetches again.
    pub fn refresh(&self) {
        let mut state = self.state.lock().unwrap();
        let Some(current) = state.selected else {
            return;
        };
        if state.has_visible_children(current) {
            state.splice_out(current);
        }
        let released = state.descendants(current);
        state.nodes[current].expanded = false;
        state.nodes[current].children = None;
        // A node still being fetched is written to when its worker ends.
        let reusable: Vec<NodeId> = released
            .into_iter()
            .filter(|id| !state.expanding.contains(id))
            .collect();
        debug!("refresh released {} nodes", reusable.len());
        state.free.extend(reusable);
    }
}
