//! Activity detection: which interactions count as "the user is working".
//!
//! Only interactions with something that navigates or has a click handler
//! count. Scrolling, selecting text or clicking blank space does not keep the
//! session alive.

use std::time::Duration;

use keepalive_protocol::RuntimeMessage;
use tokio::time::Instant;

use crate::config::WatchdogConfig;

/// DOM events a page binding should forward to [`ActivityDetector::on_pointer`].
pub const POINTER_EVENTS: [&str; 5] = ["mousedown", "pointerdown", "click", "touchstart", "touchend"];

/// Minimal view of a DOM node needed by the actionable-element walk.
pub trait ElementNode: Sized {
	/// `false` for text, comment and document nodes.
	fn is_element(&self) -> bool;

	/// Raw `href` attribute, if present.
	fn href(&self) -> Option<&str>;

	/// Whether an `onclick` property or attribute is set.
	fn has_click_handler(&self) -> bool;

	/// Parent element; `None` at the document.
	fn parent(&self) -> Option<Self>;
}

fn has_navigation(node: &impl ElementNode) -> bool {
	node.is_element()
		&& node.href().is_some_and(|href| {
			let href = href.trim();
			!href.is_empty() && href != "#"
		})
}

/// Returns `true` when `start` or one of its ancestors is actionable.
///
/// At most `max_hops` nodes are inspected, `start` included.
pub fn is_actionable<N: ElementNode>(start: N, max_hops: usize) -> bool {
	let mut node = Some(start);
	let mut hops = 0;
	while let Some(current) = node {
		if hops >= max_hops {
			break;
		}
		if has_navigation(&current) || (current.is_element() && current.has_click_handler()) {
			return true;
		}
		node = current.parent();
		hops += 1;
	}
	false
}

/// Turns qualifying interactions into throttled `activity_ping` messages.
#[derive(Debug, Clone)]
pub struct ActivityDetector {
	throttle: Duration,
	max_hops: usize,
	last_ping: Option<Instant>,
}

impl ActivityDetector {
	pub fn new(config: &WatchdogConfig) -> Self {
		Self {
			throttle: config.activity_throttle(),
			max_hops: config.actionable_max_hops,
			last_ping: None,
		}
	}

	/// Pointer-like event (see [`POINTER_EVENTS`]) on `target`.
	pub fn on_pointer<N: ElementNode>(&mut self, target: N, now: Instant) -> Option<RuntimeMessage> {
		if is_actionable(target, self.max_hops) { self.ping(now) } else { None }
	}

	/// Keydown while `focused` has focus. Only activation keys count.
	pub fn on_key<N: ElementNode>(&mut self, key: &str, focused: N, now: Instant) -> Option<RuntimeMessage> {
		if !matches!(key, "Enter" | " " | "Spacebar") {
			return None;
		}
		if is_actionable(focused, self.max_hops) { self.ping(now) } else { None }
	}

	fn ping(&mut self, now: Instant) -> Option<RuntimeMessage> {
		if let Some(last) = self.last_ping {
			if now.saturating_duration_since(last) < self.throttle {
				return None;
			}
		}
		self.last_ping = Some(now);
		Some(RuntimeMessage::ActivityPing)
	}
}

/// Index of a node inside an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct NodeData {
	element: bool,
	href: Option<String>,
	onclick: bool,
	parent: Option<NodeId>,
}

/// Arena-backed element tree, for bindings that snapshot the DOM path of an event.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
	nodes: Vec<NodeData>,
}

impl ElementTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a plain element under `parent`.
	pub fn element(&mut self, parent: Option<NodeId>) -> NodeId {
		self.push(NodeData {
			element: true,
			parent,
			..Default::default()
		})
	}

	/// Adds an element carrying an `href` attribute.
	pub fn link(&mut self, parent: Option<NodeId>, href: &str) -> NodeId {
		self.push(NodeData {
			element: true,
			href: Some(href.to_string()),
			parent,
			..Default::default()
		})
	}

	/// Adds an element with a click handler.
	pub fn clickable(&mut self, parent: Option<NodeId>) -> NodeId {
		self.push(NodeData {
			element: true,
			onclick: true,
			parent,
			..Default::default()
		})
	}

	/// Adds a text node.
	pub fn text(&mut self, parent: Option<NodeId>) -> NodeId {
		self.push(NodeData {
			parent,
			..Default::default()
		})
	}

	pub fn get(&self, id: NodeId) -> ElementRef<'_> {
		ElementRef { tree: self, id }
	}

	fn push(&mut self, node: NodeData) -> NodeId {
		self.nodes.push(node);
		NodeId(self.nodes.len() - 1)
	}
}

/// Borrowed handle to a node of an [`ElementTree`].
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
	tree: &'a ElementTree,
	id: NodeId,
}

impl ElementRef<'_> {
	fn data(&self) -> &NodeData {
		&self.tree.nodes[self.id.0]
	}
}

impl ElementNode for ElementRef<'_> {
	fn is_element(&self) -> bool {
		self.data().element
	}

	fn href(&self) -> Option<&str> {
		self.data().href.as_deref()
	}

	fn has_click_handler(&self) -> bool {
		self.data().onclick
	}

	fn parent(&self) -> Option<Self> {
		self.data().parent.map(|id| ElementRef { tree: self.tree, id })
	}
}
