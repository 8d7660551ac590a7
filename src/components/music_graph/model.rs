use std::collections::{HashMap, HashSet};

use log::debug;

use super::types::{Edge, Node, NodeId, Relation};

/// Delay before the origin node is released from its center pin.
pub const ORIGIN_UNPIN_MS: f64 = 500.0;
/// Delay before an expansion anchor is released from its transient pin.
pub const ANCHOR_UNPIN_MS: f64 = 600.0;

/// Result of [`GraphModel::add_nodes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
	/// The single candidate was already resident; only selection state
	/// should change.
	Reselected(NodeId),
	/// Structural merge happened (possibly empty after filtering).
	Merged {
		nodes_added: usize,
		links_added: usize,
	},
}

#[derive(Clone, Copy, Debug)]
struct Unpin {
	at_ms: f64,
	node: NodeId,
}

/// Canonical node/edge store with incremental merge, adjacency caches and
/// cascading removal.
pub struct GraphModel {
	nodes: Vec<Node>,
	index: HashMap<NodeId, usize>,
	links: Vec<Edge>,
	expanded: HashSet<NodeId>,
	origin: Option<NodeId>,
	unpins: Vec<Unpin>,
	clock_ms: f64,
	width: f64,
	height: f64,
}

impl GraphModel {
	pub fn new(width: f64, height: f64) -> Self {
		GraphModel {
			nodes: Vec::new(),
			index: HashMap::new(),
			links: Vec::new(),
			expanded: HashSet::new(),
			origin: None,
			unpins: Vec::new(),
			clock_ms: 0.0,
			width,
			height,
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.index.contains_key(&id)
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.index.get(&id).map(|&i| &self.nodes[i])
	}

	pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.index.get(&id).map(|&i| &mut self.nodes[i])
	}

	pub fn index_of(&self, id: NodeId) -> Option<usize> {
		self.index.get(&id).copied()
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn links(&self) -> &[Edge] {
		&self.links
	}

	/// Mutable node slice for the simulation step.
	pub fn nodes_mut(&mut self) -> &mut [Node] {
		&mut self.nodes
	}

	pub fn expanded_count(&self) -> usize {
		self.expanded.len()
	}

	pub fn is_expanded(&self, id: NodeId) -> bool {
		self.expanded.contains(&id)
	}

	pub fn origin_id(&self) -> Option<NodeId> {
		self.origin
	}

	pub fn clock_ms(&self) -> f64 {
		self.clock_ms
	}

	/// Merge a batch of candidate nodes and relations into the graph.
	///
	/// A single candidate whose id is already resident short-circuits to
	/// [`MergeOutcome::Reselected`] with no structural mutation. Otherwise
	/// new nodes are seeded at the anchor node named by `origin_id` (or at
	/// the viewport center when no such node is resident), relations with a
	/// non-resident endpoint are dropped, and reciprocal duplicates are
	/// suppressed.
	pub fn add_nodes(
		&mut self,
		new_nodes: Vec<Node>,
		relations: &[Relation],
		origin_id: Option<NodeId>,
	) -> MergeOutcome {
		if let [single] = new_nodes.as_slice() {
			if self.contains(single.id) {
				return MergeOutcome::Reselected(single.id);
			}
		}

		let mut nodes_added = 0;
		for mut node in new_nodes {
			if self.contains(node.id) {
				continue;
			}
			let seed = origin_id
				.and_then(|id| self.node(id))
				.map(|anchor| (anchor.x, anchor.y))
				.unwrap_or_else(|| self.center());
			let (jx, jy) = seed_jitter(self.nodes.len());
			node.x = seed.0 + jx;
			node.y = seed.1 + jy;
			node.vx = 0.0;
			node.vy = 0.0;
			self.index.insert(node.id, self.nodes.len());
			self.nodes.push(node);
			nodes_added += 1;
		}

		if let Some(anchor) = origin_id.filter(|&id| self.contains(id)) {
			if self.origin.is_none() {
				self.init_origin(anchor);
			} else if nodes_added > 0 {
				self.pin_in_place(anchor);
				self.schedule_unpin(anchor, ANCHOR_UNPIN_MS);
			}
			self.mark_expanded(anchor);
		}

		let mut links_added = 0;
		for rel in relations {
			if rel.source == rel.target {
				continue;
			}
			let (Some(&si), Some(&ti)) =
				(self.index.get(&rel.source), self.index.get(&rel.target))
			else {
				continue;
			};
			// Skip if this direction, or its reciprocal, is already cached.
			if self.nodes[si].source_links.contains(&rel.target)
				|| self.nodes[si].target_links.contains(&rel.target)
			{
				continue;
			}
			self.nodes[si].source_links.insert(rel.target);
			self.nodes[ti].target_links.insert(rel.source);
			self.links.push(Edge {
				source: rel.source,
				target: rel.target,
				weight: rel.weight,
			});
			links_added += 1;
		}

		debug!("merge: +{nodes_added} nodes, +{links_added} links");
		MergeOutcome::Merged {
			nodes_added,
			links_added,
		}
	}

	/// Remove the given ids plus, one level deep, each id's direct
	/// `source_links` children. Returns the full removed set so callers can
	/// clear any references of their own.
	pub fn remove_nodes(&mut self, ids: &[NodeId]) -> HashSet<NodeId> {
		let mut doomed = HashSet::new();
		for &id in ids {
			if let Some(node) = self.node(id) {
				doomed.extend(node.source_links.iter().copied());
				doomed.insert(id);
			}
		}
		if doomed.is_empty() {
			return doomed;
		}

		for node in &mut self.nodes {
			if doomed.contains(&node.id) {
				continue;
			}
			node.source_links.retain(|id| !doomed.contains(id));
			node.target_links.retain(|id| !doomed.contains(id));
		}
		self.links
			.retain(|l| !doomed.contains(&l.source) && !doomed.contains(&l.target));
		self.nodes.retain(|n| !doomed.contains(&n.id));
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id, i))
			.collect();
		for id in &doomed {
			self.expanded.remove(id);
		}
		self.unpins.retain(|u| !doomed.contains(&u.node));

		debug!("removed {} nodes", doomed.len());
		doomed
	}

	/// Advance the model clock and release any pins whose deadline passed.
	/// Deadlines for ids no longer resident are no-ops.
	pub fn advance(&mut self, dt_ms: f64) {
		self.clock_ms += dt_ms;
		let now = self.clock_ms;
		let mut due = Vec::new();
		self.unpins.retain(|u| {
			if u.at_ms <= now {
				due.push(u.node);
				false
			} else {
				true
			}
		});
		for id in due {
			if let Some(node) = self.node_mut(id) {
				node.pinned = None;
			}
		}
	}

	/// Pin a node at its current position.
	pub fn pin_in_place(&mut self, id: NodeId) {
		if let Some(node) = self.node_mut(id) {
			node.pinned = Some((node.x, node.y));
		}
	}

	/// Pin a node at an explicit position, moving it there.
	pub fn pin_at(&mut self, id: NodeId, x: f64, y: f64) {
		if let Some(node) = self.node_mut(id) {
			node.x = x;
			node.y = y;
			node.pinned = Some((x, y));
		}
	}

	/// Release a pin immediately, dropping any scheduled release with it.
	pub fn unpin(&mut self, id: NodeId) {
		self.cancel_unpin(id);
		if let Some(node) = self.node_mut(id) {
			node.pinned = None;
		}
	}

	/// Schedule a pin release; a later call for the same id replaces the
	/// earlier deadline. Non-resident ids are ignored.
	pub fn schedule_unpin(&mut self, id: NodeId, delay_ms: f64) {
		if !self.contains(id) {
			return;
		}
		self.unpins.retain(|u| u.node != id);
		self.unpins.push(Unpin {
			at_ms: self.clock_ms + delay_ms,
			node: id,
		});
	}

	pub fn cancel_unpin(&mut self, id: NodeId) {
		self.unpins.retain(|u| u.node != id);
	}

	pub fn set_hovered(&mut self, id: NodeId, hovered: bool) {
		if let Some(node) = self.node_mut(id) {
			node.hovered = hovered;
		}
	}

	pub fn set_menu_open(&mut self, id: NodeId, open: bool) {
		if let Some(node) = self.node_mut(id) {
			node.menu_open = open;
		}
	}

	fn mark_expanded(&mut self, id: NodeId) {
		self.expanded.insert(id);
		if let Some(node) = self.node_mut(id) {
			node.expanded = true;
		}
	}

	fn init_origin(&mut self, id: NodeId) {
		let (cx, cy) = self.center();
		if let Some(node) = self.node_mut(id) {
			node.x = cx;
			node.y = cy;
			node.pinned = Some((cx, cy));
		}
		self.origin = Some(id);
		self.schedule_unpin(id, ORIGIN_UNPIN_MS);
	}
}

/// Small deterministic offset so batch-seeded nodes never start coincident.
fn seed_jitter(seed: usize) -> (f64, f64) {
	let r = ((seed + 1) * 9301 + 49297) % 233280;
	let t = (r as f64) / 233280.0 * std::f64::consts::TAU;
	(3.0 * t.cos(), 3.0 * t.sin())
}

#[cfg(test)]
pub(crate) mod test_support {
	use std::collections::HashSet;

	use super::super::types::{EntityType, Node, Relation};

	pub fn node(id: u64, entity_type: EntityType) -> Node {
		Node {
			id,
			mbid: format!("mbid-{id}"),
			name: format!("node-{id}"),
			entity_type,
			listeners: None,
			x: 0.0,
			y: 0.0,
			vx: 0.0,
			vy: 0.0,
			pinned: None,
			radius: 35.0,
			source_links: HashSet::new(),
			target_links: HashSet::new(),
			expanded: false,
			hovered: false,
			menu_open: false,
		}
	}

	pub fn artist(id: u64) -> Node {
		node(id, EntityType::Artist)
	}

	pub fn rel(source: u64, target: u64, weight: f64) -> Relation {
		Relation {
			source,
			target,
			weight,
		}
	}
}
