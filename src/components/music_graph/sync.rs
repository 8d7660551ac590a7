use std::collections::HashSet;

use super::model::GraphModel;
use super::types::{EdgeKey, EntityType, Node, NodeId};

/// A positioned fragment of a fitted label, offset from the node center.
#[derive(Clone, Debug, PartialEq)]
pub struct SubLabel {
	pub text: String,
	pub dx: f64,
	pub dy: f64,
}

/// Pure label-fitting function injected by the embedder.
pub type FitLabel = fn(&str, &Node) -> Vec<SubLabel>;

/// Visual attributes of an edge element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVisual {
	pub weight: f64,
}

/// Visual attributes of a node marker element.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerVisual {
	pub radius: f64,
	pub entity_type: EntityType,
	pub expanded: bool,
}

/// Visual attributes of a label element.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelVisual {
	pub lines: Vec<SubLabel>,
}

/// Keyed enter/update/exit delta for one visual layer.
#[derive(Clone, Debug)]
pub struct SyncDelta<K, V> {
	pub enter: Vec<(K, V)>,
	pub update: Vec<(K, V)>,
	pub exit: Vec<K>,
}

impl<K, V> SyncDelta<K, V> {
	pub fn is_empty(&self) -> bool {
		self.enter.is_empty() && self.update.is_empty() && self.exit.is_empty()
	}
}

impl<K, V> Default for SyncDelta<K, V> {
	fn default() -> Self {
		SyncDelta {
			enter: Vec::new(),
			update: Vec::new(),
			exit: Vec::new(),
		}
	}
}

/// Rendering backend consuming layer deltas. Implementations keep their
/// elements keyed so persisting identities survive a sync untouched.
pub trait RenderBackend {
	fn sync_edges(&mut self, delta: SyncDelta<EdgeKey, EdgeVisual>);
	fn sync_markers(&mut self, delta: SyncDelta<NodeId, MarkerVisual>);
	fn sync_labels(&mut self, delta: SyncDelta<NodeId, LabelVisual>);
}

/// Reconciles the canonical collections to the three visual layers.
/// Tracks the key sets handed to the backend so each sync emits enters for
/// new identities, updates for persisting ones and exits for dropped ones.
pub struct RenderSync {
	edge_keys: HashSet<EdgeKey>,
	node_keys: HashSet<NodeId>,
}

impl RenderSync {
	pub fn new() -> Self {
		RenderSync {
			edge_keys: HashSet::new(),
			node_keys: HashSet::new(),
		}
	}

	pub fn sync(&mut self, model: &GraphModel, fit_label: FitLabel, backend: &mut dyn RenderBackend) {
		let mut edges = SyncDelta::default();
		let mut current_edges = HashSet::new();
		for link in model.links() {
			let key = link.key();
			current_edges.insert(key);
			let visual = EdgeVisual {
				weight: link.weight,
			};
			if self.edge_keys.contains(&key) {
				edges.update.push((key, visual));
			} else {
				edges.enter.push((key, visual));
			}
		}
		edges.exit = self
			.edge_keys
			.difference(&current_edges)
			.copied()
			.collect();
		self.edge_keys = current_edges;

		let mut markers = SyncDelta::default();
		let mut labels = SyncDelta::default();
		let mut current_nodes = HashSet::new();
		for node in model.nodes() {
			current_nodes.insert(node.id);
			let marker = MarkerVisual {
				radius: node.radius,
				entity_type: node.entity_type,
				expanded: model.is_expanded(node.id),
			};
			let label = LabelVisual {
				lines: fit_label(&node.name, node),
			};
			if self.node_keys.contains(&node.id) {
				markers.update.push((node.id, marker));
				labels.update.push((node.id, label));
			} else {
				markers.enter.push((node.id, marker));
				labels.enter.push((node.id, label));
			}
		}
		let gone: Vec<NodeId> = self
			.node_keys
			.difference(&current_nodes)
			.copied()
			.collect();
		markers.exit = gone.clone();
		labels.exit = gone;
		self.node_keys = current_nodes;

		backend.sync_edges(edges);
		backend.sync_markers(markers);
		backend.sync_labels(labels);
	}
}

impl Default for RenderSync {
	fn default() -> Self {
		Self::new()
	}
}

/// Default label fitting: break the name on whitespace into at most two
/// centered lines, folding overflow into the last line.
pub fn fit_label_default(text: &str, node: &Node) -> Vec<SubLabel> {
	const LINE_HEIGHT: f64 = 13.0;
	let words: Vec<&str> = text.split_whitespace().collect();
	let lines: Vec<String> = match words.len() {
		0 => Vec::new(),
		1 => vec![words[0].to_string()],
		_ => {
			let split = words.len().div_ceil(2);
			vec![words[..split].join(" "), words[split..].join(" ")]
		}
	};
	let base = node.radius + LINE_HEIGHT;
	lines
		.into_iter()
		.enumerate()
		.map(|(i, text)| SubLabel {
			text,
			dx: 0.0,
			dy: base + i as f64 * LINE_HEIGHT,
		})
		.collect()
}
