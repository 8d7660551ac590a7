use std::collections::HashSet;

use serde::Deserialize;

/// Stable node identifier assigned by the data service.
pub type NodeId = u64;

/// Edge identity: (source id, target id).
pub type EdgeKey = (NodeId, NodeId);

/// Kind of music entity behind a node, derived from the labels the data
/// service attaches to each row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
	Artist,
	Group,
	Tag,
	Album,
	Ep,
	Single,
}

impl EntityType {
	/// More specific labels win: `Tag` and `Group` rows also carry `Artist`.
	pub fn from_labels(labels: &[String]) -> Option<Self> {
		let has = |l: &str| labels.iter().any(|x| x == l);
		if has("Tag") {
			Some(Self::Tag)
		} else if has("Group") {
			Some(Self::Group)
		} else if has("Album") {
			Some(Self::Album)
		} else if has("EP") {
			Some(Self::Ep)
		} else if has("Single") {
			Some(Self::Single)
		} else if has("Artist") {
			Some(Self::Artist)
		} else {
			None
		}
	}

	/// Artist and Group nodes are the ones click-focus applies to.
	pub fn is_focusable(self) -> bool {
		matches!(self, Self::Artist | Self::Group)
	}

	/// Albums, EPs and singles share the release menu.
	pub fn is_release(self) -> bool {
		matches!(self, Self::Album | Self::Ep | Self::Single)
	}
}

/// One row of a data-service response.
#[derive(Clone, Debug, Deserialize)]
pub struct WireNode {
	pub id: NodeId,
	pub mbid: String,
	pub name: String,
	#[serde(default)]
	pub listeners: Option<u64>,
	#[serde(default)]
	pub labels: Vec<String>,
}

/// Weighted directed relation between two node ids.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Relation {
	pub source: NodeId,
	pub target: NodeId,
	pub weight: f64,
}

/// Node/edge delta resolved by the multi-node data-service queries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphDelta {
	#[serde(alias = "artists")]
	pub new_nodes: Vec<WireNode>,
	#[serde(default)]
	pub relations: Vec<Relation>,
}

/// Single-node query result; converted into a [`GraphDelta`] before merging.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeDetails {
	pub node: WireNode,
	#[serde(default)]
	pub relations: Vec<Relation>,
}

impl From<NodeDetails> for GraphDelta {
	fn from(details: NodeDetails) -> Self {
		GraphDelta {
			new_nodes: vec![details.node],
			relations: details.relations,
		}
	}
}

/// A graph vertex with its adjacency caches and transient view flags.
#[derive(Clone, Debug)]
pub struct Node {
	pub id: NodeId,
	pub mbid: String,
	pub name: String,
	pub entity_type: EntityType,
	pub listeners: Option<u64>,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Fixed position while pinned; the simulation reasserts it each step.
	pub pinned: Option<(f64, f64)>,
	pub radius: f64,
	/// Ids this node links out to.
	pub source_links: HashSet<NodeId>,
	/// Ids linking into this node.
	pub target_links: HashSet<NodeId>,
	pub expanded: bool,
	pub hovered: bool,
	pub menu_open: bool,
}

impl Node {
	/// Validates a wire row into a node; rows with no recognized entity
	/// label yield `None` and are dropped by the caller.
	pub fn from_wire(wire: &WireNode) -> Option<Self> {
		let entity_type = EntityType::from_labels(&wire.labels)?;
		Some(Node {
			id: wire.id,
			mbid: wire.mbid.clone(),
			name: wire.name.clone(),
			entity_type,
			listeners: wire.listeners,
			x: 0.0,
			y: 0.0,
			vx: 0.0,
			vy: 0.0,
			pinned: None,
			radius: derived_radius(wire.listeners),
			source_links: HashSet::new(),
			target_links: HashSet::new(),
			expanded: false,
			hovered: false,
			menu_open: false,
		})
	}
}

/// A stored edge. At most one directional record exists per unordered pair.
#[derive(Clone, Debug)]
pub struct Edge {
	pub source: NodeId,
	pub target: NodeId,
	/// Match strength in [0, 1].
	pub weight: f64,
}

impl Edge {
	pub fn key(&self) -> EdgeKey {
		(self.source, self.target)
	}

	pub fn touches(&self, id: NodeId) -> bool {
		self.source == id || self.target == id
	}
}

/// Marker radius grows slowly with the popularity metric.
pub fn derived_radius(listeners: Option<u64>) -> f64 {
	match listeners {
		Some(n) => (24.0 + 2.2 * ((n as f64) + 1.0).log10()).min(48.0),
		None => 35.0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn labels(ls: &[&str]) -> Vec<String> {
		ls.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn specific_labels_win_over_artist() {
		assert_eq!(
			EntityType::from_labels(&labels(&["Artist", "Group"])),
			Some(EntityType::Group)
		);
		assert_eq!(
			EntityType::from_labels(&labels(&["Artist", "Tag"])),
			Some(EntityType::Tag)
		);
		assert_eq!(
			EntityType::from_labels(&labels(&["Artist"])),
			Some(EntityType::Artist)
		);
	}

	#[test]
	fn unknown_labels_yield_none() {
		assert_eq!(EntityType::from_labels(&labels(&["Playlist"])), None);
		assert_eq!(EntityType::from_labels(&[]), None);
	}

	#[test]
	fn radius_is_monotone_and_clamped() {
		let small = derived_radius(Some(100));
		let big = derived_radius(Some(10_000_000));
		assert!(small < big);
		assert!(big <= 48.0);
		assert_eq!(derived_radius(None), 35.0);
	}
}
