use async_trait::async_trait;
use log::debug;
use thiserror::Error;

use super::types::{GraphDelta, Node, NodeDetails, NodeId, Relation};

/// Data-service failure. Never fatal to the graph: the caller logs it and
/// skips the merge.
#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("request failed: {0}")]
	Request(String),
	#[error("malformed payload: {0}")]
	Payload(#[from] serde_json::Error),
	#[error("unknown entity: {0}")]
	UnknownEntity(String),
}

/// Asynchronous query interface to the remote music-graph service, keyed
/// by entity correlation key (mbid). Each call resolves to a node/edge
/// delta for [`GraphModel`](super::model::GraphModel) to merge.
#[async_trait(?Send)]
pub trait DataService {
	async fn get_related(&self, mbid: &str) -> Result<GraphDelta, ServiceError>;
	async fn get_group_members(&self, mbid: &str) -> Result<GraphDelta, ServiceError>;
	async fn get_path(&self, from_mbid: &str, to_mbid: &str)
	-> Result<GraphDelta, ServiceError>;
	async fn get_artist_tags(&self, mbid: &str) -> Result<GraphDelta, ServiceError>;
	async fn get_release_details(&self, mbid: &str) -> Result<NodeDetails, ServiceError>;
	async fn get_related_tags(&self, mbid: &str) -> Result<GraphDelta, ServiceError>;
	async fn get_related_by_tag(&self, mbid: &str) -> Result<GraphDelta, ServiceError>;
}

/// A fetch the menu (or seed expansion) asked for, bound to the node that
/// triggered it. The result merges with that node as its anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchCommand {
	pub node: NodeId,
	pub kind: FetchKind,
}

/// Which service query to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
	Related { mbid: String },
	Members { mbid: String },
	Path { from_mbid: String, to_mbid: String },
	ArtistTags { mbid: String },
	ReleaseDetails { mbid: String },
	RelatedTags { mbid: String },
}

/// Validate wire rows into model nodes, dropping rows with no recognized
/// entity label.
pub fn materialize(delta: &GraphDelta) -> (Vec<Node>, Vec<Relation>) {
	let mut nodes = Vec::with_capacity(delta.new_nodes.len());
	for wire in &delta.new_nodes {
		match Node::from_wire(wire) {
			Some(node) => nodes.push(node),
			None => debug!("dropping row {} with labels {:?}", wire.id, wire.labels),
		}
	}
	(nodes, delta.relations.clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::music_graph::types::WireNode;

	fn wire(id: NodeId, labels: &[&str]) -> WireNode {
		WireNode {
			id,
			mbid: format!("mbid-{id}"),
			name: format!("row-{id}"),
			listeners: Some(1000),
			labels: labels.iter().map(|s| s.to_string()).collect(),
		}
	}

	#[test]
	fn materialize_drops_unlabeled_rows() {
		let delta = GraphDelta {
			new_nodes: vec![wire(1, &["Artist"]), wire(2, &[]), wire(3, &["Tag"])],
			relations: vec![Relation {
				source: 1,
				target: 3,
				weight: 0.5,
			}],
		};
		let (nodes, relations) = materialize(&delta);
		assert_eq!(
			nodes.iter().map(|n| n.id).collect::<Vec<_>>(),
			vec![1, 3]
		);
		assert_eq!(relations.len(), 1);
	}

	#[test]
	fn delta_parses_service_payload() {
		let delta: GraphDelta = serde_json::from_str(
			r#"{
				"artists": [
					{"id": 9, "mbid": "m-9", "name": "Nine", "listeners": 42, "labels": ["Artist"]}
				],
				"relations": [{"source": 9, "target": 9, "weight": 1.0}]
			}"#,
		)
		.unwrap();
		assert_eq!(delta.new_nodes.len(), 1);
		assert_eq!(delta.new_nodes[0].mbid, "m-9");
		assert_eq!(delta.relations.len(), 1);
	}
}
