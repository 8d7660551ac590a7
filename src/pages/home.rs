use std::rc::Rc;

use async_trait::async_trait;
use leptos::prelude::*;

use crate::components::music_graph::{
	DataService, GraphDelta, HoverLink, MusicGraphCanvas, NodeDetails, Relation, ServiceError,
	WireNode,
};

/// Correlation key the demo graph is seeded from.
const SEED_MBID: &str = "mb-massive-attack";

/// Small embedded catalog standing in for the remote service. Every query
/// is answered by filtering this one graph.
const CATALOG: &str = r#"{
	"artists": [
		{"id": 1, "mbid": "mb-massive-attack", "name": "Massive Attack", "listeners": 2400000, "labels": ["Artist", "Group"]},
		{"id": 2, "mbid": "mb-portishead", "name": "Portishead", "listeners": 1900000, "labels": ["Artist", "Group"]},
		{"id": 3, "mbid": "mb-tricky", "name": "Tricky", "listeners": 820000, "labels": ["Artist"]},
		{"id": 4, "mbid": "mb-beth-gibbons", "name": "Beth Gibbons", "listeners": 310000, "labels": ["Artist"]},
		{"id": 5, "mbid": "mb-horace-andy", "name": "Horace Andy", "listeners": 270000, "labels": ["Artist"]},
		{"id": 6, "mbid": "mb-trip-hop", "name": "trip hop", "labels": ["Tag"]},
		{"id": 7, "mbid": "mb-downtempo", "name": "downtempo", "labels": ["Tag"]},
		{"id": 8, "mbid": "mb-electronic", "name": "electronic", "labels": ["Tag"]},
		{"id": 9, "mbid": "mb-mezzanine", "name": "Mezzanine", "listeners": 950000, "labels": ["Album"]},
		{"id": 10, "mbid": "mb-dummy", "name": "Dummy", "listeners": 870000, "labels": ["Album"]},
		{"id": 11, "mbid": "mb-teardrop", "name": "Teardrop", "listeners": 640000, "labels": ["Single"]},
		{"id": 12, "mbid": "mb-glory-box", "name": "Glory Box", "listeners": 410000, "labels": ["EP"]}
	],
	"relations": [
		{"source": 1, "target": 2, "weight": 0.86},
		{"source": 1, "target": 3, "weight": 0.74},
		{"source": 2, "target": 4, "weight": 0.93},
		{"source": 1, "target": 5, "weight": 0.52},
		{"source": 3, "target": 2, "weight": 0.41},
		{"source": 1, "target": 6, "weight": 0.97},
		{"source": 2, "target": 6, "weight": 0.95},
		{"source": 3, "target": 6, "weight": 0.88},
		{"source": 6, "target": 7, "weight": 0.71},
		{"source": 6, "target": 8, "weight": 0.64},
		{"source": 7, "target": 8, "weight": 0.58},
		{"source": 1, "target": 9, "weight": 0.9},
		{"source": 2, "target": 10, "weight": 0.9},
		{"source": 9, "target": 11, "weight": 0.8},
		{"source": 10, "target": 12, "weight": 0.77},
		{"source": 9, "target": 6, "weight": 0.81},
		{"source": 10, "target": 6, "weight": 0.79}
	]
}"#;

/// In-memory [`DataService`] over the embedded catalog.
pub struct DemoService {
	catalog: GraphDelta,
}

impl DemoService {
	pub fn from_catalog() -> Result<Self, ServiceError> {
		let catalog: GraphDelta = serde_json::from_str(CATALOG)?;
		Ok(DemoService { catalog })
	}

	fn find(&self, mbid: &str) -> Result<&WireNode, ServiceError> {
		self.catalog
			.new_nodes
			.iter()
			.find(|row| row.mbid == mbid)
			.ok_or_else(|| ServiceError::UnknownEntity(mbid.to_string()))
	}

	fn row(&self, id: u64) -> Option<&WireNode> {
		self.catalog.new_nodes.iter().find(|row| row.id == id)
	}

	/// The queried row plus every neighbor passing the label filter, with
	/// the relations connecting them.
	fn neighborhood(
		&self,
		mbid: &str,
		keep: impl Fn(&WireNode) -> bool,
	) -> Result<GraphDelta, ServiceError> {
		let center = self.find(mbid)?;
		let mut new_nodes = vec![center.clone()];
		let mut relations = Vec::new();
		for rel in &self.catalog.relations {
			let other = if rel.source == center.id {
				rel.target
			} else if rel.target == center.id {
				rel.source
			} else {
				continue;
			};
			let Some(row) = self.row(other) else {
				continue;
			};
			if !keep(row) {
				continue;
			}
			new_nodes.push(row.clone());
			relations.push(*rel);
		}
		Ok(GraphDelta {
			new_nodes,
			relations,
		})
	}
}

fn has_label(row: &WireNode, label: &str) -> bool {
	row.labels.iter().any(|l| l == label)
}

#[async_trait(?Send)]
impl DataService for DemoService {
	async fn get_related(&self, mbid: &str) -> Result<GraphDelta, ServiceError> {
		self.neighborhood(mbid, |row| {
			has_label(row, "Artist") || has_label(row, "Group")
		})
	}

	async fn get_group_members(&self, mbid: &str) -> Result<GraphDelta, ServiceError> {
		self.neighborhood(mbid, |row| {
			has_label(row, "Artist") && !has_label(row, "Group")
		})
	}

	async fn get_path(&self, from_mbid: &str, to_mbid: &str) -> Result<GraphDelta, ServiceError> {
		let from = self.find(from_mbid)?.clone();
		let to = self.find(to_mbid)?.clone();
		let relations = self
			.catalog
			.relations
			.iter()
			.filter(|rel| {
				(rel.source == from.id && rel.target == to.id)
					|| (rel.source == to.id && rel.target == from.id)
			})
			.copied()
			.collect::<Vec<Relation>>();
		Ok(GraphDelta {
			new_nodes: vec![from, to],
			relations,
		})
	}

	async fn get_artist_tags(&self, mbid: &str) -> Result<GraphDelta, ServiceError> {
		self.neighborhood(mbid, |row| has_label(row, "Tag"))
	}

	async fn get_release_details(&self, mbid: &str) -> Result<NodeDetails, ServiceError> {
		let node = self.find(mbid)?.clone();
		let relations = self
			.catalog
			.relations
			.iter()
			.filter(|rel| rel.source == node.id || rel.target == node.id)
			.copied()
			.collect();
		Ok(NodeDetails { node, relations })
	}

	async fn get_related_tags(&self, mbid: &str) -> Result<GraphDelta, ServiceError> {
		self.neighborhood(mbid, |row| has_label(row, "Tag"))
	}

	async fn get_related_by_tag(&self, mbid: &str) -> Result<GraphDelta, ServiceError> {
		self.neighborhood(mbid, |row| {
			has_label(row, "Artist") || has_label(row, "Group")
		})
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let service: Rc<dyn DataService> =
		Rc::new(DemoService::from_catalog().expect("embedded catalog parses"));
	let hover_links = RwSignal::new(Vec::<HoverLink>::new());

	view! {
		<div class="fullscreen-graph">
			<MusicGraphCanvas service=service seed_mbid=SEED_MBID hover_links=hover_links />
			<div class="graph-overlay">
				<h1>"Music Graph"</h1>
				<p class="subtitle">
					"Double-click or right-click a node for its menu. Drag nodes, scroll to zoom, hold Shift to pan."
				</p>
				<div class="hover-panel">
					<For
						each=move || hover_links.get()
						key=|row| row.other
						children=move |row: HoverLink| {
							view! {
								<div class="match-row">
									<span class="match-name">{row.other_name}</span>
									<span class="match-pct">{row.match_pct}</span>
								</div>
							}
						}
					/>
				</div>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn catalog_parses_and_answers_queries() {
		let service = DemoService::from_catalog().unwrap();

		let related = service
			.neighborhood(SEED_MBID, |row| {
				has_label(row, "Artist") || has_label(row, "Group")
			})
			.unwrap();
		assert!(related.new_nodes.iter().any(|r| r.mbid == SEED_MBID));
		assert!(related.new_nodes.len() > 1);
		assert!(
			related
				.new_nodes
				.iter()
				.all(|r| has_label(r, "Artist") || has_label(r, "Group"))
		);

		let tags = service
			.neighborhood(SEED_MBID, |row| has_label(row, "Tag"))
			.unwrap();
		assert!(
			tags.new_nodes[1..].iter().all(|r| has_label(r, "Tag")),
			"only tag neighbors expected"
		);

		let missing = service.find("mb-nope");
		assert!(matches!(missing, Err(ServiceError::UnknownEntity(_))));
	}
}
