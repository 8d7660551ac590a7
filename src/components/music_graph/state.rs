use log::{debug, info};

use super::interaction::{HoverLink, InteractionController};
use super::layout::LayoutEngine;
use super::menu::{ContextMenu, MenuAction};
use super::model::{GraphModel, MergeOutcome};
use super::service::{FetchCommand, FetchKind, materialize};
use super::sync::{FitLabel, RenderBackend, RenderSync};
use super::types::{GraphDelta, NodeId};

/// The single owner of the graph subsystems. Event closures and fetch
/// completions all route through here, one callback at a time.
pub struct MusicGraphState {
	pub model: GraphModel,
	pub layout: LayoutEngine,
	pub menu: ContextMenu,
	pub interaction: InteractionController,
	sync: RenderSync,
	commands: Vec<FetchCommand>,
	dirty: bool,
}

impl MusicGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		MusicGraphState {
			model: GraphModel::new(width, height),
			layout: LayoutEngine::new(width, height),
			menu: ContextMenu::new(),
			interaction: InteractionController::new(),
			sync: RenderSync::new(),
			commands: Vec::new(),
			dirty: false,
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.model.resize(width, height);
		self.layout.resize(width, height);
	}

	/// One frame: advance pin deadlines, then step the simulation.
	pub fn tick(&mut self, dt_ms: f64) {
		self.model.advance(dt_ms);
		self.layout.step(self.model.nodes_mut());
	}

	/// Push pending structural changes to the rendering backend.
	pub fn flush_sync(&mut self, fit_label: FitLabel, backend: &mut dyn RenderBackend) {
		if self.dirty {
			self.sync.sync(&self.model, fit_label, backend);
			self.dirty = false;
		}
	}

	pub fn needs_sync(&self) -> bool {
		self.dirty
	}

	/// Fetches queued by menu invocations, for the embedder to dispatch.
	pub fn take_commands(&mut self) -> Vec<FetchCommand> {
		std::mem::take(&mut self.commands)
	}

	pub fn hover_links(&self) -> &[HoverLink] {
		self.interaction.hover_links()
	}

	/// Primary button press. While a menu is open this either invokes the
	/// wedge under the pointer or plainly dismisses; otherwise it grabs a
	/// node for dragging or starts a view pan.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let (gx, gy) = self.interaction.transform.screen_to_graph(sx, sy);
		if self.menu.is_open() {
			if let Some((node, action)) = self.menu.invoke_at(&mut self.model, gx, gy) {
				self.run_action(node, action);
			} else {
				self.menu.dismiss(&mut self.model);
			}
			return;
		}
		match self.interaction.node_at(&self.model, gx, gy) {
			Some(id) if !self.interaction.pan_mode() => {
				self.interaction.begin_drag(&mut self.model, id, gx, gy);
				self.layout.begin_drag();
			}
			_ => self.interaction.begin_pan(sx, sy),
		}
	}

	/// Pointer motion: drag, pan or hover. Returns true when the hover
	/// target changed (the side panel wants to know).
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> bool {
		let (gx, gy) = self.interaction.transform.screen_to_graph(sx, sy);
		if self.interaction.dragging().is_some() {
			self.interaction.drag_to(&mut self.model, gx, gy);
			false
		} else if self.interaction.panning() {
			self.interaction.pan_to(sx, sy);
			false
		} else {
			let target = self.interaction.node_at(&self.model, gx, gy);
			self.interaction.hover(&mut self.model, target)
		}
	}

	pub fn pointer_up(&mut self) {
		if self.interaction.dragging().is_some() {
			self.interaction.end_drag(&mut self.model, self.menu.open_on());
			self.layout.end_drag();
		}
		self.interaction.end_pan();
	}

	/// Click after a press/release pair that did not drag: toggle focus on
	/// Artist/Group nodes. Visual resync only, no layout reseed.
	pub fn click(&mut self, sx: f64, sy: f64) {
		if self.interaction.take_drag_moved() {
			return;
		}
		let (gx, gy) = self.interaction.transform.screen_to_graph(sx, sy);
		if let Some(id) = self.interaction.node_at(&self.model, gx, gy) {
			if self.interaction.click(&self.model, id) {
				self.dirty = true;
			}
		}
	}

	/// Secondary action (double-click / right-click): dismiss an open menu
	/// first; only a later secondary action may open the next one.
	pub fn secondary(&mut self, sx: f64, sy: f64) {
		if self.menu.is_open() {
			self.menu.dismiss(&mut self.model);
			return;
		}
		let (gx, gy) = self.interaction.transform.screen_to_graph(sx, sy);
		if let Some(id) = self.interaction.node_at(&self.model, gx, gy) {
			let hovered = self.interaction.hovered();
			self.menu.open(&mut self.model, id, hovered);
		}
	}

	/// Wheel zoom; a zoom gesture dismisses any open menu.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		if self.menu.is_open() {
			self.menu.dismiss(&mut self.model);
		}
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.interaction.transform.zoom_at(sx, sy, factor);
	}

	pub fn pointer_leave(&mut self) {
		self.pointer_up();
		self.interaction.unhover(&mut self.model);
		self.interaction.set_pan_mode(false);
	}

	pub fn key_down(&mut self, key: &str) {
		match key {
			"Shift" => self.interaction.set_pan_mode(true),
			"Escape" => {
				self.interaction.set_pan_mode(false);
				if self.menu.is_open() {
					self.menu.dismiss(&mut self.model);
				}
			}
			_ => {}
		}
	}

	pub fn key_up(&mut self, key: &str) {
		if key == "Shift" {
			self.interaction.set_pan_mode(false);
		}
	}

	/// First population: the node matching the seed key becomes the origin.
	pub fn apply_initial(&mut self, delta: GraphDelta, seed_mbid: &str) {
		let origin = delta
			.new_nodes
			.iter()
			.find(|w| w.mbid == seed_mbid)
			.map(|w| w.id);
		self.merge(delta, origin);
	}

	/// Merge a fetch result. Results arriving after their triggering node
	/// was removed are dropped whole.
	pub fn apply_fetched(&mut self, triggered_by: NodeId, delta: GraphDelta) {
		if !self.model.contains(triggered_by) {
			debug!("dropping stale result for node {triggered_by}");
			return;
		}
		self.merge(delta, Some(triggered_by));
	}

	fn merge(&mut self, delta: GraphDelta, origin: Option<NodeId>) {
		let (nodes, relations) = materialize(&delta);
		match self.model.add_nodes(nodes, &relations, origin) {
			MergeOutcome::Reselected(id) => {
				self.interaction.reselect(&mut self.model, id);
				self.dirty = true;
			}
			MergeOutcome::Merged {
				nodes_added,
				links_added,
			} => {
				self.layout.reseed(&self.model);
				self.dirty = true;
				info!("merged {nodes_added} nodes, {links_added} links");
			}
		}
	}

	fn run_action(&mut self, node: NodeId, action: MenuAction) {
		if action == MenuAction::Remove {
			self.remove_node(node);
			return;
		}
		if let Some(kind) = self.fetch_kind_for(node, action) {
			self.commands.push(FetchCommand { node, kind });
		}
	}

	fn fetch_kind_for(&self, id: NodeId, action: MenuAction) -> Option<FetchKind> {
		let mbid = self.model.node(id)?.mbid.clone();
		match action {
			MenuAction::Members => Some(FetchKind::Members { mbid }),
			MenuAction::Related => Some(FetchKind::Related { mbid }),
			MenuAction::Tags => Some(FetchKind::ArtistTags { mbid }),
			MenuAction::RelatedTags => Some(FetchKind::RelatedTags { mbid }),
			MenuAction::ReleaseTags => Some(FetchKind::ReleaseDetails { mbid }),
			MenuAction::PathToHere { from } => {
				let from_mbid = self.model.node(from)?.mbid.clone();
				Some(FetchKind::Path {
					from_mbid,
					to_mbid: mbid,
				})
			}
			MenuAction::Remove => None,
		}
	}

	fn remove_node(&mut self, id: NodeId) {
		let removed = self.model.remove_nodes(&[id]);
		if removed.is_empty() {
			return;
		}
		self.interaction.clear_refs(&removed);
		if self.menu.open_on().is_some_and(|m| removed.contains(&m)) {
			self.menu.dismiss(&mut self.model);
		}
		self.layout.reseed(&self.model);
		self.dirty = true;
		info!("removed {} nodes", removed.len());
	}
}

#[cfg(test)]
mod tests {
	use super::super::menu::{MENU_INNER_RADIUS, MENU_OUTER_RADIUS};
	use super::super::types::{Relation, WireNode};
	use super::*;

	fn wire(id: NodeId, labels: &[&str]) -> WireNode {
		WireNode {
			id,
			mbid: format!("mbid-{id}"),
			name: format!("row-{id}"),
			listeners: None,
			labels: labels.iter().map(|s| s.to_string()).collect(),
		}
	}

	fn rel(source: NodeId, target: NodeId, weight: f64) -> Relation {
		Relation {
			source,
			target,
			weight,
		}
	}

	fn seeded() -> MusicGraphState {
		let mut state = MusicGraphState::new(1000.0, 800.0);
		state.apply_initial(
			GraphDelta {
				new_nodes: vec![wire(1, &["Artist"]), wire(2, &["Artist"])],
				relations: vec![rel(1, 2, 0.8)],
			},
			"mbid-1",
		);
		// Pull the sibling away from the seeded pile so pointer tests hit
		// unambiguously.
		{
			let n = state.model.node_mut(2).unwrap();
			n.x = 800.0;
			n.y = 200.0;
		}
		state
	}

	#[test]
	fn initial_merge_sets_origin_from_seed_key() {
		let state = seeded();
		assert_eq!(state.model.origin_id(), Some(1));
		assert!(state.model.is_expanded(1));
		assert!(state.needs_sync());
	}

	#[test]
	fn stale_result_does_not_reintroduce_removed_node() {
		let mut state = seeded();
		// The expansion that triggered this fetch is removed before the
		// response lands, and the response even includes the node itself.
		let gone = state.model.remove_nodes(&[2]);
		assert!(gone.contains(&2));

		state.apply_fetched(
			2,
			GraphDelta {
				new_nodes: vec![wire(2, &["Artist"]), wire(3, &["Artist"])],
				relations: vec![rel(2, 3, 0.9)],
			},
		);
		assert!(!state.model.contains(2));
		assert!(!state.model.contains(3));
	}

	#[test]
	fn secondary_opens_menu_then_wedge_press_queues_fetch() {
		let mut state = seeded();
		let (x, y) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.secondary(x, y);
		assert_eq!(state.menu.open_on(), Some(1));

		// Press through the middle of the "Members" wedge.
		let wedge = state.menu.wedges()[0];
		let r = (MENU_INNER_RADIUS + MENU_OUTER_RADIUS) / 2.0;
		let (px, py) = (
			x + r * wedge.mid_angle().cos(),
			y + r * wedge.mid_angle().sin(),
		);
		state.pointer_down(px, py);

		assert!(!state.menu.is_open());
		let commands = state.take_commands();
		assert_eq!(
			commands,
			vec![FetchCommand {
				node: 1,
				kind: FetchKind::Members {
					mbid: "mbid-1".into()
				}
			}]
		);
		assert!(state.take_commands().is_empty());
	}

	#[test]
	fn second_secondary_dismisses_without_reopening() {
		let mut state = seeded();
		let (x1, y1) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.secondary(x1, y1);
		assert_eq!(state.menu.open_on(), Some(1));

		let (x2, y2) = {
			let n = state.model.node(2).unwrap();
			(n.x, n.y)
		};
		state.secondary(x2, y2);
		assert!(!state.menu.is_open());

		state.secondary(x2, y2);
		assert_eq!(state.menu.open_on(), Some(2));
	}

	#[test]
	fn background_press_dismisses_menu() {
		let mut state = seeded();
		let (x, y) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.secondary(x, y);
		state.pointer_down(x + 500.0, y + 300.0);
		assert!(!state.menu.is_open());
		// Plain dismissal: the pin lingers until its delayed release.
		assert!(state.model.node(1).unwrap().pinned.is_some());
	}

	#[test]
	fn remove_wedge_removes_node_and_children() {
		let mut state = seeded();
		let (x, y) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.secondary(x, y);
		let wedge = *state
			.menu
			.wedges()
			.iter()
			.find(|w| w.action == MenuAction::Remove)
			.unwrap();
		let r = (MENU_INNER_RADIUS + MENU_OUTER_RADIUS) / 2.0;
		state.pointer_down(
			x + r * wedge.mid_angle().cos(),
			y + r * wedge.mid_angle().sin(),
		);

		// Node 1 and its direct child 2 are gone.
		assert!(!state.model.contains(1));
		assert!(!state.model.contains(2));
		assert!(state.model.links().is_empty());
	}

	#[test]
	fn drag_is_suppressed_while_menu_is_open() {
		let mut state = seeded();
		let (x, y) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.secondary(x, y);
		// Pressing the node under its own open menu dismisses; no drag.
		state.pointer_down(x, y);
		assert_eq!(state.interaction.dragging(), None);
		assert!(!state.menu.is_open());
	}

	#[test]
	fn failed_fetch_skips_merge_cleanly() {
		let mut state = seeded();
		let nodes_before = state.model.nodes().len();
		// The embedder simply never calls apply_fetched on failure; what
		// must hold is that nothing queued turns into phantom state.
		assert!(state.take_commands().is_empty());
		assert_eq!(state.model.nodes().len(), nodes_before);
	}

	#[test]
	fn shift_toggles_pan_mode_and_leave_clears_it() {
		let mut state = seeded();
		state.key_down("Shift");
		assert!(state.interaction.pan_mode());
		// In pan mode a press over a node pans instead of dragging.
		let (x, y) = {
			let n = state.model.node(1).unwrap();
			(n.x, n.y)
		};
		state.pointer_down(x, y);
		assert_eq!(state.interaction.dragging(), None);
		assert!(state.interaction.panning());
		state.pointer_up();

		state.key_up("Shift");
		assert!(!state.interaction.pan_mode());

		state.key_down("Shift");
		state.pointer_leave();
		assert!(!state.interaction.pan_mode());
	}

	#[test]
	fn path_action_binds_both_correlation_keys() {
		let mut state = seeded();
		let (x2, y2) = {
			let n = state.model.node(2).unwrap();
			(n.x, n.y)
		};
		// Hover node 1, open the menu on node 2.
		state.interaction.hover(&mut state.model, Some(1));
		state.secondary(x2, y2);

		let wedge = *state
			.menu
			.wedges()
			.iter()
			.find(|w| matches!(w.action, MenuAction::PathToHere { .. }))
			.unwrap();
		let r = (MENU_INNER_RADIUS + MENU_OUTER_RADIUS) / 2.0;
		state.pointer_down(
			x2 + r * wedge.mid_angle().cos(),
			y2 + r * wedge.mid_angle().sin(),
		);

		assert_eq!(
			state.take_commands(),
			vec![FetchCommand {
				node: 2,
				kind: FetchKind::Path {
					from_mbid: "mbid-1".into(),
					to_mbid: "mbid-2".into(),
				}
			}]
		);
	}
}
