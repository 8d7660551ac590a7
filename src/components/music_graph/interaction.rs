use std::collections::HashSet;

use super::model::GraphModel;
use super::types::NodeId;

/// Zoom scale bounds.
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 5.0;

/// Pan/zoom view transform between screen and graph space.
#[derive(Clone, Copy, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		ViewTransform {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Zoom by a wheel factor, keeping the cursor's graph point fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

/// One row of the hover side panel.
#[derive(Clone, Debug, PartialEq)]
pub struct HoverLink {
	/// Match strength formatted as a percentage, e.g. `"80.00%"`.
	pub match_pct: String,
	/// The other endpoint of the incident edge.
	pub other: NodeId,
	pub other_name: String,
}

#[derive(Clone, Copy, Debug)]
struct PanGrab {
	start_x: f64,
	start_y: f64,
	transform_x: f64,
	transform_y: f64,
}

/// Translates pointer and keyboard input into model and view-state
/// changes: hover neighborhoods, Artist/Group focus, node drag, view pan.
pub struct InteractionController {
	pub transform: ViewTransform,
	hovered: Option<NodeId>,
	focused: Option<NodeId>,
	hover_links: Vec<HoverLink>,
	drag: Option<NodeId>,
	drag_grab: (f64, f64),
	drag_moved: bool,
	pan: Option<PanGrab>,
	pan_mode: bool,
}

impl InteractionController {
	pub fn new() -> Self {
		InteractionController {
			transform: ViewTransform::default(),
			hovered: None,
			focused: None,
			hover_links: Vec::new(),
			drag: None,
			drag_grab: (0.0, 0.0),
			drag_moved: false,
			pan: None,
			pan_mode: false,
		}
	}

	pub fn hovered(&self) -> Option<NodeId> {
		self.hovered
	}

	pub fn focused(&self) -> Option<NodeId> {
		self.focused
	}

	pub fn hover_links(&self) -> &[HoverLink] {
		&self.hover_links
	}

	pub fn dragging(&self) -> Option<NodeId> {
		self.drag
	}

	pub fn panning(&self) -> bool {
		self.pan.is_some()
	}

	pub fn pan_mode(&self) -> bool {
		self.pan_mode
	}

	pub fn set_pan_mode(&mut self, on: bool) {
		self.pan_mode = on;
	}

	/// Hit-test in graph space; later nodes win, matching paint order.
	pub fn node_at(&self, model: &GraphModel, gx: f64, gy: f64) -> Option<NodeId> {
		let mut found = None;
		for node in model.nodes() {
			let (dx, dy) = (node.x - gx, node.y - gy);
			if (dx * dx + dy * dy).sqrt() < node.radius {
				found = Some(node.id);
			}
		}
		found
	}

	/// Update the hovered node and its side-panel rows. Returns true when
	/// the hover target changed.
	pub fn hover(&mut self, model: &mut GraphModel, target: Option<NodeId>) -> bool {
		if self.hovered == target {
			return false;
		}
		if let Some(prev) = self.hovered.take() {
			model.set_hovered(prev, false);
		}
		self.hover_links.clear();

		if let Some(id) = target {
			model.set_hovered(id, true);
			for link in model.links() {
				let other = if link.source == id {
					link.target
				} else if link.target == id {
					link.source
				} else {
					continue;
				};
				let name = model
					.node(other)
					.map(|n| n.name.clone())
					.unwrap_or_default();
				self.hover_links.push(HoverLink {
					match_pct: format!("{:.2}%", link.weight * 100.0),
					other,
					other_name: name,
				});
			}
		}
		self.hovered = target;
		true
	}

	pub fn unhover(&mut self, model: &mut GraphModel) {
		self.hover(model, None);
	}

	/// Whether a node belongs to the hovered neighborhood (for emphasis).
	pub fn is_neighbor_of_hover(&self, model: &GraphModel, id: NodeId) -> bool {
		let Some(h) = self.hovered else {
			return false;
		};
		model
			.node(id)
			.is_some_and(|n| n.source_links.contains(&h) || n.target_links.contains(&h))
	}

	/// Focus toggle; meaningful only for Artist/Group nodes. Returns true
	/// when focus changed and a visual resync is wanted.
	pub fn click(&mut self, model: &GraphModel, id: NodeId) -> bool {
		let Some(node) = model.node(id) else {
			return false;
		};
		if !node.entity_type.is_focusable() {
			return false;
		}
		self.focused = if self.focused == Some(id) {
			None
		} else {
			Some(id)
		};
		true
	}

	/// Selection update for the reselect fast-path: focus when focusable,
	/// hover otherwise.
	pub fn reselect(&mut self, model: &mut GraphModel, id: NodeId) {
		if model.node(id).is_some_and(|n| n.entity_type.is_focusable()) {
			self.focused = Some(id);
		}
		self.hover(model, Some(id));
	}

	/// Grab a node: pin it to the pointer for the duration of the drag.
	pub fn begin_drag(&mut self, model: &mut GraphModel, id: NodeId, gx: f64, gy: f64) {
		model.cancel_unpin(id);
		model.pin_at(id, gx, gy);
		self.drag = Some(id);
		self.drag_grab = (gx, gy);
		self.drag_moved = false;
	}

	pub fn drag_to(&mut self, model: &mut GraphModel, gx: f64, gy: f64) {
		if let Some(id) = self.drag {
			let (ox, oy) = self.drag_grab;
			if (gx - ox).hypot(gy - oy) > 3.0 {
				self.drag_moved = true;
			}
			model.pin_at(id, gx, gy);
		}
	}

	/// Whether the last grab actually moved the node; consumed by the click
	/// handler so a completed drag does not double as a focus toggle.
	pub fn take_drag_moved(&mut self) -> bool {
		std::mem::replace(&mut self.drag_moved, false)
	}

	/// Release the drag. The pin is cleared unless the node's menu is open.
	pub fn end_drag(&mut self, model: &mut GraphModel, menu_open_on: Option<NodeId>) {
		if let Some(id) = self.drag.take() {
			if menu_open_on != Some(id) {
				model.unpin(id);
			}
		}
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan = Some(PanGrab {
			start_x: sx,
			start_y: sy,
			transform_x: self.transform.x,
			transform_y: self.transform.y,
		});
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if let Some(grab) = self.pan {
			self.transform.x = grab.transform_x + (sx - grab.start_x);
			self.transform.y = grab.transform_y + (sy - grab.start_y);
		}
	}

	pub fn end_pan(&mut self) {
		self.pan = None;
	}

	/// Drop hover/focus/drag references into a removed-node set.
	pub fn clear_refs(&mut self, removed: &HashSet<NodeId>) {
		if self.hovered.is_some_and(|id| removed.contains(&id)) {
			self.hovered = None;
			self.hover_links.clear();
		}
		self.hover_links.retain(|l| !removed.contains(&l.other));
		if self.focused.is_some_and(|id| removed.contains(&id)) {
			self.focused = None;
		}
		if self.drag.is_some_and(|id| removed.contains(&id)) {
			self.drag = None;
		}
	}
}

impl Default for InteractionController {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::super::model::test_support::{artist, node, rel};
	use super::*;
	use crate::components::music_graph::types::EntityType;

	fn model() -> GraphModel {
		let mut m = GraphModel::new(1000.0, 800.0);
		m.add_nodes(
			vec![artist(1), artist(2), node(3, EntityType::Tag)],
			&[rel(1, 2, 0.8), rel(3, 1, 0.25)],
			None,
		);
		m
	}

	#[test]
	fn hover_builds_match_rows_for_both_directions() {
		let mut m = model();
		let mut ic = InteractionController::new();
		assert!(ic.hover(&mut m, Some(1)));

		let mut rows = ic.hover_links().to_vec();
		rows.sort_by_key(|r| r.other);
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].other, 2);
		assert_eq!(rows[0].match_pct, "80.00%");
		assert_eq!(rows[1].other, 3);
		assert_eq!(rows[1].match_pct, "25.00%");
		assert!(m.node(1).unwrap().hovered);

		assert!(!ic.hover(&mut m, Some(1)), "unchanged target is a no-op");
		ic.unhover(&mut m);
		assert!(!m.node(1).unwrap().hovered);
		assert!(ic.hover_links().is_empty());
	}

	#[test]
	fn click_toggles_focus_for_artists_only() {
		let m = model();
		let mut ic = InteractionController::new();

		assert!(ic.click(&m, 1));
		assert_eq!(ic.focused(), Some(1));
		assert!(ic.click(&m, 1));
		assert_eq!(ic.focused(), None);

		assert!(!ic.click(&m, 3), "tags are not focusable");
		assert_eq!(ic.focused(), None);
	}

	#[test]
	fn drag_pins_to_pointer_and_releases() {
		let mut m = model();
		let mut ic = InteractionController::new();
		ic.begin_drag(&mut m, 1, 10.0, 20.0);
		assert_eq!(m.node(1).unwrap().pinned, Some((10.0, 20.0)));

		ic.drag_to(&mut m, 30.0, 40.0);
		assert_eq!(m.node(1).unwrap().pinned, Some((30.0, 40.0)));
		assert_eq!((m.node(1).unwrap().x, m.node(1).unwrap().y), (30.0, 40.0));

		ic.end_drag(&mut m, None);
		assert_eq!(m.node(1).unwrap().pinned, None);
		assert_eq!(ic.dragging(), None);
	}

	#[test]
	fn drag_release_keeps_pin_while_menu_is_open() {
		let mut m = model();
		let mut ic = InteractionController::new();
		ic.begin_drag(&mut m, 1, 10.0, 20.0);
		ic.end_drag(&mut m, Some(1));
		assert_eq!(m.node(1).unwrap().pinned, Some((10.0, 20.0)));
	}

	#[test]
	fn zoom_keeps_cursor_point_fixed() {
		let mut t = ViewTransform::default();
		let before = t.screen_to_graph(300.0, 200.0);
		t.zoom_at(300.0, 200.0, 1.1);
		let after = t.screen_to_graph(300.0, 200.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
		assert!((t.k - 1.1).abs() < 1e-12);
	}

	#[test]
	fn zoom_is_clamped_to_scale_extent() {
		let mut t = ViewTransform::default();
		for _ in 0..100 {
			t.zoom_at(0.0, 0.0, 1.5);
		}
		assert!(t.k <= 5.0);
		for _ in 0..200 {
			t.zoom_at(0.0, 0.0, 0.5);
		}
		assert!(t.k >= 0.1);
	}

	#[test]
	fn removed_ids_are_cleared_from_references() {
		let mut m = model();
		let mut ic = InteractionController::new();
		ic.hover(&mut m, Some(1));
		ic.click(&m, 1);

		let removed = m.remove_nodes(&[1]);
		ic.clear_refs(&removed);
		assert_eq!(ic.hovered(), None);
		assert_eq!(ic.focused(), None);
		assert!(ic.hover_links().is_empty());
	}
}
