use std::f64::consts::{FRAC_PI_2, TAU};

use super::model::GraphModel;
use super::types::{EntityType, NodeId};

/// Delay before a plainly-dismissed menu releases its node pin.
pub const MENU_DISMISS_UNPIN_MS: f64 = 300.0;
/// Angular gap between adjacent wedges, radians.
pub const WEDGE_GAP: f64 = 0.16;
/// Inner edge of the wedge ring, graph units from the node center.
pub const MENU_INNER_RADIUS: f64 = 46.0;
/// Outer edge of the wedge ring.
pub const MENU_OUTER_RADIUS: f64 = 96.0;

/// One entry of the radial menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
	/// Fetch group membership.
	Members,
	/// Fetch an explanatory path from the ambient hovered node to this one.
	PathToHere {
		from: NodeId,
	},
	/// Expand the artist/group neighborhood.
	Related,
	/// Fetch artist tag associations.
	Tags,
	/// Expand a tag through the tag-to-tag relation.
	RelatedTags,
	/// Fetch release tag associations.
	ReleaseTags,
	/// Remove this node (and its direct children) from the graph.
	Remove,
}

impl MenuAction {
	pub fn label(self) -> &'static str {
		match self {
			MenuAction::Members => "Members",
			MenuAction::PathToHere { .. } => "Path to here",
			MenuAction::Related | MenuAction::RelatedTags => "Related",
			MenuAction::Tags | MenuAction::ReleaseTags => "Tags",
			MenuAction::Remove => "Remove from graph",
		}
	}
}

/// A wedge of the ring, with its angular span for drawing and hit-testing.
#[derive(Clone, Copy, Debug)]
pub struct Wedge {
	pub action: MenuAction,
	pub start_angle: f64,
	pub end_angle: f64,
}

impl Wedge {
	pub fn mid_angle(&self) -> f64 {
		(self.start_angle + self.end_angle) / 2.0
	}
}

enum MenuState {
	Closed,
	Open { node: NodeId, wedges: Vec<Wedge> },
}

/// Per-node radial menu lifecycle. At most one menu is open at a time; the
/// open node is pinned for the menu's duration.
pub struct ContextMenu {
	state: MenuState,
}

impl ContextMenu {
	pub fn new() -> Self {
		ContextMenu {
			state: MenuState::Closed,
		}
	}

	pub fn is_open(&self) -> bool {
		matches!(self.state, MenuState::Open { .. })
	}

	pub fn open_on(&self) -> Option<NodeId> {
		match &self.state {
			MenuState::Open { node, .. } => Some(*node),
			MenuState::Closed => None,
		}
	}

	pub fn wedges(&self) -> &[Wedge] {
		match &self.state {
			MenuState::Open { wedges, .. } => wedges,
			MenuState::Closed => &[],
		}
	}

	/// Open on a node: pin it where it stands (cancelling any pending
	/// release) and build the action ring from its entity type and the
	/// ambient hover.
	pub fn open(&mut self, model: &mut GraphModel, id: NodeId, hovered: Option<NodeId>) {
		let Some(node) = model.node(id) else {
			return;
		};
		let actions = actions_for(node.entity_type, id, hovered);
		let wedges = layout_wedges(&actions);
		model.cancel_unpin(id);
		model.pin_in_place(id);
		model.set_menu_open(id, true);
		self.state = MenuState::Open { node: id, wedges };
	}

	/// Plain dismissal (background press, pan/zoom start, another node's
	/// secondary action): the pin is released only after a short delay.
	pub fn dismiss(&mut self, model: &mut GraphModel) {
		if let MenuState::Open { node, .. } =
			std::mem::replace(&mut self.state, MenuState::Closed)
		{
			model.set_menu_open(node, false);
			model.schedule_unpin(node, MENU_DISMISS_UNPIN_MS);
		}
	}

	/// Try to invoke the wedge under the graph-space point. On a hit the
	/// menu closes and the node's pin is released immediately; the bound
	/// action is returned for the caller to run.
	pub fn invoke_at(
		&mut self,
		model: &mut GraphModel,
		gx: f64,
		gy: f64,
	) -> Option<(NodeId, MenuAction)> {
		let MenuState::Open { node, wedges } = &self.state else {
			return None;
		};
		let id = *node;
		let center = model.node(id).map(|n| (n.x, n.y))?;
		let action = hit_wedge(wedges, center, gx, gy)?.action;

		self.state = MenuState::Closed;
		model.set_menu_open(id, false);
		model.unpin(id);
		Some((id, action))
	}
}

impl Default for ContextMenu {
	fn default() -> Self {
		Self::new()
	}
}

fn actions_for(entity: EntityType, id: NodeId, hovered: Option<NodeId>) -> Vec<MenuAction> {
	let mut actions = Vec::new();
	match entity {
		EntityType::Artist | EntityType::Group => {
			actions.push(MenuAction::Members);
			if let Some(from) = hovered.filter(|&h| h != id) {
				actions.push(MenuAction::PathToHere { from });
			}
			actions.push(MenuAction::Related);
			actions.push(MenuAction::Tags);
		}
		EntityType::Tag => actions.push(MenuAction::RelatedTags),
		EntityType::Album | EntityType::Ep | EntityType::Single => {
			actions.push(MenuAction::ReleaseTags)
		}
	}
	actions.push(MenuAction::Remove);
	actions
}

/// Subdivide the ring evenly among the actions, keeping a fixed gap
/// between wedges, starting from 12 o'clock.
fn layout_wedges(actions: &[MenuAction]) -> Vec<Wedge> {
	let n = actions.len();
	let span = (TAU - n as f64 * WEDGE_GAP) / n as f64;
	actions
		.iter()
		.enumerate()
		.map(|(i, &action)| {
			let start = -FRAC_PI_2 + WEDGE_GAP / 2.0 + i as f64 * (span + WEDGE_GAP);
			Wedge {
				action,
				start_angle: start,
				end_angle: start + span,
			}
		})
		.collect()
}

/// Wedge under a graph-space point, if any.
pub fn hit_wedge(wedges: &[Wedge], center: (f64, f64), gx: f64, gy: f64) -> Option<&Wedge> {
	let (dx, dy) = (gx - center.0, gy - center.1);
	let dist = (dx * dx + dy * dy).sqrt();
	if !(MENU_INNER_RADIUS..=MENU_OUTER_RADIUS).contains(&dist) {
		return None;
	}
	let angle = dy.atan2(dx);
	wedges.iter().find(|w| {
		let mut a = angle;
		while a < w.start_angle {
			a += TAU;
		}
		a <= w.end_angle
	})
}

#[cfg(test)]
mod tests {
	use super::super::model::test_support::{artist, node};
	use super::*;
	use crate::components::music_graph::types::EntityType;

	fn model_with(nodes: Vec<super::super::types::Node>) -> GraphModel {
		let mut m = GraphModel::new(1000.0, 800.0);
		m.add_nodes(nodes, &[], None);
		m
	}

	fn actions_of(menu: &ContextMenu) -> Vec<MenuAction> {
		menu.wedges().iter().map(|w| w.action).collect()
	}

	#[test]
	fn artist_menu_lists_members_related_tags_remove() {
		let mut m = model_with(vec![artist(1)]);
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, None);
		assert_eq!(
			actions_of(&menu),
			vec![
				MenuAction::Members,
				MenuAction::Related,
				MenuAction::Tags,
				MenuAction::Remove
			]
		);
	}

	#[test]
	fn hovered_other_node_adds_path_action() {
		let mut m = model_with(vec![artist(1), artist(2)]);
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, Some(2));
		assert!(
			actions_of(&menu).contains(&MenuAction::PathToHere { from: 2 })
		);

		// Hovering the menu node itself adds nothing.
		menu.dismiss(&mut m);
		menu.open(&mut m, 1, Some(1));
		assert_eq!(actions_of(&menu).len(), 4);
	}

	#[test]
	fn tag_menu_has_one_related_entry() {
		let mut m = model_with(vec![node(5, EntityType::Tag)]);
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 5, None);
		assert_eq!(
			actions_of(&menu),
			vec![MenuAction::RelatedTags, MenuAction::Remove]
		);
	}

	#[test]
	fn release_menu_has_tags_then_remove() {
		for entity in [EntityType::Album, EntityType::Ep, EntityType::Single] {
			let mut m = model_with(vec![node(7, entity)]);
			let mut menu = ContextMenu::new();
			menu.open(&mut m, 7, None);
			assert_eq!(
				actions_of(&menu),
				vec![MenuAction::ReleaseTags, MenuAction::Remove]
			);
		}
	}

	#[test]
	fn open_pins_and_plain_dismiss_unpins_after_delay() {
		let mut m = model_with(vec![artist(1)]);
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, None);
		assert!(m.node(1).unwrap().pinned.is_some());
		assert!(m.node(1).unwrap().menu_open);

		menu.dismiss(&mut m);
		assert!(!menu.is_open());
		assert!(!m.node(1).unwrap().menu_open);
		assert!(m.node(1).unwrap().pinned.is_some());

		m.advance(MENU_DISMISS_UNPIN_MS + 1.0);
		assert!(m.node(1).unwrap().pinned.is_none());
	}

	#[test]
	fn invoking_a_wedge_unpins_immediately() {
		let mut m = model_with(vec![artist(1)]);
		{
			let n = m.node_mut(1).unwrap();
			n.x = 500.0;
			n.y = 400.0;
		}
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, None);

		// Aim through the middle of the first wedge.
		let wedge = menu.wedges()[0];
		let r = (MENU_INNER_RADIUS + MENU_OUTER_RADIUS) / 2.0;
		let (gx, gy) = (
			500.0 + r * wedge.mid_angle().cos(),
			400.0 + r * wedge.mid_angle().sin(),
		);
		let hit = menu.invoke_at(&mut m, gx, gy);

		assert_eq!(hit, Some((1, MenuAction::Members)));
		assert!(!menu.is_open());
		assert!(m.node(1).unwrap().pinned.is_none());
		assert!(!m.node(1).unwrap().menu_open);
	}

	#[test]
	fn press_outside_the_ring_invokes_nothing() {
		let mut m = model_with(vec![artist(1)]);
		{
			let n = m.node_mut(1).unwrap();
			n.x = 500.0;
			n.y = 400.0;
		}
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, None);

		assert!(menu.invoke_at(&mut m, 500.0, 400.0).is_none());
		assert!(
			menu.invoke_at(&mut m, 500.0 + MENU_OUTER_RADIUS * 3.0, 400.0)
				.is_none()
		);
		assert!(menu.is_open());
	}

	#[test]
	fn wedges_cover_the_ring_with_gaps() {
		let mut m = model_with(vec![artist(1), artist(2)]);
		let mut menu = ContextMenu::new();
		menu.open(&mut m, 1, Some(2));
		let wedges = menu.wedges();
		assert_eq!(wedges.len(), 5);
		let span = wedges[0].end_angle - wedges[0].start_angle;
		for w in wedges {
			assert!((w.end_angle - w.start_angle - span).abs() < 1e-9);
		}
		for pair in wedges.windows(2) {
			let gap = pair[1].start_angle - pair[0].end_angle;
			assert!((gap - WEDGE_GAP).abs() < 1e-9);
		}
	}
}
