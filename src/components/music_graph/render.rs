use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::InteractionController;
use super::menu::{ContextMenu, MENU_INNER_RADIUS, MENU_OUTER_RADIUS};
use super::model::GraphModel;
use super::sync::{EdgeVisual, LabelVisual, MarkerVisual, RenderBackend, SyncDelta};
use super::types::{EdgeKey, EntityType, NodeId};

const BACKGROUND: &str = "#1a1a2e";
const EXPANDED_STROKE: &str = "#1cb3c8";
const FADE_IN_MS: f64 = 250.0;

fn entity_color(entity: EntityType) -> &'static str {
	match entity {
		EntityType::Artist => "#1f77b4",
		EntityType::Group => "#9467bd",
		EntityType::Tag => "#2ca02c",
		EntityType::Album => "#ff7f0e",
		EntityType::Ep => "#e377c2",
		EntityType::Single => "#8c564b",
	}
}

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

struct Retained<V> {
	visual: V,
	born_ms: f64,
}

/// Canvas 2d rendering backend. Elements are retained per identity so a
/// resync updates visuals in place; the spawn timestamp survives updates,
/// which is what keeps the fade-in from restarting.
pub struct CanvasBackend {
	edges: HashMap<EdgeKey, Retained<EdgeVisual>>,
	markers: HashMap<NodeId, Retained<MarkerVisual>>,
	labels: HashMap<NodeId, Retained<LabelVisual>>,
	clock_ms: f64,
}

impl CanvasBackend {
	pub fn new() -> Self {
		CanvasBackend {
			edges: HashMap::new(),
			markers: HashMap::new(),
			labels: HashMap::new(),
			clock_ms: 0.0,
		}
	}

	fn apply<K: std::hash::Hash + Eq, V>(
		store: &mut HashMap<K, Retained<V>>,
		delta: SyncDelta<K, V>,
		now_ms: f64,
	) {
		for (key, visual) in delta.enter {
			store.insert(
				key,
				Retained {
					visual,
					born_ms: now_ms,
				},
			);
		}
		for (key, visual) in delta.update {
			if let Some(elem) = store.get_mut(&key) {
				elem.visual = visual;
			}
		}
		for key in delta.exit {
			store.remove(&key);
		}
	}

	fn fade(&self, born_ms: f64) -> f64 {
		(((self.clock_ms - born_ms) / FADE_IN_MS).clamp(0.0, 1.0)).sqrt()
	}

	/// Draw one frame from the retained elements, reading live positions
	/// from the model.
	pub fn draw(
		&mut self,
		model: &GraphModel,
		interaction: &InteractionController,
		menu: &ContextMenu,
		ctx: &CanvasRenderingContext2d,
		width: f64,
		height: f64,
		dt_ms: f64,
	) {
		self.clock_ms += dt_ms;

		ctx.set_fill_style_str(BACKGROUND);
		ctx.fill_rect(0.0, 0.0, width, height);
		ctx.save();
		let t = interaction.transform;
		let _ = ctx.translate(t.x, t.y);
		let _ = ctx.scale(t.k, t.k);

		self.draw_edges(model, interaction, ctx);
		self.draw_markers(model, interaction, ctx);
		self.draw_labels(model, interaction, ctx);
		self.draw_menu(model, menu, ctx);

		ctx.restore();
	}

	fn draw_edges(
		&self,
		model: &GraphModel,
		interaction: &InteractionController,
		ctx: &CanvasRenderingContext2d,
	) {
		let hovered = interaction.hovered();
		let (dash, gap) = (8.0, 4.0);
		let dash_offset = -(self.clock_ms / 30.0) % (dash + gap);

		for (&(source, target), elem) in &self.edges {
			let (Some(a), Some(b)) = (model.node(source), model.node(target)) else {
				continue;
			};
			let fade = self.fade(elem.born_ms);
			let selected = hovered == Some(source) || hovered == Some(target);
			let dimmed = hovered.is_some() && !selected;

			let alpha = if dimmed { 0.12 } else { 0.35 + 0.45 * elem.visual.weight };
			ctx.set_global_alpha(alpha * fade);
			ctx.set_stroke_style_str(if selected { "#8ecbff" } else { "#5a6a8a" });
			ctx.set_line_width(1.0 + 2.0 * elem.visual.weight);
			if selected {
				let _ = ctx.set_line_dash(&js_sys::Array::of2(
					&JsValue::from_f64(dash),
					&JsValue::from_f64(gap),
				));
				ctx.set_line_dash_offset(dash_offset);
			}
			ctx.begin_path();
			ctx.move_to(a.x, a.y);
			ctx.line_to(b.x, b.y);
			ctx.stroke();
			if selected {
				let _ = ctx.set_line_dash(&js_sys::Array::new());
			}
		}
		ctx.set_global_alpha(1.0);
	}

	fn draw_markers(
		&self,
		model: &GraphModel,
		interaction: &InteractionController,
		ctx: &CanvasRenderingContext2d,
	) {
		let hovered = interaction.hovered();
		let focused = interaction.focused();

		for (&id, elem) in &self.markers {
			let Some(node) = model.node(id) else {
				continue;
			};
			let fade = self.fade(elem.born_ms);
			let in_neighborhood =
				hovered == Some(id) || interaction.is_neighbor_of_hover(model, id);
			let dimmed = hovered.is_some() && !in_neighborhood;

			ctx.set_global_alpha(if dimmed { 0.25 } else { fade });
			ctx.begin_path();
			let _ = ctx.arc(node.x, node.y, elem.visual.radius, 0.0, 2.0 * PI);
			ctx.set_fill_style_str("#242a45");
			ctx.fill();
			ctx.set_stroke_style_str(if elem.visual.expanded {
				EXPANDED_STROKE
			} else {
				entity_color(elem.visual.entity_type)
			});
			ctx.set_line_width(if hovered == Some(id) { 4.0 } else { 2.5 });
			ctx.stroke();

			if focused == Some(id) {
				ctx.begin_path();
				let _ = ctx.arc(node.x, node.y, elem.visual.radius + 6.0, 0.0, 2.0 * PI);
				ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
				ctx.set_line_width(1.5);
				ctx.stroke();
			}

			if hovered == Some(id) {
				let glow = ease_out_cubic(fade);
				ctx.begin_path();
				let _ = ctx.arc(
					node.x,
					node.y,
					elem.visual.radius + 10.0,
					0.0,
					2.0 * PI,
				);
				ctx.set_stroke_style_str(&format!("rgba(142, 203, 255, {})", 0.35 * glow));
				ctx.set_line_width(6.0);
				ctx.stroke();
			}
		}
		ctx.set_global_alpha(1.0);
	}

	fn draw_labels(
		&self,
		model: &GraphModel,
		interaction: &InteractionController,
		ctx: &CanvasRenderingContext2d,
	) {
		let hovered = interaction.hovered();
		ctx.set_font("12px sans-serif");
		ctx.set_text_align("center");

		for (&id, elem) in &self.labels {
			let Some(node) = model.node(id) else {
				continue;
			};
			let emphasized = hovered == Some(id)
				|| interaction.is_neighbor_of_hover(model, id);
			let dimmed = hovered.is_some() && !emphasized;
			let base = if dimmed { 0.2 } else { 0.85 };
			let alpha = base * self.fade(elem.born_ms);
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {alpha})"));
			for line in &elem.visual.lines {
				let _ = ctx.fill_text(&line.text, node.x + line.dx, node.y + line.dy);
			}
		}
	}

	fn draw_menu(&self, model: &GraphModel, menu: &ContextMenu, ctx: &CanvasRenderingContext2d) {
		let Some(center) = menu
			.open_on()
			.and_then(|id| model.node(id))
			.map(|n| (n.x, n.y))
		else {
			return;
		};
		let label_radius = (MENU_INNER_RADIUS + MENU_OUTER_RADIUS) / 2.0;
		ctx.set_font("11px sans-serif");
		ctx.set_text_align("center");

		for wedge in menu.wedges() {
			ctx.begin_path();
			let _ = ctx.arc(
				center.0,
				center.1,
				MENU_OUTER_RADIUS,
				wedge.start_angle,
				wedge.end_angle,
			);
			let _ = ctx.arc_with_anticlockwise(
				center.0,
				center.1,
				MENU_INNER_RADIUS,
				wedge.end_angle,
				wedge.start_angle,
				true,
			);
			ctx.close_path();
			ctx.set_fill_style_str("rgba(36, 42, 69, 0.92)");
			ctx.fill();
			ctx.set_stroke_style_str("rgba(142, 203, 255, 0.6)");
			ctx.set_line_width(1.0);
			ctx.stroke();

			let mid = wedge.mid_angle();
			ctx.set_fill_style_str("#e8ecff");
			let _ = ctx.fill_text(
				wedge.action.label(),
				center.0 + label_radius * mid.cos(),
				center.1 + label_radius * mid.sin() + 4.0,
			);
		}
	}
}

impl Default for CanvasBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl RenderBackend for CanvasBackend {
	fn sync_edges(&mut self, delta: SyncDelta<EdgeKey, EdgeVisual>) {
		Self::apply(&mut self.edges, delta, self.clock_ms);
	}

	fn sync_markers(&mut self, delta: SyncDelta<NodeId, MarkerVisual>) {
		Self::apply(&mut self.markers, delta, self.clock_ms);
	}

	fn sync_labels(&mut self, delta: SyncDelta<NodeId, LabelVisual>) {
		Self::apply(&mut self.labels, delta, self.clock_ms);
	}
}
