use super::model::GraphModel;
use super::types::Node;

/// Tunable force and relaxation parameters.
#[derive(Clone, Copy, Debug)]
pub struct LayoutParams {
	/// All-pairs repulsion scale (inverse-square falloff).
	pub charge_strength: f64,
	/// Cap on the per-pair repulsion so near-coincident nodes separate
	/// without being launched.
	pub charge_max: f64,
	/// Fraction of pairwise overlap corrected per step.
	pub collide_strength: f64,
	/// Fraction of the barycenter offset corrected per step.
	pub center_strength: f64,
	/// Per-step relaxation of alpha toward its target.
	pub alpha_decay: f64,
	/// Below this, with a zero target, the simulation coasts.
	pub alpha_min: f64,
	/// Alpha is raised to this on every structural reseed.
	pub restart_alpha: f64,
	/// Alpha target latched while a drag is active.
	pub drag_alpha_target: f64,
	/// Velocity damping applied before integration.
	pub velocity_decay: f64,
}

impl Default for LayoutParams {
	fn default() -> Self {
		LayoutParams {
			charge_strength: 1800.0,
			charge_max: 60.0,
			collide_strength: 0.7,
			center_strength: 0.05,
			alpha_decay: 0.028,
			alpha_min: 0.001,
			restart_alpha: 0.9,
			drag_alpha_target: 0.3,
			velocity_decay: 0.6,
		}
	}
}

/// Spring rest length: shorter for stronger matches, and shorter still as
/// the graph accumulates expanded nodes, keeping a proliferating layout
/// compact.
pub fn rest_length(weight: f64, expanded: usize) -> f64 {
	(1.2 / weight.max(0.05)) * (94.0 / expanded.max(1) as f64)
}

#[derive(Clone, Copy, Debug)]
struct Spring {
	source: usize,
	target: usize,
	rest: f64,
	strength: f64,
}

/// Continuous force simulation stepped once per frame over the model's
/// node slice.
pub struct LayoutEngine {
	params: LayoutParams,
	alpha: f64,
	alpha_target: f64,
	springs: Vec<Spring>,
	center: (f64, f64),
}

impl LayoutEngine {
	pub fn new(width: f64, height: f64) -> Self {
		LayoutEngine {
			params: LayoutParams::default(),
			alpha: 0.0,
			alpha_target: 0.0,
			springs: Vec::new(),
			center: (width / 2.0, height / 2.0),
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.center = (width / 2.0, height / 2.0);
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Rebuild the resolved spring list from the model and raise alpha to
	/// the restart value so the new layout visibly re-settles.
	pub fn reseed(&mut self, model: &GraphModel) {
		let expanded = model.expanded_count();
		self.springs = model
			.links()
			.iter()
			.filter_map(|link| {
				Some(Spring {
					source: model.index_of(link.source)?,
					target: model.index_of(link.target)?,
					rest: rest_length(link.weight, expanded),
					strength: link.weight,
				})
			})
			.collect();
		self.alpha = self.alpha.max(self.params.restart_alpha);
	}

	/// Raise the energy target so neighbors react while a node is dragged.
	pub fn begin_drag(&mut self) {
		if self.alpha < self.params.drag_alpha_target {
			self.alpha_target = self.params.drag_alpha_target;
		}
	}

	pub fn end_drag(&mut self) {
		self.alpha_target = 0.0;
	}

	/// One simulation step. Pinned nodes exert forces but are reasserted
	/// at their fixed position afterwards.
	pub fn step(&mut self, nodes: &mut [Node]) {
		if nodes.is_empty() {
			return;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
		if self.alpha < self.params.alpha_min && self.alpha_target < self.params.alpha_min {
			return;
		}
		let alpha = self.alpha;

		for spring in &self.springs {
			if spring.source >= nodes.len() || spring.target >= nodes.len() {
				continue;
			}
			let dx = nodes[spring.target].x - nodes[spring.source].x;
			let dy = nodes[spring.target].y - nodes[spring.source].y;
			let dist = (dx * dx + dy * dy).sqrt().max(1e-3);
			let k = (dist - spring.rest) / dist * spring.strength * alpha * 0.5;
			let (fx, fy) = (dx * k, dy * k);
			nodes[spring.target].vx -= fx;
			nodes[spring.target].vy -= fy;
			nodes[spring.source].vx += fx;
			nodes[spring.source].vy += fy;
		}

		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let dx = nodes[j].x - nodes[i].x;
				let dy = nodes[j].y - nodes[i].y;
				let d2 = (dx * dx + dy * dy).max(1.0);
				let dist = d2.sqrt();
				let (ux, uy) = (dx / dist, dy / dist);

				let f = (self.params.charge_strength * alpha / d2).min(self.params.charge_max);
				nodes[i].vx -= ux * f;
				nodes[i].vy -= uy * f;
				nodes[j].vx += ux * f;
				nodes[j].vy += uy * f;

				let min_sep = nodes[i].radius + nodes[j].radius;
				if dist < min_sep {
					let push = (min_sep - dist) * self.params.collide_strength * 0.5;
					nodes[i].x -= ux * push;
					nodes[i].y -= uy * push;
					nodes[j].x += ux * push;
					nodes[j].y += uy * push;
				}
			}
		}

		let n = nodes.len() as f64;
		let mx = nodes.iter().map(|d| d.x).sum::<f64>() / n;
		let my = nodes.iter().map(|d| d.y).sum::<f64>() / n;
		let (sx, sy) = (
			(self.center.0 - mx) * self.params.center_strength,
			(self.center.1 - my) * self.params.center_strength,
		);

		for node in nodes.iter_mut() {
			node.x += sx;
			node.y += sy;
			node.vx *= self.params.velocity_decay;
			node.vy *= self.params.velocity_decay;
			node.x += node.vx;
			node.y += node.vy;
			if let Some((fx, fy)) = node.pinned {
				node.x = fx;
				node.y = fy;
				node.vx = 0.0;
				node.vy = 0.0;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::super::model::test_support::{artist, rel};
	use super::*;

	fn seeded_model() -> GraphModel {
		let mut m = GraphModel::new(1000.0, 800.0);
		m.add_nodes(vec![artist(1)], &[], Some(1));
		m.add_nodes(vec![artist(2), artist(3)], &[rel(1, 2, 0.8), rel(1, 3, 0.4)], Some(1));
		m
	}

	#[test]
	fn rest_length_shrinks_as_graph_expands() {
		let mut last = f64::INFINITY;
		for expanded in 1..10 {
			let len = rest_length(0.8, expanded);
			assert!(len < last, "rest length must strictly decrease");
			last = len;
		}
	}

	#[test]
	fn rest_length_shrinks_with_weight() {
		assert!(rest_length(0.9, 3) < rest_length(0.3, 3));
	}

	#[test]
	fn alpha_rises_on_reseed_and_decays() {
		let mut m = seeded_model();
		let mut engine = LayoutEngine::new(1000.0, 800.0);
		engine.reseed(&m);
		let start = engine.alpha();
		assert!(start > 0.0);

		for _ in 0..50 {
			engine.step(m.nodes_mut());
		}
		assert!(engine.alpha() < start);
	}

	#[test]
	fn pinned_node_stays_fixed_while_neighbors_move() {
		let mut m = seeded_model();
		m.pin_at(1, 500.0, 400.0);
		let free_before = {
			let b = m.node(2).unwrap();
			(b.x, b.y)
		};

		let mut engine = LayoutEngine::new(1000.0, 800.0);
		engine.reseed(&m);
		for _ in 0..20 {
			engine.step(m.nodes_mut());
		}

		let pinned = m.node(1).unwrap();
		assert_eq!((pinned.x, pinned.y), (500.0, 400.0));
		let free = m.node(2).unwrap();
		assert!(
			(free.x - free_before.0).abs() > 1e-6 || (free.y - free_before.1).abs() > 1e-6,
			"free neighbor should have been displaced"
		);
	}

	#[test]
	fn drag_raises_alpha_target_until_release() {
		let mut m = seeded_model();
		let mut engine = LayoutEngine::new(1000.0, 800.0);
		engine.reseed(&m);

		// Let the layout settle down first.
		for _ in 0..600 {
			engine.step(m.nodes_mut());
		}
		let settled = engine.alpha();

		engine.begin_drag();
		for _ in 0..50 {
			engine.step(m.nodes_mut());
		}
		assert!(engine.alpha() > settled);

		engine.end_drag();
		for _ in 0..600 {
			engine.step(m.nodes_mut());
		}
		assert!(engine.alpha() < 0.05);
	}
}
