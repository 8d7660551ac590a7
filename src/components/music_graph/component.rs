use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window,
};

use super::interaction::HoverLink;
use super::render::CanvasBackend;
use super::service::{DataService, FetchCommand, FetchKind};
use super::state::MusicGraphState;
use super::sync::fit_label_default;

const FRAME_MS: f64 = 16.0;

struct GraphApp {
	state: MusicGraphState,
	backend: CanvasBackend,
	width: f64,
	height: f64,
}

impl GraphApp {
	fn new(width: f64, height: f64) -> Self {
		GraphApp {
			state: MusicGraphState::new(width, height),
			backend: CanvasBackend::new(),
			width,
			height,
		}
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.state.resize(width, height);
	}

	fn frame(&mut self, ctx: &CanvasRenderingContext2d) {
		self.state.tick(FRAME_MS);
		self.state
			.flush_sync(fit_label_default, &mut self.backend);
		self.backend.draw(
			&self.state.model,
			&self.state.interaction,
			&self.state.menu,
			ctx,
			self.width,
			self.height,
			FRAME_MS,
		);
	}
}

type SharedApp = Rc<RefCell<Option<GraphApp>>>;

/// Run the service query a fetch command is bound to and merge its result.
/// A failed call only logs; the graph is left untouched.
fn dispatch_commands(app: &SharedApp, service: &Rc<dyn DataService>) {
	let commands = app
		.borrow_mut()
		.as_mut()
		.map(|a| a.state.take_commands())
		.unwrap_or_default();
	for command in commands {
		let app = app.clone();
		let service = service.clone();
		spawn_local(async move {
			let FetchCommand { node, kind } = command;
			let result = match kind {
				FetchKind::Related { mbid } => service.get_related(&mbid).await,
				FetchKind::Members { mbid } => service.get_group_members(&mbid).await,
				FetchKind::Path { from_mbid, to_mbid } => {
					service.get_path(&from_mbid, &to_mbid).await
				}
				FetchKind::ArtistTags { mbid } => service.get_artist_tags(&mbid).await,
				FetchKind::ReleaseDetails { mbid } => {
					service.get_release_details(&mbid).await.map(Into::into)
				}
				FetchKind::RelatedTags { mbid } => service.get_related_tags(&mbid).await,
			};
			match result {
				Ok(delta) => {
					if let Some(app) = app.borrow_mut().as_mut() {
						app.state.apply_fetched(node, delta);
					}
				}
				Err(err) => warn!("fetch failed: {err}"),
			}
		});
	}
}

fn event_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Interactive music-graph canvas. The graph starts empty and populates
/// from a `get_related` expansion of `seed_mbid`.
#[component]
pub fn MusicGraphCanvas(
	/// Query interface the menu actions fetch through.
	service: Rc<dyn DataService>,
	/// Correlation key of the artist the graph is seeded from.
	#[prop(into)]
	seed_mbid: String,
	/// Optional side-panel signal receiving the hovered node's match rows.
	#[prop(into, optional)]
	hover_links: Option<RwSignal<Vec<HoverLink>>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let app: SharedApp = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let key_cbs: Rc<RefCell<Vec<Closure<dyn FnMut(KeyboardEvent)>>>> =
		Rc::new(RefCell::new(Vec::new()));

	let (app_init, animate_init, resize_cb_init, key_cbs_init) =
		(app.clone(), animate.clone(), resize_cb.clone(), key_cbs.clone());
	let (service_init, seed_init) = (service.clone(), seed_mbid.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = (
			window.inner_width().unwrap().as_f64().unwrap(),
			window.inner_height().unwrap().as_f64().unwrap(),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*app_init.borrow_mut() = Some(GraphApp::new(w, h));

		// Seed expansion: the matching response row becomes the origin.
		{
			let app = app_init.clone();
			let service = service_init.clone();
			let seed = seed_init.clone();
			spawn_local(async move {
				match service.get_related(&seed).await {
					Ok(delta) => {
						if let Some(app) = app.borrow_mut().as_mut() {
							app.state.apply_initial(delta, &seed);
						}
					}
					Err(err) => warn!("seed expansion failed: {err}"),
				}
			});
		}

		{
			let (app_resize, canvas_resize) = (app_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(app) = app_resize.borrow_mut().as_mut() {
					app.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ = window
					.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// Pan-mode modifier tracking lives on the window so the flag
		// releases even when the pointer is elsewhere.
		{
			let app_key = app_init.clone();
			let down: Closure<dyn FnMut(KeyboardEvent)> = Closure::new(move |ev: KeyboardEvent| {
				if let Some(app) = app_key.borrow_mut().as_mut() {
					app.state.key_down(&ev.key());
				}
			});
			let app_key = app_init.clone();
			let up: Closure<dyn FnMut(KeyboardEvent)> = Closure::new(move |ev: KeyboardEvent| {
				if let Some(app) = app_key.borrow_mut().as_mut() {
					app.state.key_up(&ev.key());
				}
			});
			let _ = window
				.add_event_listener_with_callback("keydown", down.as_ref().unchecked_ref());
			let _ =
				window.add_event_listener_with_callback("keyup", up.as_ref().unchecked_ref());
			key_cbs_init.borrow_mut().extend([down, up]);
		}

		let (app_anim, animate_inner) = (app_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(app) = app_anim.borrow_mut().as_mut() {
				app.frame(&ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (app_md, service_md) = (app.clone(), service.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_position(&canvas, &ev);
		if let Some(app) = app_md.borrow_mut().as_mut() {
			app.state.pointer_down(x, y);
		}
		// A wedge press may have queued a fetch.
		dispatch_commands(&app_md, &service_md);
	};

	let app_mm = app.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_position(&canvas, &ev);
		if let Some(app) = app_mm.borrow_mut().as_mut() {
			let hover_changed = app.state.pointer_move(x, y);
			if hover_changed {
				if let Some(signal) = hover_links {
					signal.set(app.state.hover_links().to_vec());
				}
			}
		}
	};

	let app_mu = app.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(app) = app_mu.borrow_mut().as_mut() {
			app.state.pointer_up();
		}
	};

	let app_cl = app.clone();
	let on_click = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_position(&canvas, &ev);
		if let Some(app) = app_cl.borrow_mut().as_mut() {
			app.state.click(x, y);
		}
	};

	let app_db = app.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_position(&canvas, &ev);
		if let Some(app) = app_db.borrow_mut().as_mut() {
			app.state.secondary(x, y);
		}
	};

	let app_cm = app.clone();
	let on_contextmenu = move |ev: MouseEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_position(&canvas, &ev);
		if let Some(app) = app_cm.borrow_mut().as_mut() {
			app.state.secondary(x, y);
		}
	};

	let app_ml = app.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(app) = app_ml.borrow_mut().as_mut() {
			app.state.pointer_leave();
		}
		if let Some(signal) = hover_links {
			signal.set(Vec::new());
		}
	};

	let app_wh = app.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let rect = canvas.get_bounding_client_rect();
		let (x, y) = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);
		if let Some(app) = app_wh.borrow_mut().as_mut() {
			app.state.wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="music-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:click=on_click
			on:dblclick=on_dblclick
			on:contextmenu=on_contextmenu
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
