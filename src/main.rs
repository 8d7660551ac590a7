//! Client entry point.
#![allow(unused_crate_dependencies)]

use music_graph_canvas::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App);
}
