use leptos::*;

use presale_view::app::App;
use presale_view::logging::setup_logging;

fn main() {
    console_error_panic_hook::set_once();
    setup_logging();
    mount_to_body(|| view! { <App/> })
}
