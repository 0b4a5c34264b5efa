//! Binds `.myForm` containers of a browser page.
//!
//! From JavaScript:
//!
//! ```js
//! import init, { bind_document } from "./formbind_web.js";
//!
//! await init();
//! bind_document(); // submits to the page origin
//! ```
//!
//! With the default `console-log` feature, binding installs a global tracing
//! subscriber that writes to the browser console, unless the embedding code
//! already installed one. Without it, warnings such as a form missing its
//! result element are only visible to a subscriber set up by the caller.

mod host;
mod spawner;

use std::{cell::RefCell, rc::Rc};

use formbind::{BinderOptions, BoundForm, DynTransport, FormBinder, FormHost};
use formbind_http::HttpTransport;
use wasm_bindgen::prelude::*;

pub use self::{host::WebHost, spawner::BrowserSpawner};

thread_local! {
    // Bound forms live as long as the page.
    static BOUND: RefCell<Vec<BoundForm>> = const { RefCell::new(Vec::new()) };
}

/// Bind every form in the current document.
///
/// Requests go to `base_url`, or the page origin when omitted.
/// Returns the number of bound forms.
#[wasm_bindgen]
pub fn bind_document(base_url: Option<String>) -> Result<u32, JsValue> {
    let host = WebHost::document().map_err(to_js_error)?;
    bind_host(&host, base_url, BinderOptions::default())
}

/// Bind the forms below `root`.
///
/// `options` is an optional object with `selectors` and `palette`, eg:
/// `{ palette: { alert: "orange" } }`. Missing keys keep their defaults.
#[wasm_bindgen]
pub fn bind_root(
    root: web_sys::Element,
    base_url: Option<String>,
    options: JsValue,
) -> Result<u32, JsValue> {
    let options = if options.is_undefined() || options.is_null() {
        BinderOptions::default()
    } else {
        serde_wasm_bindgen::from_value::<BinderOptions>(options)
            .map_err(|err| JsValue::from(js_sys::Error::new(&format!("invalid options: {err}"))))?
    };
    bind_host(&WebHost::new(root), base_url, options)
}

/// Drop all bindings made so far and remove their click listeners.
#[wasm_bindgen]
pub fn unbind_all() {
    BOUND.with(|bound| bound.borrow_mut().clear());
}

fn bind_host(
    host: &dyn FormHost,
    base_url: Option<String>,
    options: BinderOptions,
) -> Result<u32, JsValue> {
    #[cfg(feature = "console-panic")]
    console_error_panic_hook::set_once();
    #[cfg(feature = "console-log")]
    init_console_log();

    let base_url = match base_url {
        Some(url) => url,
        None => page_origin().map_err(to_js_error)?,
    };
    let transport = HttpTransport::from_uri(&base_url).map_err(to_js_error)?;

    let binder = FormBinder::new(
        Rc::new(transport) as DynTransport,
        Rc::new(BrowserSpawner),
    )
    .with_options(options);
    let forms = binder.bind(host).map_err(to_js_error)?;

    let count = forms.len() as u32;
    BOUND.with(|bound| bound.borrow_mut().extend(forms));
    Ok(count)
}

#[cfg(feature = "console-log")]
fn init_console_log() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        // Fails if the page installed its own subscriber, which then stays.
        if tracing_wasm::try_set_as_global_default().is_ok() {
            tracing::debug!("console logging enabled");
        }
    });
}

fn page_origin() -> Result<String, anyhow::Error> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window available"))?;
    window
        .location()
        .origin()
        .map_err(|err| anyhow::anyhow!("could not read page origin: {err:?}"))
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{err:#}")).into()
}
