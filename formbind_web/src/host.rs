use std::{cell::RefCell, rc::Rc};

use formbind::{
    ClickHandler, DynFormContainer, FieldKind, FormContainer, FormHost, InputSnapshot, Palette,
    ResultView, Selectors,
};
use wasm_bindgen::{JsCast as _, JsValue, closure::Closure};
use web_sys::{Element, Event, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

const DISABLED_ATTR: &str = "disabled";

/// Forms below a DOM element.
///
/// Usually the document element, see [`WebHost::document`].
#[derive(Clone, Debug)]
pub struct WebHost {
    root: Element,
}

impl WebHost {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Host for the whole document of the current window.
    pub fn document() -> Result<Self, anyhow::Error> {
        let root = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.document_element())
            .ok_or_else(|| anyhow::anyhow!("no document available"))?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

impl FormHost for WebHost {
    fn forms(&self, selectors: &Selectors) -> Result<Vec<DynFormContainer>, anyhow::Error> {
        let roots = query_all(&self.root, &selectors.form_class)?;

        let mut forms = Vec::with_capacity(roots.len());
        for root in roots {
            let Some(submit) = query_first(&root, &selectors.submit_class)? else {
                tracing::warn!(id = %root.id(), "scan::skipped_form - no submit element");
                continue;
            };
            let Some(result) = query_first(&root, &selectors.result_class)? else {
                tracing::warn!(id = %root.id(), "scan::skipped_form - no result element");
                continue;
            };

            forms.push(Rc::new(WebFormContainer {
                root,
                submit,
                result,
                input_class: selectors.input_class.clone(),
                action_attribute: selectors.action_attribute.clone(),
                listeners: RefCell::new(Vec::new()),
            }) as DynFormContainer);
        }
        Ok(forms)
    }
}

fn class_selector(class: &str) -> String {
    format!(".{class}")
}

fn js_error(context: &str, value: JsValue) -> anyhow::Error {
    anyhow::anyhow!("{context}: {value:?}")
}

/// All descendants of `root` carrying the class, in document order.
fn query_all(root: &Element, class: &str) -> Result<Vec<HtmlElement>, anyhow::Error> {
    let nodes = root
        .query_selector_all(&class_selector(class))
        .map_err(|e| js_error("invalid selector", e))?;

    let mut elements = Vec::with_capacity(nodes.length() as usize);
    for index in 0..nodes.length() {
        if let Some(el) = nodes.item(index).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
            elements.push(el);
        }
    }
    Ok(elements)
}

fn query_first(root: &Element, class: &str) -> Result<Option<HtmlElement>, anyhow::Error> {
    let el = root
        .query_selector(&class_selector(class))
        .map_err(|e| js_error("invalid selector", e))?;
    Ok(el.and_then(|el| el.dyn_into::<HtmlElement>().ok()))
}

/// The current value of a form control.
///
/// Elements that are not form controls report their text content.
fn element_value(el: &HtmlElement) -> String {
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
        select.value()
    } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.value()
    } else {
        el.text_content().unwrap_or_default()
    }
}

type Listener = Closure<dyn FnMut(Event)>;

struct WebFormContainer {
    root: HtmlElement,
    submit: HtmlElement,
    result: HtmlElement,
    input_class: String,
    action_attribute: String,
    // Removed from the button on drop.
    listeners: RefCell<Vec<Listener>>,
}

impl FormContainer for WebFormContainer {
    fn action(&self) -> Option<String> {
        self.root.get_attribute(&self.action_attribute)
    }

    fn inputs(&self) -> Vec<InputSnapshot> {
        let elements = match query_all(&self.root, &self.input_class) {
            Ok(elements) => elements,
            Err(error) => {
                tracing::error!(%error, "collect::failed");
                return Vec::new();
            }
        };

        elements
            .iter()
            .map(|el| InputSnapshot {
                name: el.get_attribute("name"),
                kind: FieldKind::from_type_attr(el.get_attribute("type").as_deref()),
                raw: element_value(el),
            })
            .collect()
    }

    fn is_submit_disabled(&self) -> bool {
        self.submit.has_attribute(DISABLED_ATTR)
    }

    fn set_submit_disabled(&self, disabled: bool) {
        let res = if disabled {
            self.submit.set_attribute(DISABLED_ATTR, "")
        } else {
            self.submit.remove_attribute(DISABLED_ATTR)
        };
        if let Err(error) = res {
            tracing::error!(?error, disabled, "submit::toggle_failed");
        }
    }

    fn show_result(&self, view: &ResultView, palette: &Palette) {
        self.result.set_text_content(Some(&view.text));

        let style = self.result.style();
        if let Err(error) = style.set_property("color", palette.color(view.tone)) {
            tracing::error!(?error, "render::color_failed");
        }
        if let Err(error) = style.remove_property("display") {
            tracing::error!(?error, "render::show_failed");
        }
        self.result.set_hidden(false);
    }

    fn on_submit_click(&self, handler: ClickHandler) {
        let submit = self.submit.clone();
        let listener = Closure::wrap(Box::new(move |_event: Event| {
            // Non-control elements still dispatch clicks while disabled.
            if submit.has_attribute(DISABLED_ATTR) {
                return;
            }
            handler();
        }) as Box<dyn FnMut(Event)>);

        if let Err(error) = self
            .submit
            .add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())
        {
            tracing::error!(?error, "bind::listener_failed");
            return;
        }
        self.listeners.borrow_mut().push(listener);
    }
}

impl Drop for WebFormContainer {
    fn drop(&mut self) {
        for listener in self.listeners.get_mut().drain(..) {
            let _ = self
                .submit
                .remove_event_listener_with_callback("click", listener.as_ref().unchecked_ref());
        }
    }
}
