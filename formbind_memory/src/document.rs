use std::{cell::RefCell, rc::Rc};

use formbind::{
    ClickHandler, DynFormContainer, FieldKind, FormContainer, FormHost, FormLayout, InputSnapshot,
    Palette, ResultView, Selectors,
};

use crate::MemoryElement;

/// In-memory document.
///
/// Forms are plain element trees below [`Self::body`]; they can be built by
/// hand or from a [`FormLayout`] with [`Self::add_form`].
///
/// Like a browser page, the document owns the form containers it hands out,
/// so bindings stay active as long as the document is alive.
#[derive(Clone, Debug)]
pub struct MemoryDocument {
    body: MemoryElement,
    containers: Rc<RefCell<Vec<Rc<MemoryFormContainer>>>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            body: MemoryElement::new("body"),
            containers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn body(&self) -> &MemoryElement {
        &self.body
    }

    /// Append a form built from the layout.
    ///
    /// The form looks like what a page would contain:
    /// a container with the action attribute, one input per layout input,
    /// a submit button and a hidden result element.
    pub fn add_form(&self, layout: &FormLayout, selectors: &Selectors) -> MemoryForm {
        let root = MemoryElement::new("div")
            .with_class(&selectors.form_class)
            .with_attr(&selectors.action_attribute, &layout.action);

        let mut inputs = Vec::with_capacity(layout.inputs.len());
        for input in &layout.inputs {
            let el = MemoryElement::new("input")
                .with_class(&selectors.input_class)
                .with_attr("name", &input.name)
                .with_attr("type", input.kind.type_attr())
                .with_value(&input.value);
            root.append_child(el.clone());
            inputs.push(el);
        }

        let submit = MemoryElement::new("button").with_class(&selectors.submit_class);
        let result = MemoryElement::new("pre")
            .with_class(&selectors.result_class)
            .hidden();
        root.append_child(submit.clone());
        root.append_child(result.clone());

        self.body.append_child(root.clone());

        MemoryForm {
            root,
            submit,
            result,
            inputs,
        }
    }
}

impl FormHost for MemoryDocument {
    fn forms(&self, selectors: &Selectors) -> Result<Vec<DynFormContainer>, anyhow::Error> {
        let mut forms = Vec::new();
        for root in self.body.find_by_class(&selectors.form_class) {
            let Some(submit) = root.find_by_class(&selectors.submit_class).into_iter().next()
            else {
                tracing::warn!(?root, "scan::skipped_form - no submit element");
                continue;
            };
            let Some(result) = root.find_by_class(&selectors.result_class).into_iter().next()
            else {
                tracing::warn!(?root, "scan::skipped_form - no result element");
                continue;
            };

            let container = Rc::new(MemoryFormContainer {
                root,
                submit,
                result,
                input_class: selectors.input_class.clone(),
                action_attribute: selectors.action_attribute.clone(),
            });
            self.containers.borrow_mut().push(container.clone());
            forms.push(container as DynFormContainer);
        }
        Ok(forms)
    }
}

/// Handles to the elements of a form created by [`MemoryDocument::add_form`].
#[derive(Clone, Debug)]
pub struct MemoryForm {
    pub root: MemoryElement,
    pub submit: MemoryElement,
    pub result: MemoryElement,
    inputs: Vec<MemoryElement>,
}

impl MemoryForm {
    pub fn action(&self, selectors: &Selectors) -> Option<String> {
        self.root.attr(&selectors.action_attribute)
    }

    pub fn inputs(&self) -> &[MemoryElement] {
        &self.inputs
    }

    /// The last input with the given name.
    pub fn input(&self, name: &str) -> Option<&MemoryElement> {
        self.inputs
            .iter()
            .rev()
            .find(|el| el.attr("name").as_deref() == Some(name))
    }
}

#[derive(Debug)]
struct MemoryFormContainer {
    root: MemoryElement,
    submit: MemoryElement,
    result: MemoryElement,
    input_class: String,
    action_attribute: String,
}

impl FormContainer for MemoryFormContainer {
    fn action(&self) -> Option<String> {
        self.root.attr(&self.action_attribute)
    }

    fn inputs(&self) -> Vec<InputSnapshot> {
        self.root
            .find_by_class(&self.input_class)
            .into_iter()
            .map(|el| InputSnapshot {
                name: el.attr("name"),
                kind: FieldKind::from_type_attr(el.attr("type").as_deref()),
                raw: el.value(),
            })
            .collect()
    }

    fn is_submit_disabled(&self) -> bool {
        self.submit.is_disabled()
    }

    fn set_submit_disabled(&self, disabled: bool) {
        self.submit.set_disabled(disabled);
    }

    fn show_result(&self, view: &ResultView, palette: &Palette) {
        self.result.set_text(&view.text);
        self.result.set_color(palette.color(view.tone));
        self.result.set_visible(true);
    }

    fn on_submit_click(&self, handler: ClickHandler) {
        self.submit.add_click_handler(handler);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_scan_skips_incomplete_forms() {
        let doc = MemoryDocument::new();
        let selectors = Selectors::default();

        doc.add_form(&FormLayout::new("reset"), &selectors);
        // No result element.
        doc.body().append_child(
            MemoryElement::new("div")
                .with_class("myForm")
                .with_attr("data-action", "broken")
                .with_child(MemoryElement::new("button").with_class("myFormSubmit")),
        );

        let forms = doc.forms(&selectors).unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].action().as_deref(), Some("reset"));
    }

    #[test]
    fn test_inputs_read_current_values() {
        let doc = MemoryDocument::new();
        let selectors = Selectors::default();
        let form = doc.add_form(
            &FormLayout::new("remote_start_transaction")
                .with_text("idTag", "tag-1")
                .with_number("transactionId", "1"),
            &selectors,
        );
        // Not a form input: no input class.
        form.root
            .append_child(MemoryElement::new("input").with_attr("name", "csrf"));

        let container = doc.forms(&selectors).unwrap().remove(0);
        form.input("idTag").unwrap().set_value("tag-2");

        assert_eq!(
            container.inputs(),
            vec![
                InputSnapshot::new("idTag", FieldKind::Text, "tag-2"),
                InputSnapshot::new("transactionId", FieldKind::Number, "1"),
            ]
        );
    }

    #[test]
    fn test_custom_selectors() {
        let doc = MemoryDocument::new();
        let selectors = Selectors {
            form_class: "remote".to_string(),
            action_attribute: "data-route".to_string(),
            ..Default::default()
        };
        doc.add_form(&FormLayout::new("reset"), &selectors);

        assert!(doc.forms(&Selectors::default()).unwrap().is_empty());
        let forms = doc.forms(&selectors).unwrap();
        assert_eq!(forms[0].action().as_deref(), Some("reset"));
    }
}
