use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use formbind::ClickHandler;

/// A minimal element node.
///
/// Carries just the state a form binding reads or writes: classes,
/// attributes, an input value, text content, a text color, visibility and the
/// disabled flag. Clones share the same node.
#[derive(Clone)]
pub struct MemoryElement {
    node: Rc<Node>,
}

struct Node {
    tag: String,
    classes: RefCell<Vec<String>>,
    attributes: RefCell<BTreeMap<String, String>>,
    value: RefCell<String>,
    text: RefCell<String>,
    color: RefCell<Option<String>>,
    visible: Cell<bool>,
    disabled: Cell<bool>,
    children: RefCell<Vec<MemoryElement>>,
    click_handlers: RefCell<Vec<ClickHandler>>,
}

impl std::fmt::Debug for MemoryElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryElement")
            .field("tag", &self.node.tag)
            .field("classes", &self.node.classes.borrow())
            .field("attributes", &self.node.attributes.borrow())
            .finish()
    }
}

impl MemoryElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(Node {
                tag: tag.into(),
                classes: RefCell::new(Vec::new()),
                attributes: RefCell::new(BTreeMap::new()),
                value: RefCell::new(String::new()),
                text: RefCell::new(String::new()),
                color: RefCell::new(None),
                visible: Cell::new(true),
                disabled: Cell::new(false),
                children: RefCell::new(Vec::new()),
                click_handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn with_class(self, class: impl Into<String>) -> Self {
        self.node.classes.borrow_mut().push(class.into());
        self
    }

    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_value(self, value: impl Into<String>) -> Self {
        self.set_value(value);
        self
    }

    pub fn with_child(self, child: MemoryElement) -> Self {
        self.append_child(child);
        self
    }

    pub fn hidden(self) -> Self {
        self.node.visible.set(false);
        self
    }

    pub fn tag(&self) -> &str {
        &self.node.tag
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node.classes.borrow().iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.node.attributes.borrow().get(name).cloned()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.node
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    pub fn remove_attr(&self, name: &str) -> Option<String> {
        self.node.attributes.borrow_mut().remove(name)
    }

    pub fn value(&self) -> String {
        self.node.value.borrow().clone()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *self.node.value.borrow_mut() = value.into();
    }

    pub fn text(&self) -> String {
        self.node.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.node.text.borrow_mut() = text.into();
    }

    /// Inline text color, if one was set.
    pub fn color(&self) -> Option<String> {
        self.node.color.borrow().clone()
    }

    pub fn set_color(&self, color: impl Into<String>) {
        *self.node.color.borrow_mut() = Some(color.into());
    }

    pub fn is_visible(&self) -> bool {
        self.node.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.node.visible.set(visible);
    }

    pub fn is_disabled(&self) -> bool {
        self.node.disabled.get()
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.node.disabled.set(disabled);
    }

    pub fn append_child(&self, child: MemoryElement) {
        self.node.children.borrow_mut().push(child);
    }

    pub fn children(&self) -> Vec<MemoryElement> {
        self.node.children.borrow().clone()
    }

    /// All descendants carrying the class, in document order.
    ///
    /// The element itself is not included.
    pub fn find_by_class(&self, class: &str) -> Vec<MemoryElement> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class(&self, class: &str, found: &mut Vec<MemoryElement>) {
        for child in self.node.children.borrow().iter() {
            if child.has_class(class) {
                found.push(child.clone());
            }
            child.collect_by_class(class, found);
        }
    }

    pub fn add_click_handler(&self, handler: ClickHandler) {
        self.node.click_handlers.borrow_mut().push(handler);
    }

    /// Dispatch a click.
    ///
    /// Disabled elements swallow clicks. Returns whether handlers were run.
    pub fn click(&self) -> bool {
        if self.is_disabled() {
            tracing::trace!(tag = %self.node.tag, "click::ignored_disabled");
            return false;
        }
        // Handlers may touch this element, so don't hold the borrow.
        let handlers = self.node.click_handlers.borrow().clone();
        for handler in handlers {
            handler();
        }
        true
    }

    /// Whether both handles point to the same node.
    pub fn same_node(&self, other: &MemoryElement) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_find_by_class_is_document_order() {
        let a = MemoryElement::new("input").with_class("field");
        let b = MemoryElement::new("input").with_class("field");
        let c = MemoryElement::new("input").with_class("field");
        let root = MemoryElement::new("div")
            .with_class("field")
            .with_child(a.clone())
            .with_child(MemoryElement::new("fieldset").with_child(b.clone()))
            .with_child(c.clone());

        let found = root.find_by_class("field");
        assert_eq!(found.len(), 3);
        assert!(found[0].same_node(&a));
        assert!(found[1].same_node(&b));
        assert!(found[2].same_node(&c));
    }

    #[test]
    fn test_click_respects_disabled() {
        let clicks = Rc::new(Cell::new(0));
        let button = MemoryElement::new("button");
        let counter = clicks.clone();
        button.add_click_handler(Rc::new(move || counter.set(counter.get() + 1)));

        assert!(button.click());
        button.set_disabled(true);
        assert!(!button.click());
        button.set_disabled(false);
        assert!(button.click());

        assert_eq!(clicks.get(), 2);
    }
}
