use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::{InputSnapshot, Palette, ResultView, Selectors};

/// Handler attached to a submit button.
pub type ClickHandler = Rc<dyn Fn()>;

pub type DynFormContainer = Rc<dyn FormContainer>;

/// An environment that owns form elements (a browser document, an in-memory
/// document, ...).
pub trait FormHost {
    /// Find all form containers matching the selectors.
    ///
    /// Containers without a submit button or without a result element are not
    /// returned.
    fn forms(&self, selectors: &Selectors) -> Result<Vec<DynFormContainer>, anyhow::Error>;
}

/// A single form container, with its submit button and result element
/// already resolved.
pub trait FormContainer {
    /// The configured action name, read from the container attribute.
    fn action(&self) -> Option<String>;

    /// Current state of all inputs inside the container.
    ///
    /// Read at submit time; hosts must not cache values.
    fn inputs(&self) -> Vec<InputSnapshot>;

    fn is_submit_disabled(&self) -> bool;

    fn set_submit_disabled(&self, disabled: bool);

    /// Write the view into the result element, apply the tone color and make
    /// the element visible.
    fn show_result(&self, view: &ResultView, palette: &Palette);

    /// Attach a click handler to the submit button.
    ///
    /// Clicks on a disabled button must not invoke the handler.
    fn on_submit_click(&self, handler: ClickHandler);
}

/// Runs submission futures on the host's event loop.
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

impl<S: Spawner + ?Sized> Spawner for Rc<S> {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.as_ref().spawn(task)
    }
}

impl Spawner for futures::executor::LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(error) = futures::task::LocalSpawnExt::spawn_local(self, task) {
            tracing::error!(%error, "spawn::failed - executor has shut down");
        }
    }
}
