use futures::future::LocalBoxFuture;

/// Runs submissions on the browser event loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl formbind::Spawner for BrowserSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}
