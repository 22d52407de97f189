use std::time::Duration;

use dronedash_engine::Runtime;
use futures::future::LocalBoxFuture;

/// Browser event loop: tasks go to the microtask queue, sleeps to `setTimeout`.
pub struct WasmRuntime;

impl Runtime for WasmRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(gloo_timers::future::sleep(duration))
    }
}
