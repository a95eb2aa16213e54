//! Per-thread execution context flags.
//!
//! A policy only polices code running inside a [`RenderScope`] (unless it was built with a
//! custom render-thread predicate). Scopes nest and are released on drop, including while
//! unwinding. Threads spawned from inside a scope start outside of it.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static RENDER_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LOGGER_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as executing untrusted rendering code.
#[must_use = "the render scope ends when the guard is dropped"]
pub struct RenderScope {
    // Tied to the thread that entered it
    _not_send: PhantomData<*const ()>,
}

impl RenderScope {
    pub fn enter() -> Self {
        RENDER_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Run `f` inside a render scope
    pub fn run<T>(f: impl FnOnce() -> T) -> T {
        let _scope = Self::enter();
        f()
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        RENDER_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while the current thread is inside at least one [`RenderScope`]
pub fn is_render_thread() -> bool {
    RENDER_DEPTH.with(|depth| depth.get() > 0)
}

/// Marks the current thread as running the logging framework.
///
/// Logging backends enumerate every property while formatting records; that bulk
/// enumeration is allowed while a logger scope is open.
#[must_use = "the logger scope ends when the guard is dropped"]
pub struct LoggerScope {
    _not_send: PhantomData<*const ()>,
}

impl LoggerScope {
    pub fn enter() -> Self {
        LOGGER_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for LoggerScope {
    fn drop(&mut self) {
        LOGGER_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub fn in_logger_scope() -> bool {
    LOGGER_DEPTH.with(|depth| depth.get() > 0)
}
