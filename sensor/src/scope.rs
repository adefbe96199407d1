//! Exit stack for per-tick resources.

use std::cell::RefCell;
use std::fmt;

type ExitCallback = Box<dyn FnOnce() + Send>;

/// Callbacks run in reverse registration order when the stack is closed or
/// dropped. Each callback runs at most once.
#[derive(Default)]
pub struct ExitStack {
    callbacks: RefCell<Vec<ExitCallback>>,
}

impl ExitStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.callbacks.borrow_mut().push(Box::new(callback));
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every pending callback, newest first.
    pub fn close(&self) {
        // Pop one at a time so a callback may register another without a
        // double borrow.
        loop {
            let next = self.callbacks.borrow_mut().pop();
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }
}

impl Drop for ExitStack {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ExitStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitStack")
            .field("pending", &self.len())
            .finish()
    }
}
