//! Synchronous change notification channel.
//!
//! One event per logical mutation, delivered on the calling thread before
//! the mutating call returns. Subscribers register independently and must
//! not register further subscribers from inside a callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A field took a new explicit value.
    FieldSet,
    /// A field reverted to its declared default.
    FieldRestored,
    SectionAdded,
    SectionRemoved,
}

/// A change to the configuration, identified by full path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: Vec<String>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub(crate) fn new(path: Vec<String>, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

type Callback = Box<dyn Fn(&ChangeEvent)>;

/// Shared subscriber registry; cheap to clone, all clones deliver to the
/// same subscribers.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Rc<RefCell<Vec<Callback>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&ChangeEvent) + 'static) {
        self.inner.borrow_mut().push(Box::new(callback));
    }

    pub(crate) fn emit(&self, event: &ChangeEvent) {
        for callback in self.inner.borrow().iter() {
            callback(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.inner.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_subscribers_hear_each_event() {
        let subscribers = Subscribers::new();
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen_a);
        subscribers.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        let sink = Rc::clone(&seen_b);
        subscribers.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let event = ChangeEvent::new(vec!["a".to_string()], ChangeKind::FieldSet);
        subscribers.emit(&event);

        assert_eq!(seen_a.borrow().as_slice(), &[event.clone()]);
        assert_eq!(seen_b.borrow().as_slice(), &[event]);
    }

    #[test]
    fn test_clones_share_registry() {
        let subscribers = Subscribers::new();
        let clone = subscribers.clone();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        subscribers.subscribe(move |_| *sink.borrow_mut() += 1);

        clone.emit(&ChangeEvent::new(vec![], ChangeKind::SectionAdded));
        assert_eq!(*seen.borrow(), 1);
    }
}
