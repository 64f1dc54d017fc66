use {
    crate::view::item::{ItemNotify, ItemWatch},
    std::{collections::HashMap, hash::Hash},
};

/// Item subscriptions of a view, keyed by item identity.
///
/// An identity that occurs several times in the source holds one
/// watch per occurrence, so removing one occurrence keeps the others
/// subscribed.
pub(crate) struct WatchTable<T>
where
    T: ItemNotify + Clone + Eq + Hash,
{
    watches: HashMap<T, Vec<ItemWatch>>,
    count: usize,
}

impl<T> WatchTable<T>
where
    T: ItemNotify + Clone + Eq + Hash,
{
    pub fn new() -> Self {
        WatchTable {
            watches: HashMap::new(),
            count: 0,
        }
    }

    pub fn watch(&mut self, item: &T, on_change: impl Fn() + Send + Sync + 'static) {
        if !T::CAN_CHANGE {
            return;
        }
        if let Some(w) = item.watch(Box::new(on_change)) {
            self.watches.entry(item.clone()).or_default().push(w);
            self.count += 1;
        }
    }

    pub fn unwatch(&mut self, item: &T) {
        if let Some(ws) = self.watches.get_mut(item) {
            if ws.pop().is_some() {
                self.count -= 1;
            }
            if ws.is_empty() {
                self.watches.remove(item);
            }
        }
    }

    pub fn clear(&mut self) {
        self.watches.clear();
        self.count = 0;
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.count
    }
}
