use {
    crate::{
        buffer::vec::VecBuffer,
        config::ProjectionConfig,
        error::{Result, ViewError},
        projection::watch::WatchTable,
        view::{
            item::ItemNotify,
            list::{ListDiff, ListView, ListViewExt},
            Observer, OuterViewPort,
        },
    },
    std::{
        hash::Hash,
        sync::{Arc, PoisonError, RwLock, Weak},
    },
    tracing::{debug, error, trace, warn},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Elements a filtering view can hold.
/// Equality is taken as element identity.
pub trait FilterItem: Clone + Eq + Hash + ItemNotify + Send + Sync + 'static {}

impl<T> FilterItem for T where T: Clone + Eq + Hash + ItemNotify + Send + Sync + 'static {}

/// One slot of the source as seen by a filtering view.
#[derive(Clone, Debug)]
pub struct Member<T> {
    pub item: T,
    pub passes: bool,
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                  Order
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/

/// Decides where passing elements sit in the derived list.
///
/// `members` always reflects the source including the slot
/// being asked about. The engine reports every change of the
/// source slots so an order can keep its own bookkeeping in step.
pub trait Order<T>: Send + Sync + 'static {
    /// Arrange the passing elements of a fresh snapshot,
    /// given in source order together with their slots.
    fn seed(&mut self, passing: Vec<(usize, T)>) -> Vec<T>;

    /// Derived index at which `item`, held by source slot `slot`,
    /// enters the view.
    fn entry_index(&self, members: &[Member<T>], slot: usize, item: &T) -> usize;

    /// Derived index of the passing element held by source slot `slot`.
    fn current_index(&self, members: &[Member<T>], slot: usize, item: &T) -> Option<usize>;

    /// Derived index of the element held by `slot` if it is no
    /// longer in place after the item changed on its own.
    fn stale_index(&self, _members: &[Member<T>], _slot: usize, _item: &T) -> Option<usize> {
        None
    }

    fn entered(&mut self, _idx: usize, _slot: usize, _item: &T) {}
    fn left(&mut self, _idx: usize) {}

    fn slot_inserted(&mut self, _slot: usize) {}
    fn slot_removed(&mut self, _slot: usize) {}
    fn slot_moved(&mut self, _from: usize, _to: usize) {}

    fn clear(&mut self) {}
}

/// Keep the relative order of the source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceOrder {
    passing: usize,
}

impl SourceOrder {
    /// Number of passing slots before `slot`, given that `total`
    /// slots of `members` pass. Counted from the nearer end, so
    /// appends and prepends cost nothing.
    fn rank<T>(members: &[Member<T>], slot: usize, total: usize) -> usize {
        if slot <= members.len() / 2 {
            members[..slot].iter().filter(|m| m.passes).count()
        } else {
            total - members[slot..].iter().filter(|m| m.passes).count()
        }
    }
}

impl<T> Order<T> for SourceOrder
where
    T: Send + Sync + 'static,
{
    fn seed(&mut self, passing: Vec<(usize, T)>) -> Vec<T> {
        self.passing = passing.len();
        passing.into_iter().map(|(_, item)| item).collect()
    }

    // the entering slot is flagged already but not yet counted
    fn entry_index(&self, members: &[Member<T>], slot: usize, _item: &T) -> usize {
        SourceOrder::rank(members, slot, self.passing + 1)
    }

    fn current_index(&self, members: &[Member<T>], slot: usize, _item: &T) -> Option<usize> {
        Some(SourceOrder::rank(members, slot, self.passing))
    }

    fn entered(&mut self, _idx: usize, _slot: usize, _item: &T) {
        self.passing += 1;
    }

    fn left(&mut self, _idx: usize) {
        self.passing -= 1;
    }

    fn clear(&mut self) {
        self.passing = 0;
    }
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                  Engine
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
pub(crate) struct FilterEngine<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    this: Weak<RwLock<FilterEngine<T, O>>>,
    pred: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    order: O,
    members: Vec<Member<T>>,
    watches: WatchTable<T>,
    out: VecBuffer<T>,
    fault: Option<ViewError>,
    disposed: bool,
    /// Set while an update runs; still set afterwards if it panicked.
    busy: bool,
    label: String,
}

impl<T, O> FilterEngine<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    fn watch(&mut self, item: &T) {
        if !T::CAN_CHANGE {
            return;
        }
        let engine = self.this.clone();
        let changed = item.clone();
        self.watches.watch(item, move || {
            if let Some(engine) = engine.upgrade() {
                engine
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_item_changed(&changed);
            }
        });
    }

    fn check_bounds(&self, action: &'static str, idx: usize, count: usize) -> Result<()> {
        let end = idx + count;
        if end > self.members.len() {
            return Err(ViewError::invalid(
                action,
                format!("slots {}..{} beyond source length {}", idx, end, self.members.len()),
            ));
        }
        Ok(())
    }

    /// First slot from `idx` on whose item differs from `items`.
    fn mismatch(&self, idx: usize, items: &[T]) -> Option<usize> {
        items
            .iter()
            .enumerate()
            .find(|(k, item)| self.members[idx + k].item != **item)
            .map(|(k, _)| idx + k)
    }

    fn check_items(&self, action: &'static str, idx: usize, items: &[T]) -> Result<()> {
        self.check_bounds(action, idx, items.len())?;
        match self.mismatch(idx, items) {
            Some(slot) => Err(ViewError::invalid(
                action,
                format!("item at slot {} does not match the source", slot),
            )),
            None => Ok(()),
        }
    }

    fn seed(&mut self, view: Option<Arc<dyn ListView<T>>>) -> Result<()> {
        self.watches.clear();
        self.members.clear();
        self.order.clear();

        let items: Vec<T> = view.map(|v| v.iter().collect()).unwrap_or_default();
        for item in items {
            self.watch(&item);
            let passes = (self.pred)(&item);
            self.members.push(Member { item, passes });
        }

        let passing = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.passes)
            .map(|(slot, m)| (slot, m.item.clone()))
            .collect();
        let ordered = self.order.seed(passing);

        if !self.out.is_empty() {
            self.out.clear()?;
        }
        self.out.insert_many(0, ordered)
    }

    fn apply(&mut self, msg: &ListDiff<T>) -> Result<()> {
        match msg {
            ListDiff::Insert { idx, items } => self.insert(*idx, items),
            ListDiff::Remove { idx, items } => self.remove(*idx, items),
            ListDiff::Replace { idx, old, new } => self.replace(*idx, old, new),
            ListDiff::Move { from, to, item } => self.move_item(*from, *to, item),
            ListDiff::Reset => self.clear(),
        }
    }

    fn insert(&mut self, idx: usize, items: &[T]) -> Result<()> {
        if idx > self.members.len() {
            return Err(ViewError::invalid(
                "insert",
                format!("slot {} beyond source length {}", idx, self.members.len()),
            ));
        }

        let mut entering = Vec::new();
        for (k, item) in items.iter().enumerate() {
            let slot = idx + k;
            self.watch(item);
            let passes = (self.pred)(item);
            self.members.insert(
                slot,
                Member {
                    item: item.clone(),
                    passes,
                },
            );
            self.order.slot_inserted(slot);
            if passes {
                let d = self.order.entry_index(&self.members, slot, item);
                self.order.entered(d, slot, item);
                entering.push((d, item.clone()));
            }
        }
        self.emit_inserts(entering)
    }

    /// Removing items that are already gone is a re-delivered
    /// event and leaves the view as it is.
    fn remove(&mut self, idx: usize, items: &[T]) -> Result<()> {
        self.check_bounds("remove", idx, items.len())?;
        if let Some(slot) = self.mismatch(idx, items) {
            let gone = items
                .iter()
                .all(|item| !self.members.iter().any(|m| m.item == *item));
            if gone {
                warn!(view = %self.label, idx, count = items.len(), "removed items are not in the source; ignored");
                return Ok(());
            }
            return Err(ViewError::invalid(
                "remove",
                format!("item at slot {} does not match the source", slot),
            ));
        }

        let mut leaving = Vec::new();
        for item in items {
            if self.members[idx].passes {
                match self.order.current_index(&self.members, idx, item) {
                    Some(d) => {
                        self.order.left(d);
                        leaving.push(d);
                    }
                    None => warn!(view = %self.label, "removed item was not in the view"),
                }
            }
            self.members.remove(idx);
            self.order.slot_removed(idx);
            self.watches.unwatch(item);
        }
        self.emit_removes(leaving)
    }

    /// The new element is tested on its own: it only takes over
    /// the derived slot if it passes.
    fn replace(&mut self, idx: usize, old: &T, new: &T) -> Result<()> {
        self.check_items("replace", idx, std::slice::from_ref(old))?;

        self.watches.unwatch(old);
        self.watch(new);

        let was = self.members[idx].passes;
        let now = (self.pred)(new);

        let d_old = if was {
            self.order.current_index(&self.members, idx, old)
        } else {
            None
        };
        if let Some(d) = d_old {
            self.order.left(d);
        }

        self.members[idx] = Member {
            item: new.clone(),
            passes: now,
        };

        let d_new = if now {
            let d = self.order.entry_index(&self.members, idx, new);
            self.order.entered(d, idx, new);
            Some(d)
        } else {
            None
        };

        match (d_old, d_new) {
            (Some(a), Some(b)) if a == b => {
                self.out.replace(a, new.clone())?;
            }
            (a, b) => {
                if let Some(a) = a {
                    self.out.remove(a)?;
                }
                if let Some(b) = b {
                    self.out.insert(b, new.clone())?;
                }
            }
        }
        Ok(())
    }

    fn move_item(&mut self, from: usize, to: usize, item: &T) -> Result<()> {
        if to >= self.members.len() {
            return Err(ViewError::invalid(
                "move",
                format!("target slot {} beyond source length {}", to, self.members.len()),
            ));
        }
        self.check_items("move", from, std::slice::from_ref(item))?;

        let d_from = if self.members[from].passes {
            self.order.current_index(&self.members, from, item)
        } else {
            None
        };
        if let Some(d) = d_from {
            self.order.left(d);
        }

        let member = self.members.remove(from);
        self.members.insert(to, member);
        self.order.slot_moved(from, to);

        if let Some(d) = d_from {
            let d_to = self.order.entry_index(&self.members, to, item);
            self.order.entered(d_to, to, item);
            if d != d_to {
                self.out.move_item(d, d_to)?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.watches.clear();
        self.members.clear();
        self.order.clear();
        self.out.clear()
    }

    fn item_changed(&mut self, item: &T) -> Result<()> {
        let slots: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.item == *item)
            .map(|(slot, _)| slot)
            .collect();

        for slot in slots {
            let was = self.members[slot].passes;
            let now = (self.pred)(&self.members[slot].item);

            let d_old = match (was, now) {
                (false, false) => continue,
                (false, true) => None,
                (true, true) => match self.order.stale_index(&self.members, slot, item) {
                    Some(d) => Some(d),
                    None => continue,
                },
                (true, false) => self
                    .order
                    .stale_index(&self.members, slot, item)
                    .or_else(|| self.order.current_index(&self.members, slot, item)),
            };
            if let Some(d) = d_old {
                self.order.left(d);
            }

            self.members[slot].passes = now;

            let d_new = if now {
                let d = self.order.entry_index(&self.members, slot, item);
                self.order.entered(d, slot, item);
                Some(d)
            } else {
                None
            };

            match (d_old, d_new) {
                (Some(a), Some(b)) => {
                    if a != b {
                        self.out.move_item(a, b)?;
                    }
                }
                (Some(a), None) => {
                    self.out.remove(a)?;
                }
                (None, Some(b)) => {
                    self.out.insert(b, item.clone())?;
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    /// Indices were computed one after another, so each run of
    /// adjacent positions can go out as one diff.
    fn emit_inserts(&mut self, entering: Vec<(usize, T)>) -> Result<()> {
        let mut run: Option<(usize, Vec<T>)> = None;
        for (d, item) in entering {
            match run.as_mut() {
                Some((start, items)) if *start + items.len() == d => items.push(item),
                _ => {
                    if let Some((start, items)) = run.take() {
                        self.out.insert_many(start, items)?;
                    }
                    run = Some((d, vec![item]));
                }
            }
        }
        if let Some((start, items)) = run {
            self.out.insert_many(start, items)?;
        }
        Ok(())
    }

    fn emit_removes(&mut self, leaving: Vec<usize>) -> Result<()> {
        let mut run: Option<(usize, usize)> = None;
        for d in leaving {
            match run.as_mut() {
                Some((start, count)) if *start == d => *count += 1,
                _ => {
                    if let Some((start, count)) = run.take() {
                        self.out.remove_range(start, count)?;
                    }
                    run = Some((d, 1));
                }
            }
        }
        if let Some((start, count)) = run {
            self.out.remove_range(start, count)?;
        }
        Ok(())
    }

    /// Run one update unless the view is stopped. An update
    /// that never finished leaves the mirror untrustworthy.
    fn run(&mut self, update: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.disposed {
            return Err(ViewError::Disposed);
        }
        if self.busy {
            self.busy = false;
            self.settle(Err(ViewError::Interrupted));
        }
        if let Some(fault) = self.fault.clone() {
            return Err(fault);
        }
        self.busy = true;
        let result = update(self);
        self.busy = false;
        self.settle(result.clone());
        result
    }

    fn on_item_changed(&mut self, item: &T) {
        trace!(view = %self.label, "item changed");
        let _ = self.run(|engine| engine.item_changed(item));
    }

    fn settle(&mut self, result: Result<()>) {
        if let Err(err) = result {
            error!(view = %self.label, %err, "view is out of sync and must be disposed");
            self.fault = Some(err);
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.watches.clear();
        self.members.clear();
        self.order.clear();
        if !self.out.is_empty() {
            if let Err(err) = self.out.clear() {
                warn!(view = %self.label, %err, "clearing disposed view failed");
            }
        }
        debug!(view = %self.label, "filtering view disposed");
    }
}

impl<T, O> Observer<dyn ListView<T>> for FilterEngine<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    fn reset(&mut self, view: Option<Arc<dyn ListView<T>>>) {
        let _ = self.run(|engine| engine.seed(view));
    }

    fn notify(&mut self, msg: &ListDiff<T>) {
        trace!(view = %self.label, action = msg.action(), "source changed");
        let _ = self.run(|engine| engine.apply(msg));
    }
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                  Handle
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/

/// Live filtered view of a list.
///
/// Stays attached to its source until `dispose` is called or
/// the handle is dropped.
pub struct Filtered<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    engine: Arc<RwLock<FilterEngine<T, O>>>,
    source: OuterViewPort<dyn ListView<T>>,
    out: VecBuffer<T>,
}

/// Passing elements in source order.
pub type FilterList<T> = Filtered<T, SourceOrder>;

impl<T, O> Filtered<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    pub(crate) fn build(
        source: &OuterViewPort<dyn ListView<T>>,
        pred: Arc<dyn Fn(&T) -> bool + Send + Sync>,
        order: O,
        config: ProjectionConfig,
    ) -> Self {
        let out = VecBuffer::new();
        let label = config.label().to_string();

        let engine = Arc::new_cyclic(|this| {
            RwLock::new(FilterEngine {
                this: this.clone(),
                pred,
                order,
                members: Vec::new(),
                watches: WatchTable::new(),
                out: out.clone(),
                fault: None,
                disposed: false,
                busy: false,
                label,
            })
        });

        source.add_observer(engine.clone());

        debug!(
            view = config.label(),
            len = out.len(),
            watching = T::CAN_CHANGE,
            "filtering view attached"
        );

        Filtered {
            engine,
            source: source.clone(),
            out,
        }
    }

    pub fn port(&self) -> OuterViewPort<dyn ListView<T>> {
        self.out.get_port()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        self.out.get(idx)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.out.to_vec()
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.out.index_of(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Number of source elements currently watched for changes.
    pub fn watch_count(&self) -> usize {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .watches
            .len()
    }

    /// The error that stopped this view, if any.
    pub fn fault(&self) -> Option<ViewError> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fault
            .clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .disposed
    }

    /// Feed a change of the source directly.
    /// An error faults the view just like one arriving from the source port.
    pub fn apply(&self, diff: &ListDiff<T>) -> Result<()> {
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .run(|engine| engine.apply(diff))
    }

    /// Detach from the source and from every item, then clear the view.
    /// Calling it again does nothing.
    pub fn dispose(&self) {
        let engine: Arc<RwLock<dyn Observer<dyn ListView<T>>>> = self.engine.clone();
        self.source.remove_observer(&engine);
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .dispose();
    }
}

impl<T, O> Drop for Filtered<T, O>
where
    T: FilterItem,
    O: Order<T>,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> Filtered<T, SourceOrder>
where
    T: FilterItem,
{
    pub fn new<P>(source: &OuterViewPort<dyn ListView<T>>, pred: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::with_config(source, pred, ProjectionConfig::default())
    }

    pub fn with_config<P>(
        source: &OuterViewPort<dyn ListView<T>>,
        pred: P,
        config: ProjectionConfig,
    ) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filtered::build(source, Arc::new(pred), SourceOrder::default(), config)
    }
}

impl<T> OuterViewPort<dyn ListView<T>>
where
    T: FilterItem,
{
    pub fn filter_list<P>(&self, pred: P) -> FilterList<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        FilterList::new(self, pred)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
