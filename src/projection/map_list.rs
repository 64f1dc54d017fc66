use {
    crate::{
        buffer::vec::VecBuffer,
        config::{DuplicatePolicy, ProjectionConfig},
        error::{Result, ViewError},
        view::{
            list::{ListDiff, ListView, ListViewExt},
            Observer, OuterViewPort,
        },
    },
    std::{
        collections::{HashMap, HashSet},
        hash::Hash,
        sync::{Arc, PoisonError, RwLock},
    },
    tracing::{debug, error, trace, warn},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Source slot of a converting view. A slot is left unmapped
/// when its input was already mapped and duplicates are ignored.
struct Slot<S> {
    item: S,
    mapped: bool,
}

pub(crate) struct MapEngine<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    f: Arc<dyn Fn(&S) -> T + Send + Sync>,
    slots: Vec<Slot<S>>,
    lookup: Arc<RwLock<HashMap<S, T>>>,
    out: VecBuffer<T>,
    duplicates: DuplicatePolicy,
    /// Number of unmapped slots.
    skipped: usize,
    fault: Option<ViewError>,
    disposed: bool,
    busy: bool,
    label: String,
}

impl<S, T> MapEngine<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Derived index of source slot `slot`. Without skipped
    /// duplicates the view mirrors the source slot for slot.
    fn rank(&self, slot: usize) -> usize {
        if self.skipped == 0 {
            slot
        } else if slot <= self.slots.len() / 2 {
            self.slots[..slot].iter().filter(|s| s.mapped).count()
        } else {
            let mapped = self.slots.len() - self.skipped;
            mapped - self.slots[slot..].iter().filter(|s| s.mapped).count()
        }
    }

    fn check_items(&self, action: &'static str, idx: usize, items: &[S]) -> Result<()> {
        let end = idx + items.len();
        if end > self.slots.len() {
            return Err(ViewError::invalid(
                action,
                format!("slots {}..{} beyond source length {}", idx, end, self.slots.len()),
            ));
        }
        for (k, item) in items.iter().enumerate() {
            if self.slots[idx + k].item != *item {
                return Err(ViewError::invalid(
                    action,
                    format!("item at slot {} does not match the source", idx + k),
                ));
            }
        }
        Ok(())
    }

    fn seed(&mut self, view: Option<Arc<dyn ListView<S>>>) -> Result<()> {
        self.slots.clear();
        self.skipped = 0;
        self.lookup.write().unwrap().clear();
        if !self.out.is_empty() {
            self.out.clear()?;
        }

        let items: Vec<S> = view.map(|v| v.iter().collect()).unwrap_or_default();
        self.insert(0, &items)
    }

    fn apply(&mut self, msg: &ListDiff<S>) -> Result<()> {
        match msg {
            ListDiff::Insert { idx, items } => self.insert(*idx, items),
            ListDiff::Remove { idx, items } => self.remove(*idx, items),
            ListDiff::Replace { idx, old, new } => self.replace(*idx, old, new),
            ListDiff::Move { from, to, item } => self.move_item(*from, *to, item),
            ListDiff::Reset => self.clear(),
        }
    }

    fn insert(&mut self, idx: usize, items: &[S]) -> Result<()> {
        if idx > self.slots.len() {
            return Err(ViewError::invalid(
                "insert",
                format!("slot {} beyond source length {}", idx, self.slots.len()),
            ));
        }

        // decide on every duplicate before touching any state
        let mut fresh = Vec::with_capacity(items.len());
        {
            let lookup = self.lookup.read().unwrap();
            let mut seen = HashSet::new();
            for item in items {
                let is_fresh = !lookup.contains_key(item) && seen.insert(item);
                if !is_fresh {
                    match self.duplicates {
                        DuplicatePolicy::Reject => return Err(ViewError::DuplicateIdentity),
                        DuplicatePolicy::Ignore => {
                            warn!(view = %self.label, "input is already mapped; skipped")
                        }
                    }
                }
                fresh.push(is_fresh);
            }
        }

        let mut outputs = Vec::new();
        let mut entries = Vec::new();
        for (item, is_fresh) in items.iter().zip(fresh.iter()) {
            if *is_fresh {
                let output = (self.f)(item);
                entries.push((item.clone(), output.clone()));
                outputs.push(output);
            }
        }

        self.lookup.write().unwrap().extend(entries);
        let start = self.rank(idx);
        self.skipped += fresh.iter().filter(|f| !**f).count();
        self.slots.splice(
            idx..idx,
            items.iter().zip(fresh).map(|(item, mapped)| Slot {
                item: item.clone(),
                mapped,
            }),
        );

        self.out.insert_many(start, outputs)
    }

    fn remove(&mut self, idx: usize, items: &[S]) -> Result<()> {
        self.check_items("remove", idx, items)?;

        let start = self.rank(idx);
        let mut count = 0;
        {
            let mut lookup = self.lookup.write().unwrap();
            for slot in self.slots.drain(idx..idx + items.len()) {
                if slot.mapped {
                    lookup.remove(&slot.item);
                    count += 1;
                } else {
                    self.skipped -= 1;
                    trace!(view = %self.label, "removed input was never mapped");
                }
            }
        }

        if count > 0 {
            self.out.remove_range(start, count)?;
        }
        Ok(())
    }

    fn replace(&mut self, idx: usize, old: &S, new: &S) -> Result<()> {
        self.check_items("replace", idx, std::slice::from_ref(old))?;

        let was_mapped = self.slots[idx].mapped;
        let duplicate = {
            let lookup = self.lookup.read().unwrap();
            lookup.contains_key(new) && !(was_mapped && old == new)
        };
        if duplicate {
            match self.duplicates {
                DuplicatePolicy::Reject => return Err(ViewError::DuplicateIdentity),
                DuplicatePolicy::Ignore => {
                    warn!(view = %self.label, "replacing input is already mapped; skipped")
                }
            }
        }

        let output = if duplicate { None } else { Some((self.f)(new)) };
        {
            let mut lookup = self.lookup.write().unwrap();
            if was_mapped {
                lookup.remove(old);
            }
            if let Some(output) = output.as_ref() {
                lookup.insert(new.clone(), output.clone());
            }
        }
        self.slots[idx] = Slot {
            item: new.clone(),
            mapped: output.is_some(),
        };
        match (was_mapped, output.is_some()) {
            (true, false) => self.skipped += 1,
            (false, true) => self.skipped -= 1,
            _ => {}
        }

        let d = self.rank(idx);
        match (was_mapped, output) {
            (true, Some(output)) => {
                self.out.replace(d, output)?;
            }
            (true, None) => {
                self.out.remove(d)?;
            }
            (false, Some(output)) => {
                self.out.insert(d, output)?;
            }
            (false, None) => {}
        }
        Ok(())
    }

    fn move_item(&mut self, from: usize, to: usize, item: &S) -> Result<()> {
        if to >= self.slots.len() {
            return Err(ViewError::invalid(
                "move",
                format!("target slot {} beyond source length {}", to, self.slots.len()),
            ));
        }
        self.check_items("move", from, std::slice::from_ref(item))?;

        let mapped = self.slots[from].mapped;
        let d_from = self.rank(from);
        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);

        if mapped {
            let d_to = self.rank(to);
            if d_from != d_to {
                self.out.move_item(d_from, d_to)?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slots.clear();
        self.skipped = 0;
        self.lookup.write().unwrap().clear();
        self.out.clear()
    }

    /// Run one update unless the view is stopped. An update
    /// that never finished leaves the slot table untrustworthy.
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
        self.slots.clear();
        self.skipped = 0;
        self.lookup
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if !self.out.is_empty() {
            if let Err(err) = self.out.clear() {
                warn!(view = %self.label, %err, "clearing disposed view failed");
            }
        }
        debug!(view = %self.label, "converting view disposed");
    }
}

impl<S, T> Observer<dyn ListView<S>> for MapEngine<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn reset(&mut self, view: Option<Arc<dyn ListView<S>>>) {
        let _ = self.run(|engine| engine.seed(view));
    }

    fn notify(&mut self, msg: &ListDiff<S>) {
        trace!(view = %self.label, action = msg.action(), "source changed");
        let _ = self.run(|engine| engine.apply(msg));
    }
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                  Handle
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/

/// Live element-wise conversion of a list.
///
/// Every input is mapped exactly once, when it enters the source,
/// and the output is remembered in a lookup keyed by the input.
pub struct MapList<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    engine: Arc<RwLock<MapEngine<S, T>>>,
    source: OuterViewPort<dyn ListView<S>>,
    lookup: Arc<RwLock<HashMap<S, T>>>,
    out: VecBuffer<T>,
}

impl<S, T> MapList<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(source: &OuterViewPort<dyn ListView<S>>, f: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        MapList::with_config(source, f, ProjectionConfig::default())
    }

    pub fn with_config<F>(
        source: &OuterViewPort<dyn ListView<S>>,
        f: F,
        config: ProjectionConfig,
    ) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let out = VecBuffer::new();
        let lookup = Arc::new(RwLock::new(HashMap::new()));

        let engine = Arc::new(RwLock::new(MapEngine {
            f: Arc::new(f),
            slots: Vec::new(),
            lookup: lookup.clone(),
            out: out.clone(),
            duplicates: config.duplicates,
            skipped: 0,
            fault: None,
            disposed: false,
            busy: false,
            label: config.label().to_string(),
        }));

        source.add_observer(engine.clone());

        debug!(
            view = config.label(),
            len = out.len(),
            duplicates = ?config.duplicates,
            "converting view attached"
        );

        MapList {
            engine,
            source: source.clone(),
            lookup,
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

    /// Output that `input` was mapped to.
    pub fn lookup(&self, input: &S) -> Option<T> {
        self.lookup.read().unwrap().get(input).cloned()
    }

    pub fn contains_source(&self, input: &S) -> bool {
        self.lookup.read().unwrap().contains_key(input)
    }

    pub fn lookup_len(&self) -> usize {
        self.lookup.read().unwrap().len()
    }

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
    pub fn apply(&self, diff: &ListDiff<S>) -> Result<()> {
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .run(|engine| engine.apply(diff))
    }

    /// Detach from the source and clear the view and lookup.
    /// Calling it again does nothing.
    pub fn dispose(&self) {
        let engine: Arc<RwLock<dyn Observer<dyn ListView<S>>>> = self.engine.clone();
        self.source.remove_observer(&engine);
        self.engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .dispose();
    }
}

impl<S, T> MapList<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Position of the first output equal to `output`.
    pub fn index_of(&self, output: &T) -> Option<usize> {
        self.out.index_of(output)
    }

    pub fn contains(&self, output: &T) -> bool {
        self.index_of(output).is_some()
    }
}

impl<S, T> Drop for MapList<S, T>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S> OuterViewPort<dyn ListView<S>>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn map_list<T, F>(&self, f: F) -> MapList<S, T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        MapList::new(self, f)
    }

    pub fn map_list_with_config<T, F>(&self, f: F, config: ProjectionConfig) -> MapList<S, T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        MapList::with_config(self, f, config)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
