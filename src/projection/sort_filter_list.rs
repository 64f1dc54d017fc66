use {
    crate::{
        config::ProjectionConfig,
        projection::filter_list::{FilterItem, Filtered, Member, Order},
        view::{list::ListView, OuterViewPort},
    },
    std::sync::Arc,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Sort key of a filtering view.
pub trait SortKey: Ord + Clone + Send + Sync + 'static {}

impl<K> SortKey for K where K: Ord + Clone + Send + Sync + 'static {}

/// Keep the view ordered by `key`.
///
/// Each derived element caches its key and the source slot it
/// sits in. Equal keys are ordered by slot, so the view is the
/// stable sort of the passing source elements.
pub struct KeyOrder<T, K>
where
    T: FilterItem,
    K: SortKey,
{
    key: Arc<dyn Fn(&T) -> K + Send + Sync>,
    entries: Vec<(K, usize)>,
}

impl<T, K> KeyOrder<T, K>
where
    T: FilterItem,
    K: SortKey,
{
    pub fn new(key: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        KeyOrder {
            key: Arc::new(key),
            entries: Vec::new(),
        }
    }

    /// Index of the first entry not below `(key, slot)`.
    fn position(&self, key: &K, slot: usize) -> usize {
        self.entries
            .partition_point(|(k, s)| k < key || (k == key && *s < slot))
    }
}

impl<T, K> Order<T> for KeyOrder<T, K>
where
    T: FilterItem,
    K: SortKey,
{
    fn seed(&mut self, passing: Vec<(usize, T)>) -> Vec<T> {
        let mut entries: Vec<(K, usize, T)> = passing
            .into_iter()
            .map(|(slot, item)| ((self.key)(&item), slot, item))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        self.entries = entries.iter().map(|(k, slot, _)| (k.clone(), *slot)).collect();
        entries.into_iter().map(|(_, _, item)| item).collect()
    }

    fn entry_index(&self, _members: &[Member<T>], slot: usize, item: &T) -> usize {
        self.position(&(self.key)(item), slot)
    }

    fn current_index(&self, _members: &[Member<T>], slot: usize, item: &T) -> Option<usize> {
        let d = self.position(&(self.key)(item), slot);
        match self.entries.as_slice().get(d) {
            Some((_, s)) if *s == slot => Some(d),
            // the cached key is out of date
            _ => self.entries.iter().position(|(_, s)| *s == slot),
        }
    }

    fn stale_index(&self, _members: &[Member<T>], slot: usize, item: &T) -> Option<usize> {
        let key = (self.key)(item);
        self.entries
            .iter()
            .position(|(k, s)| *s == slot && *k != key)
    }

    fn entered(&mut self, idx: usize, slot: usize, item: &T) {
        let key = (self.key)(item);
        self.entries.insert(idx, (key, slot));
    }

    fn left(&mut self, idx: usize) {
        self.entries.remove(idx);
    }

    fn slot_inserted(&mut self, slot: usize) {
        for (_, s) in self.entries.iter_mut() {
            if *s >= slot {
                *s += 1;
            }
        }
    }

    fn slot_removed(&mut self, slot: usize) {
        for (_, s) in self.entries.iter_mut() {
            if *s > slot {
                *s -= 1;
            }
        }
    }

    fn slot_moved(&mut self, from: usize, to: usize) {
        for (_, s) in self.entries.iter_mut() {
            if from < to && *s > from && *s <= to {
                *s -= 1;
            } else if to < from && *s >= to && *s < from {
                *s += 1;
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Passing elements ordered by a key.
pub type SortFilterList<T, K> = Filtered<T, KeyOrder<T, K>>;

impl<T, K> Filtered<T, KeyOrder<T, K>>
where
    T: FilterItem,
    K: SortKey,
{
    pub fn new<P, F>(source: &OuterViewPort<dyn ListView<T>>, pred: P, key: F) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::with_config(source, pred, key, ProjectionConfig::default())
    }

    pub fn with_config<P, F>(
        source: &OuterViewPort<dyn ListView<T>>,
        pred: P,
        key: F,
        config: ProjectionConfig,
    ) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Filtered::build(source, Arc::new(pred), KeyOrder::new(key), config)
    }
}

impl<T> OuterViewPort<dyn ListView<T>>
where
    T: FilterItem,
{
    pub fn sort_filter_list<K, P, F>(&self, pred: P, key: F) -> SortFilterList<T, K>
    where
        K: SortKey,
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        SortFilterList::new(self, pred, key)
    }

    pub fn sorted_list<K, F>(&self, key: F) -> SortFilterList<T, K>
    where
        K: SortKey,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        SortFilterList::new(self, |_| true, key)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use crate::buffer::{singleton::SingletonBuffer, vec::VecBuffer};
    use crate::projection::sort_filter_list::*;

    #[test]
    fn sort_filter_list1() {
        let mut buffer = VecBuffer::with_data(vec![3, 1, 2]);
        let sorted = buffer.get_port().sorted_list(|x| *x);

        assert_eq!(sorted.to_vec(), vec![1, 2, 3]);

        buffer.insert(0, 0).unwrap();
        assert_eq!(sorted.to_vec(), vec![0, 1, 2, 3]);

        buffer.push(2).unwrap();
        assert_eq!(sorted.to_vec(), vec![0, 1, 2, 2, 3]);
    }

    #[test]
    fn filters_before_sorting() {
        let mut buffer = VecBuffer::with_data(vec![5, 2, 8, 1, 4]);
        let evens = buffer
            .get_port()
            .sort_filter_list(|x| x % 2 == 0, |x| *x);

        assert_eq!(evens.to_vec(), vec![2, 4, 8]);

        buffer.remove(2).unwrap();
        assert_eq!(evens.to_vec(), vec![2, 4]);

        buffer.replace(1, 6).unwrap();
        assert_eq!(evens.to_vec(), vec![4, 6]);

        buffer.replace(0, 3).unwrap();
        assert_eq!(evens.to_vec(), vec![4, 6]);

        buffer.replace(1, 7).unwrap();
        assert_eq!(evens.to_vec(), vec![4]);
    }

    #[test]
    fn equal_keys_follow_source_order() {
        let mut buffer = VecBuffer::with_data(vec![
            "bb".to_string(),
            "a".to_string(),
            "cc".to_string(),
        ]);
        let by_len = buffer.get_port().sorted_list(|s: &String| s.len());

        assert_eq!(by_len.to_vec(), vec!["a", "bb", "cc"]);

        buffer.insert(0, "dd".to_string()).unwrap();
        assert_eq!(by_len.to_vec(), vec!["a", "dd", "bb", "cc"]);

        buffer.move_item(0, 3).unwrap();
        assert_eq!(buffer.to_vec(), vec!["bb", "a", "cc", "dd"]);
        assert_eq!(by_len.to_vec(), vec!["a", "bb", "cc", "dd"]);

        buffer.remove(0).unwrap();
        buffer.insert(3, "ee".to_string()).unwrap();
        buffer.insert(1, "ff".to_string()).unwrap();
        assert_eq!(buffer.to_vec(), vec!["a", "ff", "cc", "dd", "ee"]);
        assert_eq!(by_len.to_vec(), vec!["a", "ff", "cc", "dd", "ee"]);
    }

    #[test]
    fn same_source_gives_same_view() {
        let seeded = VecBuffer::with_data(vec!["x", "y"]);
        let mut grown = VecBuffer::with_data(vec!["y"]);
        grown.insert(0, "x").unwrap();

        let a = seeded.get_port().sorted_list(|_| 0);
        let b = grown.get_port().sorted_list(|_| 0);
        assert_eq!(a.to_vec(), vec!["x", "y"]);
        assert_eq!(b.to_vec(), a.to_vec());
    }

    #[test]
    fn source_moves_keep_key_order() {
        let mut buffer = VecBuffer::with_data(vec![3, 1, 2]);
        let sorted = buffer.get_port().sorted_list(|x| *x);

        buffer.move_item(0, 2).unwrap();
        assert_eq!(buffer.to_vec(), vec![1, 2, 3]);
        assert_eq!(sorted.to_vec(), vec![1, 2, 3]);

        buffer.remove(2).unwrap();
        assert_eq!(sorted.to_vec(), vec![1, 2]);
    }

    #[test]
    fn key_change_relocates_item() {
        let a = SingletonBuffer::new(5);
        let b = SingletonBuffer::new(1);
        let c = SingletonBuffer::new(3);
        let buffer = VecBuffer::with_data(vec![a.clone(), b.clone(), c.clone()]);

        let sorted = buffer
            .get_port()
            .sort_filter_list(|x| x.get() < 10, |x| x.get());
        assert_eq!(sorted.to_vec(), vec![b.clone(), c.clone(), a.clone()]);

        *a.get_mut() = 0;
        assert_eq!(sorted.to_vec(), vec![a.clone(), b.clone(), c.clone()]);

        *b.get_mut() = 4;
        assert_eq!(sorted.to_vec(), vec![a.clone(), c.clone(), b.clone()]);

        *c.get_mut() = 20;
        assert_eq!(sorted.to_vec(), vec![a.clone(), b.clone()]);

        *c.get_mut() = 2;
        assert_eq!(sorted.to_vec(), vec![a.clone(), c.clone(), b.clone()]);
    }
}
