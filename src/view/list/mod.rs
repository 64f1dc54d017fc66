use {
    crate::view::View,
    serde::{Deserialize, Serialize},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Structural change of an ordered list.
///
/// Indices of `Insert` and `Replace` refer to the list *after*
/// the change, those of `Remove` and `Move::from` to the list
/// *before* it. `Move` takes the item out at `from` and then
/// reinserts it at `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListDiff<T> {
    Insert { idx: usize, items: Vec<T> },
    Remove { idx: usize, items: Vec<T> },
    Replace { idx: usize, old: T, new: T },
    Move { from: usize, to: usize, item: T },
    Reset,
}

impl<T> ListDiff<T> {
    pub fn action(&self) -> &'static str {
        match self {
            ListDiff::Insert { .. } => "insert",
            ListDiff::Remove { .. } => "remove",
            ListDiff::Replace { .. } => "replace",
            ListDiff::Move { .. } => "move",
            ListDiff::Reset => "reset",
        }
    }

    /// Check that the change fits a list of length `len`.
    pub fn check(&self, len: usize) -> Result<(), String> {
        match self {
            ListDiff::Insert { idx, .. } if *idx > len => {
                Err(format!("insert at {} beyond length {}", idx, len))
            }
            ListDiff::Remove { idx, items } if idx + items.len() > len => Err(format!(
                "remove of {}..{} beyond length {}",
                idx,
                idx + items.len(),
                len
            )),
            ListDiff::Replace { idx, .. } if *idx >= len => {
                Err(format!("replace at {} beyond length {}", idx, len))
            }
            ListDiff::Move { from, to, .. } if *from >= len || *to >= len => {
                Err(format!("move {} -> {} beyond length {}", from, to, len))
            }
            _ => Ok(()),
        }
    }

    /// Carry out the change on `data`, which is left untouched
    /// if the indices do not fit.
    pub fn apply_to(&self, data: &mut Vec<T>) -> Result<(), String>
    where
        T: Clone,
    {
        self.check(data.len())?;
        match self {
            ListDiff::Insert { idx, items } => {
                data.splice(*idx..*idx, items.iter().cloned());
            }
            ListDiff::Remove { idx, items } => {
                data.drain(*idx..idx + items.len());
            }
            ListDiff::Replace { idx, new, .. } => {
                data[*idx] = new.clone();
            }
            ListDiff::Move { from, to, .. } => {
                let item = data.remove(*from);
                data.insert(*to, item);
            }
            ListDiff::Reset => data.clear(),
        }
        Ok(())
    }
}

pub trait ListView<Item>: View<Msg = ListDiff<Item>>
where
    Item: Clone + Send + Sync + 'static,
{
    fn len(&self) -> Option<usize>;
    fn get(&self, idx: &usize) -> Option<Item>;
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub trait ListViewExt<T>: ListView<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn iter<'a>(&'a self) -> ListViewIter<'a, T, Self> {
        ListViewIter {
            _phantom: std::marker::PhantomData,
            view: self,
            cur: 0,
        }
    }
}

impl<T, V: ListView<T> + ?Sized> ListViewExt<T> for V where T: Clone + Send + Sync + 'static {}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct ListViewIter<'a, T, V>
where
    T: Clone + Send + Sync + 'static,
    V: ListView<T> + ?Sized,
{
    _phantom: std::marker::PhantomData<T>,
    view: &'a V,
    cur: usize,
}

impl<'a, T, V> Iterator for ListViewIter<'a, T, V>
where
    T: Clone + Send + Sync + 'static,
    V: ListView<T> + ?Sized,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.cur;
        self.cur += 1;
        self.view.get(&i)
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

use std::sync::RwLock;
use std::{ops::Deref, sync::Arc};

impl<T> View for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Msg = ListDiff<T>;
}

/// Buffers publish their data as a locked `Vec`.
impl<T> ListView<T> for RwLock<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
{
    fn len(&self) -> Option<usize> {
        Some(self.read().unwrap().len())
    }

    fn get(&self, idx: &usize) -> Option<T> {
        self.read().unwrap().as_slice().get(*idx).cloned()
    }
}

impl<Item: Clone + Send + Sync + 'static, V: ListView<Item> + ?Sized> ListView<Item> for Arc<V> {
    fn get(&self, idx: &usize) -> Option<Item> {
        self.deref().get(idx)
    }

    fn len(&self) -> Option<usize> {
        self.deref().len()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_takes_out_then_reinserts() {
        let mut data = vec!['a', 'b', 'c', 'd'];

        ListDiff::Move { from: 0, to: 2, item: 'a' }
            .apply_to(&mut data)
            .unwrap();
        assert_eq!(data, vec!['b', 'c', 'a', 'd']);

        ListDiff::Move { from: 3, to: 0, item: 'd' }
            .apply_to(&mut data)
            .unwrap();
        assert_eq!(data, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn out_of_range_diffs_leave_data_untouched() {
        let mut data = vec![1, 2, 3];

        assert!(ListDiff::Insert { idx: 4, items: vec![9] }.apply_to(&mut data).is_err());
        assert!(ListDiff::Remove { idx: 2, items: vec![3, 4] }.apply_to(&mut data).is_err());
        assert!(ListDiff::Replace { idx: 3, old: 0, new: 9 }.apply_to(&mut data).is_err());
        assert!(ListDiff::Move { from: 0, to: 3, item: 1 }.apply_to(&mut data).is_err());

        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn diff_serializes_as_tagged_enum() {
        let diff = ListDiff::Insert { idx: 1, items: vec![7, 8] };
        let json = serde_json::to_string(&diff).unwrap();
        assert_eq!(json, r#"{"Insert":{"idx":1,"items":[7,8]}}"#);

        let back: ListDiff<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diff);
    }
}
