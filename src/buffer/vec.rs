use {
    crate::{
        error::{Result, ViewError},
        view::{
            list::{ListDiff, ListView},
            InnerViewPort, OuterViewPort, ViewPort,
        },
    },
    std::sync::RwLock,
    std::{
        ops::{Deref, DerefMut},
        sync::Arc,
    },
    tracing::warn,
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Observable `Vec`.
///
/// Every mutation goes through `apply_diff`, which first
/// previews the diff to observers, then changes the data and
/// finally notifies. Observers can read the buffer from inside
/// both callbacks.
#[derive(Clone)]
pub struct VecBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    data: Arc<RwLock<Vec<T>>>,
    port: InnerViewPort<dyn ListView<T>>,
}

impl<T> VecBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn with_data_port(data: Vec<T>, port: InnerViewPort<dyn ListView<T>>) -> Self {
        let data = Arc::new(RwLock::new(data));
        port.set_view(Some(data.clone()));

        VecBuffer { data, port }
    }

    pub fn with_data(data: Vec<T>) -> Self {
        VecBuffer::with_data_port(data, ViewPort::new().into_inner())
    }

    pub fn with_port(port: InnerViewPort<dyn ListView<T>>) -> Self {
        VecBuffer::with_data_port(vec![], port)
    }

    pub fn new() -> Self {
        VecBuffer::with_port(ViewPort::new().into_inner())
    }

    pub fn get_port(&self) -> OuterViewPort<dyn ListView<T>> {
        self.port.0.outer()
    }

    pub fn apply_diff(&mut self, diff: ListDiff<T>) -> Result<()> {
        let len = self.len();
        diff.check(len)
            .map_err(|reason| ViewError::invalid(diff.action(), reason))?;

        self.port.preview(&diff);

        let mut data = self.data.write().unwrap();
        diff.apply_to(&mut data)
            .map_err(|reason| ViewError::invalid(diff.action(), reason))?;
        drop(data);

        self.port.notify(&diff);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        self.data.read().unwrap().as_slice().get(idx).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data.read().unwrap().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.port.observer_count()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.apply_diff(ListDiff::Reset)
    }

    pub fn push(&mut self, val: T) -> Result<()> {
        let idx = self.len();
        self.insert(idx, val)
    }

    pub fn insert(&mut self, idx: usize, val: T) -> Result<()> {
        self.insert_many(idx, vec![val])
    }

    pub fn insert_many(&mut self, idx: usize, items: Vec<T>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.apply_diff(ListDiff::Insert { idx, items })
    }

    pub fn remove(&mut self, idx: usize) -> Result<T> {
        let mut items = self.remove_range(idx, 1)?;
        items
            .pop()
            .ok_or_else(|| ViewError::invalid("remove", "nothing removed"))
    }

    pub fn remove_range(&mut self, idx: usize, count: usize) -> Result<Vec<T>> {
        let items = {
            let data = self.data.read().unwrap();
            match data.as_slice().get(idx..idx + count) {
                Some(items) => items.to_vec(),
                None => {
                    return Err(ViewError::invalid(
                        "remove",
                        format!("remove of {}..{} beyond length {}", idx, idx + count, data.len()),
                    ))
                }
            }
        };
        if !items.is_empty() {
            self.apply_diff(ListDiff::Remove {
                idx,
                items: items.clone(),
            })?;
        }
        Ok(items)
    }

    /// Put `val` into slot `idx`, returning the previous item.
    pub fn replace(&mut self, idx: usize, val: T) -> Result<T> {
        let old = self.get(idx).ok_or_else(|| {
            ViewError::invalid(
                "replace",
                format!("replace at {} beyond length {}", idx, self.len()),
            )
        })?;
        self.apply_diff(ListDiff::Replace {
            idx,
            old: old.clone(),
            new: val,
        })?;
        Ok(old)
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let item = self.get(from).ok_or_else(|| {
            ViewError::invalid(
                "move",
                format!("move {} -> {} beyond length {}", from, to, self.len()),
            )
        })?;
        if from == to {
            return Ok(());
        }
        self.apply_diff(ListDiff::Move { from, to, item })
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<MutableVecAccess<T>> {
        let val = self.get(idx)?;
        Some(MutableVecAccess {
            buf: self.clone(),
            idx,
            val,
        })
    }
}

impl<T> VecBuffer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Position of the first element equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.data.read().unwrap().iter().position(|x| x == item)
    }
}

impl<T> Default for VecBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        VecBuffer::new()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Writes the edited value back as a `Replace` when dropped.
pub struct MutableVecAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    buf: VecBuffer<T>,
    idx: usize,
    val: T,
}

impl<T> Deref for MutableVecAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.val
    }
}

impl<T> DerefMut for MutableVecAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.val
    }
}

impl<T> Drop for MutableVecAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Err(err) = self.buf.replace(self.idx, self.val.clone()) {
            warn!(idx = self.idx, %err, "write-back of edited item failed");
        }
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use crate::buffer::vec::*;
    use crate::view::{list::ListViewExt, Observer};
    use std::sync::Mutex;

    #[test]
    fn vec_buffer1() {
        let mut buffer = VecBuffer::new();

        buffer.push('a').unwrap();
        buffer.push('b').unwrap();
        buffer.push('c').unwrap();
        buffer.move_item(0, 2).unwrap();
        assert_eq!(buffer.replace(1, 'x').unwrap(), 'c');

        assert_eq!(buffer.to_vec(), vec!['b', 'x', 'a']);

        let view = buffer.get_port().get_view().unwrap();
        assert_eq!(view.iter().collect::<Vec<_>>(), vec!['b', 'x', 'a']);
    }

    #[test]
    fn get_mut_writes_back() {
        let mut buffer = VecBuffer::with_data(vec![1, 2, 3]);
        *buffer.get_mut(1).unwrap() += 40;
        assert_eq!(buffer.to_vec(), vec![1, 42, 3]);
    }

    #[test]
    fn out_of_range_is_rejected_without_notification() {
        let mut buffer = VecBuffer::with_data(vec![1, 2]);
        let seen = Arc::new(Mutex::new(0));
        let s = seen.clone();
        let _obs = buffer.get_port().add_notify_fn(move |_| *s.lock().unwrap() += 1);

        assert!(matches!(buffer.remove(2), Err(ViewError::InvalidEvent { .. })));
        assert!(buffer.insert(5, 9).is_err());
        assert!(buffer.move_item(0, 2).is_err());

        assert_eq!(*seen.lock().unwrap(), 0);
        assert_eq!(buffer.to_vec(), vec![1, 2]);
    }

    struct Recorder {
        buf: VecBuffer<u8>,
        log: Arc<Mutex<Vec<(&'static str, Vec<u8>)>>>,
    }

    impl Observer<dyn ListView<u8>> for Recorder {
        fn preview(&mut self, _msg: &ListDiff<u8>) {
            self.log.lock().unwrap().push(("preview", self.buf.to_vec()));
        }

        fn notify(&mut self, _msg: &ListDiff<u8>) {
            self.log.lock().unwrap().push(("notify", self.buf.to_vec()));
        }
    }

    #[test]
    fn preview_sees_state_before_mutation() {
        let mut buffer = VecBuffer::with_data(vec![1, 2]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let rec = Arc::new(RwLock::new(Recorder {
            buf: buffer.clone(),
            log: log.clone(),
        }));
        buffer.get_port().add_observer(rec.clone());

        buffer.remove(0).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![("preview", vec![1, 2]), ("notify", vec![2])]
        );
    }
}
