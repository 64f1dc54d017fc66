use {
    crate::view::{
        item::{ItemNotify, ItemWatch},
        singleton::SingletonView,
        InnerViewPort, OuterViewPort, View, ViewPort,
    },
    std::sync::RwLock,
    std::{
        fmt,
        hash::{Hash, Hasher},
        ops::{Deref, DerefMut},
        sync::Arc,
    },
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct SingletonBufferView<T: Clone + Send + Sync + 'static>(pub Arc<RwLock<T>>);

impl<T> View for SingletonBufferView<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Msg = ();
}

impl<T> SingletonView for SingletonBufferView<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn get(&self) -> Self::Item {
        self.0.read().unwrap().clone()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

/// Observable cell.
///
/// Clones share the value; equality and hashing go by that
/// shared allocation, not by the contained value, so a buffer
/// keeps its identity inside a list while its value changes.
#[derive(Clone)]
pub struct SingletonBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub value: Arc<RwLock<T>>,
    pub port: InnerViewPort<dyn SingletonView<Item = T>>,
}

impl<T> SingletonBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn with_port(value: T, port: InnerViewPort<dyn SingletonView<Item = T>>) -> Self {
        let value = Arc::new(RwLock::new(value));
        port.set_view(Some(Arc::new(SingletonBufferView(value.clone()))));

        SingletonBuffer { value, port }
    }

    pub fn new(value: T) -> Self {
        SingletonBuffer::with_port(value, ViewPort::new().into_inner())
    }

    pub fn get_port(&self) -> OuterViewPort<dyn SingletonView<Item = T>> {
        self.port.0.outer()
    }

    pub fn get(&self) -> T {
        self.value.read().unwrap().clone()
    }

    pub fn get_mut(&self) -> MutableSingletonAccess<T> {
        MutableSingletonAccess {
            buf: self.clone(),
            val: self.get(),
        }
    }

    pub fn set(&mut self, new_value: T) {
        let mut v = self.value.write().unwrap();
        *v = new_value;
        drop(v);
        self.port.notify(&());
    }
}

impl<T> PartialEq for SingletonBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> Eq for SingletonBuffer<T> where T: Clone + Send + Sync + 'static {}

impl<T> Hash for SingletonBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.value) as usize).hash(state);
    }
}

impl<T> fmt::Debug for SingletonBuffer<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SingletonBuffer").field(&self.get()).finish()
    }
}

impl<T> ItemNotify for SingletonBuffer<T>
where
    T: Clone + Send + Sync + 'static,
{
    const CAN_CHANGE: bool = true;

    fn watch(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Option<ItemWatch> {
        let obs = self.get_port().add_notify_fn(move |_| on_change());
        Some(ItemWatch::new(obs))
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct MutableSingletonAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    buf: SingletonBuffer<T>,
    val: T,
}

impl<T> Deref for MutableSingletonAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.val
    }
}

impl<T> DerefMut for MutableSingletonAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.val
    }
}

impl<T> Drop for MutableSingletonAccess<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.buf.set(self.val.clone());
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
