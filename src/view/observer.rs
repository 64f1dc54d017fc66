use {
    crate::view::View,
    std::sync::RwLock,
    std::sync::{Arc, Weak},
};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                 Observer
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
pub trait Observer<V: View + ?Sized>: Send + Sync {
    fn reset(&mut self, _view: Option<Arc<V>>) {}

    /// Delivered right before the view applies `msg`,
    /// while the view still holds its old state.
    fn preview(&mut self, _msg: &V::Msg) {}

    fn notify(&mut self, msg: &V::Msg);
}

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                 Broadcast
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/

/// Fans messages out to all registered observers.
///
/// Observers are held weakly: dropping the last strong reference
/// to an observer detaches it. Delivery happens synchronously
/// on the thread that calls `notify`.
pub struct ObserverBroadcast<V: View + ?Sized>
where
    V::Msg: Send + Sync,
{
    observers: Vec<Weak<RwLock<dyn Observer<V>>>>,
}

impl<V: View + ?Sized> ObserverBroadcast<V>
where
    V::Msg: Clone + Send + Sync,
{
    pub fn new() -> Self {
        ObserverBroadcast {
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, obs: Weak<RwLock<dyn Observer<V>>>) {
        self.cleanup();
        self.observers.push(obs);
    }

    /// Detach `obs`. Returns false if it was not registered.
    pub fn remove_observer(&mut self, obs: &Arc<RwLock<dyn Observer<V>>>) -> bool {
        let target = Arc::as_ptr(obs) as *const ();
        let before = self.observers.len();
        self.observers
            .retain(|o| o.strong_count() > 0 && Weak::as_ptr(o) as *const () != target);
        self.observers.len() < before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|o| o.strong_count() > 0).count()
    }

    fn cleanup(&mut self) {
        self.observers.retain(|o| o.strong_count() > 0);
    }

    /// Strong references to every observer still alive.
    pub fn live(&self) -> Vec<Arc<RwLock<dyn Observer<V>>>> {
        self.observers.iter().filter_map(|o| o.upgrade()).collect()
    }
}

impl<V: View + ?Sized> Default for ObserverBroadcast<V>
where
    V::Msg: Clone + Send + Sync,
{
    fn default() -> Self {
        ObserverBroadcast::new()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct NotifyFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(&V::Msg) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<V>,
}

impl<V, F> NotifyFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(&V::Msg) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        NotifyFnObserver {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V, F> Observer<V> for NotifyFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(&V::Msg) + Send + Sync,
{
    fn notify(&mut self, msg: &V::Msg) {
        (self.f)(msg);
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct ResetFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(Option<Arc<V>>) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<V>,
}

impl<V, F> ResetFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(Option<Arc<V>>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        ResetFnObserver {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V, F> Observer<V> for ResetFnObserver<V, F>
where
    V: View + ?Sized,
    F: Fn(Option<Arc<V>>) + Send + Sync,
{
    fn notify(&mut self, _msg: &V::Msg) {}
    fn reset(&mut self, view: Option<Arc<V>>) {
        (self.f)(view);
    }
}
