use {
    crate::view::{
        channel::{queue_channel, ChannelReceiver},
        NotifyFnObserver, Observer, ObserverBroadcast, ResetFnObserver, View,
    },
    std::sync::{Arc, PoisonError, RwLock},
};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                 View Port
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
pub struct ViewPort<V: View + ?Sized> {
    view: Arc<RwLock<Option<Arc<V>>>>,
    cast: Arc<RwLock<ObserverBroadcast<V>>>,
}

impl<V: View + ?Sized> ViewPort<V>
where
    V::Msg: Clone,
{
    pub fn new() -> Self {
        ViewPort {
            view: Arc::new(RwLock::new(None)),
            cast: Arc::new(RwLock::new(ObserverBroadcast::new())),
        }
    }

    pub fn set_view(&self, view: Option<Arc<V>>) {
        *self.view.write().unwrap() = view.clone();
        let observers = self.cast.read().unwrap().live();
        for o in observers {
            o.write()
                .unwrap_or_else(PoisonError::into_inner)
                .reset(view.clone());
        }
    }

    pub fn add_observer(&self, observer: Arc<RwLock<dyn Observer<V>>>) {
        self.cast
            .write()
            .unwrap()
            .add_observer(Arc::downgrade(&observer));

        let view = self.view.read().unwrap().clone();
        observer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset(view);
    }

    pub fn remove_observer(&self, observer: &Arc<RwLock<dyn Observer<V>>>) -> bool {
        self.cast.write().unwrap().remove_observer(observer)
    }

    pub fn inner(&self) -> InnerViewPort<V> {
        InnerViewPort(self.clone())
    }

    pub fn outer(&self) -> OuterViewPort<V> {
        OuterViewPort(self.clone())
    }

    pub fn into_inner(self) -> InnerViewPort<V> {
        InnerViewPort(self)
    }

    pub fn into_outer(self) -> OuterViewPort<V> {
        OuterViewPort(self)
    }
}

impl<V: View + ?Sized> Clone for ViewPort<V>
where
    V::Msg: Clone,
{
    fn clone(&self) -> Self {
        ViewPort {
            view: self.view.clone(),
            cast: self.cast.clone(),
        }
    }
}

impl<V: View + ?Sized> Default for ViewPort<V>
where
    V::Msg: Clone,
{
    fn default() -> Self {
        ViewPort::new()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub struct InnerViewPort<V: View + ?Sized>(pub ViewPort<V>)
where
    V::Msg: Clone;
pub struct OuterViewPort<V: View + ?Sized>(pub ViewPort<V>)
where
    V::Msg: Clone;

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<V: View + ?Sized> InnerViewPort<V>
where
    V::Msg: Clone,
{
    pub fn get_broadcast(&self) -> Arc<RwLock<ObserverBroadcast<V>>> {
        self.0.cast.clone()
    }

    pub fn set_view(&self, view: Option<Arc<V>>) -> Arc<RwLock<ObserverBroadcast<V>>> {
        self.0.set_view(view);
        self.get_broadcast()
    }

    pub fn get_view(&self) -> Option<Arc<V>> {
        self.0.view.read().unwrap().clone()
    }

    /// The broadcast lock is released before any observer runs,
    /// so observers may (un)subscribe from inside a notification.
    /// An observer that panicked earlier still gets the message
    /// and has to notice on its own that it is out of sync.
    pub fn preview(&self, msg: &V::Msg) {
        let observers = self.0.cast.read().unwrap().live();
        for o in observers {
            o.write()
                .unwrap_or_else(PoisonError::into_inner)
                .preview(msg);
        }
    }

    pub fn notify(&self, msg: &V::Msg) {
        let observers = self.0.cast.read().unwrap().live();
        for o in observers {
            o.write()
                .unwrap_or_else(PoisonError::into_inner)
                .notify(msg);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.0.cast.read().unwrap().observer_count()
    }
}

impl<V: View + ?Sized> Clone for InnerViewPort<V>
where
    V::Msg: Clone,
{
    fn clone(&self) -> Self {
        InnerViewPort(self.0.clone())
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

impl<V: View + ?Sized + 'static> OuterViewPort<V>
where
    V::Msg: Clone,
{
    pub fn get_view(&self) -> Option<Arc<V>> {
        self.0.view.read().unwrap().clone()
    }

    pub fn get_view_arc(&self) -> Arc<RwLock<Option<Arc<V>>>> {
        self.0.view.clone()
    }

    pub fn add_observer(
        &self,
        observer: Arc<RwLock<dyn Observer<V>>>,
    ) -> Arc<RwLock<Option<Arc<V>>>> {
        self.0.add_observer(observer);
        self.get_view_arc()
    }

    pub fn remove_observer(&self, observer: &Arc<RwLock<dyn Observer<V>>>) -> bool {
        self.0.remove_observer(observer)
    }

    pub fn add_reset_fn<F: Fn(Option<Arc<V>>) + Send + Sync + 'static>(
        &self,
        reset: F,
    ) -> Arc<RwLock<ResetFnObserver<V, F>>> {
        let obs = Arc::new(RwLock::new(ResetFnObserver::new(reset)));
        self.add_observer(obs.clone());
        obs
    }

    pub fn add_notify_fn<F: Fn(&V::Msg) + Send + Sync + 'static>(
        &self,
        notify: F,
    ) -> Arc<RwLock<NotifyFnObserver<V, F>>> {
        let obs = Arc::new(RwLock::new(NotifyFnObserver::new(notify)));
        self.add_observer(obs.clone());
        obs
    }

    /// Queue every future message into a channel.
    /// The subscription lasts as long as the returned receiver.
    pub fn subscribe(&self) -> ChannelReceiver<Vec<V::Msg>>
    where
        V::Msg: 'static,
    {
        let (tx, mut rx) = queue_channel::<V::Msg>();
        let tx = Arc::new(RwLock::new(tx));
        self.add_observer(tx.clone());
        rx.keep_alive(tx);
        rx
    }
}

impl<V: View + ?Sized> Clone for OuterViewPort<V>
where
    V::Msg: Clone,
{
    fn clone(&self) -> Self {
        OuterViewPort(self.0.clone())
    }
}

impl<V: View + ?Sized> Default for OuterViewPort<V>
where
    V::Msg: Clone,
{
    fn default() -> Self {
        ViewPort::new().into_outer()
    }
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

#[cfg(test)]
mod tests {
    use crate::view::{
        list::{ListDiff, ListView},
        port::*,
    };
    use std::sync::Mutex;

    #[test]
    fn new_observer_sees_current_view() {
        let port = ViewPort::<dyn ListView<u8>>::new();
        port.inner().set_view(Some(Arc::new(RwLock::new(vec![1u8, 2]))));

        let lens = Arc::new(Mutex::new(Vec::new()));
        let l = lens.clone();
        let _obs = port
            .outer()
            .add_reset_fn(move |view| l.lock().unwrap().push(view.and_then(|v| v.len())));

        port.inner().set_view(None);

        assert_eq!(*lens.lock().unwrap(), vec![Some(2), None]);
    }

    #[test]
    fn removed_or_dropped_observers_stop_receiving() {
        let port = ViewPort::<dyn ListView<u8>>::new();
        let hits = Arc::new(Mutex::new(0));

        let h = hits.clone();
        let kept: Arc<RwLock<dyn Observer<dyn ListView<u8>>>> =
            port.outer().add_notify_fn(move |_| *h.lock().unwrap() += 1);
        let h = hits.clone();
        let dropped = port.outer().add_notify_fn(move |_| *h.lock().unwrap() += 1);
        assert_eq!(port.inner().observer_count(), 2);

        drop(dropped);
        port.inner().notify(&ListDiff::Reset);
        assert_eq!(*hits.lock().unwrap(), 1);

        assert!(port.outer().remove_observer(&kept));
        assert!(!port.outer().remove_observer(&kept));
        port.inner().notify(&ListDiff::Reset);
        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(port.inner().observer_count(), 0);
    }
}
