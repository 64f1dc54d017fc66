
                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                   View
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/
pub trait View: Send + Sync {
    /// Notification message for the observers
    type Msg: Send + Sync;
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

use std::sync::{Arc, RwLock};

impl<V: View + ?Sized> View for RwLock<V> {
    type Msg = V::Msg;
}

impl<V: View + ?Sized> View for Arc<V> {
    type Msg = V::Msg;
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub mod channel;
pub mod observer;
pub mod port;

pub use {
    channel::{queue_channel, ChannelReceiver, ChannelSender},
    observer::{NotifyFnObserver, Observer, ObserverBroadcast, ResetFnObserver},
    port::{InnerViewPort, OuterViewPort, ViewPort},
};

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>

pub mod item;
pub mod list;
pub mod singleton;
