use std::{any::Any, sync::Arc};

                    /*\
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
          Item Change Notification
<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
                    \*/

/// Keeps an item subscription alive; dropping it unsubscribes.
pub struct ItemWatch(Arc<dyn Any + Send + Sync>);

impl ItemWatch {
    pub fn new(keepalive: Arc<dyn Any + Send + Sync>) -> Self {
        ItemWatch(keepalive)
    }
}

impl std::fmt::Debug for ItemWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ItemWatch")
    }
}

/// Elements that can signal changes of their own state,
/// independent of their position in any list.
///
/// Filtering views consult `CAN_CHANGE` once and only
/// register watches for element types that set it.
pub trait ItemNotify {
    const CAN_CHANGE: bool = false;

    /// Call `on_change` whenever this item's observable state changes,
    /// until the returned handle is dropped.
    fn watch(&self, _on_change: Box<dyn Fn() + Send + Sync>) -> Option<ItemWatch> {
        None
    }
}

macro_rules! impl_unchanging_item {
    ($($t:ty),*) => {
        $( impl ItemNotify for $t {} )*
    };
}

impl_unchanging_item!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str
);

impl<T: ItemNotify> ItemNotify for Box<T> {
    const CAN_CHANGE: bool = T::CAN_CHANGE;

    fn watch(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Option<ItemWatch> {
        (**self).watch(on_change)
    }
}

impl<T: ItemNotify> ItemNotify for Arc<T> {
    const CAN_CHANGE: bool = T::CAN_CHANGE;

    fn watch(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Option<ItemWatch> {
        (**self).watch(on_change)
    }
}
