
mod watch;

pub mod filter_list;
pub mod map_list;
pub mod sort_filter_list;

pub use {
    filter_list::{FilterItem, FilterList, Filtered, Member, Order, SourceOrder},
    map_list::MapList,
    sort_filter_list::{KeyOrder, SortFilterList, SortKey},
};
