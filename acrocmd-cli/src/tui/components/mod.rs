//! Reusable UI components

pub mod fast_list;
pub mod menu_bar;

pub use fast_list::FastList;
