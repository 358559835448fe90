pub mod dashboard;
pub mod details;
pub mod help_overlay;
pub mod log_panel;
pub mod now_playing;
pub mod result_list;
pub mod search_bar;
pub mod top_items;
