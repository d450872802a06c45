pub mod curriculum_tree;
pub mod menu;
pub mod progress_bar;
pub mod typing_area;
