pub mod global_setting_merger;
pub mod setting_clusterer;
pub mod setting_graph;
pub mod setting_oracle;
