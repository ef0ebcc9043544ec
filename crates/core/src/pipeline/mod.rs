pub mod annotate_video_use_case;
pub mod cluster_executor;
pub mod cluster_settings_use_case;
pub mod infrastructure;
pub mod merge_settings_use_case;
pub mod pipeline_logger;
pub mod resolve_identities_use_case;
