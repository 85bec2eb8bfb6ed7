pub mod build_timeline_use_case;
pub mod burn_captions_use_case;
pub mod frame_captioner;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
