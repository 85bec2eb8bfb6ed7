pub mod audio;
pub mod captioning;
pub mod pipeline;
pub mod rendering;
pub mod shared;
pub mod video;
