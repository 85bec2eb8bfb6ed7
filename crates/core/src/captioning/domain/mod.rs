pub mod caption_cursor;
pub mod caption_error;
pub mod caption_interval;
pub mod caption_settings;
pub mod interval_adjuster;
pub mod segmenter;
pub mod word_timestamp;
