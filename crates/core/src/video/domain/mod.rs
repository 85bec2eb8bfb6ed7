pub mod audio_reader;
pub mod frame_clock;
pub mod video_reader;
pub mod video_writer;
