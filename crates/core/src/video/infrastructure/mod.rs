pub mod ffmpeg_audio_reader;
pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
