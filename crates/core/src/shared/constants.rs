pub const WHISPER_MODEL_NAME: &str = "ggml-base.bin";
pub const WHISPER_MODEL_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin";
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Frames between progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 100;
