pub mod jsonl_caption_store;
