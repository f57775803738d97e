pub mod convert;
pub mod errors;
pub mod finetune;
pub mod jsonl;
pub mod source;

pub use convert::{ConvertStats, convert_csv, convert_file};
pub use errors::PipelineError;
pub use finetune::{FineTuneExample, FineTuneStats, build_finetune_corpus};
pub use jsonl::{CleanStats, clean_jsonl};
pub use source::{decode_input, read_input};
