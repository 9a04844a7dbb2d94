pub mod record;
pub mod writer;

pub use record::RunRecord;
pub use writer::{ensure_parent, write_jsonl, RecordWriter};
