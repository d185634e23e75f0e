pub mod binder;
pub mod engine;
pub mod parsers;
pub mod pool;
pub mod source;
pub mod task;

pub use crate::domain::model::{InputFormat, Record, RecordList, SourceSpec, TaskStatus};
pub use crate::domain::ports::{Bindable, ConfigProvider, DataParser};
pub use crate::utils::error::Result;
