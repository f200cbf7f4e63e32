//! Registry ingestion: raw host shapes and the interned snapshot.

pub mod raw;
pub mod snapshot;

pub use raw::{
    RawAsyncContext, RawBase, RawError, RawEvent, RawHook, RawIsolation, RawMeta, RawMiddleware,
    RawRegistry, RawResource, RawTag, RawTask,
};
pub use snapshot::RegistrySnapshot;
