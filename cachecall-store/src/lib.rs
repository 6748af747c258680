#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod disk;
mod entry;
mod error;
mod key;
mod store;

pub use disk::{DiskStore, DiskStoreBuilder};
pub use entry::StoredResponse;
pub use error::StoreError;
pub use key::StoreKey;
pub use store::{DeleteStatus, Store, StoreResult};
