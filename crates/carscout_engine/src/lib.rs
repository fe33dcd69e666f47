//! CarScout engine: fetching, site extraction, persistence seams and the
//! per-chat poll scheduler.
mod controller;
mod decode;
mod diagnostics;
mod extract;
mod fetch;
mod messenger;
mod persist;
mod router;
mod scheduler;
mod store;
mod types;

pub use controller::ChatController;
pub use decode::{decode_page, DecodedPage};
pub use diagnostics::{
    diagnostic_filename, DiagnosticSink, FileDiagnosticSink, NullDiagnosticSink,
};
pub use extract::{
    AutoScout24Adapter, ExtractError, Extraction, ExtractorRegistry, MobileAdapter, SiteAdapter,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use messenger::{Messenger, MessengerError};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use router::ChatRouter;
pub use scheduler::{Registered, Scheduler, SchedulerSettings, SessionHandle};
pub use store::{MemoryStore, Store, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
