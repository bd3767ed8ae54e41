//! Feed lifecycle for the freed page watcher.
//!
//! Anonymous callers act on a feed through capability tokens mailed to the
//! feed's registered address; there are no accounts. See [`signer`] for what
//! a token proves and [`lifecycle`] for the state machine built on it.

pub mod detector;
pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod locks;
pub mod mailer;
pub mod notifier;
pub mod scheduler;
pub mod signer;

pub use error::{CreateError, FetchError, NotifyError};
pub use fetcher::{ContentFetcher, HttpFetcher};
pub use lifecycle::{
    Delivery, DestroyOutcome, FeedLifecycle, LifecycleConfig, PollOutcome, UnverifiedPolicy,
    VerifyOutcome,
};
pub use notifier::{LogNotifier, Notifier};
pub use scheduler::Scheduler;
pub use signer::Signer;
