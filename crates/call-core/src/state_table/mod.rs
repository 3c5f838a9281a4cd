pub mod types;
pub mod builder;

pub use types::*;
pub use builder::StateTableBuilder;

use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Default delay before `failed_to_connect` recovers into `idle`
pub const FAILED_TO_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// The default lifecycle table - shared by every machine that does not
/// override the recovery timeout
pub static DEFAULT_TABLE: Lazy<Arc<StateTable>> =
    Lazy::new(|| Arc::new(StateTableBuilder::default_table(FAILED_TO_CONNECT_TIMEOUT)));

/// Table for a given recovery timeout, reusing the shared one when possible
pub fn table_for_timeout(failed_to_connect_timeout: Duration) -> Arc<StateTable> {
    if failed_to_connect_timeout == FAILED_TO_CONNECT_TIMEOUT {
        Arc::clone(&*DEFAULT_TABLE)
    } else {
        Arc::new(StateTableBuilder::default_table(failed_to_connect_timeout))
    }
}
