use std::{fmt, time::Duration};

use crate::MailboxFactory;

/// Timeout used by [`Environment::request_default`](crate::Environment::request_default)
/// unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration of an [`Environment`](crate::Environment).
///
/// Use the builder methods to customize, or [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use cellnet::Config;
///
/// let config = Config::default()
///     .with_id("pipeline")
///     .with_mailbox_size(64)                    // Fewer buffer growths under load
///     .with_max_faults(3, Duration::from_secs(10));
/// ```
#[derive(Clone)]
pub struct Config {
    /// Identifier of the environment. A random UUID is used when `None`.
    pub id: Option<String>,

    /// Initial capacity of each cell's local mailbox buffer.
    /// The buffer grows on demand, so this is not a limit.
    /// Default: 10, minimum: 5
    pub mailbox_size: usize,

    /// Custom mailbox construction, replacing the local ring-buffer mailbox.
    pub mailbox_factory: Option<MailboxFactory>,

    /// Number of faults within `fault_window` after which a cell is
    /// stopped instead of recovered.
    /// Default: 12
    pub max_faults: usize,

    /// Trailing time window for `max_faults`.
    /// Default: 1 minute
    pub fault_window: Duration,

    /// Timeout of [`Environment::request_default`](crate::Environment::request_default).
    /// Default: [`DEFAULT_TIMEOUT`]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            id: None,
            mailbox_size: 10,
            mailbox_factory: None,
            max_faults: 12,
            fault_window: Duration::from_secs(60),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the initial buffer size of local mailboxes. Values below 5 are raised to 5.
    pub fn with_mailbox_size(mut self, size: usize) -> Self {
        self.mailbox_size = size;
        self
    }

    pub fn with_mailbox_factory(mut self, factory: MailboxFactory) -> Self {
        self.mailbox_factory = Some(factory);
        self
    }

    /// Set the supervision limit: a cell faulting `max_faults` times within
    /// `window` is stopped permanently.
    pub fn with_max_faults(mut self, max_faults: usize, window: Duration) -> Self {
        self.max_faults = max_faults;
        self.fault_window = window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("id", &self.id)
            .field("mailbox_size", &self.mailbox_size)
            .field("mailbox_factory", &self.mailbox_factory.is_some())
            .field("max_faults", &self.max_faults)
            .field("fault_window", &self.fault_window)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
