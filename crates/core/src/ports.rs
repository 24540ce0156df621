use crate::domain::{ChannelRecord, Decision, ExportOutcome, PageSnapshot, ReplacementProposal};
use crate::error::CoreError;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Keyed persistence for channel records, primary key `telegram_link`
pub trait ChannelRepository {
    fn find(&self, telegram_link: &str) -> Result<Option<ChannelRecord>>;

    /// Inserts the record or replaces the one with the same key, atomically
    fn save(&self, record: &ChannelRecord) -> Result<()>;

    /// Removes every record and returns how many were removed
    fn delete_all(&self) -> Result<usize>;

    /// Every record in the store's natural (key) order
    fn fetch_all(&self) -> Result<Vec<ChannelRecord>>;

    /// Runs `work` as one unit: its reads and writes commit together, or not
    /// at all when it fails. Repositories without transactions just run it.
    fn in_transaction(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        work()
    }
}

/// Reads the raw fields of one rendered channel page
pub trait PageSource {
    fn snapshot(&self) -> Result<PageSnapshot>;
}

/// Trait for writing exported records
/// This is a port (interface) that defines how the core communicates with output adapters
pub trait RecordExporter {
    fn export(&self, records: &[ChannelRecord]) -> Result<ExportOutcome>;
}

/// Operator decision points guarding destructive store operations
pub trait ConfirmationGate {
    fn confirm_replace(&self, proposal: &ReplacementProposal) -> Decision;
    fn confirm_clear(&self) -> Decision;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Gate that answers every question the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedGate(pub Decision);

impl ConfirmationGate for FixedGate {
    fn confirm_replace(&self, _proposal: &ReplacementProposal) -> Decision {
        self.0
    }

    fn confirm_clear(&self) -> Decision {
        self.0
    }
}
