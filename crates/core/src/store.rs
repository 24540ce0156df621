use crate::domain::{
    ChannelRecord, ChannelSnapshot, ClearOutcome, Decision, PutOutcome, ReplacementProposal,
};
use crate::ports::{ChannelRepository, Clock, ConfirmationGate, Result, SystemClock};

/// Channel record store enforcing the confirm-before-overwrite protocol
/// on top of a keyed repository
pub struct SnapshotStore {
    repository: Box<dyn ChannelRepository>,
    clock: Box<dyn Clock>,
}

impl SnapshotStore {
    pub fn new(repository: Box<dyn ChannelRepository>) -> Self {
        Self::with_clock(repository, Box::new(SystemClock))
    }

    pub fn with_clock(repository: Box<dyn ChannelRepository>, clock: Box<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn get(&self, telegram_link: &str) -> Result<Option<ChannelRecord>> {
        self.repository.find(telegram_link)
    }

    /// Stores the snapshot under its `telegram_link`.
    ///
    /// An unseen key is inserted directly. An existing key is only replaced,
    /// as a whole, once `gate` accepts the proposal; otherwise nothing changes.
    /// The lookup, the decision and the write run in one repository
    /// transaction, so no other write lands between them.
    pub fn put(&self, snapshot: ChannelSnapshot, gate: &dyn ConfirmationGate) -> Result<PutOutcome> {
        let mut outcome = PutOutcome::Declined;
        self.repository.in_transaction(&mut || -> Result<()> {
            outcome = self.put_locked(&snapshot, gate)?;
            Ok(())
        })?;
        Ok(outcome)
    }

    fn put_locked(&self, snapshot: &ChannelSnapshot, gate: &dyn ConfirmationGate) -> Result<PutOutcome> {
        let outcome = match self.repository.find(&snapshot.telegram_link)? {
            None => PutOutcome::Inserted,
            Some(existing) => {
                let proposal = ReplacementProposal::new(&existing, snapshot);
                match gate.confirm_replace(&proposal) {
                    Decision::Accept => PutOutcome::Updated,
                    Decision::Decline => {
                        tracing::info!(key = %snapshot.telegram_link, "update declined");
                        return Ok(PutOutcome::Declined);
                    }
                }
            }
        };

        let record = snapshot.clone().stamp(self.clock.now());
        self.repository.save(&record)?;
        tracing::info!(key = %record.telegram_link, ?outcome, "channel record saved");
        Ok(outcome)
    }

    /// Removes every record once `gate` confirms
    pub fn clear(&self, gate: &dyn ConfirmationGate) -> Result<ClearOutcome> {
        match gate.confirm_clear() {
            Decision::Accept => {
                let removed = self.repository.delete_all()?;
                tracing::info!(removed, "store cleared");
                Ok(ClearOutcome::Cleared(removed))
            }
            Decision::Decline => {
                tracing::info!("clear declined");
                Ok(ClearOutcome::Declined)
            }
        }
    }

    pub fn list_all(&self) -> Result<Vec<ChannelRecord>> {
        self.repository.fetch_all()
    }
}
