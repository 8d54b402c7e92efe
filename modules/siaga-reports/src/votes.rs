//! Vote tally engine.
//!
//! All mutation of `vote_tally` and `voter_record` funnels through
//! `cast_vote`, a read-modify-write loop over the store's conditional write.
//! The delta is always derived from the user's previously recorded vote, so
//! the tally-equals-sum-of-record invariant survives any interleaving of
//! concurrent voters: a conflicting commit forces a re-read, never a lost
//! update.

use tracing::{debug, warn};
use uuid::Uuid;

use siaga_common::{SiagaError, VoteStatus, VoteValue, VOTE_COMMIT_ATTEMPTS};
use siaga_store::{DocStore, StoreError};

pub struct VoteEngine {
    store: DocStore,
}

impl VoteEngine {
    pub fn new(store: DocStore) -> Self {
        Self { store }
    }

    /// Apply one user's vote decision to one report and return the committed
    /// tally.
    ///
    /// `Retract` removes the user's record entirely; `Up`/`Down` replace
    /// whatever was recorded before. The engine trusts the caller's resolved
    /// value (see [`resolve_toggle`]) but never assumes the previous vote was
    /// zero. Identity policy is not enforced here beyond rejecting the nil
    /// id; who may vote is the auth layer's decision.
    pub async fn cast_vote(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        vote: VoteValue,
    ) -> Result<i64, SiagaError> {
        if user_id.is_nil() {
            return Err(SiagaError::InvalidInput("nil user id".to_string()));
        }

        for attempt in 1..=VOTE_COMMIT_ATTEMPTS {
            let (mut doc, version) = self
                .store
                .get_report(report_id)
                .await
                .map_err(SiagaError::from)?
                .ok_or(SiagaError::NotFound(report_id))?;

            let previous = doc
                .voter_record
                .get(&user_id)
                .map(|d| d.value())
                .unwrap_or(0);
            let new_tally = doc.vote_tally - previous + vote.delta();

            match vote.direction() {
                Some(direction) => {
                    doc.voter_record.insert(user_id, direction);
                }
                None => {
                    doc.voter_record.remove(&user_id);
                }
            }
            doc.vote_tally = new_tally;

            match self.store.try_update_report(report_id, version, doc).await {
                Ok(_) => {
                    debug!(report = %report_id, user = %user_id, tally = new_tally, "vote committed");
                    return Ok(new_tally);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(report = %report_id, attempt, "vote commit conflicted, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SiagaError::WriteFailed {
            attempts: VOTE_COMMIT_ATTEMPTS,
        })
    }

    /// The user's current recorded vote on a report. Reads the same document
    /// the commit loop writes; there is no separate cache to drift.
    pub async fn vote_status(
        &self,
        report_id: Uuid,
        user_id: Uuid,
    ) -> Result<VoteStatus, SiagaError> {
        let (doc, _) = self
            .store
            .get_report(report_id)
            .await
            .map_err(SiagaError::from)?
            .ok_or(SiagaError::NotFound(report_id))?;

        Ok(match doc.voter_record.get(&user_id).map(|d| d.value()) {
            Some(1) => VoteStatus::Upvoted,
            Some(_) => VoteStatus::Downvoted,
            None => VoteStatus::None,
        })
    }
}

/// Caller-side toggle rule: pressing the direction already recorded retracts
/// it instead of re-applying it. Pressing the other direction flips it.
pub fn resolve_toggle(requested: VoteValue, current: VoteStatus) -> VoteValue {
    match (requested, current) {
        (VoteValue::Up, VoteStatus::Upvoted) => VoteValue::Retract,
        (VoteValue::Down, VoteStatus::Downvoted) => VoteValue::Retract,
        (v, _) => v,
    }
}
