//! Transaction merge - one history from the external feed and local transfers

use crate::domain::{ExternalTransaction, MergedTransaction, TransferTransaction};

/// Merge a link's external transactions with its transfers
///
/// Transfers are normalized relative to `link_id` (debit when the link sent
/// the money). The result holds every input exactly once, most recent
/// first; the sort is stable, so equal dates keep external-then-transfer
/// order.
pub fn merge_transactions(
    link_id: &str,
    external: Vec<ExternalTransaction>,
    transfers: &[TransferTransaction],
) -> Vec<MergedTransaction> {
    let mut merged: Vec<MergedTransaction> = Vec::with_capacity(external.len() + transfers.len());
    merged.extend(external.into_iter().map(MergedTransaction::External));
    merged.extend(
        transfers
            .iter()
            .map(|t| MergedTransaction::Transfer(t.to_entry(link_id))),
    );

    merged.sort_by(|a, b| b.date().cmp(a.date()));
    merged
}
