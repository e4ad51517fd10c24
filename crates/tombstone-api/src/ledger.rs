use crate::error::LedgerError;

/// Store that moves file attachments off a live post onto an audit record.
///
/// Both operations are idempotent per identifier.
pub trait AttachmentLedger: Send + Sync {
    /// Remove the attachment from its live channel context.
    fn detach(&self, file_id: &str) -> Result<(), LedgerError>;

    /// Associate the attachments with another post, typically the archived
    /// revision that still references them.
    fn reattach(&self, target_post_id: &str, file_ids: &[String]) -> Result<(), LedgerError>;
}
