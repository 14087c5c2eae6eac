//! Notebook status enum mapping to the SMALLINT `status` column.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of a notebook job.
///
/// Discriminants are the values stored in `notebooks.status`. `Processing`
/// is the only non-terminal state; reconciliation moves jobs from it to
/// exactly one terminal state and never back.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookStatus {
    Processing = 0,
    Success = 1,
    Failure = 2,
    Cancelled = 3,
}

impl NotebookStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Map a stored status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            0 => Some(Self::Processing),
            1 => Some(Self::Success),
            2 => Some(Self::Failure),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Lowercase wire name used in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl From<NotebookStatus> for StatusId {
    fn from(value: NotebookStatus) -> Self {
        value as StatusId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for status in [
            NotebookStatus::Processing,
            NotebookStatus::Success,
            NotebookStatus::Failure,
            NotebookStatus::Cancelled,
        ] {
            assert_eq!(NotebookStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(NotebookStatus::from_id(7), None);
    }

    #[test]
    fn test_only_processing_is_non_terminal() {
        assert!(!NotebookStatus::Processing.is_terminal());
        assert!(NotebookStatus::Success.is_terminal());
        assert!(NotebookStatus::Failure.is_terminal());
        assert!(NotebookStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_wire_names_are_lowercase() {
        assert_eq!(NotebookStatus::Processing.as_str(), "processing");
        assert_eq!(NotebookStatus::Cancelled.as_str(), "cancelled");
    }
}
