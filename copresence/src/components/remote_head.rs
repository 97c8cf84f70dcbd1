use copresence_protocol::UserId;

/// Component marking the placeholder that stands in for a remote participant's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteHead {
    /// The participant this head belongs to
    pub user_id: UserId,
}
