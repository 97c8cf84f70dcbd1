use std::collections::HashMap;

use copresence_protocol::{HeadTransform, UserId};
use glam::{Quat, Vec3};

use crate::{
    config::{RotationPolicy, UNIT_TOLERANCE},
    contexts::PlaceholderRenderer,
    CopresenceConfig, CopresenceError, CopresenceResult,
};

/// What we know about one remote participant's head.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteHeadEntry<H> {
    user_id: UserId,
    placeholder: H,
    /// Position relative to the stage, as last sent by the participant
    pub local_position: Vec3,
    /// Rotation relative to the stage, as last sent by the participant
    pub local_rotation: Quat,
    /// How many pose updates have been applied to this entry
    pub updates_applied: u64,
}

impl<H> RemoteHeadEntry<H> {
    fn new(user_id: UserId, placeholder: H) -> Self {
        Self {
            user_id,
            placeholder,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            updates_applied: 0,
        }
    }

    /// The participant this head belongs to
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The placeholder standing in for this head
    pub fn placeholder(&self) -> &H {
        &self.placeholder
    }
}

/// Every remote participant we currently know about, keyed by [`UserId`].
///
/// An entry exists for a participant from the moment they join (or, with
/// [`CopresenceConfig::eager_entry_creation`] turned off, from their first pose update) until the
/// moment they leave. Each entry owns a placeholder created through a [`PlaceholderRenderer`], and
/// destroys it through the same renderer when it goes away.
///
/// The registry is not thread safe. Every call must come from the update thread; see
/// [`crate::Engine`] for how session events from other threads get there.
#[derive(Debug)]
pub struct RemoteHeadRegistry<H> {
    heads: HashMap<UserId, RemoteHeadEntry<H>>,
    local_user_id: Option<UserId>,
    eager_entry_creation: bool,
    rotation_policy: RotationPolicy,
}

impl<H> RemoteHeadRegistry<H> {
    /// Create an empty registry
    pub fn new(config: &CopresenceConfig) -> Self {
        Self {
            heads: HashMap::new(),
            local_user_id: None,
            eager_entry_creation: config.eager_entry_creation,
            rotation_policy: config.rotation_policy,
        }
    }

    /// Tell the registry which participant is us. We never get a placeholder of our own.
    pub fn set_local_user_id(&mut self, user_id: UserId) {
        self.local_user_id = Some(user_id);
    }

    /// Our own identifier, if the session has told us yet
    pub fn local_user_id(&self) -> Option<UserId> {
        self.local_user_id
    }

    /// A remote participant joined the session.
    ///
    /// Creates their entry straight away, unless eager creation is turned off, in which case the
    /// entry appears with their first pose update.
    pub fn on_session_joined<R>(&mut self, user_id: UserId, renderer: &mut R)
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        if self.is_local(user_id) {
            log::debug!("[COPRESENCE_REGISTRY] Ignoring our own join ({user_id})");
            return;
        }

        if !self.eager_entry_creation {
            log::debug!("[COPRESENCE_REGISTRY] {user_id} joined, waiting for their first pose");
            return;
        }

        log::info!("[COPRESENCE_REGISTRY] {user_id} joined");
        self.get_or_create(user_id, renderer);
    }

    /// A remote participant left the session. Their placeholder is destroyed immediately.
    ///
    /// A participant we never registered is reported as [`CopresenceError::UnknownParticipant`] and
    /// leaves the registry untouched.
    pub fn on_session_left<R>(&mut self, user_id: UserId, renderer: &mut R) -> CopresenceResult<()>
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        let entry = self
            .heads
            .remove(&user_id)
            .ok_or(CopresenceError::UnknownParticipant(user_id))?;

        log::info!(
            "[COPRESENCE_REGISTRY] {user_id} left after {} updates",
            entry.updates_applied
        );
        renderer.destroy_placeholder(entry.placeholder);
        Ok(())
    }

    /// Get a participant's entry, creating it and its placeholder if we haven't seen them yet.
    pub fn get_or_create<R>(
        &mut self,
        user_id: UserId,
        renderer: &mut R,
    ) -> &mut RemoteHeadEntry<H>
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        self.heads.entry(user_id).or_insert_with(|| {
            log::debug!("[COPRESENCE_REGISTRY] Creating placeholder for {user_id}");
            RemoteHeadEntry::new(user_id, renderer.create_placeholder(user_id))
        })
    }

    /// A head transform message arrived.
    ///
    /// The payload is decoded in full before anything changes, so a truncated message leaves every
    /// entry as it was. Late updates simply overwrite earlier ones.
    pub fn on_inbound_pose_update<R>(
        &mut self,
        payload: &[u8],
        renderer: &mut R,
    ) -> CopresenceResult<()>
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        let head_transform = HeadTransform::decode(payload)?;
        self.apply_head_transform(&head_transform, renderer)
    }

    /// Apply an already decoded head transform.
    pub fn apply_head_transform<R>(
        &mut self,
        head_transform: &HeadTransform,
        renderer: &mut R,
    ) -> CopresenceResult<()>
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        let user_id = head_transform.user_id;
        if self.is_local(user_id) {
            log::debug!("[COPRESENCE_REGISTRY] Ignoring a pose update carrying our own id");
            return Ok(());
        }

        let position = Vec3::from(head_transform.position);
        let rotation = self.check_rotation(user_id, Quat::from(head_transform.rotation))?;

        let entry = self.get_or_create(user_id, renderer);
        entry.local_position = position;
        entry.local_rotation = rotation;
        entry.updates_applied += 1;
        renderer.set_local_transform(&entry.placeholder, position, rotation);

        log::trace!("[COPRESENCE_REGISTRY] {user_id} is now at {position}");
        Ok(())
    }

    /// Forget everyone, destroying every placeholder. Used when the session ends.
    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: PlaceholderRenderer<Handle = H>,
    {
        if !self.heads.is_empty() {
            log::info!("[COPRESENCE_REGISTRY] Removing {} remote heads", self.heads.len());
        }

        for (_, entry) in self.heads.drain() {
            renderer.destroy_placeholder(entry.placeholder);
        }
    }

    /// Look up a participant's entry
    pub fn get(&self, user_id: UserId) -> Option<&RemoteHeadEntry<H>> {
        self.heads.get(&user_id)
    }

    /// Do we have an entry for this participant?
    pub fn contains(&self, user_id: UserId) -> bool {
        self.heads.contains_key(&user_id)
    }

    /// Every entry, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &RemoteHeadEntry<H>> {
        self.heads.values()
    }

    /// How many remote heads we know about
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Are we alone?
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    fn is_local(&self, user_id: UserId) -> bool {
        self.local_user_id == Some(user_id)
    }

    fn check_rotation(&self, user_id: UserId, rotation: Quat) -> CopresenceResult<Quat> {
        match self.rotation_policy {
            RotationPolicy::AsIs => Ok(rotation),
            RotationPolicy::Normalize => {
                let length = rotation.length();
                if !length.is_finite() || length <= f32::EPSILON {
                    return Err(CopresenceError::NonUnitRotation { user_id, length });
                }
                Ok(rotation / length)
            }
            RotationPolicy::Reject => {
                let length = rotation.length();
                if !length.is_finite() || (length - 1.0).abs() > UNIT_TOLERANCE {
                    return Err(CopresenceError::NonUnitRotation { user_id, length });
                }
                Ok(rotation)
            }
        }
    }
}
