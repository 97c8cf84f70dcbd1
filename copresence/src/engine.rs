use crate::{
    components::{GlobalTransform, LocalTransform, Parent, Stage, HMD},
    contexts::{HeadTransformSink, ScenePlaceholders},
    systems::{
        broadcast_head_pose_system, update_global_transform_system,
        update_global_transform_with_parent_system, PoseBroadcaster,
    },
    CopresenceConfig, CopresenceError, CopresenceResult, RemoteHeadRegistry,
};
use copresence_protocol::{MessageType, SessionEvent};
use glam::{Affine3A, Quat, Vec3};

use std::{
    sync::mpsc,
    time::{Duration, Instant},
};

/// Builder for `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<CopresenceConfig>,
}

impl EngineBuilder {
    /// Create an `EngineBuilder`
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the configuration for the remote head registry
    pub fn config(&mut self, config: CopresenceConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Build the `Engine`
    pub fn build(&mut self) -> CopresenceResult<Engine> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;

        log::info!("[COPRESENCE_ENGINE] Engine ready with {config:?}");
        Ok(Engine::with_config(config))
    }
}

fn create_tracking_entities(world: &mut hecs::World) -> (hecs::Entity, hecs::Entity) {
    let stage_entity = world.spawn((
        Stage {},
        LocalTransform::default(),
        GlobalTransform::default(),
    ));
    let hmd_entity = world.spawn((
        HMD {},
        Parent(stage_entity),
        LocalTransform::default(),
        GlobalTransform::default(),
    ));
    (stage_entity, hmd_entity)
}

/// The Copresence Engine
/// Owns the scene, the remote head registry and the pose broadcaster, and makes sure they are only
/// ever touched from the thread calling `update`.
///
/// Session callbacks arriving on other threads are sent as [`SessionEvent`]s down the channel
/// returned by [`Engine::session_events`], and applied at the start of the next `update`.
/// **IMPORTANT**: make sure you call `update` each tick
pub struct Engine {
    /// World
    pub world: hecs::World,
    /// Stage entity. Its transform is the reference frame every network pose is relative to.
    pub stage_entity: hecs::Entity,
    /// HMD entity, the local viewer
    pub hmd_entity: hecs::Entity,
    /// Every remote participant we currently know about
    pub registry: RemoteHeadRegistry<hecs::Entity>,
    /// Sends our head pose each tick
    pub broadcaster: PoseBroadcaster,
    config: CopresenceConfig,
    sender: mpsc::Sender<SessionEvent>,
    receiver: mpsc::Receiver<SessionEvent>,
    performance_timers: PerformanceTimers,
}

/// Keeps an eye on how long ticks take.
#[derive(Debug)]
struct PerformanceTimers {
    timings: Vec<Duration>,
    last_update: Instant,
}

impl PerformanceTimers {
    fn record(&mut self, tick_start: Instant) {
        let now = Instant::now();
        self.timings.push(now - tick_start);

        if (now - self.last_update).as_secs_f32() >= 1.0 {
            let average = self.timings.iter().sum::<Duration>() / self.timings.len() as u32;
            log::debug!("[COPRESENCE_PERF] Average tick time: {average:?}");
            self.last_update = now;
            self.timings.clear();
        }
    }
}

impl Default for PerformanceTimers {
    fn default() -> Self {
        Self {
            last_update: Instant::now(),
            timings: Default::default(),
        }
    }
}

/// The result of calling `update()` on Engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickData {
    /// Session events applied without error this tick
    pub events_applied: usize,
    /// Session events that failed. Each one was logged and skipped.
    pub event_errors: usize,
    /// Whether a [`SessionEvent::Ended`] was seen this tick
    pub session_ended: bool,
    /// Remote heads known at the end of the tick
    pub remote_heads: usize,
}

impl Engine {
    /// Create a new instance of the engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(Default::default())
    }

    fn with_config(config: CopresenceConfig) -> Self {
        // Initialize the world with our "tracking" entities, the stage and the HMD.
        let mut world = hecs::World::default();
        let (stage_entity, hmd_entity) = create_tracking_entities(&mut world);
        let (sender, receiver) = mpsc::channel();

        Engine {
            world,
            stage_entity,
            hmd_entity,
            registry: RemoteHeadRegistry::new(&config),
            broadcaster: PoseBroadcaster::new(),
            config,
            sender,
            receiver,
            performance_timers: Default::default(),
        }
    }

    /// Get a handle that session callbacks can use to reach the engine from any thread.
    pub fn session_events(&self) -> mpsc::Sender<SessionEvent> {
        self.sender.clone()
    }

    /// Set the local viewer's pose, in stage space.
    ///
    /// Since the HMD is parented to the Stage, its LocalTransform (ie. its transform with respect to
    /// the parent) is equal to its pose in stage space.
    pub fn set_viewer_pose(&mut self, position: Vec3, rotation: Quat) -> CopresenceResult<()> {
        let mut transform = self
            .world
            .get::<&mut LocalTransform>(self.hmd_entity)
            .map_err(anyhow::Error::from)?;
        transform.translation = position;
        transform.rotation = rotation;
        Ok(())
    }

    /// Move the stage, and with it the local viewer and every remote head.
    pub fn set_stage_transform(&mut self, global_from_stage: &Affine3A) -> CopresenceResult<()> {
        let mut transform = self
            .world
            .get::<&mut LocalTransform>(self.stage_entity)
            .map_err(anyhow::Error::from)?;
        let (scale, rotation, translation) = global_from_stage.to_scale_rotation_translation();
        transform.translation = translation;
        transform.rotation = rotation;
        transform.scale = scale;
        Ok(())
    }

    /// IMPORTANT: Call this function each tick.
    ///
    /// Applies every pending session event in the order it arrived, brings the scene's transforms up
    /// to date, then sends our head pose through `sink`. A session event that fails is logged and
    /// counted in the returned [`TickData`]; it never stops the tick.
    pub fn update<S: HeadTransformSink + ?Sized>(&mut self, sink: &mut S) -> TickData {
        let tick_start = Instant::now();
        let mut tick_data = TickData::default();

        // Check to see if there's anything from the session:
        let events: Vec<SessionEvent> = self.receiver.try_iter().collect();
        for event in events {
            if matches!(event, SessionEvent::Ended) {
                tick_data.session_ended = true;
            }

            match self.apply_session_event(event) {
                Ok(()) => tick_data.events_applied += 1,
                Err(e) => {
                    log::warn!("[COPRESENCE_ENGINE] Unable to apply session event: {e}");
                    tick_data.event_errors += 1;
                }
            }
        }

        update_global_transform_system(&mut self.world);
        update_global_transform_with_parent_system(&mut self.world);

        broadcast_head_pose_system(&mut self.world, &mut self.broadcaster, sink);

        tick_data.remote_heads = self.registry.len();
        self.performance_timers.record(tick_start);
        tick_data
    }

    /// Apply a single session event right now, bypassing the channel.
    pub fn apply_session_event(&mut self, event: SessionEvent) -> CopresenceResult<()> {
        let mut placeholders = ScenePlaceholders::new(
            &mut self.world,
            self.stage_entity,
            self.config.placeholder_scale,
        );

        match event {
            SessionEvent::LocalUser(user_id) => {
                log::info!("[COPRESENCE_ENGINE] We are participant {user_id}");
                if self.registry.contains(user_id) {
                    self.registry.on_session_left(user_id, &mut placeholders)?;
                }
                self.registry.set_local_user_id(user_id);
            }
            SessionEvent::Joined(user_id) => {
                self.registry.on_session_joined(user_id, &mut placeholders)
            }
            SessionEvent::Left(user_id) => {
                self.registry.on_session_left(user_id, &mut placeholders)?
            }
            SessionEvent::Message(frame) => match frame.message_type {
                MessageType::HeadTransform => self
                    .registry
                    .on_inbound_pose_update(&frame.payload, &mut placeholders)?,
                other => {
                    log::debug!("[COPRESENCE_ENGINE] Ignoring message of type {other:?}");
                }
            },
            SessionEvent::Ended => {
                log::info!("[COPRESENCE_ENGINE] Session ended");
                self.registry.clear(&mut placeholders);
            }
        }

        Ok(())
    }

    /// Send an event to ourselves, as a session callback would.
    pub fn queue_session_event(&self, event: SessionEvent) -> CopresenceResult<()> {
        self.sender
            .send(event)
            .map_err(|e| CopresenceError::Other(anyhow::anyhow!("{e}")))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
