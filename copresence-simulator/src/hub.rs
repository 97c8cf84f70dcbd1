use std::{f32::consts::TAU, sync::mpsc, thread, time::Duration};

use anyhow::{anyhow, Result};
use copresence::{contexts::head_transform_frame, SessionEvent, UserId};
use copresence_protocol::{Frame, HeadTransform, MessageType};
use glam::{Quat, Vec3};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::settings::SimulatorConfig;

/// The identifier the hub hands to the engine it is connected to.
pub const LOCAL_USER_ID: UserId = 1;

/// Ticks between one simulated participant joining and the next.
pub const JOIN_STAGGER: u64 = 10;

/// What the hub saw of the session once it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Pose updates sent on behalf of simulated participants
    pub poses_sent: u64,
    /// Frames broadcast by the local engine
    pub frames_received: u64,
    /// Bytes broadcast by the local engine
    pub bytes_received: usize,
}

/// An in-process stand in for a session service.
///
/// Runs on its own thread with a single threaded tokio runtime. It delivers session callbacks to the
/// engine through `to_engine` and receives the engine's broadcasts, already framed, on `from_engine`.
pub fn spawn(
    config: SimulatorConfig,
    to_engine: mpsc::Sender<SessionEvent>,
    from_engine: UnboundedReceiver<Vec<u8>>,
) -> thread::JoinHandle<Result<HubStats>> {
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        log::info!("[COPRESENCE_HUB] Runtime starting..");
        let stats = runtime.block_on(run_session(config, to_engine, from_engine));
        log::info!("[COPRESENCE_HUB] Runtime finished");
        stats
    })
}

/// Run one session from start to finish.
///
/// The engine learns its own identifier first. Each participant then joins, walks around the stage
/// for a while, and leaves. Once everyone has left the session ends, and the hub keeps listening to
/// the engine until it hangs up.
pub async fn run_session(
    config: SimulatorConfig,
    to_engine: mpsc::Sender<SessionEvent>,
    mut from_engine: UnboundedReceiver<Vec<u8>>,
) -> Result<HubStats> {
    send(&to_engine, SessionEvent::LocalUser(LOCAL_USER_ID))?;

    let listener = tokio::spawn(async move {
        let mut stats = HubStats::default();
        while let Some(bytes) = from_engine.recv().await {
            stats.bytes_received += bytes.len();
            match Frame::read_from(&mut bytes.as_slice()) {
                Ok(frame) if frame.message_type == MessageType::HeadTransform => {
                    stats.frames_received += 1;
                    log::trace!("[COPRESENCE_HUB] Engine broadcast {frame:?}");
                }
                Ok(frame) => log::debug!("[COPRESENCE_HUB] Ignoring {:?}", frame.message_type),
                Err(e) => log::warn!("[COPRESENCE_HUB] Engine sent a bad frame: {e}"),
            }
        }
        stats
    });

    let participants = (0..config.participants)
        .map(|index| {
            let participant = simulate_participant(index, config.clone(), to_engine.clone());
            tokio::spawn(participant)
        })
        .collect::<Vec<_>>();

    let mut poses_sent = 0;
    for participant in participants {
        poses_sent += participant.await??;
    }

    log::info!("[COPRESENCE_HUB] Everyone has left, ending the session");
    send(&to_engine, SessionEvent::Ended)?;

    let mut stats = listener.await?;
    stats.poses_sent = poses_sent;
    Ok(stats)
}

async fn simulate_participant(
    index: usize,
    config: SimulatorConfig,
    to_engine: mpsc::Sender<SessionEvent>,
) -> Result<u64> {
    let user_id = LOCAL_USER_ID + 1 + index as UserId;
    let tick = Duration::from_secs_f32(1.0 / config.tick_rate);
    let phase = index as f32 * TAU / config.participants.max(1) as f32;

    tokio::time::sleep(tick * (JOIN_STAGGER * index as u64) as u32).await;
    log::info!("[COPRESENCE_HUB] Participant {user_id} joining");
    send(&to_engine, SessionEvent::Joined(user_id))?;

    let mut interval = tokio::time::interval(tick);
    let mut poses_sent = 0;
    for n in 0..config.ticks {
        interval.tick().await;

        let seconds = n as f32 / config.tick_rate;
        let (position, rotation) = orbit(config.orbit_radius, phase, seconds);
        let frame = over_the_wire(&head_transform_frame(user_id, position, rotation))?;
        send(&to_engine, SessionEvent::Message(frame))?;
        poses_sent += 1;
    }

    log::info!("[COPRESENCE_HUB] Participant {user_id} leaving");
    send(&to_engine, SessionEvent::Left(user_id))?;
    Ok(poses_sent)
}

/// Somewhere on a circle around the stage origin at head height, looking at the middle.
pub fn orbit(radius: f32, phase: f32, seconds: f32) -> (Vec3, Quat) {
    const HEAD_HEIGHT: f32 = 1.6;
    const ANGULAR_SPEED: f32 = 0.5;

    let angle = phase + seconds * ANGULAR_SPEED;
    let position = Vec3::new(radius * angle.cos(), HEAD_HEIGHT, radius * angle.sin());
    let forward = -Vec3::new(position.x, 0.0, position.z).normalize_or_zero();
    let rotation = if forward == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, forward)
    };

    (position, rotation)
}

/// Push a frame through its byte representation, as a real transport would.
fn over_the_wire(frame: &Frame) -> Result<Frame> {
    let mut bytes = Vec::new();
    frame.write_to(&mut bytes)?;
    let frame = Frame::read_from(&mut bytes.as_slice())?;

    let head_transform = HeadTransform::decode(&frame.payload)?;
    log::trace!("[COPRESENCE_HUB] {head_transform:?}");
    Ok(frame)
}

fn send(to_engine: &mpsc::Sender<SessionEvent>, event: SessionEvent) -> Result<()> {
    to_engine
        .send(event)
        .map_err(|_| anyhow!("The engine has gone away"))
}

/// The engine side of the loopback: frames every broadcast and hands it to the hub.
pub struct LoopbackSink {
    user_id: UserId,
    to_hub: UnboundedSender<Vec<u8>>,
    sent: u64,
}

impl LoopbackSink {
    pub fn new(user_id: UserId, to_hub: UnboundedSender<Vec<u8>>) -> Self {
        Self {
            user_id,
            to_hub,
            sent: 0,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl copresence::contexts::HeadTransformSink for LoopbackSink {
    fn send_head_transform(&mut self, position: Vec3, rotation: Quat) {
        let frame = head_transform_frame(self.user_id, position, rotation);
        let mut bytes = Vec::new();
        if let Err(e) = frame.write_to(&mut bytes) {
            log::warn!("[COPRESENCE_HUB] Unable to frame head pose: {e}");
            return;
        }

        if self.to_hub.send(bytes).is_err() {
            log::debug!("[COPRESENCE_HUB] Hub has hung up, dropping head pose");
            return;
        }
        self.sent += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;
    use copresence::contexts::HeadTransformSink;

    use super::*;

    fn test_config(participants: usize, ticks: u64) -> SimulatorConfig {
        SimulatorConfig {
            participants,
            tick_rate: 1000.0,
            ticks,
            orbit_radius: 2.0,
        }
    }

    #[test]
    pub fn test_session_event_order() {
        let (to_engine, from_hub) = mpsc::channel();
        let (to_hub, from_engine) = tokio::sync::mpsc::unbounded_channel();

        let mut sink = LoopbackSink::new(LOCAL_USER_ID, to_hub);
        sink.send_head_transform(Vec3::ONE, Quat::IDENTITY);
        drop(sink);

        let stats = spawn(test_config(2, 3), to_engine, from_engine)
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(
            stats,
            HubStats {
                poses_sent: 6,
                frames_received: 1,
                bytes_received: 41,
            }
        );

        let events: Vec<SessionEvent> = from_hub.try_iter().collect();
        assert_eq!(events.first(), Some(&SessionEvent::LocalUser(LOCAL_USER_ID)));
        assert_eq!(events.last(), Some(&SessionEvent::Ended));

        // Every participant joins, sends their poses, then leaves.
        let mut seen: HashMap<UserId, Vec<&str>> = HashMap::new();
        for event in &events {
            match event {
                SessionEvent::Joined(user_id) => seen.entry(*user_id).or_default().push("joined"),
                SessionEvent::Left(user_id) => seen.entry(*user_id).or_default().push("left"),
                SessionEvent::Message(frame) => {
                    let head_transform = HeadTransform::decode(&frame.payload).unwrap();
                    seen.entry(head_transform.user_id).or_default().push("pose");
                }
                _ => {}
            }
        }

        assert_eq!(seen.len(), 2);
        for user_id in [2, 3] {
            assert_eq!(seen[&user_id], ["joined", "pose", "pose", "pose", "left"]);
        }
    }

    #[test]
    pub fn test_orbit() {
        let (position, rotation) = orbit(2.0, 0.0, 0.0);
        assert_relative_eq!(position, Vec3::new(2.0, 1.6, 0.0));

        // Looking back at the middle of the stage.
        assert_relative_eq!(rotation * Vec3::NEG_Z, Vec3::NEG_X, epsilon = 1e-6);

        let (position, rotation) = orbit(0.0, 0.0, 1.0);
        assert_relative_eq!(position, Vec3::new(0.0, 1.6, 0.0));
        assert_eq!(rotation, Quat::IDENTITY);
    }
}
