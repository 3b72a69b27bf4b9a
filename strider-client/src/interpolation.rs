use std::collections::VecDeque;

use glam::{DQuat, DVec3};

use strider_core::movement::{MovementConfig, PlayerState};

/// One remote player pose as broadcast by the server.
///
/// `timestamp` is the observer's own clock at the moment the snapshot was
/// received. Snapshot states carry the mover's clock, which is offset from
/// ours by an unknown join-time difference, so it never enters the buffer.
#[derive(Clone, Copy, Debug)]
pub struct RemoteSample {
    pub timestamp: f64,
    pub position: DVec3,
    pub rotation: DQuat,
    pub velocity: DVec3,
}

impl RemoteSample {
    pub fn from_state(state: &PlayerState, received_at: f64) -> RemoteSample {
        RemoteSample {
            timestamp: received_at,
            position: state.position,
            rotation: state.rotation,
            velocity: state.velocity,
        }
    }
}

/// Timestamped pose buffer for one remote player. Remote players are
/// rendered slightly in the past (the interpolation delay) so there is
/// almost always a pair of snapshots to blend between; when the stream
/// stalls, extrapolation continues along the last velocity for a bounded
/// time and then freezes.
pub struct InterpolationBuffer {
    samples: VecDeque<RemoteSample>,
    capacity: usize,
}

impl InterpolationBuffer {
    pub fn new(config: &MovementConfig) -> InterpolationBuffer {
        InterpolationBuffer {
            samples: VecDeque::with_capacity(config.state_buffer_size),
            capacity: config.state_buffer_size,
        }
    }

    pub fn push(&mut self, sample: RemoteSample) {
        // Snapshots arrive in order on this transport; ignore any that
        // would run time backwards. Several snapshots drained from the
        // socket in one frame share a receipt time and collapse to the
        // newest pose.
        if let Some(last) = self.samples.back_mut() {
            if sample.timestamp < last.timestamp {
                return;
            }
            if sample.timestamp == last.timestamp {
                *last = sample;
                return;
            }
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Pose at `render_time`, interpolated between bracketing snapshots or
    /// extrapolated at most `extrapolation_limit` seconds past the newest.
    pub fn sample(&self, render_time: f64, extrapolation_limit: f64) -> Option<(DVec3, DQuat)> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;

        if render_time <= first.timestamp {
            return Some((first.position, first.rotation));
        }

        if render_time >= last.timestamp {
            let ahead = (render_time - last.timestamp).min(extrapolation_limit);
            return Some((last.position + last.velocity * ahead, last.rotation));
        }

        let mut iter = self.samples.iter().peekable();
        while let (Some(older), Some(newer)) = (iter.next(), iter.peek()) {
            if render_time <= newer.timestamp {
                let span = newer.timestamp - older.timestamp;
                let alpha = if span > 0.0 {
                    (render_time - older.timestamp) / span
                } else {
                    1.0
                };
                let position = older.position.lerp(newer.position, alpha);
                let rotation = older.rotation.slerp(newer.rotation, alpha);
                return Some((position, rotation));
            }
        }

        Some((last.position, last.rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: f64, x: f64, vx: f64) -> RemoteSample {
        RemoteSample {
            timestamp,
            position: DVec3::new(x, 0.0, 0.0),
            rotation: DQuat::IDENTITY,
            velocity: DVec3::new(vx, 0.0, 0.0),
        }
    }

    fn buffer() -> InterpolationBuffer {
        InterpolationBuffer::new(&MovementConfig::default())
    }

    #[test]
    fn midpoint_sampling_interpolates_linearly() {
        let mut buffer = buffer();
        buffer.push(sample(1.0, 0.0, 0.0));
        buffer.push(sample(2.0, 10.0, 0.0));

        let (position, _) = buffer.sample(1.5, 0.25).unwrap();
        assert!((position.x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn sampling_before_the_oldest_clamps_to_it() {
        let mut buffer = buffer();
        buffer.push(sample(5.0, 7.0, 0.0));

        let (position, _) = buffer.sample(0.0, 0.25).unwrap();
        assert_eq!(position.x, 7.0);
    }

    #[test]
    fn extrapolation_is_capped_at_the_limit() {
        let mut buffer = buffer();
        buffer.push(sample(1.0, 0.0, 4.0));

        // Ten seconds past the newest snapshot, but capped to 0.25s worth.
        let (position, _) = buffer.sample(11.0, 0.25).unwrap();
        assert!((position.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_order_snapshots_are_ignored() {
        let mut buffer = buffer();
        buffer.push(sample(2.0, 0.0, 0.0));
        buffer.push(sample(1.0, 99.0, 0.0));

        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn same_instant_snapshots_collapse_to_the_newest_pose() {
        let mut buffer = buffer();
        buffer.push(sample(1.0, 2.0, 0.0));
        buffer.push(sample(1.0, 9.0, 0.0));

        assert_eq!(buffer.len(), 1);
        let (position, _) = buffer.sample(1.0, 0.25).unwrap();
        assert_eq!(position.x, 9.0);
    }

    #[test]
    fn buffer_is_bounded_by_config() {
        let mut config = MovementConfig::default();
        config.state_buffer_size = 3;
        let mut buffer = InterpolationBuffer::new(&config);
        for i in 0..10 {
            buffer.push(sample(i as f64, 0.0, 0.0));
        }

        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert!(buffer().sample(0.0, 0.25).is_none());
    }
}
