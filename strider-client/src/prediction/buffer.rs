use std::collections::VecDeque;

use strider_core::movement::{InputCommand, MovementConfig, PlayerState};

/// One sent command paired with the state the local simulator predicted
/// for it. Lives until the server acknowledges a sequence at or past it,
/// then lingers briefly for diagnostics before trimming.
#[derive(Clone, Debug)]
pub struct PredictionFrame {
    pub command: InputCommand,
    pub predicted: PlayerState,
    pub sent: bool,
    pub acknowledged: bool,
    pub captured_at: f64,
    /// Times this frame's prediction was rewritten by a replay.
    pub corrections: u32,
    /// Position error observed at the most recent replay.
    pub last_error: f64,
}

impl PredictionFrame {
    pub fn new(command: InputCommand, predicted: PlayerState, captured_at: f64) -> PredictionFrame {
        PredictionFrame {
            command,
            predicted,
            sent: false,
            acknowledged: false,
            captured_at,
            corrections: 0,
            last_error: 0.0,
        }
    }
}

/// Append-only buffer of prediction frames awaiting acknowledgment.
pub struct InputBuffer {
    frames: VecDeque<PredictionFrame>,
    capacity: usize,
    retention_secs: f64,
    dropped_inputs: u64,
}

impl InputBuffer {
    pub fn new(config: &MovementConfig) -> InputBuffer {
        InputBuffer {
            frames: VecDeque::with_capacity(config.input_buffer_size),
            capacity: config.input_buffer_size,
            retention_secs: config.input_retention_secs,
            dropped_inputs: 0,
        }
    }

    pub fn push(&mut self, frame: PredictionFrame) {
        self.frames.push_back(frame);
    }

    /// Mark every frame with `sequence <= acknowledged` as acknowledged.
    pub fn acknowledge(&mut self, acknowledged: u64) {
        for frame in &mut self.frames {
            if frame.command.sequence <= acknowledged {
                frame.acknowledged = true;
            }
        }
    }

    /// Unacknowledged frames newer than the given sequence, oldest first.
    pub fn pending_after(&self, sequence: u64) -> impl Iterator<Item = &PredictionFrame> {
        self.frames
            .iter()
            .filter(move |frame| !frame.acknowledged && frame.command.sequence > sequence)
    }

    pub(crate) fn pending_after_mut(
        &mut self,
        sequence: u64,
    ) -> impl Iterator<Item = &mut PredictionFrame> {
        self.frames
            .iter_mut()
            .filter(move |frame| !frame.acknowledged && frame.command.sequence > sequence)
    }

    pub fn frame_at(&self, sequence: u64) -> Option<&PredictionFrame> {
        self.frames
            .iter()
            .find(|frame| frame.command.sequence == sequence)
    }

    /// Drop acknowledged frames past their retention window, then enforce
    /// the capacity bound. Unacknowledged frames forced out by capacity are
    /// counted as dropped inputs, never discarded silently.
    pub fn trim(&mut self, now: f64) {
        while let Some(frame) = self.frames.front() {
            if frame.acknowledged && now - frame.captured_at > self.retention_secs {
                self.frames.pop_front();
            } else {
                break;
            }
        }

        while self.frames.len() > self.capacity {
            if let Some(frame) = self.frames.pop_front() {
                if !frame.acknowledged {
                    self.dropped_inputs += 1;
                }
            }
        }
    }

    /// Inputs lost to buffer overflow since construction.
    pub fn dropped_inputs(&self) -> u64 {
        self.dropped_inputs
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use strider_core::movement::PlayerState;

    fn frame(sequence: u64, captured_at: f64) -> PredictionFrame {
        PredictionFrame::new(
            InputCommand::new(sequence, captured_at, 1.0 / 60.0),
            PlayerState::spawn_at(DVec3::ZERO),
            captured_at,
        )
    }

    fn small_buffer(capacity: usize) -> InputBuffer {
        let mut config = MovementConfig::default();
        config.input_buffer_size = capacity;
        InputBuffer::new(&config)
    }

    #[test]
    fn acknowledge_marks_everything_at_or_below_the_sequence() {
        let mut buffer = small_buffer(16);
        for sequence in 1..=5 {
            buffer.push(frame(sequence, 0.0));
        }

        buffer.acknowledge(3);

        assert_eq!(buffer.pending_after(0).count(), 2);
        assert!(buffer.frame_at(3).unwrap().acknowledged);
        assert!(!buffer.frame_at(4).unwrap().acknowledged);
    }

    #[test]
    fn pending_after_skips_older_sequences() {
        let mut buffer = small_buffer(16);
        for sequence in 1..=6 {
            buffer.push(frame(sequence, 0.0));
        }

        let pending: Vec<u64> = buffer
            .pending_after(4)
            .map(|frame| frame.command.sequence)
            .collect();
        assert_eq!(pending, vec![5, 6]);
    }

    #[test]
    fn overflow_drops_oldest_unacknowledged_and_counts() {
        let mut buffer = small_buffer(4);
        for sequence in 1..=7 {
            buffer.push(frame(sequence, 0.0));
        }

        buffer.trim(0.0);

        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.dropped_inputs(), 3);
        assert!(buffer.frame_at(1).is_none());
        assert!(buffer.frame_at(4).is_some());
    }

    #[test]
    fn acknowledged_frames_age_out_without_counting_as_dropped() {
        let mut buffer = small_buffer(16);
        for sequence in 1..=3 {
            buffer.push(frame(sequence, 0.0));
        }
        buffer.acknowledge(3);

        buffer.trim(10.0);

        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped_inputs(), 0);
    }

    #[test]
    fn recent_acknowledged_frames_are_retained_for_diagnostics() {
        let mut buffer = small_buffer(16);
        buffer.push(frame(1, 0.0));
        buffer.acknowledge(1);

        buffer.trim(0.1);

        assert_eq!(buffer.len(), 1);
    }
}
