use glam::DVec3;

use strider_core::movement::{
    Buttons, InputCommand, MovementConfig, StatusEffects, FlatGround, WORLD_BOUND,
};
use strider_core::networking::{ClientBoundPacket, CorrectionReason};

use crate::game::session::PlayerSession;
use crate::terrain::{Mound, ServerTerrain};

const TICK: f64 = 1.0 / 60.0;

fn forward_command(sequence: u64) -> InputCommand {
    let mut command = InputCommand::new(sequence, sequence as f64 * TICK, TICK);
    command.buttons = Buttons::FORWARD;
    command
}

fn ack_sequence(packet: &ClientBoundPacket) -> u64 {
    match packet {
        ClientBoundPacket::InputAck { sequence, .. } => *sequence,
        _ => panic!("expected an input ack"),
    }
}

fn correction_reason(packet: &ClientBoundPacket) -> Option<CorrectionReason> {
    match packet {
        ClientBoundPacket::InputAck { correction, .. } => {
            correction.as_ref().map(|c| c.reason)
        }
        _ => None,
    }
}

#[test]
fn accepted_command_advances_state_and_acks() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    let reply = session
        .apply_command(forward_command(1), 0.0, &config, &FlatGround)
        .expect("accepted command must be acknowledged");

    assert_eq!(ack_sequence(&reply), 1);
    assert_eq!(correction_reason(&reply), None);
    assert!(session.state.velocity.z < 0.0);
    assert_eq!(session.last_applied_sequence(), 1);
}

#[test]
fn stale_and_duplicate_commands_are_ignored_and_counted() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    assert!(session
        .apply_command(forward_command(5), 0.0, &config, &FlatGround)
        .is_some());
    assert!(session
        .apply_command(forward_command(5), 0.1, &config, &FlatGround)
        .is_none());
    assert!(session
        .apply_command(forward_command(3), 0.2, &config, &FlatGround)
        .is_none());

    assert_eq!(session.stale_inputs, 2);
    assert_eq!(session.last_applied_sequence(), 5);
}

#[test]
fn malformed_command_is_dropped_and_counted() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    let mut command = forward_command(1);
    command.delta_time = f64::NAN;

    assert!(session
        .apply_command(command, 0.0, &config, &FlatGround)
        .is_none());
    assert_eq!(session.rejected_inputs, 1);
    assert_eq!(session.last_applied_sequence(), 0);
}

#[test]
fn checksum_mismatch_is_a_signal_not_a_rejection() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    let mut command = forward_command(1);
    command.checksum = Some(0xdead_beef);

    assert!(session
        .apply_command(command, 0.0, &config, &FlatGround)
        .is_some());
    assert_eq!(session.checksum_mismatches, 1);
    assert_eq!(session.last_applied_sequence(), 1);
}

#[test]
fn leaving_the_world_box_earns_an_illegal_move_correction() {
    let config = MovementConfig::default();
    let spawn = DVec3::new(0.0, 0.0, -(WORLD_BOUND - 0.001));
    let mut session = PlayerSession::new(0, spawn);

    // Forward is -Z, so this command pushes straight out of bounds.
    let reply = session
        .apply_command(forward_command(1), 0.0, &config, &FlatGround)
        .expect("rejection still answers with a correction");

    assert_eq!(correction_reason(&reply), Some(CorrectionReason::IllegalMove));
    // The offending delta was not applied.
    assert_eq!(session.state.position, spawn);
    // The sequence is still consumed, so a resend will not re-fire.
    assert_eq!(session.last_applied_sequence(), 1);
}

#[test]
fn oversized_displacement_earns_a_teleport_correction() {
    let mut config = MovementConfig::default();
    config.teleport_threshold = 1e-6;
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    let reply = session
        .apply_command(forward_command(1), 0.0, &config, &FlatGround)
        .expect("rejection still answers with a correction");

    assert_eq!(correction_reason(&reply), Some(CorrectionReason::Teleport));
    assert_eq!(session.state.position, DVec3::ZERO);
}

#[test]
fn effect_change_emits_a_correction_with_new_multipliers() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(0, DVec3::ZERO);
    session
        .apply_command(forward_command(1), 0.0, &config, &FlatGround)
        .unwrap();

    let mut slowed = StatusEffects::default();
    slowed.speed_multiplier = 0.5;
    let packet = session.apply_effects(slowed.clone());

    assert_eq!(correction_reason(&packet), Some(CorrectionReason::EffectApplied));
    assert_eq!(session.state.effects, slowed);
    match packet {
        ClientBoundPacket::InputAck { correction: Some(c), .. } => {
            assert_eq!(c.correct_state.effects, slowed);
            assert_eq!(c.sequence, 1);
        }
        _ => panic!("expected a correction"),
    }
}

#[test]
fn first_broadcast_is_full_then_deltas_follow() {
    let config = MovementConfig::default();
    let mut session = PlayerSession::new(3, DVec3::ZERO);

    match session.broadcast_packet() {
        ClientBoundPacket::Snapshot { player, .. } => assert_eq!(player, 3),
        _ => panic!("first broadcast must be a full snapshot"),
    }

    session
        .apply_command(forward_command(1), 0.0, &config, &FlatGround)
        .unwrap();

    match session.broadcast_packet() {
        ClientBoundPacket::SnapshotDelta { player, delta } => {
            assert_eq!(player, 3);
            assert_ne!(delta.mask, 0);
        }
        _ => panic!("second broadcast must be a delta"),
    }
}

#[test]
fn position_history_is_bounded() {
    let mut config = MovementConfig::default();
    config.position_history_size = 4;
    let mut session = PlayerSession::new(0, DVec3::ZERO);

    for sequence in 1..=20 {
        session
            .apply_command(forward_command(sequence), 0.0, &config, &FlatGround)
            .unwrap();
    }

    assert_eq!(session.position_history().count(), 4);
}

#[test]
fn session_simulates_against_server_terrain() {
    let config = MovementConfig::default();
    let terrain = ServerTerrain::with_mounds(vec![Mound {
        x: 0.0,
        z: 0.0,
        radius: 8.0,
        height: 0.2,
    }]);
    let spawn = DVec3::new(0.0, terrain_height(&terrain), 0.0);
    let mut session = PlayerSession::new(0, spawn);

    session
        .apply_command(forward_command(1), 0.0, &config, &terrain)
        .unwrap();

    // Still grounded, snapped to the mound's surface rather than the plane.
    assert!(session.state.grounded);
    assert!(session.state.position.y > 0.0);
}

fn terrain_height(terrain: &ServerTerrain) -> f64 {
    use strider_core::movement::WorldQuery;
    terrain.height_at(0.0, 0.0)
}
