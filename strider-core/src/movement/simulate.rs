use glam::{DQuat, DVec3};

use crate::movement::config::MovementConfig;
use crate::movement::input::{Buttons, InputCommand};
use crate::movement::state::{MoveState, PlayerState};
use crate::movement::world::{surface_normal, FlatGround, WorldQuery};

/// Wish directions shorter than this are treated as "no movement intent".
const MIN_WISH_LENGTH_SQUARED: f64 = 1e-8;

/// Horizontal speeds below this count as standing still.
const IDLE_SPEED: f64 = 0.1;

static FLAT_GROUND: FlatGround = FlatGround;

/* Advance one player by one input command. This is the one function both
 * roles execute: the client for prediction, the server as the authority.
 * It must stay a pure function of its arguments - no clocks, no RNG, no
 * shared scratch state - so that identical inputs give bit-identical
 * outputs on both sides of the wire. */
pub fn simulate(
    state: &PlayerState,
    input: &InputCommand,
    config: &MovementConfig,
    world: Option<&dyn WorldQuery>,
) -> PlayerState {
    let world: &dyn WorldQuery = world.unwrap_or(&FLAT_GROUND);
    let dt = input.delta_time;

    let mut next = state.clone();
    next.sequence = input.sequence;
    next.timestamp = input.client_timestamp;

    // Rooted or stunned: gravity and drift only, horizontal velocity is
    // left exactly as it was.
    if !state.effects.can_move {
        if !next.grounded {
            next.velocity.y -= config.gravity * state.effects.gravity_multiplier * dt;
            next.air_time = next.air_time.map(|t| t + dt);
        }
        next.position += next.velocity * dt;
        settle_on_ground(&mut next, world, config);
        next.move_state = derive_move_state(&next, input.buttons, config);
        next.acceleration = (next.velocity - state.velocity) / dt;
        return next;
    }

    let wish_dir = wish_direction(input);
    let wish_speed = wish_speed(input.buttons, config) * state.effects.speed_multiplier;

    if next.grounded {
        next.velocity = apply_friction(next.velocity, config.ground_friction, dt);
        next.velocity = accelerate(
            next.velocity,
            wish_dir,
            wish_speed,
            config.ground_acceleration,
            dt,
        );

        let wants_jump = input.buttons.contains(Buttons::JUMP);
        if wants_jump && state.effects.can_jump {
            next.velocity.y =
                (2.0 * config.gravity * config.jump_height * state.effects.jump_multiplier).sqrt();
            leave_ground(&mut next);
        } else {
            // Walking off a ledge flips to airborne within the same tick.
            let ahead = next.position + next.velocity * dt;
            let ahead_height = world.height_at(ahead.x, ahead.z);
            if ahead.y > ahead_height + config.step_height {
                leave_ground(&mut next);
            }
        }
    } else {
        let air_wish_speed = (wish_speed * config.air_control_ratio)
            .min(config.max_air_speed * state.effects.speed_multiplier);
        next.velocity = apply_friction(next.velocity, config.air_friction, dt);
        next.velocity = accelerate(
            next.velocity,
            wish_dir,
            air_wish_speed,
            config.air_acceleration,
            dt,
        );
        next.velocity.y -= config.gravity * state.effects.gravity_multiplier * dt;
        next.air_time = next.air_time.map(|t| t + dt);
    }

    clamp_horizontal(&mut next, input.buttons, config);

    next.position += next.velocity * dt;

    settle_on_ground(&mut next, world, config);

    next.move_state = derive_move_state(&next, input.buttons, config);

    if wish_dir.length_squared() > MIN_WISH_LENGTH_SQUARED {
        let target_yaw = (-wish_dir.x).atan2(-wish_dir.z);
        let target = DQuat::from_rotation_y(target_yaw);
        let turn = (config.turn_rate * dt).min(1.0);
        next.rotation = state.rotation.slerp(target, turn);
    }

    next.acceleration = (next.velocity - state.velocity) / dt;
    next
}

/// World-space movement intent. A non-negligible move_vector overrides the
/// button flags entirely; otherwise the four directional buttons are
/// projected through the view orientation onto the horizontal plane.
fn wish_direction(input: &InputCommand) -> DVec3 {
    let explicit = DVec3::new(input.move_vector.x, 0.0, input.move_vector.z);
    if explicit.length_squared() > MIN_WISH_LENGTH_SQUARED {
        return explicit.normalize();
    }

    let forward = flatten(input.view_angles * -DVec3::Z);
    let right = flatten(input.view_angles * DVec3::X);

    let mut wish = DVec3::ZERO;
    if input.buttons.contains(Buttons::FORWARD) {
        wish += forward;
    }
    if input.buttons.contains(Buttons::BACK) {
        wish -= forward;
    }
    if input.buttons.contains(Buttons::RIGHT) {
        wish += right;
    }
    if input.buttons.contains(Buttons::LEFT) {
        wish -= right;
    }
    wish.normalize_or_zero()
}

fn flatten(v: DVec3) -> DVec3 {
    DVec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Sprint > walk > run > default ground speed, in that precedence order.
fn wish_speed(buttons: Buttons, config: &MovementConfig) -> f64 {
    if buttons.contains(Buttons::SPRINT) {
        config.max_sprint_speed
    } else if buttons.contains(Buttons::WALK) {
        config.walk_speed
    } else if buttons.contains(Buttons::RUN) {
        config.max_run_speed
    } else {
        config.max_ground_speed
    }
}

/// Friction reduces current horizontal speed before acceleration adds any;
/// this ordering fixes the top speed reached after N ticks, so changing it
/// desyncs the two roles.
fn apply_friction(velocity: DVec3, friction: f64, dt: f64) -> DVec3 {
    let speed = DVec3::new(velocity.x, 0.0, velocity.z).length();
    if speed < 1e-9 {
        return velocity;
    }
    let drop = speed * friction * dt;
    let scale = ((speed - drop).max(0.0)) / speed;
    DVec3::new(velocity.x * scale, velocity.y, velocity.z * scale)
}

/// Add velocity along the wish direction, up to the remaining budget
/// between the current speed-along-wish and the wish speed.
fn accelerate(velocity: DVec3, wish_dir: DVec3, wish_speed: f64, acceleration: f64, dt: f64) -> DVec3 {
    let current = velocity.dot(wish_dir);
    let budget = wish_speed - current;
    if budget <= 0.0 {
        return velocity;
    }
    let amount = (acceleration * wish_speed * dt).min(budget);
    velocity + wish_dir * amount
}

/// Clamp x/z speed to the stance-appropriate cap; vertical velocity is
/// never clamped here.
fn clamp_horizontal(state: &mut PlayerState, buttons: Buttons, config: &MovementConfig) {
    let cap = if state.grounded {
        if buttons.contains(Buttons::SPRINT) {
            config.max_sprint_speed
        } else {
            config.max_run_speed.max(config.max_ground_speed)
        }
    } else {
        config.max_air_speed
    } * state.effects.speed_multiplier;

    let horizontal = DVec3::new(state.velocity.x, 0.0, state.velocity.z);
    let speed = horizontal.length();
    if speed > cap {
        let scaled = horizontal * (cap / speed);
        state.velocity.x = scaled.x;
        state.velocity.z = scaled.z;
    }
}

fn leave_ground(state: &mut PlayerState) {
    state.grounded = false;
    state.ground_normal = None;
    state.air_time = Some(0.0);
}

/// Ground check at the (already integrated) new position. Landing zeroes
/// vertical velocity and clears air time; this is also the fall-damage
/// hook point when that system arrives.
fn settle_on_ground(state: &mut PlayerState, world: &dyn WorldQuery, config: &MovementConfig) {
    let height = world.height_at(state.position.x, state.position.z);

    if state.grounded {
        if (state.position.y - height).abs() <= config.step_height {
            state.position.y = height;
            state.ground_normal = Some(surface_normal(world, state.position.x, state.position.z));
        } else {
            leave_ground(state);
        }
        return;
    }

    if state.velocity.y <= 0.0 && state.position.y <= height + config.step_height {
        let normal = surface_normal(world, state.position.x, state.position.z);
        // Slopes steeper than the limit never count as ground.
        if normal.y < config.slope_limit {
            return;
        }
        state.position.y = height;
        state.velocity.y = 0.0;
        state.grounded = true;
        state.ground_normal = Some(normal);
        state.air_time = None;
    }
}

fn derive_move_state(state: &PlayerState, buttons: Buttons, config: &MovementConfig) -> MoveState {
    if !state.grounded {
        return if state.velocity.y > 0.0 {
            MoveState::Jumping
        } else {
            MoveState::Falling
        };
    }

    let speed = state.horizontal_speed();
    if buttons.contains(Buttons::CROUCH) {
        return if speed > config.walk_speed {
            MoveState::Sliding
        } else {
            MoveState::Crouching
        };
    }
    if speed < IDLE_SPEED {
        MoveState::Idle
    } else if buttons.contains(Buttons::SPRINT) && speed > config.max_run_speed {
        MoveState::Sprinting
    } else if speed > config.walk_speed {
        MoveState::Running
    } else {
        MoveState::Walking
    }
}
