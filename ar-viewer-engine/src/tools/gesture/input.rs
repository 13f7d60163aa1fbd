use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::pointer::{MOUSE_POINTER_ID, PointerEvent, PointerPhase};

/// Mouse button state carried between frames so moves are only reported
/// while the button is held.
#[derive(Resource, Default)]
pub struct MousePointer {
    pressed: bool,
    last_position: Option<Vec2>,
}

fn touch_phase(phase: TouchPhase) -> PointerPhase {
    match phase {
        TouchPhase::Started => PointerPhase::Down,
        TouchPhase::Moved => PointerPhase::Move,
        TouchPhase::Ended => PointerPhase::Up,
        TouchPhase::Canceled => PointerPhase::Cancel,
    }
}

/// Convert touch and left-mouse input into [`PointerEvent`]s.
pub fn collect_pointer_input(
    mut touches: EventReader<TouchInput>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut mouse: ResMut<MousePointer>,
    mut pointers: EventWriter<PointerEvent>,
) {
    let now = time.elapsed_secs_f64();

    for touch in touches.read() {
        pointers.write(PointerEvent::new(
            touch.id,
            touch_phase(touch.phase),
            touch.position,
            now,
        ));
    }

    let cursor = windows
        .single()
        .ok()
        .and_then(|window| window.cursor_position());

    if buttons.just_pressed(MouseButton::Left) {
        if let Some(position) = cursor {
            mouse.pressed = true;
            mouse.last_position = Some(position);
            pointers.write(PointerEvent::new(
                MOUSE_POINTER_ID,
                PointerPhase::Down,
                position,
                now,
            ));
        }
        return;
    }

    if !mouse.pressed {
        return;
    }

    if buttons.just_released(MouseButton::Left) || !buttons.pressed(MouseButton::Left) {
        mouse.pressed = false;
        let position = cursor.or(mouse.last_position).unwrap_or_default();
        let phase = if cursor.is_some() {
            PointerPhase::Up
        } else {
            PointerPhase::Cancel
        };
        pointers.write(PointerEvent::new(MOUSE_POINTER_ID, phase, position, now));
        mouse.last_position = None;
        return;
    }

    if let Some(position) = cursor.filter(|p| Some(*p) != mouse.last_position) {
        mouse.last_position = Some(position);
        pointers.write(PointerEvent::new(
            MOUSE_POINTER_ID,
            PointerPhase::Move,
            position,
            now,
        ));
    }
}
