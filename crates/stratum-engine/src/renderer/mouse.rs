use crate::host::{MouseEvent, MouseListener};

/// Last known pointer position, for the mirror cursor.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct MouseTracker {
    x: i32,
    y: i32,
}

impl MouseTracker {
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

impl MouseListener for MouseTracker {
    fn mouse_moved(&mut self, event: MouseEvent) -> MouseEvent {
        (self.x, self.y) = (event.x, event.y);
        event
    }

    fn mouse_dragged(&mut self, event: MouseEvent) -> MouseEvent {
        (self.x, self.y) = (event.x, event.y);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_moves_and_drags_only() {
        let mut mouse = MouseTracker::default();
        let ev = mouse.mouse_moved(MouseEvent { x: 10, y: 20 });
        assert_eq!(ev, MouseEvent { x: 10, y: 20 });
        assert_eq!(mouse.position(), (10, 20));

        mouse.mouse_dragged(MouseEvent { x: 30, y: 40 });
        assert_eq!(mouse.position(), (30, 40));

        mouse.mouse_pressed(MouseEvent { x: 1, y: 1 });
        mouse.mouse_clicked(MouseEvent { x: 1, y: 1 });
        assert_eq!(mouse.position(), (30, 40));
    }
}
