use crate::config::AntiAliasingMode;
use crate::render::{plan_aa, AaKey, AaTransition};

/// What changed about the drawing surface since the previous frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceChanges {
    /// The canvas changed size; the interface texture must follow.
    pub canvas_resized: Option<(u32, u32)>,
    pub aa: AaTransition,
}

/// Remembers the canvas size and multisample key last frame was built for.
#[derive(Debug, Default)]
pub struct SurfaceTracker {
    canvas: Option<(u32, u32)>,
    aa: Option<AaKey>,
}

impl SurfaceTracker {
    /// `canvas` is the host's logical canvas; `surface` is the physical
    /// size frames are presented at, which is the stretched size when
    /// stretching is on.
    pub fn update(&mut self, canvas: (u32, u32), surface: (u32, u32), aa: AntiAliasingMode) -> SurfaceChanges {
        let canvas_resized = (self.canvas != Some(canvas)).then(|| {
            self.canvas = Some(canvas);
            canvas
        });

        let transition = plan_aa(aa, surface, self.aa);
        match transition {
            AaTransition::Rebuild(key) => self.aa = Some(key),
            AaTransition::Release => self.aa = None,
            AaTransition::Keep => {}
        }

        SurfaceChanges {
            canvas_resized,
            aa: transition,
        }
    }

    /// Forget everything, so the next frame rebuilds all size-dependent
    /// resources.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_allocates_everything() {
        let mut tracker = SurfaceTracker::default();
        let changes = tracker.update((765, 503), (765, 503), AntiAliasingMode::Msaa4);
        assert_eq!(changes.canvas_resized, Some((765, 503)));
        assert!(matches!(changes.aa, AaTransition::Rebuild(_)));

        let changes = tracker.update((765, 503), (765, 503), AntiAliasingMode::Msaa4);
        assert_eq!(changes.canvas_resized, None);
        assert_eq!(changes.aa, AaTransition::Keep);
    }

    #[test]
    fn canvas_resize_under_stretching_keeps_aa_target() {
        let mut tracker = SurfaceTracker::default();
        let stretched = (1530, 1006);
        tracker.update((765, 503), stretched, AntiAliasingMode::Msaa4);

        let mut interface_reallocs = 0;
        let mut aa_rebuilds = 0;
        for canvas in [(800, 600), (800, 600), (800, 600)] {
            let changes = tracker.update(canvas, stretched, AntiAliasingMode::Msaa4);
            interface_reallocs += changes.canvas_resized.is_some() as u32;
            aa_rebuilds += matches!(changes.aa, AaTransition::Rebuild(_)) as u32;
        }
        assert_eq!(interface_reallocs, 1);
        assert_eq!(aa_rebuilds, 0);
    }

    #[test]
    fn disabling_aa_releases_once() {
        let mut tracker = SurfaceTracker::default();
        tracker.update((765, 503), (765, 503), AntiAliasingMode::Msaa2);
        let changes = tracker.update((765, 503), (765, 503), AntiAliasingMode::Disabled);
        assert_eq!(changes.aa, AaTransition::Release);
        let changes = tracker.update((765, 503), (765, 503), AntiAliasingMode::Disabled);
        assert_eq!(changes.aa, AaTransition::Keep);
    }

    #[test]
    fn reset_forces_reallocation() {
        let mut tracker = SurfaceTracker::default();
        tracker.update((765, 503), (765, 503), AntiAliasingMode::Msaa2);
        tracker.reset();
        let changes = tracker.update((765, 503), (765, 503), AntiAliasingMode::Msaa2);
        assert!(changes.canvas_resized.is_some());
        assert!(matches!(changes.aa, AaTransition::Rebuild(_)));
    }
}
