//! Mirror hand-off: composited frames go to a secondary display on a
//! background thread, at most one at a time.

use std::thread::JoinHandle;

use image::{Rgba, RgbaImage};

/// Arrow cursor drawn over mirrored frames. `#` outline, `.` fill.
const CURSOR: [&str; 12] = [
    "#",
    "##",
    "#.#",
    "#..#",
    "#...#",
    "#....#",
    "#.....#",
    "#......#",
    "#....###",
    "#.#..#",
    "##  #..#",
    "#    ##",
];

/// Draws the cursor with its tip at `(x, y)` in frame pixels.
pub fn draw_cursor(frame: &mut RgbaImage, x: i32, y: i32) {
    let (width, height) = frame.dimensions();
    for (row, line) in CURSOR.iter().enumerate() {
        for (col, c) in line.bytes().enumerate() {
            let color = match c {
                b'#' => Rgba([0, 0, 0, 255]),
                b'.' => Rgba([255, 255, 255, 255]),
                _ => continue,
            };
            let px = x as i64 + col as i64;
            let py = y as i64 + row as i64;
            if (0..width as i64).contains(&px) && (0..height as i64).contains(&py) {
                frame.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Single-slot background job runner.
#[derive(Debug, Default)]
pub struct MirrorTask {
    running: Option<JoinHandle<()>>,
}

impl MirrorTask {
    pub fn is_idle(&self) -> bool {
        self.running.as_ref().is_none_or(|handle| handle.is_finished())
    }

    /// Runs `job` on a new thread unless the previous job is still going.
    /// Returns whether the job was started; a busy slot drops it.
    pub fn try_start(&mut self, job: impl FnOnce() + Send + 'static) -> bool {
        if !self.is_idle() {
            return false;
        }
        if let Some(done) = self.running.take() {
            if done.join().is_err() {
                log::warn!("mirror job panicked");
            }
        }
        let spawned = std::thread::Builder::new()
            .name("stratum-mirror".into())
            .spawn(job);
        match spawned {
            Ok(handle) => {
                self.running = Some(handle);
                true
            }
            Err(err) => {
                log::warn!("failed to start mirror job: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn busy_slot_drops_new_jobs() {
        let mut task = MirrorTask::default();
        assert!(task.is_idle());

        let (release_tx, release_rx) = mpsc::channel::<()>();
        assert!(task.try_start(move || {
            let _ = release_rx.recv();
        }));
        assert!(!task.is_idle());

        let (ran_tx, ran_rx) = mpsc::channel::<()>();
        let ran = ran_tx.clone();
        assert!(!task.try_start(move || {
            let _ = ran.send(());
        }));

        release_tx.send(()).unwrap();
        while !task.is_idle() {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(ran_rx.try_recv().is_err());

        assert!(task.try_start(move || {
            let _ = ran_tx.send(());
        }));
        ran_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn cursor_is_clipped_to_frame() {
        let mut frame = RgbaImage::new(4, 4);
        draw_cursor(&mut frame, 2, 2);
        assert_eq!(frame.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(frame.get_pixel(3, 3), &Rgba([0, 0, 0, 255]));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));

        draw_cursor(&mut frame, -20, 100);
    }

    #[test]
    fn cursor_has_a_white_fill() {
        let mut frame = RgbaImage::new(16, 16);
        draw_cursor(&mut frame, 0, 0);
        assert_eq!(frame.get_pixel(1, 2), &Rgba([255, 255, 255, 255]));
    }
}
