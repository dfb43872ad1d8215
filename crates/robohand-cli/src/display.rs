//! Terminal finger gauge shown during a voice session.

use std::io::Write;

use colored::Colorize;
use robohand_middleware::Snapshot;
use robohand_runtime::FingerDisplay;
use robohand_types::Finger;

/// Prints one gauge line per change of the session snapshot.
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

/// One cell per finger in wire order, `▮` extended and `▯` folded.
pub fn gauge(snapshot: &Snapshot) -> String {
    Finger::ALL
        .iter()
        .map(|&finger| {
            let mark = if snapshot.vector.is_extended(finger) { '▮' } else { '▯' };
            format!("{:>6} {mark}", finger.label())
        })
        .collect::<Vec<_>>()
        .join("  ")
}

impl<W: Write> FingerDisplay for TerminalDisplay<W> {
    fn render(&mut self, snapshot: &Snapshot) {
        let fingers = gauge(snapshot);
        let fingers = if snapshot.vector.bits().iter().any(|&b| b) {
            fingers.green()
        } else {
            fingers.dimmed()
        };
        let bpm = format!("{} bpm", snapshot.heart_rate).red().bold();
        let at = snapshot.updated_at.format("%H:%M:%S").to_string().dimmed();
        // A closed stdout only loses the display.
        let _ = writeln!(self.out, "  {at} [{}] {fingers}  {bpm}", snapshot.vector);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robohand_middleware::SessionState;

    #[test]
    fn gauge_marks_extended_fingers() {
        let state = SessionState::new();
        let snapshot = state.set_vector("10001".parse().unwrap());
        let line = gauge(&snapshot);
        assert_eq!(line.matches('▮').count(), 2);
        assert_eq!(line.matches('▯').count(), 3);
        assert!(line.find("thumb").unwrap() < line.find("little").unwrap());
    }

    #[test]
    fn render_writes_one_line_with_vector_and_bpm() {
        let state = SessionState::new();
        state.set_heart_rate(64);
        let snapshot = state.set_vector("01100".parse().unwrap());

        let mut out = Vec::new();
        TerminalDisplay::new(&mut out).render(&snapshot);
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("01100"));
        assert!(text.contains("64 bpm"));
    }

    #[test]
    fn render_stamps_the_snapshot_time() {
        let state = SessionState::new();
        let snapshot = state.set_vector("11111".parse().unwrap());

        let mut out = Vec::new();
        TerminalDisplay::new(&mut out).render(&snapshot);
        let text = String::from_utf8(out).unwrap();

        let stamp = snapshot.updated_at.format("%H:%M:%S").to_string();
        assert!(text.contains(&stamp));
        assert!(text.find(&stamp).unwrap() < text.find("11111").unwrap());
    }
}
