//! Telemetry sinks for the fusion loop's pose output

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use robot_if::tm::{PoseTm, TelemetrySink};
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Logs the pose at info level once every `every` items.
pub struct LogTmSink {
    every: usize,
    count: usize,
}

/// Writes every pose into `pose_tm.csv` in the session archive.
pub struct ArchiveTmSink {
    arch: Archiver,
}

/// One row of the pose archive.
#[derive(Serialize)]
struct TmRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    phi_rad: f64,
    true_x_m: Option<f64>,
    true_y_m: Option<f64>,
    true_phi_rad: Option<f64>,
    num_updates: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogTmSink {
    /// A sink logging one item in `every`, zero disables the log.
    pub fn new(every: usize) -> Self {
        Self { every, count: 0 }
    }

    fn due(&mut self) -> bool {
        if self.every == 0 {
            return false;
        }

        let due = self.count % self.every == 0;
        self.count = self.count.wrapping_add(1);
        due
    }
}

impl TelemetrySink for LogTmSink {
    fn send(&mut self, tm: &PoseTm) {
        if !self.due() {
            return;
        }

        let (x, y, phi) = tm.as_tuple();
        match tm.truth {
            Some(t) => info!(
                "Pose ({:.3}, {:.3}, {:.3}), truth ({:.3}, {:.3}, {:.3})",
                x, y, phi, t.x_m, t.y_m, t.phi_rad
            ),
            None => info!("Pose ({:.3}, {:.3}, {:.3})", x, y, phi),
        }
    }
}

impl ArchiveTmSink {
    pub fn new(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch: Archiver::from_path(session, "pose_tm.csv")?,
        })
    }
}

impl TelemetrySink for ArchiveTmSink {
    fn send(&mut self, tm: &PoseTm) {
        let record = TmRecord {
            time_s: tm.time_s,
            x_m: tm.est.x_m,
            y_m: tm.est.y_m,
            phi_rad: tm.est.phi_rad,
            true_x_m: tm.truth.map(|t| t.x_m),
            true_y_m: tm.truth.map(|t| t.y_m),
            true_phi_rad: tm.truth.map(|t| t.phi_rad),
            num_updates: tm.num_updates,
        };

        if let Err(e) = self.arch.serialise(record) {
            warn!("Could not archive pose telemetry: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_decimation() {
        let mut sink = LogTmSink::new(3);
        let due: Vec<bool> = (0..7).map(|_| sink.due()).collect();
        assert_eq!(due, vec![true, false, false, true, false, false, true]);

        let mut off = LogTmSink::new(0);
        assert!(!off.due());
    }
}
