//! Packet counters, logged periodically by the frame loop

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vrwheel_errors::ReportError;

use crate::packet::PacketKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketStats {
    handled: [u64; PacketKind::ALL.len()],
    /// Known but unmodelled report ids
    unsupported: BTreeMap<u8, u64>,
    /// Truncated, unknown or malformed reports
    rejected: u64,
}

impl PacketStats {
    pub fn record_handled(&mut self, kind: PacketKind) {
        if let Some(count) = self.handled.get_mut(kind.index()) {
            *count = count.saturating_add(1);
        }
    }

    pub fn record_error(&mut self, error: &ReportError) {
        match error {
            ReportError::UnsupportedReport(id) => {
                let count = self.unsupported.entry(*id).or_default();
                *count = count.saturating_add(1);
            }
            _ => self.rejected = self.rejected.saturating_add(1),
        }
    }

    pub fn handled(&self, kind: PacketKind) -> u64 {
        self.handled.get(kind.index()).copied().unwrap_or_default()
    }

    pub fn total_handled(&self) -> u64 {
        self.handled.iter().fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    pub fn unsupported(&self) -> &BTreeMap<u8, u64> {
        &self.unsupported
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl fmt::Display for PacketStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handled={}", self.total_handled())?;
        for kind in PacketKind::ALL {
            write!(f, " {kind:?}={}", self.handled(kind))?;
        }
        write!(f, " rejected={}", self.rejected)?;
        for (id, count) in &self.unsupported {
            write!(f, " unsupported[0x{id:02X}]={count}")?;
        }
        Ok(())
    }
}
