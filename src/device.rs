// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Device registry.
//!
//! Every gateway sample carries a `deviceType` code identifying the
//! machine class that produced it. Codes 1..8 map to dedicated
//! processors; anything else falls back to the pass-through default.

/// Machine class behind a `deviceType` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Hydraulic press 1
    Ph1,
    /// Hydraulic press 2
    Ph2,
    /// Dryer infeed
    DryerIn,
    /// Dryer outfeed
    DryerOut,
    /// Glaze line
    Glaze,
    /// Kiln infeed
    KilnIn,
    /// Kiln outfeed
    KilnOut,
    /// Quality station
    Quality,
}

impl DeviceKind {
    /// Resolve a wire code. Codes outside 1..=8 have no dedicated
    /// processor.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DeviceKind::Ph1),
            2 => Some(DeviceKind::Ph2),
            3 => Some(DeviceKind::DryerIn),
            4 => Some(DeviceKind::DryerOut),
            5 => Some(DeviceKind::Glaze),
            6 => Some(DeviceKind::KilnIn),
            7 => Some(DeviceKind::KilnOut),
            8 => Some(DeviceKind::Quality),
            _ => None,
        }
    }

    /// Slug used in derived topic paths.
    pub fn slug(self) -> &'static str {
        match self {
            DeviceKind::Ph1 => "prensa_hidraulica1",
            DeviceKind::Ph2 => "prensa_hidraulica2",
            DeviceKind::DryerIn => "entrada_secador",
            DeviceKind::DryerOut => "salida_secador",
            DeviceKind::Glaze => "esmalte",
            DeviceKind::KilnIn => "entrada_horno",
            DeviceKind::KilnOut => "salida_horno",
            DeviceKind::Quality => "calidad",
        }
    }

    /// `maquina_id` stamped on production documents.
    pub fn machine_id(self) -> u8 {
        match self {
            DeviceKind::Ph1 => 1,
            DeviceKind::Ph2 => 2,
            DeviceKind::DryerIn => 3,
            DeviceKind::DryerOut => 4,
            DeviceKind::Glaze => 5,
            DeviceKind::KilnIn => 6,
            DeviceKind::KilnOut => 7,
            DeviceKind::Quality => 8,
        }
    }

    /// Short name for log lines.
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Ph1 => "PH_1",
            DeviceKind::Ph2 => "PH_2",
            DeviceKind::DryerIn => "Entrada_secador",
            DeviceKind::DryerOut => "Salida_secador",
            DeviceKind::Glaze => "Esmalte",
            DeviceKind::KilnIn => "Entrada_horno",
            DeviceKind::KilnOut => "Salida_horno",
            DeviceKind::Quality => "Calidad",
        }
    }
}

/// Pieces pressed per stroke, per production line. Unrecognized lines
/// press 3.
pub fn pieces_per_stroke(line_id: i64) -> u32 {
    match line_id {
        1 => 3,
        2 => 3,
        3 => 2,
        4 => 4,
        5 => 2,
        _ => 3,
    }
}
