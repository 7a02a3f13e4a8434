// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Quality station accumulator.
//!
//! The quality station does not expose wrap-around counters. Two payload
//! shapes coexist on the wire:
//!
//! - accumulated batches: `boxesQ1`/`boxesQ2`/`boxesQ6`/`totalBroken`,
//!   each a delta added to the matching shift bucket;
//! - single box events: `cajaCalidad` in {1, 2, 6} adds one box, and
//!   `quebrados` (older gateways send `quebrado`) adds broken pieces.
//!
//! Only a production document is published; the station has no alarm
//! word.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::device::DeviceKind;
use crate::error::Result;
use crate::payload::{has_field, int_field};
use crate::processors::{production_topic, Processor, Publication};
use crate::shift::{timestamp_device, Shift};

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    q1: u64,
    q2: u64,
    q6: u64,
    broken: u64,
}

/// Shift accumulator for the quality station.
pub struct QualityProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct QualityProduction {
    maquina_id: u8,
    timestamp_device: String,
    shift: u8,
    #[serde(rename = "lineID")]
    line_id: i64,
    extra_c1: u64,
    extra_c2: u64,
    comercial: u64,
    quebrados: u64,
}

impl QualityProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for QualityProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for QualityProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");

        let mut delta_q1 = 0u64;
        let mut delta_q2 = 0u64;
        let mut delta_q6 = 0u64;
        let mut delta_broken = 0u64;

        if has_field(msg, "boxesQ1") {
            delta_q1 = int_field(msg, "boxesQ1").max(0) as u64;
            delta_q2 = int_field(msg, "boxesQ2").max(0) as u64;
            delta_q6 = int_field(msg, "boxesQ6").max(0) as u64;
            delta_broken = int_field(msg, "totalBroken").max(0) as u64;
        } else if has_field(msg, "cajaCalidad") {
            match int_field(msg, "cajaCalidad") {
                1 => delta_q1 = 1,
                2 => delta_q2 = 1,
                6 => delta_q6 = 1,
                _ => {}
            }
            let broken = if has_field(msg, "quebrados") {
                int_field(msg, "quebrados")
            } else {
                int_field(msg, "quebrado")
            };
            if broken > 0 {
                delta_broken = broken as u64;
            }
        }

        let (q1, q2, q6, broken) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                *st = LineState {
                    shift: Some(shift_now),
                    ..LineState::default()
                };
            }

            st.q1 += delta_q1;
            st.q2 += delta_q2;
            st.q6 += delta_q6;
            st.broken += delta_broken;

            (st.q1, st.q2, st.q6, st.broken)
        };

        let prod = QualityProduction {
            maquina_id: DeviceKind::Quality.machine_id(),
            timestamp_device: timestamp_device(),
            shift: shift_now.number(),
            line_id,
            extra_c1: q1,
            extra_c2: q2,
            comercial: q6,
            quebrados: broken,
        };

        Ok(vec![Publication::json(
            production_topic(isa95_prefix, line_id, DeviceKind::Quality.slug()),
            &prod,
        )?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pubs: &[Publication]) -> Value {
        serde_json::from_str(&pubs[0].payload).unwrap()
    }

    #[test]
    fn test_accumulated_form_adds_deltas() {
        let p = QualityProcessor::new();
        p.process(
            &json!({"lineID": 3, "boxesQ1": 4, "boxesQ2": 0, "boxesQ6": 1, "totalBroken": 2}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        let pubs = p
            .process(
                &json!({"lineID": 3, "boxesQ1": 3, "boxesQ2": 1, "boxesQ6": 0, "totalBroken": 0}),
                "site/",
                Shift::S1,
            )
            .unwrap();

        assert_eq!(pubs.len(), 1); // production only, no alarms topic
        assert_eq!(pubs[0].topic, "site/3/calidad/production");

        let d = doc(&pubs);
        assert_eq!(d["extra_c1"], 7);
        assert_eq!(d["extra_c2"], 1);
        assert_eq!(d["comercial"], 1);
        assert_eq!(d["quebrados"], 2);
        assert_eq!(d["maquina_id"], 8);
        assert_eq!(d["lineID"], 3);
    }

    #[test]
    fn test_event_form_single_box() {
        let p = QualityProcessor::new();
        p.process(&json!({"lineID": 1, "cajaCalidad": 2}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "cajaCalidad": 2, "quebrados": 3}), "site/", Shift::S1)
            .unwrap();
        let d = doc(&pubs);
        assert_eq!(d["extra_c2"], 2); // replayed event counts twice
        assert_eq!(d["quebrados"], 3);
    }

    #[test]
    fn test_event_form_legacy_broken_key() {
        let p = QualityProcessor::new();
        let pubs = p
            .process(&json!({"lineID": 1, "cajaCalidad": 6, "quebrado": 2}), "site/", Shift::S1)
            .unwrap();
        let d = doc(&pubs);
        assert_eq!(d["comercial"], 1);
        assert_eq!(d["quebrados"], 2);
    }

    #[test]
    fn test_shift_change_wipes_then_applies() {
        let p = QualityProcessor::new();
        p.process(&json!({"lineID": 2, "boxesQ1": 10}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 2, "boxesQ1": 4}), "site/", Shift::S2)
            .unwrap();
        let d = doc(&pubs);
        assert_eq!(d["extra_c1"], 4);
        assert_eq!(d["shift"], 2);
    }

    #[test]
    fn test_unknown_box_class_ignored() {
        let p = QualityProcessor::new();
        let pubs = p
            .process(&json!({"lineID": 1, "cajaCalidad": 4}), "site/", Shift::S1)
            .unwrap();
        let d = doc(&pubs);
        assert_eq!(d["extra_c1"], 0);
        assert_eq!(d["extra_c2"], 0);
        assert_eq!(d["comercial"], 0);
    }
}
