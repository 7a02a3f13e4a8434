// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dryer infeed accumulator.
//!
//! Two signals, both noisy: a 15-bit motor-start counter and a 15-bit
//! operating-seconds counter. Both go through bounded deltas.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::counter::{mask15, Counter};
use crate::device::DeviceKind;
use crate::error::Result;
use crate::payload::{int_field, word};
use crate::processors::{alarms_topic, production_topic, AlarmsDoc, Processor, Publication};
use crate::shift::{timestamp_device, Shift};

// Bounds observed on the line: no more than 100 starts or 30 operating
// seconds between consecutive samples.
const MAX_STARTS_STEP: u16 = 100;
const MAX_OPERATION_STEP_S: u16 = 30;

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    starts: Counter,
    operation_seconds: Counter,
}

/// Shift accumulator for the dryer infeed.
pub struct DryerInProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct DryerInProduction {
    maquina_id: u8,
    turno: u8,
    cantidad_arranques: u32,
    tiempo_operacion: u32,
    timestamp_device: String,
}

impl DryerInProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DryerInProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DryerInProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");
        let alarms = int_field(msg, "alarms");

        let starts_clean = mask15(word(msg, "arranques"));
        let operation_clean = mask15(word(msg, "tiempoOperacion_s"));

        let (starts_total, operation_total) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                *st = LineState {
                    shift: Some(shift_now),
                    starts: Counter::start(starts_clean),
                    operation_seconds: Counter::start(operation_clean),
                };
            } else {
                st.starts.step_bounded(starts_clean, MAX_STARTS_STEP);
                st.operation_seconds
                    .step_bounded(operation_clean, MAX_OPERATION_STEP_S);
            }

            (st.starts.total(), st.operation_seconds.total())
        };

        let slug = DeviceKind::DryerIn.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };
        let prod = DryerInProduction {
            maquina_id: DeviceKind::DryerIn.machine_id(),
            turno: shift_now.number(),
            cantidad_arranques: starts_total,
            tiempo_operacion: operation_total,
            timestamp_device: timestamp_device(),
        };

        Ok(vec![
            Publication::json(alarms_topic(isa95_prefix, line_id, slug), &alarms_doc)?,
            Publication::json(production_topic(isa95_prefix, line_id, slug), &prod)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prod_doc(pubs: &[Publication]) -> Value {
        serde_json::from_str(&pubs[1].payload).unwrap()
    }

    #[test]
    fn test_accumulates_bounded_deltas() {
        let p = DryerInProcessor::new();
        p.process(
            &json!({"lineID": 1, "arranques": 10, "tiempoOperacion_s": 100}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        let pubs = p
            .process(
                &json!({"lineID": 1, "arranques": 13, "tiempoOperacion_s": 125}),
                "site/",
                Shift::S1,
            )
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["maquina_id"], 3);
        assert_eq!(doc["cantidad_arranques"], 3);
        assert_eq!(doc["tiempo_operacion"], 25);
        assert_eq!(pubs[1].topic, "site/1/entrada_secador/production");
    }

    #[test]
    fn test_spike_rejected_baseline_moves() {
        let p = DryerInProcessor::new();
        p.process(&json!({"lineID": 1, "arranques": 10}), "site/", Shift::S1)
            .unwrap();
        // delta 500 > 100: rejected
        let pubs = p
            .process(&json!({"lineID": 1, "arranques": 510}), "site/", Shift::S1)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidad_arranques"], 0);
        // next delta measured from the rejected reading
        let pubs = p
            .process(&json!({"lineID": 1, "arranques": 512}), "site/", Shift::S1)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidad_arranques"], 2);
    }

    #[test]
    fn test_shift_change_resets() {
        let p = DryerInProcessor::new();
        p.process(&json!({"lineID": 1, "arranques": 10}), "site/", Shift::S2)
            .unwrap();
        p.process(&json!({"lineID": 1, "arranques": 20}), "site/", Shift::S2)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "arranques": 25}), "site/", Shift::S3)
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["cantidad_arranques"], 0);
        assert_eq!(doc["turno"], 3);
    }
}
