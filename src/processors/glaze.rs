// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Glaze line accumulator.
//!
//! Same signal set as the dryer outfeed, but the glaze PLC is the worst
//! noise source on the line, so every delta is bounded.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::counter::{mask15, Counter, DeciSeconds};
use crate::device::DeviceKind;
use crate::error::Result;
use crate::payload::{int_field, word};
use crate::processors::{alarms_topic, production_topic, AlarmsDoc, Processor, Publication};
use crate::shift::{timestamp_device, Shift};

// One bound for all four signals, matching the sampling cadence.
const MAX_STEP: u16 = 200;

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    pieces: Counter,
    runtime: DeciSeconds,
    stops: Counter,
    stop_seconds: Counter,
}

/// Shift accumulator for the glaze line.
pub struct GlazeProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct GlazeProduction {
    maquina_id: u8,
    turno: u8,
    cantidad_produccion: u32,
    tiempo_produccion: u32,
    cantidad_paradas: u32,
    tiempo_paradas: u32,
    timestamp_device: String,
}

impl GlazeProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for GlazeProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for GlazeProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");
        let alarms = int_field(msg, "alarms");

        let pieces_clean = mask15(word(msg, "cantidadProductos"));
        let runtime_word = word(msg, "tiempoProduccion_ds");
        let stops_clean = mask15(word(msg, "paradas"));
        let stop_seconds_clean = mask15(word(msg, "tiempoParadas_s"));

        let (pieces_total, runtime_s, stops_total, stop_seconds_total) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                *st = LineState {
                    shift: Some(shift_now),
                    pieces: Counter::start(pieces_clean),
                    runtime: DeciSeconds::start(runtime_word),
                    stops: Counter::start(stops_clean),
                    stop_seconds: Counter::start(stop_seconds_clean),
                };
            } else {
                st.pieces.step_bounded(pieces_clean, MAX_STEP);
                st.runtime.step_bounded(runtime_word, MAX_STEP);
                st.stops.step_bounded(stops_clean, MAX_STEP);
                st.stop_seconds.step_bounded(stop_seconds_clean, MAX_STEP);
            }

            (
                st.pieces.total(),
                st.runtime.seconds(),
                st.stops.total(),
                st.stop_seconds.total(),
            )
        };

        let slug = DeviceKind::Glaze.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };
        let prod = GlazeProduction {
            maquina_id: DeviceKind::Glaze.machine_id(),
            turno: shift_now.number(),
            cantidad_produccion: pieces_total,
            tiempo_produccion: runtime_s,
            cantidad_paradas: stops_total,
            tiempo_paradas: stop_seconds_total,
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
    fn test_accumulation() {
        let p = GlazeProcessor::new();
        p.process(
            &json!({"lineID": 3, "cantidadProductos": 100, "tiempoProduccion_ds": 500}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        let pubs = p
            .process(
                &json!({"lineID": 3, "cantidadProductos": 150, "tiempoProduccion_ds": 700}),
                "site/",
                Shift::S1,
            )
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["maquina_id"], 5);
        assert_eq!(doc["cantidad_produccion"], 50);
        assert_eq!(doc["tiempo_produccion"], 20);
        assert_eq!(pubs[1].topic, "site/3/esmalte/production");
    }

    #[test]
    fn test_garbage_burst_rejected_on_every_signal() {
        let p = GlazeProcessor::new();
        p.process(
            &json!({"lineID": 3, "cantidadProductos": 10, "paradas": 1,
                    "tiempoProduccion_ds": 100, "tiempoParadas_s": 5}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        let pubs = p
            .process(
                &json!({"lineID": 3, "cantidadProductos": 5000, "paradas": 4000,
                        "tiempoProduccion_ds": 9999, "tiempoParadas_s": 7000}),
                "site/",
                Shift::S1,
            )
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["cantidad_produccion"], 0);
        assert_eq!(doc["cantidad_paradas"], 0);
        assert_eq!(doc["tiempo_produccion"], 0);
        assert_eq!(doc["tiempo_paradas"], 0);
    }
}
