// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dryer outfeed accumulator.
//!
//! Clean signals, plain wrap-aware deltas: 15-bit piece counter, 16-bit
//! decisecond runtime register, 15-bit stop counter, 15-bit stop-seconds
//! counter.

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

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    pieces: Counter,
    runtime: DeciSeconds,
    stops: Counter,
    stop_seconds: Counter,
}

/// Shift accumulator for the dryer outfeed.
pub struct DryerOutProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct DryerOutProduction {
    maquina_id: u8,
    turno: u8,
    cantidad_produccion: u32,
    tiempo_produccion: u32,
    cantidad_paradas: u32,
    tiempo_paradas: u32,
    timestamp_device: String,
}

impl DryerOutProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DryerOutProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DryerOutProcessor {
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
                st.pieces.step15(pieces_clean);
                st.runtime.step(runtime_word);
                st.stops.step15(stops_clean);
                st.stop_seconds.step15(stop_seconds_clean);
            }

            (
                st.pieces.total(),
                st.runtime.seconds(),
                st.stops.total(),
                st.stop_seconds.total(),
            )
        };

        let slug = DeviceKind::DryerOut.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };
        let prod = DryerOutProduction {
            maquina_id: DeviceKind::DryerOut.machine_id(),
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
    fn test_accumulation_and_topics() {
        let p = DryerOutProcessor::new();
        p.process(
            &json!({"lineID": 2, "cantidadProductos": 50, "tiempoProduccion_ds": 100,
                    "paradas": 1, "tiempoParadas_s": 10}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        let pubs = p
            .process(
                &json!({"lineID": 2, "cantidadProductos": 80, "tiempoProduccion_ds": 400,
                        "paradas": 3, "tiempoParadas_s": 40}),
                "site/",
                Shift::S1,
            )
            .unwrap();

        assert_eq!(pubs[0].topic, "site/2/salida_secador/alarms");
        let doc = prod_doc(&pubs);
        assert_eq!(doc["maquina_id"], 4);
        assert_eq!(doc["cantidad_produccion"], 30);
        assert_eq!(doc["tiempo_produccion"], 30); // 300 ds
        assert_eq!(doc["cantidad_paradas"], 2);
        assert_eq!(doc["tiempo_paradas"], 30);
    }

    #[test]
    fn test_runtime_16bit_rollover() {
        let p = DryerOutProcessor::new();
        p.process(&json!({"lineID": 1, "tiempoProduccion_ds": 0xFFF0}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "tiempoProduccion_ds": 0x0010}), "site/", Shift::S1)
            .unwrap();
        // 32 ds across the wrap
        assert_eq!(prod_doc(&pubs)["tiempo_produccion"], 3);
    }

    #[test]
    fn test_shift_change_resets() {
        let p = DryerOutProcessor::new();
        p.process(&json!({"lineID": 1, "cantidadProductos": 10}), "site/", Shift::S1)
            .unwrap();
        p.process(&json!({"lineID": 1, "cantidadProductos": 90}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "cantidadProductos": 120}), "site/", Shift::S2)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidad_produccion"], 0);
    }
}
