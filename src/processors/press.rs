// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Hydraulic press accumulators.
//!
//! Both presses report the same signal set: a 15-bit stroke counter
//! ("pisadas", each stroke presses several pieces), a 16-bit decisecond
//! runtime register, a 15-bit stop counter and a 15-bit stop-seconds
//! counter. The instances differ only in machine id and topic slug.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::counter::{bit15_set, mask15, Counter, DeciSeconds};
use crate::device::{pieces_per_stroke, DeviceKind};
use crate::error::Result;
use crate::payload::{int_field, word};
use crate::processors::{alarms_topic, production_topic, AlarmsDoc, Processor, Publication};
use crate::shift::{timestamp_device, Shift};

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    strokes: Counter,
    runtime: DeciSeconds,
    stops: Counter,
    stop_seconds: Counter,
}

/// Shift accumulator for one hydraulic press.
pub struct PressProcessor {
    kind: DeviceKind,
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct PressProduction {
    maquina_id: u8,
    turno: u8,

    #[serde(rename = "cantidadProductos_raw")]
    cantidad_productos_raw: i64,
    #[serde(rename = "cantidadProductos_instantaneo")]
    cantidad_productos_instantaneo: u16,
    #[serde(rename = "bit15_corruption_cantidadProductos")]
    bit15_corruption_cantidad_productos: bool,

    #[serde(rename = "cantidadPisadas_turno")]
    cantidad_pisadas_turno: u32,
    #[serde(rename = "cantidadPisadas_min")]
    cantidad_pisadas_min: u32,
    #[serde(rename = "cantidadProductos_turno")]
    cantidad_productos_turno: u32,

    #[serde(rename = "tiempoProduccion_ds_instantaneo")]
    tiempo_produccion_ds_instantaneo: u16,
    #[serde(rename = "tiempoProduccion_turno_s")]
    tiempo_produccion_turno_s: u32,

    paradas_raw: i64,
    paradas_instantaneo: u16,
    paradas_turno: u32,
    bit15_corruption_paradas: bool,

    #[serde(rename = "tiempoParadas_raw")]
    tiempo_paradas_raw: i64,
    #[serde(rename = "tiempoParadas_instantaneo")]
    tiempo_paradas_instantaneo: u16,
    #[serde(rename = "tiempoParadas_turno_s")]
    tiempo_paradas_turno_s: u32,
    #[serde(rename = "bit15_corruption_tiempoParadas")]
    bit15_corruption_tiempo_paradas: bool,

    timestamp_device: String,
}

impl PressProcessor {
    /// `kind` must be one of the two presses.
    pub fn new(kind: DeviceKind) -> Self {
        debug_assert!(matches!(kind, DeviceKind::Ph1 | DeviceKind::Ph2));
        Self {
            kind,
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Processor for PressProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");
        let alarms = int_field(msg, "alarms");

        let strokes_raw = int_field(msg, "cantidadProductos");
        let stops_raw = int_field(msg, "paradas");
        let stop_seconds_raw = int_field(msg, "tiempoParadas_s");

        let strokes_word = word(msg, "cantidadProductos");
        let runtime_word = word(msg, "tiempoProduccion_ds");
        let stops_word = word(msg, "paradas");
        let stop_seconds_word = word(msg, "tiempoParadas_s");

        let strokes_clean = mask15(strokes_word);
        let stops_clean = mask15(stops_word);
        let stop_seconds_clean = mask15(stop_seconds_word);

        let (strokes_total, runtime_s, runtime_s_exact, stops_total, stop_seconds_total) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                *st = LineState {
                    shift: Some(shift_now),
                    strokes: Counter::start(strokes_clean),
                    runtime: DeciSeconds::start(runtime_word),
                    stops: Counter::start(stops_clean),
                    stop_seconds: Counter::start(stop_seconds_clean),
                };
            } else {
                st.strokes.step15(strokes_clean);
                st.runtime.step(runtime_word);
                st.stops.step15(stops_clean);
                st.stop_seconds.step15(stop_seconds_clean);
            }

            (
                st.strokes.total(),
                st.runtime.seconds(),
                st.runtime.seconds_f64(),
                st.stops.total(),
                st.stop_seconds.total(),
            )
        };

        // Strokes per minute over the accumulated runtime
        let strokes_min = if runtime_s_exact > 1.0 {
            (f64::from(strokes_total) / (runtime_s_exact / 60.0)).round() as u32
        } else {
            0
        };

        let slug = self.kind.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };
        let prod = PressProduction {
            maquina_id: self.kind.machine_id(),
            turno: shift_now.number(),
            cantidad_productos_raw: strokes_raw,
            cantidad_productos_instantaneo: strokes_clean,
            bit15_corruption_cantidad_productos: bit15_set(strokes_word),
            cantidad_pisadas_turno: strokes_total,
            cantidad_pisadas_min: strokes_min,
            cantidad_productos_turno: strokes_total * pieces_per_stroke(line_id),
            tiempo_produccion_ds_instantaneo: runtime_word,
            tiempo_produccion_turno_s: runtime_s,
            paradas_raw: stops_raw,
            paradas_instantaneo: stops_clean,
            paradas_turno: stops_total,
            bit15_corruption_paradas: bit15_set(stops_word),
            tiempo_paradas_raw: stop_seconds_raw,
            tiempo_paradas_instantaneo: stop_seconds_clean,
            tiempo_paradas_turno_s: stop_seconds_total,
            bit15_corruption_tiempo_paradas: bit15_set(stop_seconds_word),
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
    fn test_two_sample_accumulation() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        let a = json!({
            "deviceType": 1, "lineID": 1, "cantidadProductos": 100,
            "tiempoProduccion_ds": 1000, "paradas": 0, "tiempoParadas_s": 0,
            "alarms": 0
        });
        let b = json!({
            "deviceType": 1, "lineID": 1, "cantidadProductos": 130,
            "tiempoProduccion_ds": 1200, "paradas": 2, "tiempoParadas_s": 15,
            "alarms": 0
        });

        p.process(&a, "site/", Shift::S1).unwrap();
        let pubs = p.process(&b, "site/", Shift::S1).unwrap();

        assert_eq!(pubs[0].topic, "site/1/prensa_hidraulica1/alarms");
        assert_eq!(pubs[1].topic, "site/1/prensa_hidraulica1/production");

        let doc = prod_doc(&pubs);
        assert_eq!(doc["maquina_id"], 1);
        assert_eq!(doc["turno"], 1);
        assert_eq!(doc["cantidadPisadas_turno"], 30);
        assert_eq!(doc["cantidadProductos_turno"], 90); // 30 x factor(1)=3
        assert_eq!(doc["tiempoProduccion_turno_s"], 20); // 200 ds
        assert_eq!(doc["paradas_turno"], 2);
        assert_eq!(doc["tiempoParadas_turno_s"], 15);
    }

    #[test]
    fn test_first_sample_contributes_zero() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        let a = json!({"lineID": 1, "cantidadProductos": 5000});
        let pubs = p.process(&a, "site/", Shift::S1).unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["cantidadPisadas_turno"], 0);
        assert_eq!(doc["cantidadProductos_instantaneo"], 5000);
    }

    #[test]
    fn test_stroke_counter_rollover() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        p.process(&json!({"lineID": 1, "cantidadProductos": 0x7FFE}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "cantidadProductos": 0x0002}), "site/", Shift::S1)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidadPisadas_turno"], 4);
    }

    #[test]
    fn test_bank_flag_corruption() {
        let p = PressProcessor::new(DeviceKind::Ph2);
        let pubs = p
            .process(&json!({"lineID": 2, "cantidadProductos": 0x8005}), "site/", Shift::S1)
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["maquina_id"], 2);
        assert_eq!(doc["bit15_corruption_cantidadProductos"], true);
        assert_eq!(doc["cantidadProductos_instantaneo"], 5);
        assert_eq!(doc["cantidadPisadas_turno"], 0);
    }

    #[test]
    fn test_shift_change_resets() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        p.process(&json!({"lineID": 1, "cantidadProductos": 100}), "site/", Shift::S1)
            .unwrap();
        p.process(&json!({"lineID": 1, "cantidadProductos": 600}), "site/", Shift::S1)
            .unwrap();

        let pubs = p
            .process(&json!({"lineID": 1, "cantidadProductos": 800}), "site/", Shift::S2)
            .unwrap();
        let doc = prod_doc(&pubs);
        assert_eq!(doc["cantidadPisadas_turno"], 0);
        assert_eq!(doc["turno"], 2);
        assert_eq!(doc["cantidadProductos_instantaneo"], 800);
    }

    #[test]
    fn test_strokes_per_minute() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        p.process(
            &json!({"lineID": 1, "cantidadProductos": 0, "tiempoProduccion_ds": 0}),
            "site/",
            Shift::S1,
        )
        .unwrap();
        // 120 strokes over 600 s -> 12 per minute
        let pubs = p
            .process(
                &json!({"lineID": 1, "cantidadProductos": 120, "tiempoProduccion_ds": 6000}),
                "site/",
                Shift::S1,
            )
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidadPisadas_min"], 12);
    }

    #[test]
    fn test_lines_are_independent() {
        let p = PressProcessor::new(DeviceKind::Ph1);
        p.process(&json!({"lineID": 1, "cantidadProductos": 100}), "site/", Shift::S1)
            .unwrap();
        p.process(&json!({"lineID": 2, "cantidadProductos": 0}), "site/", Shift::S1)
            .unwrap();
        let pubs = p
            .process(&json!({"lineID": 1, "cantidadProductos": 110}), "site/", Shift::S1)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidadPisadas_turno"], 10);

        let pubs = p
            .process(&json!({"lineID": 2, "cantidadProductos": 5}), "site/", Shift::S1)
            .unwrap();
        assert_eq!(prod_doc(&pubs)["cantidadPisadas_turno"], 5);
    }
}
