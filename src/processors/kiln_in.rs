// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Kiln infeed accumulator.
//!
//! Adds fault tracking to the usual production/stop signals. All six
//! words are 15-bit and noisy; each has its own delta bound.

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

// Per-signal bounds for a 30 s sampling cadence.
const MAX_PIECES_STEP: u16 = 200;
const MAX_RUNTIME_STEP_DS: u16 = 250;
const MAX_STOPS_STEP: u16 = 50;
const MAX_STOP_SECONDS_STEP: u16 = 30;
const MAX_FAULTS_STEP: u16 = 20;
const MAX_FAULT_SECONDS_STEP: u16 = 30;

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    pieces: Counter,
    runtime: DeciSeconds,
    stops: Counter,
    stop_seconds: Counter,
    faults: Counter,
    fault_seconds: Counter,
}

/// Shift accumulator for the kiln infeed.
pub struct KilnInProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

#[derive(Debug, Serialize)]
struct KilnInProduction {
    maquina_id: u8,
    turno: u8,
    cantidad_produccion: u32,
    cantidad_paradas: u32,
    cantidad_fallas: u32,
    tiempo_produccion: u32,
    tiempo_paradas: u32,
    tiempo_fallas: u32,
    timestamp_device: String,
}

impl KilnInProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for KilnInProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for KilnInProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");
        let alarms = int_field(msg, "alarms");

        let pieces_clean = mask15(word(msg, "cantidad"));
        let runtime_clean = mask15(word(msg, "tiempoProd_ds"));
        let stops_clean = mask15(word(msg, "paradas"));
        let stop_seconds_clean = mask15(word(msg, "tiempoParadas_s"));
        let faults_clean = mask15(word(msg, "fallaHorno"));
        let fault_seconds_clean = mask15(word(msg, "tiempoFalla_s"));

        let (pieces_total, runtime_s, stops_total, stop_seconds_total, faults_total, fault_seconds_total) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                *st = LineState {
                    shift: Some(shift_now),
                    pieces: Counter::start(pieces_clean),
                    runtime: DeciSeconds::start(runtime_clean),
                    stops: Counter::start(stops_clean),
                    stop_seconds: Counter::start(stop_seconds_clean),
                    faults: Counter::start(faults_clean),
                    fault_seconds: Counter::start(fault_seconds_clean),
                };
            } else {
                st.pieces.step_bounded(pieces_clean, MAX_PIECES_STEP);
                st.runtime.step_bounded(runtime_clean, MAX_RUNTIME_STEP_DS);
                st.stops.step_bounded(stops_clean, MAX_STOPS_STEP);
                st.stop_seconds
                    .step_bounded(stop_seconds_clean, MAX_STOP_SECONDS_STEP);
                st.faults.step_bounded(faults_clean, MAX_FAULTS_STEP);
                st.fault_seconds
                    .step_bounded(fault_seconds_clean, MAX_FAULT_SECONDS_STEP);
            }

            (
                st.pieces.total(),
                st.runtime.seconds(),
                st.stops.total(),
                st.stop_seconds.total(),
                st.faults.total(),
                st.fault_seconds.total(),
            )
        };

        let slug = DeviceKind::KilnIn.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };
        let prod = KilnInProduction {
            maquina_id: DeviceKind::KilnIn.machine_id(),
            turno: shift_now.number(),
            cantidad_produccion: pieces_total,
            cantidad_paradas: stops_total,
            cantidad_fallas: faults_total,
            tiempo_produccion: runtime_s,
            tiempo_paradas: stop_seconds_total,
            tiempo_fallas: fault_seconds_total,
            timestamp_device: timestamp_device(),
        };

        Ok(vec![
            Publication::json(alarms_topic(isa95_prefix, line_id, slug), &alarms_doc)?,
            Publication::json(production_topic(isa95_prefix, line_id, slug), &prod)?,
        ])
    }
}
