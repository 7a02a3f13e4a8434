// Cerabridge - Shift accumulator engine for ceramic line telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Kiln outfeed accumulator.
//!
//! The richest device on the line: thirteen 15-bit counters (pallet rows,
//! barrier and direction changes, piece counts, stops) plus a 16-bit
//! 1 Hz timer register counting operating seconds. Every counter is
//! published three ways: masked instantaneous value, shift total, and
//! bank-flag corruption marker.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::counter::{bit15_set, mask15, Counter};
use crate::device::DeviceKind;
use crate::error::Result;
use crate::payload::{int_field, word};
use crate::processors::{alarms_topic, production_topic, AlarmsDoc, Processor, Publication};
use crate::shift::{timestamp_device, Shift};

/// The 15-bit counter words, in publication order.
const SIGNALS: [&str; 13] = [
    "bancalinos0",
    "bancalinos1",
    "bancalinosComb1",
    "bancalinosComb2",
    "bancalinosTotal",
    "cambioBarrera",
    "cambioBarreraTotal",
    "cambioSentido",
    "cambioSentidoTotal",
    "cantidad",
    "cantidad_total",
    "paradas_1",
    "paradas_2",
];

#[derive(Debug, Default)]
struct LineState {
    shift: Option<Shift>,
    counters: [Counter; SIGNALS.len()],
    // timer1Hz counts seconds directly
    timer: Counter,
}

/// Shift accumulator for the kiln outfeed.
pub struct KilnOutProcessor {
    lines: Mutex<HashMap<i64, LineState>>,
}

impl KilnOutProcessor {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for KilnOutProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for KilnOutProcessor {
    fn process(
        &self,
        msg: &Value,
        isa95_prefix: &str,
        shift_now: Shift,
    ) -> Result<Vec<Publication>> {
        let line_id = int_field(msg, "lineID");
        let alarms = int_field(msg, "alarms");

        let words: Vec<u16> = SIGNALS.iter().map(|key| word(msg, key)).collect();
        let cleans: Vec<u16> = words.iter().map(|&w| mask15(w)).collect();
        let timer_word = word(msg, "timer1Hz");

        let (totals, timer_total) = {
            let mut lines = self.lines.lock().unwrap();
            let st = lines.entry(line_id).or_default();

            if st.shift != Some(shift_now) {
                st.shift = Some(shift_now);
                for (counter, &clean) in st.counters.iter_mut().zip(&cleans) {
                    *counter = Counter::start(clean);
                }
                st.timer = Counter::start(timer_word);
            } else {
                for (counter, &clean) in st.counters.iter_mut().zip(&cleans) {
                    counter.step15(clean);
                }
                st.timer.step16(timer_word);
            }

            let totals: Vec<u32> = st.counters.iter().map(Counter::total).collect();
            (totals, st.timer.total())
        };

        let mut prod = Map::new();
        prod.insert("maquina_id".into(), DeviceKind::KilnOut.machine_id().into());
        prod.insert("turno".into(), shift_now.number().into());
        for (i, key) in SIGNALS.iter().enumerate() {
            prod.insert(format!("{key}_instantaneo"), cleans[i].into());
            prod.insert(format!("{key}_turno"), totals[i].into());
            prod.insert(
                format!("bit15_corruption_{key}"),
                bit15_set(words[i]).into(),
            );
        }
        prod.insert("timer1Hz_instantaneo".into(), timer_word.into());
        prod.insert("tiempo_operacion_turno_s".into(), timer_total.into());
        prod.insert("timestamp_device".into(), timestamp_device().into());

        let slug = DeviceKind::KilnOut.slug();
        let alarms_doc = AlarmsDoc {
            alarms,
            timestamp_device: timestamp_device(),
        };

        Ok(vec![
            Publication::json(alarms_topic(isa95_prefix, line_id, slug), &alarms_doc)?,
            Publication::json(production_topic(isa95_prefix, line_id, slug), &Value::Object(prod))?,
        ])
    }
}
