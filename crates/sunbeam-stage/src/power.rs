//! Power stage: voltage and current into electrical power.
//!
//! Note: some telemetry fields are labeled `Battery*` but are motor
//! measurements, as they originate from the motor control board.

use std::collections::BTreeMap;

use sunbeam_core::{
    Artifact, ArtifactLoader, DataError, DataResult, Event, FileType, Payload, PipelineError,
    TimeSeries,
};
use tracing::warn;

use crate::context::Context;
use crate::registry::{StageDescriptor, StageOutput};
use crate::stage::{time_series_input, Stage};
use crate::stage_data::{load_stage_data, StageData};

pub static POWER_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: "power",
    dependencies: &["ingress"],
    outputs: &[
        StageOutput {
            name: "pack_power",
            file_type: FileType::TimeSeries,
        },
        StageOutput {
            name: "motor_power",
            file_type: FileType::TimeSeries,
        },
    ],
};

/// Input loaders, in positional order: TotalPackVoltage, PackCurrent,
/// BatteryVoltage, BatteryCurrent, BatteryCurrentDirection.
pub struct PowerStage {
    event: Event,
    stage_data: BTreeMap<String, StageData>,
}

impl PowerStage {
    pub fn new(event: &Event) -> Result<Self, PipelineError> {
        let context = Context::current()?;
        context.registry().get(POWER_DESCRIPTOR.name)?;
        let stage_data = load_stage_data(
            context.stage_data_root(),
            POWER_DESCRIPTOR.name,
            &|_| true,
        )?;
        Ok(Self {
            event: event.clone(),
            stage_data,
        })
    }

    pub fn stage_data(&self) -> &BTreeMap<String, StageData> {
        &self.stage_data
    }

    fn pack_power(
        voltage: DataResult<TimeSeries>,
        current: DataResult<TimeSeries>,
    ) -> DataResult<TimeSeries> {
        let (voltage, current) = align(voltage?, current?)?;
        Ok(voltage.zip_map(&current, "Pack Power", "W", |v, i| v * i))
    }

    fn motor_power(
        voltage: DataResult<TimeSeries>,
        current: DataResult<TimeSeries>,
        direction: DataResult<TimeSeries>,
    ) -> DataResult<TimeSeries> {
        // Direction is 1 when the current is negative (regen) and 0 when
        // positive (driving); -2x + 1 maps that onto a sign.
        let sign = direction?.map("Motor Current Sign", "", |d| -2.0 * d + 1.0);

        let (current, voltage) = align(current?, voltage?)?;
        let unsigned = current.zip_map(&voltage, "Motor Power", "W", |i, v| i * v);
        let (unsigned, sign) = align(unsigned, sign)?;
        Ok(unsigned.zip_map(&sign, "Motor Power", "W", |p, s| p * s))
    }
}

impl Stage for PowerStage {
    fn descriptor(&self) -> &'static StageDescriptor {
        &POWER_DESCRIPTOR
    }

    fn event_name(&self) -> &str {
        &self.event.name
    }

    fn transform(&mut self, extracted: Vec<DataResult<Artifact>>) -> Vec<DataResult<Payload>> {
        let mut inputs = extracted.into_iter();
        let mut next = |name: &str| -> DataResult<TimeSeries> {
            match inputs.next() {
                Some(result) => time_series_input(result, name),
                None => Err(DataError::Unavailable {
                    name: name.to_string(),
                    reason: "input loader was not supplied".into(),
                }),
            }
        };

        let total_pack_voltage = next("TotalPackVoltage");
        let pack_current = next("PackCurrent");
        let motor_voltage = next("BatteryVoltage");
        let motor_current = next("BatteryCurrent");
        let motor_current_direction = next("BatteryCurrentDirection");

        let pack_power = Self::pack_power(total_pack_voltage, pack_current);
        if let Err(cause) = &pack_power {
            warn!(event = %self.event.name, %cause, "failed to process pack power");
        }

        let motor_power = Self::motor_power(motor_voltage, motor_current, motor_current_direction);
        if let Err(cause) = &motor_power {
            warn!(event = %self.event.name, %cause, "failed to process motor power");
        }

        vec![
            pack_power.map(Payload::TimeSeries),
            motor_power.map(Payload::TimeSeries),
        ]
    }
}

fn align(a: TimeSeries, b: TimeSeries) -> DataResult<(TimeSeries, TimeSeries)> {
    TimeSeries::align(&a, &b).ok_or_else(|| DataError::Unavailable {
        name: a.name.clone(),
        reason: format!("windows of {} and {} do not overlap", a.name, b.name),
    })
}

/// Build the positional input loaders for this stage from one event's
/// ingress view.
pub fn power_inputs(view: &crate::ingress::EventView<'_>) -> Vec<ArtifactLoader> {
    [
        "TotalPackVoltage",
        "PackCurrent",
        "BatteryVoltage",
        "BatteryCurrent",
        "BatteryCurrentDirection",
    ]
    .into_iter()
    .map(|target| view.get(target))
    .collect()
}
