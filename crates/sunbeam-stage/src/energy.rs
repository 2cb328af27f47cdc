//! Energy stage: pack power integrated over the event window.

use std::collections::BTreeMap;

use sunbeam_core::{
    Artifact, DataError, DataResult, Event, FileType, Payload, PipelineError, TimeSeries,
};
use tracing::warn;

use crate::context::Context;
use crate::registry::{StageDescriptor, StageOutput};
use crate::stage::{time_series_input, Stage};
use crate::stage_data::{load_stage_data, StageData};

pub static ENERGY_DESCRIPTOR: StageDescriptor = StageDescriptor {
    name: "energy",
    dependencies: &["power"],
    outputs: &[StageOutput {
        name: "pack_energy",
        file_type: FileType::TimeSeries,
    }],
};

/// Input loaders, in positional order: pack_power.
pub struct EnergyStage {
    event: Event,
    stage_data: BTreeMap<String, StageData>,
}

impl EnergyStage {
    pub fn new(event: &Event) -> Result<Self, PipelineError> {
        let context = Context::current()?;
        context.registry().get(ENERGY_DESCRIPTOR.name)?;
        let stage_data = load_stage_data(
            context.stage_data_root(),
            ENERGY_DESCRIPTOR.name,
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

    /// Cumulative trapezoidal integral of power, in joules.
    fn integrate(power: &TimeSeries) -> TimeSeries {
        let mut values = Vec::with_capacity(power.len());
        let mut total = 0.0;
        let mut previous: Option<f64> = None;
        for &p in &power.values {
            if let Some(prev) = previous {
                total += 0.5 * (prev + p) * power.period_s;
            }
            values.push(total);
            previous = Some(p);
        }

        let mut series = TimeSeries::from_values(
            "Pack Energy",
            "J",
            power.period_s,
            power.start,
            values,
        );
        series.meta = power.meta.clone();
        series
    }
}

impl Stage for EnergyStage {
    fn descriptor(&self) -> &'static StageDescriptor {
        &ENERGY_DESCRIPTOR
    }

    fn event_name(&self) -> &str {
        &self.event.name
    }

    fn transform(&mut self, extracted: Vec<DataResult<Artifact>>) -> Vec<DataResult<Payload>> {
        let pack_power = match extracted.into_iter().next() {
            Some(result) => time_series_input(result, "pack_power"),
            None => Err(DataError::Unavailable {
                name: "pack_power".into(),
                reason: "input loader was not supplied".into(),
            }),
        };

        let pack_energy = pack_power.map(|power| Self::integrate(&power));
        if let Err(cause) = &pack_energy {
            warn!(event = %self.event.name, %cause, "failed to process pack energy");
        }

        vec![pack_energy.map(Payload::TimeSeries)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn integral_of_constant_power_is_linear() {
        let power = TimeSeries::from_values(
            "Pack Power",
            "W",
            1.0,
            datetime!(2024-07-16 17:00:00 UTC),
            vec![100.0; 5],
        );
        let energy = EnergyStage::integrate(&power);
        assert_eq!(energy.values, vec![0.0, 100.0, 200.0, 300.0, 400.0]);
        assert_eq!(energy.units, "J");
        assert_eq!(energy.period_s, 1.0);
    }

    #[test]
    fn integral_of_empty_power_is_empty() {
        let power = TimeSeries::from_values(
            "Pack Power",
            "W",
            1.0,
            datetime!(2024-07-16 17:00:00 UTC),
            vec![],
        );
        assert!(EnergyStage::integrate(&power).is_empty());
    }
}
