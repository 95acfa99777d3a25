use crate::config::{AxisFlags, Config, ScannerVariant};
use crate::data::model::{Axis, Window};
use crate::error::Result;

use super::conditioner::Conditioner;
use super::locator::WindowLocator;

/// A conditioned force channel and its engagement window.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub data: Vec<f64>,
    pub window: Window,
}

/// Sign convention, conditioning and window location for one axis.
#[derive(Debug, Clone)]
pub struct ChannelPreparer {
    conditioner: Conditioner,
    locator: WindowLocator,
    reverse: AxisFlags,
}

impl ChannelPreparer {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(ChannelPreparer {
            conditioner: Conditioner::new(&config.signal)?,
            locator: WindowLocator::new(&config.signal),
            reverse: config.reverse.clone(),
        })
    }

    pub fn locator(&self) -> &WindowLocator {
        &self.locator
    }

    /// Prepare a raw channel with the standard analysis window.
    pub fn prepare(&self, axis: Axis, raw: &[f64], cutting_speed: f64) -> Result<Prepared> {
        self.prepare_with(axis, raw, cutting_speed, ScannerVariant::Standard)
    }

    /// Like [`ChannelPreparer::prepare`], with an explicit window variant.
    /// The input channel is left untouched.
    pub fn prepare_with(
        &self,
        axis: Axis,
        raw: &[f64],
        cutting_speed: f64,
        variant: ScannerVariant,
    ) -> Result<Prepared> {
        let oriented: Vec<f64> = if self.reverse.get(axis) {
            raw.iter().map(|v| -v).collect()
        } else {
            raw.to_vec()
        };
        let data = self.conditioner.condition(&oriented)?;
        let window = self.locator.locate(&data, cutting_speed, variant)?;
        Ok(Prepared { data, window })
    }
}
