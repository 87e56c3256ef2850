//! Zero point estimation of a stationary sensor.
//!
//! The offset tracks the raw samples through a PI filter whose gains are damped by the
//! number of rounds and annealed after every round. The error sum is cleared every
//! `WINDUP_RESET_INTERVAL` steps of a round to keep the integral term from winding up.

use crate::{
    error::InvalidConfiguration,
    scale::AxisGroup,
    types::sensor::{Axes, Bias},
};

pub const STEPS_PER_ROUND: usize = 100;
pub const WINDUP_RESET_INTERVAL: usize = 5;
pub const ANNEALING: f64 = 0.85;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
}

impl Gains {
    pub fn of(group: AxisGroup) -> Result<Self, InvalidConfiguration> {
        match group {
            AxisGroup::Gyroscope => Ok(Self { kp: 0.6, ki: 0.02 }),
            AxisGroup::Accelerometer => Ok(Self { kp: 0.3, ki: 0.02 }),
            AxisGroup::Magnetometer => Err(InvalidConfiguration::Calibration),
        }
    }

    /// More rounds start with a gentler correction
    pub fn damped(self, rounds: usize) -> Self {
        let rate = ((100.0 - (20.0 - (rounds as f64 / 5.0 * 20.0))) / 100.0) as f32;
        Self { kp: self.kp * rate, ki: self.ki * rate }
    }

    fn anneal(&mut self) {
        self.kp = (self.kp as f64 * ANNEALING) as f32;
        self.ki = (self.ki as f64 * ANNEALING) as f32;
    }
}

#[inline]
fn round(value: f32) -> i32 {
    libm::floorf(value + 0.5) as i32
}

pub struct Calibrator {
    gains: Gains,
    offset: Bias,
    error_sum: Axes,
    step: usize,
}

impl Calibrator {
    pub fn new(group: AxisGroup, rounds: usize) -> Result<Self, InvalidConfiguration> {
        Ok(Self::with_gains(Gains::of(group)?.damped(rounds)))
    }

    pub fn with_gains(gains: Gains) -> Self {
        Self { gains, offset: Bias::default(), error_sum: Axes::default(), step: 0 }
    }

    /// Consumes one raw sample and returns the updated offset
    pub fn feed(&mut self, sample: Axes) -> Bias {
        let error = sample - self.offset;
        self.error_sum += error;
        for i in 0..3 {
            let (error, error_sum) = (error[i] as f32, self.error_sum[i] as f32);
            self.offset[i] += round(error * self.gains.kp + error_sum * self.gains.ki);
        }
        self.skip();
        self.offset
    }

    /// Consumes a step without a sample, leaving offset and error sum untouched
    /// unless the step falls on a reset point.
    pub fn skip(&mut self) {
        if self.step % WINDUP_RESET_INTERVAL == 0 {
            self.error_sum = Axes::default();
        }
        self.step += 1;
        if self.step == STEPS_PER_ROUND {
            self.step = 0;
            self.gains.anneal();
        }
    }

    pub fn offset(&self) -> Bias {
        self.offset
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }
}

pub struct Report<E> {
    pub bias: Bias,
    pub skipped: usize,
    pub last_error: Option<E>,
}

/// Runs `rounds` rounds of `STEPS_PER_ROUND` samples each. A step whose sample fails is
/// skipped and counted, the remaining steps still run.
pub fn calibrate<E, F>(
    group: AxisGroup,
    rounds: usize,
    mut sample: F,
) -> Result<Report<E>, InvalidConfiguration>
where
    F: FnMut() -> Result<Axes, E>,
{
    let mut calibrator = Calibrator::new(group, rounds)?;
    let mut report = Report { bias: Bias::default(), skipped: 0, last_error: None };
    for _ in 0..rounds * STEPS_PER_ROUND {
        match sample() {
            Ok(axes) => {
                calibrator.feed(axes);
            }
            Err(e) => {
                calibrator.skip();
                report.skipped += 1;
                report.last_error = Some(e);
            }
        }
    }
    report.bias = calibrator.offset();
    Ok(report)
}

mod test {
    #[cfg(test)]
    fn noisy(seed: u32) -> impl FnMut() -> Result<super::Axes, ()> {
        let mut state = seed;
        move || {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let noise = ((state >> 16) % 21) as i32 - 10;
            Ok(super::Axes::new(120 + noise, -35 - noise, 8 + noise / 2))
        }
    }

    #[test]
    fn test_deterministic() {
        use super::{calibrate, AxisGroup};

        for rounds in [1, 5] {
            let first = calibrate(AxisGroup::Gyroscope, rounds, noisy(7)).unwrap();
            let second = calibrate(AxisGroup::Gyroscope, rounds, noisy(7)).unwrap();
            assert_eq!(first.bias, second.bias);
            assert_eq!(first.skipped, 0);
        }
    }

    #[test]
    fn test_converge_to_constant() {
        use super::{calibrate, Axes, AxisGroup};

        let sample = || Ok::<_, ()>(Axes::new(100, -50, 20));
        let report = calibrate(AxisGroup::Gyroscope, 5, sample).unwrap();
        assert_eq!(report.bias, Axes::new(100, -50, 20));

        let report = calibrate(AxisGroup::Accelerometer, 4, sample).unwrap();
        let delta = report.bias - Axes::new(100, -50, 20);
        assert!(delta.x.abs() <= 1 && delta.y.abs() <= 1 && delta.z.abs() <= 1);
    }

    #[test]
    fn test_zero_rounds() {
        use super::{calibrate, Axes, AxisGroup};

        let mut samples = 0;
        let report = calibrate(AxisGroup::Accelerometer, 0, || {
            samples += 1;
            Ok::<_, ()>(Axes::new(1, 2, 3))
        })
        .unwrap();
        assert_eq!(report.bias, Axes::default());
        assert_eq!(samples, 0);
    }

    #[test]
    fn test_damped_gains() {
        use super::{AxisGroup, Gains};

        let gains = Gains::of(AxisGroup::Gyroscope).unwrap();
        assert_eq!(gains.damped(5), gains);
        let damped = gains.damped(1);
        assert!((damped.kp - 0.504).abs() < 1e-6);
        assert!((damped.ki - 0.0168).abs() < 1e-6);
    }

    #[test]
    fn test_anneal_every_round() {
        use super::{Axes, AxisGroup, Calibrator, Gains, ANNEALING, STEPS_PER_ROUND};

        let mut calibrator = Calibrator::new(AxisGroup::Gyroscope, 2).unwrap();
        let initial = calibrator.gains();
        for _ in 0..STEPS_PER_ROUND - 1 {
            calibrator.feed(Axes::default());
        }
        assert_eq!(calibrator.gains(), initial);
        calibrator.feed(Axes::default());
        let annealed = calibrator.gains();
        assert_eq!(annealed.kp, (initial.kp as f64 * ANNEALING) as f32);
        assert_eq!(annealed.ki, (initial.ki as f64 * ANNEALING) as f32);

        // 0.6f32 * 0.85f32 rounds to 0.51000005
        let mut calibrator = Calibrator::new(AxisGroup::Gyroscope, 5).unwrap();
        for _ in 0..STEPS_PER_ROUND {
            calibrator.skip();
        }
        assert_eq!(calibrator.gains(), Gains { kp: 0.51, ki: 0.017 });
    }

    #[test]
    fn test_windup_reset() {
        use super::{round, Axes, AxisGroup, Calibrator, STEPS_PER_ROUND};

        let sample = Axes::new(200, -120, 60);
        let mut calibrator = Calibrator::new(AxisGroup::Gyroscope, 1).unwrap();
        let gains = calibrator.gains();

        let (mut offset, mut error_sum) = (Axes::default(), Axes::default());
        let mut differs = false;
        for _ in 0..STEPS_PER_ROUND {
            let error = sample - offset;
            error_sum += error;
            for i in 0..3 {
                offset[i] += round(error[i] as f32 * gains.kp + error_sum[i] as f32 * gains.ki);
            }
            let reset = calibrator.feed(sample);
            for i in 0..3 {
                assert!(reset[i].abs() <= 2 * sample[i].abs());
            }
            differs |= reset != offset;
        }
        assert!(differs);
    }

    #[test]
    fn test_skipped_steps() {
        use super::{calibrate, Axes, AxisGroup};

        let mut count = 0;
        let report = calibrate(AxisGroup::Gyroscope, 1, || {
            count += 1;
            match count % 10 {
                0 => Err("timeout"),
                _ => Ok(Axes::new(10, 10, 10)),
            }
        })
        .unwrap();
        assert_eq!(report.skipped, 10);
        assert_eq!(report.last_error, Some("timeout"));
        assert_eq!(report.bias, Axes::new(10, 10, 10));
    }

    #[test]
    fn test_magnetometer_rejected() {
        use super::{calibrate, Axes, AxisGroup};
        use crate::error::InvalidConfiguration;

        let result = calibrate(AxisGroup::Magnetometer, 1, || Ok::<_, ()>(Axes::default()));
        assert_eq!(result.err(), Some(InvalidConfiguration::Calibration));
    }
}
