//! Dead reckoning of the attitude from bias corrected angular rate.

pub mod out;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use embedded_hal::blocking::delay::DelayUs;
use hal::clock::Monotonic;

use crate::config::Integration;
use crate::error::InvalidConfiguration;
use crate::sync::ReadSpinLock;
use crate::types::{Axes, Euler};

pub use out::{Attitude, AttitudeReader};

/// Shortest tick period, the sensor does not sample faster than 8kHz
pub const MIN_PERIOD: Duration = Duration::from_micros(125);

/// Angular rate source of the integrator
pub trait Gyroscope {
    type Error;

    fn update_gyroscope(&mut self) -> Result<(), Self::Error>;

    /// Bias corrected counts of the last update
    fn raw_gyroscope(&self) -> Axes;

    /// Degree per second per count
    fn gyroscope_resolution(&self) -> f32;

    /// Refreshes the other axis groups, only called with fusion enabled
    fn update_auxiliary(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    Stopped,
}

pub struct Integrator<S, C, D> {
    sensor: S,
    clock: C,
    delay: D,
    period: Duration,
    fusion: bool,
    state: State,
    baseline: Duration,
    /// Radians around x, y and z
    angles: [f64; 3],
    ticks: u32,
    output: Arc<ReadSpinLock<Attitude>>,
}

impl<S: Gyroscope, C: Monotonic, D: DelayUs<u32>> Integrator<S, C, D> {
    pub fn new(
        sensor: S,
        clock: C,
        delay: D,
        config: &Integration,
    ) -> Result<Self, InvalidConfiguration> {
        config.validate()?;
        let period = Duration::from_nanos(1_000_000_000 / config.sample_rate as u64);
        Ok(Self {
            sensor,
            clock,
            delay,
            period: period.max(MIN_PERIOD),
            fusion: config.fusion,
            state: State::Idle,
            baseline: Duration::default(),
            angles: [0.0; 3],
            ticks: 0,
            output: Arc::new(ReadSpinLock::default()),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn attitude(&self) -> AttitudeReader {
        AttitudeReader(self.output.clone())
    }

    pub fn euler(&self) -> Euler {
        let [pitch, roll, yaw] = self.angles;
        Euler::new(roll as f32, pitch as f32, yaw as f32)
    }

    pub fn yaw(&self) -> f32 {
        self.angles[2] as f32
    }

    pub fn roll(&self) -> f32 {
        self.angles[1] as f32
    }

    pub fn pitch(&self) -> f32 {
        self.angles[0] as f32
    }

    /// Takes the time baseline, accumulated angles are kept across restarts
    pub fn start(&mut self) {
        if self.state == State::Running {
            return;
        }
        self.baseline = self.clock.now();
        self.state = State::Running;
        debug!("Integration started with period {:?}", self.period);
    }

    pub fn stop(&mut self) {
        if self.state == State::Running {
            self.state = State::Stopped;
            debug!("Integration stopped after {} ticks", self.ticks);
        }
    }

    pub fn reset(&mut self) {
        self.angles = [0.0; 3];
        self.publish(nalgebra::Vector3::zeros());
    }

    fn publish(&mut self, gyro: nalgebra::Vector3<f32>) {
        let attitude = Attitude { euler: self.euler(), gyro, ticks: self.ticks };
        if self.output.write(attitude).is_err() {
            warn!("Attitude snapshot busy, dropped");
        }
    }

    /// One integration step, a no-op unless running.
    ///
    /// A failed sensor update leaves the angles and the time baseline untouched, so the
    /// next successful tick integrates over the whole interval.
    pub fn tick(&mut self) -> Result<(), S::Error> {
        if self.state != State::Running {
            return Ok(());
        }
        let now = self.clock.now();
        self.sensor.update_gyroscope()?;
        if self.fusion {
            self.sensor.update_auxiliary()?;
        }
        let dt = now.checked_sub(self.baseline).unwrap_or_default();
        self.baseline = now;

        let (raw, resolution) = (self.sensor.raw_gyroscope(), self.sensor.gyroscope_resolution());
        let degrees = dt.as_secs_f64() * resolution as f64;
        for i in 0..3 {
            self.angles[i] += (raw[i] as f64 * degrees).to_radians();
        }
        self.ticks = self.ticks.wrapping_add(1);
        self.publish(raw.scale(resolution));
        trace!("Integrated {:?} over {:?}", raw, dt);
        Ok(())
    }

    /// Ticks until `stop` is raised, waiting out the remainder of each period
    /// rounded up to the next microsecond.
    /// Tick errors go to `on_error` and the loop carries on.
    pub fn run<F: FnMut(S::Error)>(&mut self, stop: &AtomicBool, mut on_error: F) {
        self.start();
        while !stop.load(Ordering::Relaxed) {
            let begin = self.clock.now();
            if let Err(e) = self.tick() {
                on_error(e);
            }
            let spent = self.clock.now().checked_sub(begin).unwrap_or_default();
            if let Some(wait) = self.period.checked_sub(spent) {
                if wait > Duration::default() {
                    let mut micros = wait.as_micros() as u32;
                    if wait.subsec_nanos() % 1000 != 0 {
                        micros += 1;
                    }
                    self.delay.delay_us(micros);
                }
            }
        }
        self.stop();
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Not available while running
    pub fn sensor_mut(&mut self) -> Option<&mut S> {
        match self.state {
            State::Running => None,
            _ => Some(&mut self.sensor),
        }
    }

    pub fn into_inner(self) -> S {
        self.sensor
    }
}

#[cfg(feature = "std")]
mod thread {
    use alloc::sync::Arc;
    use core::fmt::Debug;
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::io;
    use std::thread::{self, JoinHandle};

    use embedded_hal::blocking::delay::DelayUs;
    use hal::clock::Monotonic;

    use super::{AttitudeReader, Gyroscope, Integrator};

    /// Handle of an integrator running on its own thread
    pub struct Running<S, C, D> {
        handle: JoinHandle<Integrator<S, C, D>>,
        stop: Arc<AtomicBool>,
        errors: Arc<AtomicU32>,
        reader: AttitudeReader,
    }

    impl<S, C, D> Integrator<S, C, D>
    where
        S: Gyroscope + Send + 'static,
        S::Error: Debug,
        C: Monotonic + Send + 'static,
        D: DelayUs<u32> + Send + 'static,
    {
        /// Runs the loop on a thread named "integrator", logging tick errors
        pub fn spawn(self) -> io::Result<Running<S, C, D>> {
            self.spawn_with(|e| error!("Integration tick failed: {:?}", e))
        }

        pub fn spawn_with<H>(mut self, mut handler: H) -> io::Result<Running<S, C, D>>
        where
            H: FnMut(S::Error) + Send + 'static,
        {
            let stop = Arc::new(AtomicBool::new(false));
            let errors = Arc::new(AtomicU32::new(0));
            let reader = self.attitude();
            let (flag, counter) = (stop.clone(), errors.clone());
            let handle = thread::Builder::new().name("integrator".into()).spawn(move || {
                self.run(&flag, |e| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    handler(e)
                });
                self
            })?;
            Ok(Running { handle, stop, errors, reader })
        }
    }

    impl<S, C, D> Running<S, C, D> {
        /// Raises the stop flag and waits for the current tick to finish
        pub fn stop(self) -> thread::Result<Integrator<S, C, D>> {
            self.stop.store(true, Ordering::Relaxed);
            self.handle.join()
        }

        pub fn attitude(&self) -> &AttitudeReader {
            &self.reader
        }

        pub fn yaw(&self) -> f32 {
            self.reader.yaw()
        }

        pub fn roll(&self) -> f32 {
            self.reader.roll()
        }

        pub fn pitch(&self) -> f32 {
            self.reader.pitch()
        }

        /// Failed ticks so far
        pub fn bus_errors(&self) -> u32 {
            self.errors.load(Ordering::Relaxed)
        }
    }
}

#[cfg(feature = "std")]
pub use thread::Running;

mod test {
    #[cfg(test)]
    use std::sync::{atomic::AtomicBool, atomic::AtomicU64, atomic::Ordering, Arc};

    #[cfg(test)]
    use crate::types::Axes;

    #[cfg(test)]
    #[derive(Clone, Default)]
    struct FakeClock(Arc<AtomicU64>);

    #[cfg(test)]
    impl FakeClock {
        fn advance(&self, micros: u64) {
            self.advance_nanos(micros * 1000);
        }

        fn advance_nanos(&self, nanos: u64) {
            self.0.fetch_add(nanos, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    impl hal::clock::Monotonic for FakeClock {
        fn now(&self) -> core::time::Duration {
            core::time::Duration::from_nanos(self.0.load(Ordering::Relaxed))
        }
    }

    #[cfg(test)]
    struct FakeDelay {
        clock: FakeClock,
        waits: Vec<u32>,
    }

    #[cfg(test)]
    impl embedded_hal::blocking::delay::DelayUs<u32> for FakeDelay {
        fn delay_us(&mut self, us: u32) {
            self.waits.push(us);
            self.clock.advance(us as u64);
        }
    }

    #[cfg(test)]
    struct FakeGyro {
        raw: Axes,
        updates: usize,
        auxiliary: usize,
        fail: Arc<AtomicBool>,
        fail_every: usize,
        /// Nanoseconds each update takes, with the update start times
        cost: Option<(FakeClock, u64)>,
        stamps: Vec<core::time::Duration>,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    #[cfg(test)]
    impl FakeGyro {
        fn new(raw: Axes) -> Self {
            Self {
                raw,
                updates: 0,
                auxiliary: 0,
                fail: Arc::new(AtomicBool::new(false)),
                fail_every: 0,
                cost: None,
                stamps: Vec::new(),
                stop_after: None,
            }
        }
    }

    #[cfg(test)]
    impl super::Gyroscope for FakeGyro {
        type Error = &'static str;

        fn update_gyroscope(&mut self) -> Result<(), &'static str> {
            self.updates += 1;
            if let Some((clock, nanos)) = &self.cost {
                self.stamps.push(hal::clock::Monotonic::now(clock));
                clock.advance_nanos(*nanos);
            }
            if let Some((count, stop)) = &self.stop_after {
                if self.updates >= *count {
                    stop.store(true, Ordering::Relaxed);
                }
            }
            let nth = self.fail_every > 0 && self.updates % self.fail_every == 0;
            if self.fail.load(Ordering::Relaxed) || nth {
                return Err("nack");
            }
            Ok(())
        }

        fn raw_gyroscope(&self) -> Axes {
            self.raw
        }

        fn gyroscope_resolution(&self) -> f32 {
            500.0 / 65536.0
        }

        fn update_auxiliary(&mut self) -> Result<(), &'static str> {
            self.auxiliary += 1;
            Ok(())
        }
    }

    #[test]
    fn test_linearity() {
        use super::Integrator;
        use crate::config::Integration;
        use crate::drivers::fake::NoDelay;

        let clock = FakeClock::default();
        let gyro = FakeGyro::new(Axes::new(131, -262, 0));
        let mut integrator = Integrator::new(gyro, clock.clone(), NoDelay, &Integration::default())
            .unwrap();
        integrator.start();
        for _ in 0..500 {
            clock.advance(1000);
            integrator.tick().unwrap();
        }
        let half = integrator.euler();
        for _ in 0..500 {
            clock.advance(1000);
            integrator.tick().unwrap();
        }
        let full = integrator.euler();

        let resolution = (500.0f32 / 65536.0) as f64;
        let expected = (131.0 * resolution).to_radians();
        assert!((full.pitch as f64 - expected).abs() < 1e-6);
        assert!((full.roll as f64 + 2.0 * expected).abs() < 1e-6);
        assert!((full.roll - 2.0 * half.roll).abs() < 1e-6);
        assert_eq!(full.yaw, 0.0);

        let attitude = integrator.attitude().read();
        assert_eq!(attitude.ticks, 1000);
        assert_eq!(attitude.euler, full);
        assert!((attitude.gyro.x - 131.0 * resolution as f32).abs() < 1e-6);
    }

    #[test]
    fn test_failed_tick() {
        use super::Integrator;
        use crate::config::Integration;
        use crate::drivers::fake::NoDelay;
        use crate::types::Euler;

        let clock = FakeClock::default();
        let gyro = FakeGyro::new(Axes::new(0, 0, 655));
        let fail = gyro.fail.clone();
        let config = Integration::default();
        let mut integrator = Integrator::new(gyro, clock.clone(), NoDelay, &config).unwrap();
        integrator.start();

        fail.store(true, Ordering::Relaxed);
        clock.advance(1000);
        assert_eq!(integrator.tick(), Err("nack"));
        assert_eq!(integrator.euler(), Euler::default());
        assert_eq!(integrator.attitude().read().ticks, 0);

        fail.store(false, Ordering::Relaxed);
        clock.advance(1000);
        integrator.tick().unwrap();
        let expected = (655.0 * (500.0f32 / 65536.0) as f64 * 0.002).to_radians();
        assert!((integrator.yaw() as f64 - expected).abs() < 1e-7);
        assert!((integrator.attitude().yaw() as f64 - expected).abs() < 1e-7);
    }

    #[test]
    fn test_restart() {
        use super::{Integrator, State};
        use crate::config::Integration;
        use crate::drivers::fake::NoDelay;

        let clock = FakeClock::default();
        let gyro = FakeGyro::new(Axes::new(1000, 0, 0));
        let config = Integration::default();
        let mut integrator = Integrator::new(gyro, clock.clone(), NoDelay, &config).unwrap();
        assert_eq!(integrator.state(), State::Idle);
        integrator.start();
        assert!(integrator.sensor_mut().is_none());
        clock.advance(1000);
        integrator.tick().unwrap();
        let once = integrator.pitch();
        assert!(once > 0.0);

        integrator.stop();
        assert_eq!(integrator.state(), State::Stopped);
        clock.advance(5_000_000);
        integrator.tick().unwrap();
        assert_eq!(integrator.pitch(), once);
        assert_eq!(integrator.sensor_mut().map(|gyro| gyro.updates), Some(1));

        integrator.start();
        clock.advance(1000);
        integrator.tick().unwrap();
        assert!((integrator.pitch() - 2.0 * once).abs() < 1e-6);

        integrator.reset();
        assert_eq!(integrator.pitch(), 0.0);
        assert_eq!(integrator.attitude().pitch(), 0.0);
        assert_eq!(integrator.state(), State::Running);
    }

    #[test]
    fn test_period() {
        use core::time::Duration;

        use super::{Integrator, MIN_PERIOD};
        use crate::config::Integration;
        use crate::drivers::fake::NoDelay;
        use crate::error::InvalidConfiguration;

        let period = |sample_rate| {
            let config = Integration { sample_rate, fusion: false };
            let gyro = FakeGyro::new(Axes::default());
            Integrator::new(gyro, FakeClock::default(), NoDelay, &config).map(|i| i.period())
        };
        assert_eq!(period(1000), Ok(Duration::from_millis(1)));
        assert_eq!(period(8000), Ok(MIN_PERIOD));
        assert_eq!(period(3), Ok(Duration::from_nanos(333_333_333)));
        assert_eq!(period(0), Err(InvalidConfiguration::SampleRate(0)));
        assert_eq!(period(8001), Err(InvalidConfiguration::SampleRate(8001)));
    }

    #[test]
    fn test_run() {
        use super::{Integrator, State};
        use crate::config::Integration;

        let clock = FakeClock::default();
        let stop = Arc::new(AtomicBool::new(false));
        let mut gyro = FakeGyro::new(Axes::new(0, 100, 0));
        gyro.cost = Some((clock.clone(), 200_000));
        gyro.stop_after = Some((5, stop.clone()));
        gyro.fail_every = 2;
        let delay = FakeDelay { clock: clock.clone(), waits: Vec::new() };
        let config = Integration { sample_rate: 1000, fusion: true };
        let mut integrator = Integrator::new(gyro, clock.clone(), delay, &config).unwrap();

        let mut errors = Vec::new();
        integrator.run(&stop, |e| errors.push(e));
        assert_eq!(integrator.state(), State::Stopped);
        assert_eq!(errors, vec!["nack", "nack"]);
        assert_eq!(integrator.attitude().read().ticks, 3);
        assert_eq!(integrator.delay.waits, vec![800; 5]);

        let gyro = integrator.into_inner();
        assert_eq!(gyro.updates, 5);
        assert_eq!(gyro.auxiliary, 3);
    }

    #[test]
    fn test_run_never_faster_than_period() {
        use super::Integrator;
        use crate::config::Integration;

        for (sample_rate, cost) in [(3, 1_000), (8000, 300), (1000, 999_999)] {
            let clock = FakeClock::default();
            let stop = Arc::new(AtomicBool::new(false));
            let mut gyro = FakeGyro::new(Axes::default());
            gyro.cost = Some((clock.clone(), cost));
            gyro.stop_after = Some((4, stop.clone()));
            let delay = FakeDelay { clock: clock.clone(), waits: Vec::new() };
            let config = Integration { sample_rate, fusion: false };
            let mut integrator = Integrator::new(gyro, clock.clone(), delay, &config).unwrap();
            let period = integrator.period();

            integrator.run(&stop, |_| ());
            let gyro = integrator.into_inner();
            assert_eq!(gyro.stamps.len(), 4);
            for pair in gyro.stamps.windows(2) {
                let interval = pair[1] - pair[0];
                assert!(interval >= period, "{:?} shorter than {:?}", interval, period);
                assert!(interval - period < core::time::Duration::from_micros(1));
            }
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_spawn() {
        use std::thread;
        use std::time::Duration;

        use super::{Integrator, State};
        use crate::config::Integration;
        use crate::sys::{StdClock, StdDelay};

        let _ = env_logger::builder().is_test(true).try_init();

        let mut gyro = FakeGyro::new(Axes::new(0, 0, 1000));
        gyro.fail_every = 3;
        let config = Integration { sample_rate: 2000, fusion: false };
        let integrator = Integrator::new(gyro, StdClock::new(), StdDelay, &config).unwrap();
        let running = integrator.spawn().unwrap();
        thread::sleep(Duration::from_millis(50));
        let (yaw, errors) = (running.yaw(), running.bus_errors());
        assert!(running.attitude().read().ticks > 0);

        let integrator = running.stop().unwrap();
        assert!(yaw > 0.0);
        assert!(errors > 0);
        assert_eq!(integrator.state(), State::Stopped);
        assert!(integrator.yaw() >= yaw);
        assert_eq!(integrator.attitude().yaw(), integrator.yaw());
    }
}
