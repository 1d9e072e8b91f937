//! Last-known device facts.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::command::WorkingMode;
use crate::message::{Message, MessageKind};

/// Source of host receive times, in seconds.
///
/// The delay figure is `host time - device stamp`. The two clocks share no
/// known offset, so the figure is only meaningful relative to other delays
/// from the same session.
pub trait HostClock {
    fn now(&self) -> f64;
}

/// Wall clock, seconds since the UNIX epoch.
///
/// This clock is not monotonic. An NTP correction or a manual clock change
/// steps every later delay by the same amount, and a backwards step can make
/// delays negative. Supply a monotonic [`HostClock`] when delays must stay
/// comparable across such steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl HostClock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl<F: Fn() -> f64> HostClock for F {
    fn now(&self) -> f64 {
        self()
    }
}

/// Host receive time of the latest message of each kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct Arrivals {
    pub imu: Option<f64>,
    pub point_cloud: Option<f64>,
    pub version: Option<f64>,
    pub auxiliary: Option<f64>,
}

/// What the host currently knows about the device.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    working_mode: Option<WorkingMode>,
    firmware_version: Option<String>,
    dirty_percentage: Option<u8>,
    arrivals: Arrivals,
    time_delay_us: Option<f64>,
}

impl DeviceState {
    /// Fold a decoded message received at `host_now` into the state.
    pub fn record(&mut self, message: &Message, host_now: f64) {
        let slot = match message.kind() {
            MessageKind::None => return,
            MessageKind::Imu => &mut self.arrivals.imu,
            MessageKind::PointCloud => &mut self.arrivals.point_cloud,
            MessageKind::Version => &mut self.arrivals.version,
            MessageKind::Auxiliary => &mut self.arrivals.auxiliary,
        };
        *slot = Some(host_now);

        if let Some(stamp) = message.stamp() {
            self.time_delay_us = Some((host_now - stamp) * 1e6);
        }

        match message {
            Message::Version(version) => {
                self.firmware_version = Some(version.firmware.clone());
            }
            Message::Auxiliary(aux) => self.dirty_percentage = Some(aux.dirty_percentage),
            _ => {}
        }
    }

    /// Remember a working mode the device accepted a request for.
    pub fn record_working_mode(&mut self, mode: WorkingMode) {
        self.working_mode = Some(mode);
    }

    /// Last working mode successfully sent.
    pub fn working_mode(&self) -> Option<WorkingMode> {
        self.working_mode
    }

    /// Last firmware version reported.
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    /// Last dirty percentage reported.
    pub fn dirty_percentage(&self) -> Option<u8> {
        self.dirty_percentage
    }

    /// Receive times per message kind.
    pub fn arrivals(&self) -> &Arrivals {
        &self.arrivals
    }

    /// Receive time of the latest message of `kind`.
    pub fn last_arrival(&self, kind: MessageKind) -> Option<f64> {
        match kind {
            MessageKind::None => None,
            MessageKind::Imu => self.arrivals.imu,
            MessageKind::PointCloud => self.arrivals.point_cloud,
            MessageKind::Version => self.arrivals.version,
            MessageKind::Auxiliary => self.arrivals.auxiliary,
        }
    }

    /// Delay of the latest timestamped message, microseconds.
    pub fn time_delay_us(&self) -> Option<f64> {
        self.time_delay_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Auxiliary, Imu, Version};

    fn imu_at(stamp: f64) -> Message {
        Message::Imu(Imu {
            stamp,
            id: 1,
            quaternion: [0.0, 0.0, 0.0, 1.0],
            angular_velocity: [0.0; 3],
            linear_acceleration: [0.0; 3],
        })
    }

    #[test]
    fn delay_is_host_minus_device_in_microseconds() {
        let mut state = DeviceState::default();
        state.record(&imu_at(100.0), 100.5);

        assert_eq!(state.time_delay_us(), Some(500_000.0));
        assert_eq!(state.last_arrival(MessageKind::Imu), Some(100.5));
        assert_eq!(state.last_arrival(MessageKind::PointCloud), None);
    }

    #[test]
    fn version_keeps_previous_delay() {
        let mut state = DeviceState::default();
        state.record(&imu_at(1.0), 1.25);
        state.record(&Message::Version(Version::new("1.2.3")), 9.0);

        assert_eq!(state.time_delay_us(), Some(250_000.0));
        assert_eq!(state.firmware_version(), Some("1.2.3"));
        assert_eq!(state.arrivals().version, Some(9.0));
    }

    #[test]
    fn auxiliary_updates_dirty_percentage() {
        let mut state = DeviceState::default();
        state.record(
            &Message::Auxiliary(Auxiliary {
                stamp: 5.0,
                dirty_percentage: 12,
            }),
            5.0,
        );
        assert_eq!(state.dirty_percentage(), Some(12));
        assert_eq!(state.time_delay_us(), Some(0.0));
    }

    #[test]
    fn none_changes_nothing() {
        let mut state = DeviceState::default();
        state.record(&Message::None, 3.0);
        assert_eq!(state, DeviceState::default());
    }

    #[test]
    fn host_clock_step_moves_the_delay() {
        let mut state = DeviceState::default();
        state.record(&imu_at(100.0), 100.5);
        // Host clock stepped back by one second between samples.
        state.record(&imu_at(100.25), 99.75);

        assert_eq!(state.time_delay_us(), Some(-500_000.0));
    }

    #[test]
    fn closure_clock() {
        let clock = || 42.0;
        assert_eq!(clock.now(), 42.0);
        assert!(SystemClock.now() > 0.0);
    }
}
