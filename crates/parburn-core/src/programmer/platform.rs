//! Platform collaborator trait

/// Board services the programmer depends on
///
/// Clock, bus and pin setup happen before the engine starts and are not part
/// of this trait; the engine only needs to wait and to signal activity.
pub trait Platform {
    /// Busy-wait for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Toggle the activity indicator after a block commit
    ///
    /// Must not touch protocol state.
    fn activity(&mut self) {}
}

impl<P: Platform + ?Sized> Platform for &mut P {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn activity(&mut self) {
        (**self).activity()
    }
}

/// Platform built from `embedded-hal` delay and status LED drivers
pub struct HalPlatform<D, L> {
    delay: D,
    led: L,
}

impl<D, L> HalPlatform<D, L> {
    /// Combine a delay provider and an activity LED
    pub fn new(delay: D, led: L) -> Self {
        Self { delay, led }
    }
}

impl<D, L> Platform for HalPlatform<D, L>
where
    D: embedded_hal::delay::DelayNs,
    L: embedded_hal::digital::StatefulOutputPin,
{
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn activity(&mut self) {
        // A stuck LED is not worth failing a commit over
        let _ = self.led.toggle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

    #[derive(Default)]
    struct FakeDelay {
        total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[derive(Default)]
    struct FakeLed {
        high: bool,
    }

    impl ErrorType for FakeLed {
        type Error = Infallible;
    }

    impl OutputPin for FakeLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    impl StatefulOutputPin for FakeLed {
        fn is_set_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_set_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_hal_platform() {
        let mut platform = HalPlatform::new(FakeDelay::default(), FakeLed::default());

        platform.delay_ms(10);
        platform.delay_ms(50);
        assert_eq!(platform.delay.total_ns, 60_000_000);

        platform.activity();
        assert!(platform.led.high);
        platform.activity();
        assert!(!platform.led.high);
    }
}
