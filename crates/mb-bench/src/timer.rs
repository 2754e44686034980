use std::time::{Duration, Instant};

/// Wall-clock timer that records its elapsed time into `sink` when stopped
/// or dropped, so the measurement exists on every exit path.
#[derive(Debug)]
pub struct ScopedTimer<'a> {
    start: Instant,
    sink: &'a mut Duration,
    stopped: bool,
}

impl<'a> ScopedTimer<'a> {
    pub fn start(sink: &'a mut Duration) -> Self {
        ScopedTimer {
            start: Instant::now(),
            sink,
            stopped: false,
        }
    }

    /// Stop the timer, record and return the elapsed time.
    pub fn stop(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        *self.sink = elapsed;
        self.stopped = true;
        elapsed
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            *self.sink = self.start.elapsed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_records() {
        let mut sink = Duration::ZERO;
        let timer = ScopedTimer::start(&mut sink);
        std::thread::sleep(Duration::from_millis(5));
        let got = timer.stop();
        assert_eq!(got, sink);
        assert!(sink >= Duration::from_millis(5));
    }

    #[test]
    fn test_drop_records() {
        let mut sink = Duration::ZERO;
        {
            let _timer = ScopedTimer::start(&mut sink);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(sink >= Duration::from_millis(2));
    }

    #[test]
    fn test_early_return_records() {
        fn failing(sink: &mut Duration) -> Result<(), &'static str> {
            let _timer = ScopedTimer::start(sink);
            std::thread::sleep(Duration::from_millis(2));
            Err("multiply failed")
        }
        let mut sink = Duration::ZERO;
        assert!(failing(&mut sink).is_err());
        assert!(sink >= Duration::from_millis(2));
    }
}
