use serde::{Deserialize, Serialize};

/// Event reported when the slice counter advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    SliceEnd(u32),
    FrameEnd,
}

/// How often a periodic interrupt fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    PerFrame(u32),
    Hz(u32),
}

impl Rate {
    pub fn per_second(self, frames_per_second: u32) -> u64 {
        match self {
            Rate::PerFrame(count) => count as u64 * frames_per_second as u64,
            Rate::Hz(hz) => hz as u64,
        }
    }
}

/// Share of `total` events (per second) falling in tick `tick` when a second
/// is split into `ticks` equal ticks. Summed over any run of ticks this is
/// exact, so remainders never drift.
pub fn spread(total: u64, ticks: u64, tick: u64) -> u64 {
    ((tick + 1) * total) / ticks - (tick * total) / ticks
}

/// Slice counter for the frame loop.
#[derive(Debug, Clone)]
pub struct SliceClock {
    frames_per_second: u32,
    slices_per_frame: u32,

    /// Slice within the current frame
    slice: u32,

    /// Completed frames
    frame_count: u64,
}

impl SliceClock {
    pub fn new(frames_per_second: u32, slices_per_frame: u32) -> Self {
        Self {
            frames_per_second,
            slices_per_frame,
            slice: 0,
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.slice = 0;
        self.frame_count = 0;
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn slices_per_frame(&self) -> u32 {
        self.slices_per_frame
    }

    fn slices_per_second(&self) -> u64 {
        self.frames_per_second as u64 * self.slices_per_frame as u64
    }

    /// Index of the current slice since power-on.
    pub fn global_slice(&self) -> u64 {
        self.frame_count * self.slices_per_frame as u64 + self.slice as u64
    }

    /// Cycles a cpu clocked at `clock_hz` owns in the current slice.
    pub fn cycles_for(&self, clock_hz: u32) -> u32 {
        spread(clock_hz as u64, self.slices_per_second(), self.global_slice()) as u32
    }

    /// Number of `rate` events due in the current slice.
    pub fn fires(&self, rate: Rate) -> u64 {
        spread(
            rate.per_second(self.frames_per_second),
            self.slices_per_second(),
            self.global_slice(),
        )
    }

    /// Moves to the next slice.
    pub fn tick(&mut self) -> Vec<ClockEvent> {
        let mut events = vec![ClockEvent::SliceEnd(self.slice)];

        self.slice += 1;
        if self.slice >= self.slices_per_frame {
            self.slice = 0;
            self.frame_count += 1;
            events.push(ClockEvent::FrameEnd);
        }

        events
    }

    pub fn current_slice(&self) -> u32 {
        self.slice
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Progress through the current frame (0.0 - 1.0)
    pub fn frame_progress(&self) -> f64 {
        self.slice as f64 / self.slices_per_frame as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_per_frame_are_exact() {
        let mut clock = SliceClock::new(60, 100);
        let mut total = 0u64;
        for _ in 0..100 {
            let cycles = clock.cycles_for(4_000_000);
            assert!(cycles == 666 || cycles == 667, "slice got {}", cycles);
            total += cycles as u64;
            clock.tick();
        }

        assert_eq!(total, 4_000_000 / 60);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_frame_interrupt_lands_on_last_slice() {
        let mut clock = SliceClock::new(60, 100);
        let mut fired = Vec::new();
        for slice in 0..100 {
            if clock.fires(Rate::PerFrame(1)) > 0 {
                fired.push(slice);
            }
            clock.tick();
        }

        assert_eq!(fired, vec![99]);
    }

    #[test]
    fn test_timed_interrupt_every_slice() {
        let mut clock = SliceClock::new(60, 100);
        for _ in 0..250 {
            assert_eq!(clock.fires(Rate::Hz(6000)), 1);
            clock.tick();
        }
    }

    #[test]
    fn test_frame_end_event() {
        let mut clock = SliceClock::new(60, 2);

        assert_eq!(clock.tick(), vec![ClockEvent::SliceEnd(0)]);
        assert_eq!(clock.frame_progress(), 0.5);
        assert_eq!(
            clock.tick(),
            vec![ClockEvent::SliceEnd(1), ClockEvent::FrameEnd]
        );
        assert_eq!(clock.current_slice(), 0);
    }
}
