//! Simulation-output tracing: a bitmask independent of `log`/`env_logger`.
//!
//! `log` carries diagnostic noise about the *driver* (config parsing,
//! program load failures); `TraceSink` carries a deliberately opt-in,
//! per-bit narration of the *simulation itself* (dispatch, syscalls,
//! scheduling decisions, profiler events, clock advances), selected with
//! `--trace-level` (see SPEC_FULL.md §6). Messages are built lazily so a
//! disabled bit costs nothing beyond the mask check.

/// Bit 0: dispatch of a popped event. Bit 1: syscall/interrupt handling
/// inside the policy. Bit 2: scheduling decisions (who runs next). Bit 3:
/// profiler state/mode transitions. Bit 4: raw clock advances.
pub struct TraceSink {
    mask: u8,
}

impl TraceSink {
    pub fn new(trace_level: u8) -> Self {
        Self { mask: trace_level }
    }

    pub fn enabled(&self, bit: u8) -> bool {
        self.mask & (1 << bit) != 0
    }

    /// Emit a trace line for `bit` if enabled. `msg` is only called when
    /// the bit is set, so callers can build the string unconditionally
    /// without paying for it when tracing is off.
    pub fn emit(&self, bit: u8, msg: impl FnOnce() -> String) {
        if self.enabled(bit) {
            println!("[trace {bit}] {}", msg());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn disabled_bit_never_calls_the_closure() {
        let sink = TraceSink::new(0);
        let called = Cell::new(false);
        sink.emit(0, || {
            called.set(true);
            String::new()
        });
        assert!(!called.get());
    }

    #[test]
    fn enabled_bit_is_detected() {
        let sink = TraceSink::new(0b0000_0101);
        assert!(sink.enabled(0));
        assert!(!sink.enabled(1));
        assert!(sink.enabled(2));
    }
}
