use instant::Instant;

use crate::utils::prettyprint_time;

fn elapsed_seconds(since: Instant) -> f64 {
    let dt = since.elapsed();
    (dt.as_secs() as f64) + (f64::from(dt.subsec_nanos()) * 1e-9)
}

struct TimerSpan {
    name: String,
    started_at: Instant,
    nested_time: f64,
}

/// Hierarchial magic. Spans nest; each one logs how long it took when stopped, and the whole
/// breakdown is logged again when the timer is dropped, so slow phases stand out at the end.
pub struct Timer {
    results: Vec<String>,
    stack: Vec<TimerSpan>,
    outermost_name: String,
    notes: Vec<String>,
}

impl Timer {
    pub fn new<S: Into<String>>(raw_name: S) -> Timer {
        let name = raw_name.into();
        let mut t = Timer {
            results: Vec::new(),
            stack: Vec::new(),
            outermost_name: name.clone(),
            notes: Vec::new(),
        };
        t.start(name);
        t
    }

    pub fn throwaway() -> Timer {
        Timer::new("throwaway")
    }

    /// Log immediately, but also repeat at the end, to avoid having to scroll up and find
    /// interesting debug stuff.
    pub fn note<S: Into<String>>(&mut self, raw_line: S) {
        let line = raw_line.into();
        info!("{}", line);
        self.notes.push(line);
    }

    /// Used to end the scope of a timer early.
    pub fn done(self) {}

    pub fn start<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        info!("{}...", name);
        self.stack.push(TimerSpan {
            name,
            started_at: Instant::now(),
            nested_time: 0.0,
        });
    }

    /// Panics if `name` isn't the innermost running span; that's a bug in the caller.
    pub fn stop<S: Into<String>>(&mut self, raw_name: S) {
        let name = raw_name.into();
        let span = match self.stack.pop() {
            Some(span) => span,
            None => panic!("Timer stopped {} without starting anything", name),
        };
        assert_eq!(span.name, name);
        let elapsed = elapsed_seconds(span.started_at);
        let padding = "  ".repeat(self.stack.len());
        let mut line = format!("{}- {} took {}", padding, name, prettyprint_time(elapsed));
        if span.nested_time != 0.0 {
            line = format!(
                "{} ({} outside nested spans)",
                line,
                prettyprint_time(elapsed - span.nested_time)
            );
        }
        info!("{}", line.trim_start());
        self.results.push(line);
        if let Some(parent) = self.stack.last_mut() {
            parent.nested_time += elapsed;
        }
    }
}

impl std::ops::Drop for Timer {
    fn drop(&mut self) {
        if self.outermost_name == "throwaway" {
            return;
        }

        let stop_name = self.outermost_name.clone();
        // If we're in the middle of unwinding a panic, don't further blow up.
        match self.stack.last().map(|span| span.name.clone()) {
            Some(running) if running == stop_name => {
                self.stop(stop_name);
            }
            Some(running) => {
                warn!(
                    "Timer {} dropped while {} was still running",
                    stop_name, running
                );
                return;
            }
            None => {}
        }

        // Spans finish innermost-first; show them outermost-first.
        self.results.reverse();
        for line in &self.results {
            info!("{}", line);
        }
        if !self.notes.is_empty() {
            info!("{} notes:", self.notes.len());
            for line in &self.notes {
                info!("  {}", line);
            }
        }
    }
}
