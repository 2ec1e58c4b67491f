//! Decides how long each phase of a request is paused.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use super::config::DelayConfig;
use super::duration::parse_duration;
use crate::request::Request;

/// Where a pause sits relative to the wrapped handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    /// Suffix of the request header that controls this phase in header mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After  => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both resolved durations for one request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Plan {
    pub before: Duration,
    pub after: Duration,
}

impl DelayConfig {
    /// Resolves the pause for `phase` of `req`, conditions included.
    pub fn resolve(&self, req: &Request, phase: Phase) -> Duration {
        if !self.conditions_hold(req) {
            return Duration::ZERO;
        }
        self.resolve_unconditional(req, phase)
    }

    /// Resolves both phases, evaluating the conditions only once.
    ///
    /// The request moves into the wrapped handler before the after-phase, so
    /// everything the after-phase depends on is read here.
    pub fn plan(&self, req: &Request) -> Plan {
        if !self.conditions_hold(req) {
            debug!(conditions = self.conditions.len(), "delay condition not met");
            return Plan::default();
        }
        Plan {
            before: self.resolve_unconditional(req, Phase::Before),
            after: self.resolve_unconditional(req, Phase::After),
        }
    }

    /// Every predicate passes, in insertion order, stopping at the first miss.
    fn conditions_hold(&self, req: &Request) -> bool {
        self.conditions.iter().all(|predicate| predicate(req))
    }

    fn resolve_unconditional(&self, req: &Request, phase: Phase) -> Duration {
        let requested = match &self.header_prefix {
            Some(prefix) => header_duration(req, prefix, phase),
            None => match phase {
                Phase::Before => self.before,
                Phase::After => self.after,
            },
        };
        requested.min(self.max)
    }
}

/// Reads `<prefix>-<phase>`. Absent or unparsable means no pause.
fn header_duration(req: &Request, prefix: &str, phase: Phase) -> Duration {
    let name = format!("{prefix}-{phase}");
    let Some(value) = req.header(&name) else {
        return Duration::ZERO;
    };
    match parse_duration(value) {
        Ok(d) => d,
        Err(e) => {
            debug!(header = %name, value, error = %e, "ignoring malformed delay header");
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::middleware::delay::{condition, fixed, header, max};

    fn ms(n: u64) -> Duration { Duration::from_millis(n) }

    fn request(headers: &[(&str, &str)]) -> Request {
        headers
            .iter()
            .fold(Request::builder(), |b, (k, v)| b.header(k, v))
            .build()
            .expect("valid request")
    }

    #[test]
    fn defaults_pause_one_second_before() {
        let cfg = DelayConfig::default();
        assert_eq!(cfg.plan(&request(&[])), Plan { before: ms(1_000), after: ms(0) });
    }

    #[test]
    fn fixed_durations() {
        let cfg = DelayConfig::from_options([fixed(ms(400), ms(250))]);
        let req = request(&[]);
        assert_eq!(cfg.resolve(&req, Phase::Before), ms(400));
        assert_eq!(cfg.resolve(&req, Phase::After), ms(250));
    }

    #[test]
    fn header_durations() {
        let cfg = DelayConfig::from_options([header("delay")]);
        let req = request(&[("delay-before", "300ms"), ("delay-after", "700ms")]);
        assert_eq!(cfg.plan(&req), Plan { before: ms(300), after: ms(700) });
    }

    #[test]
    fn header_mode_ignores_fixed_durations() {
        let cfg = DelayConfig::from_options([fixed(ms(400), ms(400)), header("delay")]);
        assert_eq!(cfg.plan(&request(&[])), Plan::default());

        let cfg = DelayConfig::from_options([header("delay"), fixed(ms(400), ms(400))]);
        let req = request(&[("delay-after", "1.5s")]);
        assert_eq!(cfg.plan(&req), Plan { before: ms(0), after: ms(1_500) });
    }

    #[test]
    fn empty_prefix_keeps_fixed_durations() {
        let cfg = DelayConfig::from_options([fixed(ms(400), ms(0)), header("")]);
        let req = request(&[("-before", "2s")]);
        assert_eq!(cfg.resolve(&req, Phase::Before), ms(400));
    }

    #[test]
    fn out_of_range_header_means_no_pause() {
        let cfg = DelayConfig::from_options([header("delay")]);
        let req = request(&[("delay-before", "3000000h")]);
        assert_eq!(cfg.resolve(&req, Phase::Before), Duration::ZERO);
    }

    #[test]
    fn micro_sign_units_reach_the_parser() {
        let cfg = DelayConfig::from_options([header("delay")]);
        let req = request(&[("delay-before", "1500µs"), ("delay-after", "20μs")]);
        assert_eq!(
            cfg.plan(&req),
            Plan { before: Duration::from_micros(1_500), after: Duration::from_micros(20) },
        );
    }

    #[test]
    fn malformed_header_means_no_pause() {
        let cfg = DelayConfig::from_options([header("delay")]);
        let req = request(&[("delay-before", "a while"), ("delay-after", "300")]);
        assert_eq!(cfg.plan(&req), Plan::default());
    }

    #[test]
    fn negative_header_floors_to_zero() {
        let cfg = DelayConfig::from_options([header("delay")]);
        let req = request(&[("delay-before", "-2s")]);
        assert_eq!(cfg.resolve(&req, Phase::Before), Duration::ZERO);
    }

    #[test]
    fn max_caps_each_phase() {
        let cfg = DelayConfig::from_options([fixed(ms(900), ms(200)), max(ms(500))]);
        assert_eq!(cfg.plan(&request(&[])), Plan { before: ms(500), after: ms(200) });

        let cfg = DelayConfig::from_options([header("delay"), max(ms(500))]);
        let req = request(&[("delay-before", "1h"), ("delay-after", "10s")]);
        assert_eq!(cfg.plan(&req), Plan { before: ms(500), after: ms(500) });
    }

    #[test]
    fn zero_max_disables_delays() {
        let cfg = DelayConfig::from_options([max(Duration::ZERO)]);
        assert_eq!(cfg.plan(&request(&[])), Plan::default());
    }

    #[test]
    fn failing_condition_gates_both_phases() {
        let cfg = DelayConfig::from_options([
            header("delay"),
            condition(|req| req.header("apikey") == Some("secret")),
        ]);
        let headers = [("delay-before", "300ms"), ("delay-after", "700ms")];
        assert_eq!(cfg.plan(&request(&headers)), Plan::default());
        assert_eq!(cfg.resolve(&request(&headers), Phase::After), Duration::ZERO);

        let mut with_key = headers.to_vec();
        with_key.push(("apikey", "secret"));
        assert_eq!(cfg.plan(&request(&with_key)), Plan { before: ms(300), after: ms(700) });
    }

    #[test]
    fn conditions_short_circuit_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let cfg = DelayConfig::from_options([
            condition(|_| false),
            condition(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ]);
        assert_eq!(cfg.plan(&request(&[])), Plan::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn plan_evaluates_conditions_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let cfg = DelayConfig::from_options([condition(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            true
        })]);
        cfg.plan(&request(&[]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn header_prefix_case_does_not_matter() {
        let cfg = DelayConfig::from_options([header("X-Delay")]);
        let req = request(&[("x-delay-before", "20ms")]);
        assert_eq!(cfg.resolve(&req, Phase::Before), ms(20));
    }
}
