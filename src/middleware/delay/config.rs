//! Delay configuration and the option constructors that shape it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::request::Request;

/// Pause before the wrapped handler when no option says otherwise.
pub const DEFAULT_BEFORE: Duration = Duration::from_secs(1);
/// Pause after the wrapped handler when no option says otherwise.
pub const DEFAULT_AFTER: Duration = Duration::ZERO;
/// Cap applied to each phase: total added latency stays under `2 * DEFAULT_MAX`.
pub const DEFAULT_MAX: Duration = Duration::from_secs(20);

pub(crate) type Predicate = Arc<dyn Fn(&Request) -> bool + Send + Sync + 'static>;

/// Resolved delay settings for one wrapped handler.
///
/// Built once by [`delay`](super::delay) from the defaults and the options
/// passed to it, then shared read-only by every request the handler serves.
#[derive(Clone)]
pub struct DelayConfig {
    pub(crate) before: Duration,
    pub(crate) after: Duration,
    pub(crate) header_prefix: Option<String>,
    pub(crate) max: Duration,
    pub(crate) conditions: Vec<Predicate>,
}

impl DelayConfig {
    /// Applies `options` left to right on top of the defaults.
    pub fn from_options(options: impl IntoIterator<Item = DelayOption>) -> Self {
        let mut cfg = Self::default();
        for option in options {
            (option.0)(&mut cfg);
        }
        cfg
    }

    pub fn fixed_before(&self) -> Duration { self.before }
    pub fn fixed_after(&self) -> Duration { self.after }
    pub fn header_prefix(&self) -> Option<&str> { self.header_prefix.as_deref() }
    pub fn max(&self) -> Duration { self.max }
    pub fn condition_count(&self) -> usize { self.conditions.len() }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            before: DEFAULT_BEFORE,
            after: DEFAULT_AFTER,
            header_prefix: None,
            max: DEFAULT_MAX,
            conditions: Vec::new(),
        }
    }
}

impl fmt::Debug for DelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayConfig")
            .field("before", &self.before)
            .field("after", &self.after)
            .field("header_prefix", &self.header_prefix)
            .field("max", &self.max)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// One change to a [`DelayConfig`], produced by [`fixed`], [`header`],
/// [`max`] or [`condition`].
///
/// Options are applied in the order given; a later option overwrites the
/// fields an earlier one set. Nothing is validated.
pub struct DelayOption(Box<dyn FnOnce(&mut DelayConfig) + Send>);

impl DelayOption {
    fn new(apply: impl FnOnce(&mut DelayConfig) + Send + 'static) -> Self {
        Self(Box::new(apply))
    }
}

impl fmt::Debug for DelayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DelayOption")
    }
}

/// Pauses `before` ahead of the wrapped handler and `after` once it returns.
///
/// Ignored for resolution while a [`header`] prefix is configured, whatever
/// the order the two options were given in.
pub fn fixed(before: Duration, after: Duration) -> DelayOption {
    DelayOption::new(move |cfg| {
        cfg.before = before;
        cfg.after = after;
    })
}

/// Lets the client pick the durations through the `<prefix>-before` and
/// `<prefix>-after` request headers, e.g. `delay-before: 300ms`.
///
/// Values use the `1h2m3.5s` format understood by
/// [`parse_duration`](super::parse_duration). A missing or malformed header
/// means no delay for that phase. An empty prefix switches header mode off.
pub fn header(prefix: impl Into<String>) -> DelayOption {
    let prefix = prefix.into();
    DelayOption::new(move |cfg| cfg.header_prefix = (!prefix.is_empty()).then_some(prefix))
}

/// Caps each phase at `limit`, so a request never gains more than
/// `2 * limit` of latency. Defaults to 20s.
pub fn max(limit: Duration) -> DelayOption {
    DelayOption::new(move |cfg| cfg.max = limit)
}

/// Only delays requests for which `predicate` returns `true`.
///
/// Repeated calls accumulate; every predicate must pass. A failing predicate
/// removes both phases' delays, it never adds one.
pub fn condition<P>(predicate: P) -> DelayOption
where
    P: Fn(&Request) -> bool + Send + Sync + 'static,
{
    let predicate: Predicate = Arc::new(predicate);
    DelayOption::new(move |cfg| cfg.conditions.push(predicate))
}
