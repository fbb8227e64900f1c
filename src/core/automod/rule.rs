// A compiled automod rule: typed conditions, a combinator, and the rate
// limiters the rate conditions own.
//
// A `Rule` is built once per configuration load and then reused for every
// event, because its limiters carry the counters. Rebuilding a rule starts
// every counter from zero.

use super::automod_models::{AutomodError, Combinator, ConditionRecord, EventContext, RuleRecord};
use super::conditions::{ConditionSpec, EvalDeps};
use super::rate_limiter::{RateLimiter, DEFAULT_MAX_BUCKETS};
use super::scam_links::ScamLinkGuard;
use std::sync::Arc;
use std::time::Instant;

/// Shared settings applied to every rule a loader builds.
#[derive(Clone)]
pub struct RuleOptions {
    /// Link-reputation service for `scam_links`. `None` makes that condition inert.
    pub scam_links: Option<Arc<ScamLinkGuard>>,
    /// Cap on tracked users/channels per rate limiter.
    pub max_buckets_per_limiter: usize,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            scam_links: None,
            max_buckets_per_limiter: DEFAULT_MAX_BUCKETS,
        }
    }
}

/// A condition together with the limiter it owns, if it is rate-gated.
struct Condition {
    spec: ConditionSpec,
    limiter: Option<RateLimiter>,
}

pub struct Rule {
    conditions: Vec<Condition>,
    combinator: Combinator,
    scam_links: Option<Arc<ScamLinkGuard>>,
}

impl Rule {
    /// Build a rule from stored condition records.
    ///
    /// Fails on the first record that doesn't parse, so a bad configuration
    /// never gets as far as `check`.
    pub fn build(
        records: &[ConditionRecord],
        combinator: Combinator,
        options: &RuleOptions,
    ) -> Result<Self, AutomodError> {
        let conditions = records
            .iter()
            .map(|record| {
                let spec = ConditionSpec::from_record(record)?;
                let limiter = spec.rate_condition().map(|rate| {
                    RateLimiter::new(rate.rate, rate.window, options.max_buckets_per_limiter)
                });
                Ok(Condition { spec, limiter })
            })
            .collect::<Result<Vec<_>, AutomodError>>()?;

        Ok(Self {
            conditions,
            combinator,
            scam_links: options.scam_links.clone(),
        })
    }

    pub fn from_record(record: &RuleRecord, options: &RuleOptions) -> Result<Self, AutomodError> {
        Self::build(&record.conditions, record.combinator, options)
    }

    /// Condition kinds in evaluation order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.conditions.iter().map(|c| c.spec.kind()).collect()
    }

    /// Evaluate the rule against an event using the wall clock.
    pub async fn check(&self, ctx: &EventContext) -> bool {
        self.check_at(ctx, Instant::now()).await
    }

    /// Evaluate the rule as if the event happened at `now`.
    ///
    /// Every condition runs, even once the verdict is known, so each rate
    /// limiter sees every event that passes its gate.
    pub async fn check_at(&self, ctx: &EventContext, now: Instant) -> bool {
        if self.conditions.is_empty() {
            return false;
        }

        let mut results = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let deps = EvalDeps {
                limiter: condition.limiter.as_ref(),
                scam_links: self.scam_links.as_deref(),
                now,
            };
            results.push(condition.spec.evaluate(ctx, deps).await);
        }

        self.combinator.combine(&results)
    }

    /// Evict expired buckets from every limiter this rule owns.
    pub fn sweep_limiters(&self, now: Instant) -> usize {
        self.conditions
            .iter()
            .filter_map(|c| c.limiter.as_ref())
            .map(|limiter| limiter.evict_expired(now))
            .sum()
    }
}
