//! Claims

use chrono::{DateTime, Duration, Utc};
use rusty_money::{Money, MoneyError, iso::Currency};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

use crate::booking::{Actor, BookingKey, Party};

new_key_type! {
    /// Claim Key
    pub struct ClaimKey;
}

/// Errors raised by claim transitions and resolution arithmetic.
#[derive(Debug, Error, PartialEq)]
pub enum ClaimError {
    /// The requested edge is not in the claim lifecycle adjacency.
    #[error("cannot move claim from {from:?} to {to:?}")]
    IllegalTransition {
        /// Current status.
        from: ClaimStatus,
        /// Requested status.
        to: ClaimStatus,
    },

    /// The acting party is not permitted to perform the transition.
    #[error("{party:?} may not {action} this claim")]
    Unauthorized {
        /// Party that attempted the transition.
        party: Party,
        /// Human-readable name of the attempted action.
        action: &'static str,
    },

    /// The claim already carries a renter response.
    #[error("claim already has a renter response")]
    AlreadyResponded,

    /// The estimated cost or final amount is negative.
    #[error("claim amount must be non-negative, got {0} minor units")]
    NegativeAmount(i64),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// The closed set of claim lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Filed by the owner, awaiting the renter's response.
    Pending,

    /// Renter accepted the estimate.
    Accepted,

    /// Renter rejected or countered the estimate.
    Disputed,

    /// Final amounts computed and settled.
    Resolved,

    /// Handed to arbitration with final amounts computed.
    Escalated,
}

impl ClaimStatus {
    /// Whether the claim still blocks deposit release.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(
            self,
            ClaimStatus::Pending | ClaimStatus::Accepted | ClaimStatus::Disputed
        )
    }

    /// The claim lifecycle adjacency. Escalation from `Pending` only
    /// happens through the response-window policy, never by a direct
    /// party action.
    #[must_use]
    pub fn can_transition(self, to: ClaimStatus) -> bool {
        matches!(
            (self, to),
            (
                ClaimStatus::Pending,
                ClaimStatus::Accepted | ClaimStatus::Disputed | ClaimStatus::Escalated
            ) | (ClaimStatus::Accepted, ClaimStatus::Resolved)
                | (
                    ClaimStatus::Disputed,
                    ClaimStatus::Resolved | ClaimStatus::Escalated
                )
        )
    }
}

/// How a renter answers a filed claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
    /// Agree to the filed estimate.
    Accept,

    /// Reject the claim outright, optionally with a counter-offer.
    Dispute,

    /// Counter-offer without outright rejection, keeping the claim open
    /// for an owner counter-response rather than escalating immediately.
    Negotiate,
}

/// The renter's single response to a claim.
#[derive(Debug, Clone)]
pub struct RenterResponse<'a> {
    /// The chosen response action.
    pub action: ResponseAction,

    /// Free-text notes accompanying the response.
    pub notes: Option<String>,

    /// Amount the renter proposes instead of the estimate.
    pub counter_offer: Option<Money<'a, Currency>>,

    /// When the response was recorded.
    pub responded_at: DateTime<Utc>,
}

/// How a claim's final amount is split across funding sources.
///
/// Conservation holds by construction: `paid_from_deposit +
/// paid_from_insurance + additional_charge == final_amount`, with
/// `paid_from_deposit` never exceeding the booking's deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimResolution<'a> {
    final_amount: Money<'a, Currency>,
    paid_from_deposit: Money<'a, Currency>,
    paid_from_insurance: Money<'a, Currency>,
    additional_charge: Money<'a, Currency>,
    resolved_at: DateTime<Utc>,
    resolved_by: String,
}

impl<'a> ClaimResolution<'a> {
    /// Splits `final_amount` across the funding sources: deposit first,
    /// then insurance up to `insurance_coverage`, then an additional
    /// charge to the renter for any remainder.
    ///
    /// # Errors
    ///
    /// [`ClaimError::NegativeAmount`] if `final_amount` is negative;
    /// [`ClaimError::Money`] if the amounts mix currencies.
    pub fn split(
        final_amount: Money<'a, Currency>,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        resolved_by: impl Into<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let final_minor = final_amount.to_minor_units();

        if final_minor < 0 {
            return Err(ClaimError::NegativeAmount(final_minor));
        }

        let currency = final_amount.currency();

        require_currency(currency, deposit_amount)?;
        require_currency(currency, insurance_coverage)?;

        let deposit_minor = deposit_amount.to_minor_units().max(0);
        let coverage_minor = insurance_coverage.to_minor_units().max(0);

        let from_deposit = final_minor.min(deposit_minor);
        let remainder = final_minor - from_deposit;
        let from_insurance = remainder.min(coverage_minor);
        let additional = remainder - from_insurance;

        debug_assert!(
            from_deposit + from_insurance + additional == final_minor,
            "claim split must conserve the final amount"
        );

        Ok(ClaimResolution {
            final_amount,
            paid_from_deposit: Money::from_minor(from_deposit, currency),
            paid_from_insurance: Money::from_minor(from_insurance, currency),
            additional_charge: Money::from_minor(additional, currency),
            resolved_at,
            resolved_by: resolved_by.into(),
        })
    }

    /// The settled claim amount.
    #[must_use]
    pub fn final_amount(&self) -> &Money<'a, Currency> {
        &self.final_amount
    }

    /// Share taken from the held deposit.
    #[must_use]
    pub fn paid_from_deposit(&self) -> &Money<'a, Currency> {
        &self.paid_from_deposit
    }

    /// Share covered by the marketplace insurance policy.
    #[must_use]
    pub fn paid_from_insurance(&self) -> &Money<'a, Currency> {
        &self.paid_from_insurance
    }

    /// Remainder charged to the renter directly.
    #[must_use]
    pub fn additional_charge(&self) -> &Money<'a, Currency> {
        &self.additional_charge
    }

    /// When the resolution was computed.
    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Identity of the resolving party (or `"system"` for auto-escalation).
    #[must_use]
    pub fn resolved_by(&self) -> &str {
        &self.resolved_by
    }
}

/// An owner-filed assertion of equipment damage against a booking.
#[derive(Debug, Clone)]
pub struct DamageClaim<'a> {
    booking: BookingKey,
    description: String,
    estimated_cost: Money<'a, Currency>,
    status: ClaimStatus,
    filed_at: DateTime<Utc>,
    response: Option<RenterResponse<'a>>,
    resolution: Option<ClaimResolution<'a>>,
}

impl<'a> DamageClaim<'a> {
    /// Files a new claim with a non-negative estimate.
    ///
    /// # Errors
    ///
    /// [`ClaimError::NegativeAmount`] if `estimated_cost` is negative.
    pub fn file(
        booking: BookingKey,
        description: impl Into<String>,
        estimated_cost: Money<'a, Currency>,
        filed_at: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let estimate_minor = estimated_cost.to_minor_units();

        if estimate_minor < 0 {
            return Err(ClaimError::NegativeAmount(estimate_minor));
        }

        Ok(DamageClaim {
            booking,
            description: description.into(),
            estimated_cost,
            status: ClaimStatus::Pending,
            filed_at,
            response: None,
            resolution: None,
        })
    }

    /// The booking the claim is filed against.
    #[must_use]
    pub fn booking(&self) -> BookingKey {
        self.booking
    }

    /// Owner's description of the damage.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The owner's filed estimate.
    #[must_use]
    pub fn estimated_cost(&self) -> &Money<'a, Currency> {
        &self.estimated_cost
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ClaimStatus {
        self.status
    }

    /// When the claim was filed.
    #[must_use]
    pub fn filed_at(&self) -> DateTime<Utc> {
        self.filed_at
    }

    /// The renter's response, if one was recorded.
    #[must_use]
    pub fn response(&self) -> Option<&RenterResponse<'a>> {
        self.response.as_ref()
    }

    /// The computed resolution, present once the claim is resolved or
    /// escalated.
    #[must_use]
    pub fn resolution(&self) -> Option<&ClaimResolution<'a>> {
        self.resolution.as_ref()
    }

    /// Records the renter's response to a pending claim.
    ///
    /// `Accept` moves the claim to `Accepted` (settled by
    /// [`DamageClaim::settle_accepted`]); `Dispute` and `Negotiate` both
    /// move it to `Disputed`, with the stored action distinguishing an
    /// outright rejection from an open negotiation.
    ///
    /// # Errors
    ///
    /// [`ClaimError::Unauthorized`] unless the actor is the renter;
    /// [`ClaimError::AlreadyResponded`] on a second response;
    /// [`ClaimError::IllegalTransition`] unless the claim is pending.
    pub fn respond(
        &mut self,
        actor: &Actor,
        response: RenterResponse<'a>,
    ) -> Result<(), ClaimError> {
        require_party(actor, Party::Renter, "respond to")?;

        if self.response.is_some() {
            return Err(ClaimError::AlreadyResponded);
        }

        let to = match response.action {
            ResponseAction::Accept => ClaimStatus::Accepted,
            ResponseAction::Dispute | ResponseAction::Negotiate => ClaimStatus::Disputed,
        };

        self.transition(to)?;
        self.response = Some(response);

        Ok(())
    }

    /// Settles an accepted claim at the filed estimate.
    ///
    /// # Errors
    ///
    /// [`ClaimError::IllegalTransition`] unless the claim is accepted;
    /// split errors per [`ClaimResolution::split`].
    pub fn settle_accepted(
        &mut self,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<&ClaimResolution<'a>, ClaimError> {
        if !self.status.can_transition(ClaimStatus::Resolved)
            || self.status != ClaimStatus::Accepted
        {
            return Err(ClaimError::IllegalTransition {
                from: self.status,
                to: ClaimStatus::Resolved,
            });
        }

        let resolution = ClaimResolution::split(
            self.estimated_cost,
            deposit_amount,
            insurance_coverage,
            "system",
            now,
        )?;

        self.status = ClaimStatus::Resolved;
        self.resolution = Some(resolution);

        self.resolution
            .as_ref()
            .ok_or(ClaimError::IllegalTransition {
                from: self.status,
                to: ClaimStatus::Resolved,
            })
    }

    /// Owner (or arbiter) resolves a disputed claim at `final_amount`.
    ///
    /// Only disputed claims take an owner-decided amount; an accepted claim
    /// settles automatically at the filed estimate through
    /// [`DamageClaim::settle_accepted`].
    ///
    /// # Errors
    ///
    /// [`ClaimError::Unauthorized`] unless the actor is the owner;
    /// [`ClaimError::IllegalTransition`] unless the claim is disputed;
    /// split errors per [`ClaimResolution::split`].
    pub fn resolve(
        &mut self,
        actor: &Actor,
        final_amount: Money<'a, Currency>,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<&ClaimResolution<'a>, ClaimError> {
        require_party(actor, Party::Owner, "resolve")?;
        self.require_disputed(ClaimStatus::Resolved)?;

        self.close(
            ClaimStatus::Resolved,
            final_amount,
            deposit_amount,
            insurance_coverage,
            actor.id(),
            now,
        )
    }

    /// Owner (or arbiter) escalates a disputed claim, computing the split
    /// at `final_amount` for the arbitration record.
    ///
    /// A pending claim never escalates by party action; that edge belongs
    /// to the response-window policy via [`DamageClaim::auto_escalate`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DamageClaim::resolve`].
    pub fn escalate(
        &mut self,
        actor: &Actor,
        final_amount: Money<'a, Currency>,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<&ClaimResolution<'a>, ClaimError> {
        require_party(actor, Party::Owner, "escalate")?;
        self.require_disputed(ClaimStatus::Escalated)?;

        self.close(
            ClaimStatus::Escalated,
            final_amount,
            deposit_amount,
            insurance_coverage,
            actor.id(),
            now,
        )
    }

    /// Whether the claim has sat pending without a response beyond the
    /// configured window.
    #[must_use]
    pub fn should_auto_escalate(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.status == ClaimStatus::Pending
            && self.response.is_none()
            && now - self.filed_at > window
    }

    /// Escalates an unanswered pending claim at the filed estimate,
    /// attributed to the system.
    ///
    /// # Errors
    ///
    /// [`ClaimError::IllegalTransition`] unless the claim is pending;
    /// split errors per [`ClaimResolution::split`].
    pub fn auto_escalate(
        &mut self,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        now: DateTime<Utc>,
    ) -> Result<&ClaimResolution<'a>, ClaimError> {
        if self.status != ClaimStatus::Pending {
            return Err(ClaimError::IllegalTransition {
                from: self.status,
                to: ClaimStatus::Escalated,
            });
        }

        self.close(
            ClaimStatus::Escalated,
            self.estimated_cost,
            deposit_amount,
            insurance_coverage,
            "system",
            now,
        )
    }

    /// Rejects owner-decided closes unless the claim is disputed.
    fn require_disputed(&self, to: ClaimStatus) -> Result<(), ClaimError> {
        if self.status == ClaimStatus::Disputed {
            Ok(())
        } else {
            Err(ClaimError::IllegalTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Applies a closing transition and stores the computed resolution.
    fn close(
        &mut self,
        to: ClaimStatus,
        final_amount: Money<'a, Currency>,
        deposit_amount: &Money<'a, Currency>,
        insurance_coverage: &Money<'a, Currency>,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<&ClaimResolution<'a>, ClaimError> {
        if !self.status.can_transition(to) {
            return Err(ClaimError::IllegalTransition {
                from: self.status,
                to,
            });
        }

        let resolution = ClaimResolution::split(
            final_amount,
            deposit_amount,
            insurance_coverage,
            resolved_by,
            now,
        )?;

        self.status = to;
        self.resolution = Some(resolution);

        self.resolution.as_ref().ok_or(ClaimError::IllegalTransition {
            from: self.status,
            to,
        })
    }

    fn transition(&mut self, to: ClaimStatus) -> Result<(), ClaimError> {
        if !self.status.can_transition(to) {
            return Err(ClaimError::IllegalTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;

        Ok(())
    }
}

/// Rejects the transition unless the actor holds the required role.
fn require_party(actor: &Actor, required: Party, action: &'static str) -> Result<(), ClaimError> {
    if actor.party() == required {
        Ok(())
    } else {
        Err(ClaimError::Unauthorized {
            party: actor.party(),
            action,
        })
    }
}

/// Rejects mixed-currency claim arithmetic.
fn require_currency(expected: &Currency, amount: &Money<'_, Currency>) -> Result<(), ClaimError> {
    if amount.currency() == expected {
        Ok(())
    } else {
        Err(ClaimError::Money(MoneyError::CurrencyMismatch {
            expected: expected.iso_alpha_code,
            actual: amount.currency().iso_alpha_code,
        }))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    fn owner() -> Actor {
        Actor::new(Party::Owner, "owner-1")
    }

    fn renter() -> Actor {
        Actor::new(Party::Renter, "renter-1")
    }

    fn claim(estimate_minor: i64) -> TestResult<DamageClaim<'static>> {
        Ok(DamageClaim::file(
            BookingKey::default(),
            "cracked hydraulic line",
            Money::from_minor(estimate_minor, USD),
            Utc::now(),
        )?)
    }

    fn accept(now: DateTime<Utc>) -> RenterResponse<'static> {
        RenterResponse {
            action: ResponseAction::Accept,
            notes: None,
            counter_offer: None,
            responded_at: now,
        }
    }

    #[test]
    fn accepted_claim_settles_at_the_estimate() -> TestResult {
        // estimated_cost=200.00, renter accepts
        let mut claim = claim(20_000)?;

        claim.respond(&renter(), accept(Utc::now()))?;
        assert_eq!(claim.status(), ClaimStatus::Accepted);

        let resolution = claim.settle_accepted(
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            Utc::now(),
        )?;

        assert_eq!(resolution.final_amount(), &Money::from_minor(20_000, USD));
        assert_eq!(
            resolution.paid_from_deposit(),
            &Money::from_minor(20_000, USD)
        );
        assert_eq!(claim.status(), ClaimStatus::Resolved);

        Ok(())
    }

    #[test]
    fn split_conserves_the_final_amount() -> TestResult {
        let cases = [
            // (final, deposit, coverage)
            (45_000i64, 30_000i64, 10_000i64),
            (20_000, 30_000, 0),
            (0, 30_000, 10_000),
            (100_000, 0, 0),
            (5_000, 5_000, 5_000),
        ];

        for (final_minor, deposit_minor, coverage_minor) in cases {
            let resolution = ClaimResolution::split(
                Money::from_minor(final_minor, USD),
                &Money::from_minor(deposit_minor, USD),
                &Money::from_minor(coverage_minor, USD),
                "owner-1",
                Utc::now(),
            )?;

            let from_deposit = resolution.paid_from_deposit().to_minor_units();
            let from_insurance = resolution.paid_from_insurance().to_minor_units();
            let additional = resolution.additional_charge().to_minor_units();

            assert_eq!(
                from_deposit + from_insurance + additional,
                final_minor,
                "split must conserve the final amount"
            );
            assert!(
                from_deposit <= deposit_minor,
                "deposit share must not exceed the deposit"
            );
            assert!(
                from_insurance <= coverage_minor,
                "insurance share must not exceed the coverage limit"
            );

            for part in [from_deposit, from_insurance, additional] {
                assert!(part >= 0, "split parts must be non-negative");
            }
        }

        Ok(())
    }

    #[test]
    fn excess_over_deposit_and_coverage_becomes_additional_charge() -> TestResult {
        let resolution = ClaimResolution::split(
            Money::from_minor(45_000, USD),
            &Money::from_minor(30_000, USD),
            &Money::from_minor(10_000, USD),
            "owner-1",
            Utc::now(),
        )?;

        assert_eq!(
            resolution.paid_from_deposit(),
            &Money::from_minor(30_000, USD)
        );
        assert_eq!(
            resolution.paid_from_insurance(),
            &Money::from_minor(10_000, USD)
        );
        assert_eq!(
            resolution.additional_charge(),
            &Money::from_minor(5_000, USD)
        );

        Ok(())
    }

    #[test]
    fn negative_final_amount_is_rejected() {
        let result = ClaimResolution::split(
            Money::from_minor(-1, USD),
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            "owner-1",
            Utc::now(),
        );

        assert!(matches!(result, Err(ClaimError::NegativeAmount(-1))));
    }

    #[test]
    fn negative_estimate_cannot_be_filed() {
        let result = DamageClaim::file(
            BookingKey::default(),
            "bad estimate",
            Money::from_minor(-5, USD),
            Utc::now(),
        );

        assert!(matches!(result, Err(ClaimError::NegativeAmount(-5))));
    }

    #[test]
    fn owner_cannot_respond_for_the_renter() -> TestResult {
        let mut claim = claim(20_000)?;

        let err = claim.respond(&owner(), accept(Utc::now())).err();

        assert_eq!(
            err,
            Some(ClaimError::Unauthorized {
                party: Party::Owner,
                action: "respond to",
            })
        );

        Ok(())
    }

    #[test]
    fn second_response_is_rejected() -> TestResult {
        let mut claim = claim(20_000)?;
        claim.respond(&renter(), accept(Utc::now()))?;

        let err = claim.respond(&renter(), accept(Utc::now())).err();

        assert_eq!(err, Some(ClaimError::AlreadyResponded));

        Ok(())
    }

    #[test]
    fn negotiate_keeps_the_claim_disputed_with_counter_offer() -> TestResult {
        let mut claim = claim(20_000)?;

        claim.respond(
            &renter(),
            RenterResponse {
                action: ResponseAction::Negotiate,
                notes: Some("pre-existing wear".to_string()),
                counter_offer: Some(Money::from_minor(8_000, USD)),
                responded_at: Utc::now(),
            },
        )?;

        assert_eq!(claim.status(), ClaimStatus::Disputed);

        let response = claim.response().ok_or("expected a stored response")?;

        assert_eq!(response.action, ResponseAction::Negotiate);
        assert_eq!(response.counter_offer, Some(Money::from_minor(8_000, USD)));

        Ok(())
    }

    #[test]
    fn disputed_claim_resolves_at_the_agreed_amount() -> TestResult {
        let mut claim = claim(20_000)?;

        claim.respond(
            &renter(),
            RenterResponse {
                action: ResponseAction::Dispute,
                notes: None,
                counter_offer: Some(Money::from_minor(8_000, USD)),
                responded_at: Utc::now(),
            },
        )?;

        let resolution = claim.resolve(
            &owner(),
            Money::from_minor(8_000, USD),
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            Utc::now(),
        )?;

        assert_eq!(resolution.final_amount(), &Money::from_minor(8_000, USD));
        assert_eq!(resolution.resolved_by(), "owner-1");
        assert_eq!(claim.status(), ClaimStatus::Resolved);

        Ok(())
    }

    #[test]
    fn disputed_claim_can_escalate() -> TestResult {
        let mut claim = claim(20_000)?;

        claim.respond(
            &renter(),
            RenterResponse {
                action: ResponseAction::Dispute,
                notes: None,
                counter_offer: None,
                responded_at: Utc::now(),
            },
        )?;

        claim.escalate(
            &owner(),
            Money::from_minor(20_000, USD),
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            Utc::now(),
        )?;

        assert_eq!(claim.status(), ClaimStatus::Escalated);

        Ok(())
    }

    #[test]
    fn pending_claim_cannot_be_escalated_by_the_owner() -> TestResult {
        // No response, window not lapsed: only the sweep may take this edge.
        let mut claim = claim(20_000)?;

        let err = claim
            .escalate(
                &owner(),
                Money::from_minor(20_000, USD),
                &Money::from_minor(30_000, USD),
                &Money::from_minor(0, USD),
                Utc::now(),
            )
            .err();

        assert_eq!(
            err,
            Some(ClaimError::IllegalTransition {
                from: ClaimStatus::Pending,
                to: ClaimStatus::Escalated,
            })
        );
        assert_eq!(claim.status(), ClaimStatus::Pending);

        Ok(())
    }

    #[test]
    fn accepted_claim_cannot_be_resolved_at_a_different_amount() -> TestResult {
        let mut claim = claim(20_000)?;
        claim.respond(&renter(), accept(Utc::now()))?;

        let err = claim
            .resolve(
                &owner(),
                Money::from_minor(99_000, USD),
                &Money::from_minor(30_000, USD),
                &Money::from_minor(0, USD),
                Utc::now(),
            )
            .err();

        assert_eq!(
            err,
            Some(ClaimError::IllegalTransition {
                from: ClaimStatus::Accepted,
                to: ClaimStatus::Resolved,
            })
        );
        assert_eq!(claim.status(), ClaimStatus::Accepted);

        Ok(())
    }

    #[test]
    fn unanswered_claim_auto_escalates_after_the_window() -> TestResult {
        let filed_at = Utc::now();
        let mut claim = DamageClaim::file(
            BookingKey::default(),
            "bent frame",
            Money::from_minor(20_000, USD),
            filed_at,
        )?;

        let window = Duration::hours(72);

        assert!(!claim.should_auto_escalate(filed_at + Duration::hours(71), window));
        assert!(claim.should_auto_escalate(filed_at + Duration::hours(73), window));

        let resolution = claim.auto_escalate(
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            filed_at + Duration::hours(73),
        )?;

        assert_eq!(resolution.resolved_by(), "system");
        assert_eq!(resolution.final_amount(), &Money::from_minor(20_000, USD));
        assert_eq!(claim.status(), ClaimStatus::Escalated);

        Ok(())
    }

    #[test]
    fn resolved_claim_is_immutable() -> TestResult {
        let mut claim = claim(20_000)?;
        claim.respond(&renter(), accept(Utc::now()))?;
        claim.settle_accepted(
            &Money::from_minor(30_000, USD),
            &Money::from_minor(0, USD),
            Utc::now(),
        )?;

        let err = claim
            .auto_escalate(
                &Money::from_minor(30_000, USD),
                &Money::from_minor(0, USD),
                Utc::now(),
            )
            .err();

        assert_eq!(
            err,
            Some(ClaimError::IllegalTransition {
                from: ClaimStatus::Resolved,
                to: ClaimStatus::Escalated,
            })
        );

        Ok(())
    }

    #[test]
    fn adjacency_closure_rejects_every_undefined_edge() {
        use ClaimStatus::{Accepted, Disputed, Escalated, Pending, Resolved};

        let all = [Pending, Accepted, Disputed, Resolved, Escalated];

        let defined = [
            (Pending, Accepted),
            (Pending, Disputed),
            (Pending, Escalated),
            (Accepted, Resolved),
            (Disputed, Resolved),
            (Disputed, Escalated),
        ];

        for from in all {
            for to in all {
                let expected = defined.contains(&(from, to));

                assert_eq!(
                    from.can_transition(to),
                    expected,
                    "unexpected adjacency verdict for {from:?} -> {to:?}"
                );
            }
        }
    }
}
