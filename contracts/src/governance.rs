//! # Vault Governance
//!
//! Every fee knob of a root vault is a [`TimelockedParameter`]: a change is
//! staged, sits out the governance delay, and only then can be committed.
//! Depositors who dislike a staged fee increase have the whole delay to
//! leave. Rollback is immediate.
//!
//! Who may touch a parameter depends on the parameter:
//!
//! | Parameter               | Admin | Strategist |
//! |-------------------------|:-----:|:----------:|
//! | management fee          |   x   |     x      |
//! | performance fee         |   x   |     x      |
//! | strategy treasury       |   x   |     x      |
//! | performance treasury    |   x   |     x      |
//! | protocol fee            |   x   |            |
//! | protocol treasury       |   x   |            |
//! | fee charge throttle     |   x   |            |
//! | valuation reference     |   x   |            |
//!
//! Deposit limits, the private flag and the depositor allowlist are not
//! fee-bearing and take effect immediately.

use std::collections::BTreeSet;
use std::fmt;

use kestrel_protocol::access::{AccessTable, Role};
use kestrel_protocol::clock::Timestamp;
use kestrel_protocol::config::GovernanceConfig;
use kestrel_protocol::ledger::{Account, Amount};
use kestrel_protocol::timelock::{TimelockError, TimelockedParameter};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, VaultError};

// ---------------------------------------------------------------------------
// Parameter identifiers and values
// ---------------------------------------------------------------------------

/// Names one governance-controlled parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamId {
    ManagementFee,
    PerformanceFee,
    ProtocolFee,
    FeeChargeThrottle,
    StrategyTreasury,
    PerformanceTreasury,
    ProtocolTreasury,
    ValuationReference,
}

impl ParamId {
    /// Every parameter, in declaration order.
    pub const ALL: [ParamId; 8] = [
        ParamId::ManagementFee,
        ParamId::PerformanceFee,
        ParamId::ProtocolFee,
        ParamId::FeeChargeThrottle,
        ParamId::StrategyTreasury,
        ParamId::PerformanceTreasury,
        ParamId::ProtocolTreasury,
        ParamId::ValuationReference,
    ];

    /// Snake-case name used in logs and events.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::ManagementFee => "management_fee",
            ParamId::PerformanceFee => "performance_fee",
            ParamId::ProtocolFee => "protocol_fee",
            ParamId::FeeChargeThrottle => "fee_charge_throttle",
            ParamId::StrategyTreasury => "strategy_treasury",
            ParamId::PerformanceTreasury => "performance_treasury",
            ParamId::ProtocolTreasury => "protocol_treasury",
            ParamId::ValuationReference => "valuation_reference",
        }
    }

    /// Roles allowed to stage, commit or roll back this parameter.
    pub fn authorized_roles(self) -> &'static [Role] {
        match self {
            ParamId::ManagementFee
            | ParamId::PerformanceFee
            | ParamId::StrategyTreasury
            | ParamId::PerformanceTreasury => &[Role::Admin, Role::Strategist],
            ParamId::ProtocolFee
            | ParamId::ProtocolTreasury
            | ParamId::FeeChargeThrottle
            | ParamId::ValuationReference => &[Role::Admin],
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value for one parameter. The variant must match the parameter's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Annualized fee rate scaled by `FEE_DENOMINATOR`.
    Rate(u128),
    /// Duration in seconds.
    Seconds(u64),
    /// Treasury account.
    Account(Account),
    /// Valuation adapter reference.
    Reference(String),
}

// ---------------------------------------------------------------------------
// FeeSchedule / FeeParameters
// ---------------------------------------------------------------------------

/// The active value of every fee parameter at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub management_fee: u128,
    pub performance_fee: u128,
    pub protocol_fee: u128,
    /// Minimum seconds between two fee charges.
    pub fee_charge_throttle: u64,
    pub strategy_treasury: Account,
    pub performance_treasury: Account,
    pub protocol_treasury: Account,
    pub valuation_reference: String,
}

impl FeeSchedule {
    /// Zero fees, no throttle, every treasury set to `treasury`.
    pub fn fee_free(treasury: &str, valuation_reference: &str) -> Self {
        Self {
            management_fee: 0,
            performance_fee: 0,
            protocol_fee: 0,
            fee_charge_throttle: 0,
            strategy_treasury: treasury.to_string(),
            performance_treasury: treasury.to_string(),
            protocol_treasury: treasury.to_string(),
            valuation_reference: valuation_reference.to_string(),
        }
    }

    fn value(&self, id: ParamId) -> ParamValue {
        match id {
            ParamId::ManagementFee => ParamValue::Rate(self.management_fee),
            ParamId::PerformanceFee => ParamValue::Rate(self.performance_fee),
            ParamId::ProtocolFee => ParamValue::Rate(self.protocol_fee),
            ParamId::FeeChargeThrottle => ParamValue::Seconds(self.fee_charge_throttle),
            ParamId::StrategyTreasury => ParamValue::Account(self.strategy_treasury.clone()),
            ParamId::PerformanceTreasury => {
                ParamValue::Account(self.performance_treasury.clone())
            }
            ParamId::ProtocolTreasury => ParamValue::Account(self.protocol_treasury.clone()),
            ParamId::ValuationReference => {
                ParamValue::Reference(self.valuation_reference.clone())
            }
        }
    }
}

/// Applies `$body` to the `TimelockedParameter` behind `$id`, whatever its
/// value type.
macro_rules! with_param {
    ($params:expr, $id:expr, |$p:ident| $body:expr) => {
        match $id {
            ParamId::ManagementFee => {
                let $p = &$params.management_fee;
                $body
            }
            ParamId::PerformanceFee => {
                let $p = &$params.performance_fee;
                $body
            }
            ParamId::ProtocolFee => {
                let $p = &$params.protocol_fee;
                $body
            }
            ParamId::FeeChargeThrottle => {
                let $p = &$params.fee_charge_throttle;
                $body
            }
            ParamId::StrategyTreasury => {
                let $p = &$params.strategy_treasury;
                $body
            }
            ParamId::PerformanceTreasury => {
                let $p = &$params.performance_treasury;
                $body
            }
            ParamId::ProtocolTreasury => {
                let $p = &$params.protocol_treasury;
                $body
            }
            ParamId::ValuationReference => {
                let $p = &$params.valuation_reference;
                $body
            }
        }
    };
}

macro_rules! with_param_mut {
    ($params:expr, $id:expr, |$p:ident| $body:expr) => {
        match $id {
            ParamId::ManagementFee => {
                let $p = &mut $params.management_fee;
                $body
            }
            ParamId::PerformanceFee => {
                let $p = &mut $params.performance_fee;
                $body
            }
            ParamId::ProtocolFee => {
                let $p = &mut $params.protocol_fee;
                $body
            }
            ParamId::FeeChargeThrottle => {
                let $p = &mut $params.fee_charge_throttle;
                $body
            }
            ParamId::StrategyTreasury => {
                let $p = &mut $params.strategy_treasury;
                $body
            }
            ParamId::PerformanceTreasury => {
                let $p = &mut $params.performance_treasury;
                $body
            }
            ParamId::ProtocolTreasury => {
                let $p = &mut $params.protocol_treasury;
                $body
            }
            ParamId::ValuationReference => {
                let $p = &mut $params.valuation_reference;
                $body
            }
        }
    };
}

/// The timelocked fee parameters of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameters {
    pub management_fee: TimelockedParameter<u128>,
    pub performance_fee: TimelockedParameter<u128>,
    pub protocol_fee: TimelockedParameter<u128>,
    pub fee_charge_throttle: TimelockedParameter<u64>,
    pub strategy_treasury: TimelockedParameter<Account>,
    pub performance_treasury: TimelockedParameter<Account>,
    pub protocol_treasury: TimelockedParameter<Account>,
    pub valuation_reference: TimelockedParameter<String>,
}

impl FeeParameters {
    /// All parameters active at `initial`, nothing staged.
    pub fn new(initial: FeeSchedule) -> Self {
        Self {
            management_fee: TimelockedParameter::new(initial.management_fee),
            performance_fee: TimelockedParameter::new(initial.performance_fee),
            protocol_fee: TimelockedParameter::new(initial.protocol_fee),
            fee_charge_throttle: TimelockedParameter::new(initial.fee_charge_throttle),
            strategy_treasury: TimelockedParameter::new(initial.strategy_treasury),
            performance_treasury: TimelockedParameter::new(initial.performance_treasury),
            protocol_treasury: TimelockedParameter::new(initial.protocol_treasury),
            valuation_reference: TimelockedParameter::new(initial.valuation_reference),
        }
    }

    /// Snapshot of every active value.
    pub fn active(&self) -> FeeSchedule {
        FeeSchedule {
            management_fee: *self.management_fee.active(),
            performance_fee: *self.performance_fee.active(),
            protocol_fee: *self.protocol_fee.active(),
            fee_charge_throttle: *self.fee_charge_throttle.active(),
            strategy_treasury: self.strategy_treasury.active().clone(),
            performance_treasury: self.performance_treasury.active().clone(),
            protocol_treasury: self.protocol_treasury.active().clone(),
            valuation_reference: self.valuation_reference.active().clone(),
        }
    }

    /// Active value of one parameter.
    pub fn active_value(&self, id: ParamId) -> ParamValue {
        self.active().value(id)
    }

    /// Pending value of one parameter, if any.
    pub fn staged_value(&self, id: ParamId) -> Option<ParamValue> {
        match id {
            ParamId::ManagementFee => self.management_fee.staged().map(|v| ParamValue::Rate(*v)),
            ParamId::PerformanceFee => self.performance_fee.staged().map(|v| ParamValue::Rate(*v)),
            ParamId::ProtocolFee => self.protocol_fee.staged().map(|v| ParamValue::Rate(*v)),
            ParamId::FeeChargeThrottle => self
                .fee_charge_throttle
                .staged()
                .map(|v| ParamValue::Seconds(*v)),
            ParamId::StrategyTreasury => self
                .strategy_treasury
                .staged()
                .map(|v| ParamValue::Account(v.clone())),
            ParamId::PerformanceTreasury => self
                .performance_treasury
                .staged()
                .map(|v| ParamValue::Account(v.clone())),
            ParamId::ProtocolTreasury => self
                .protocol_treasury
                .staged()
                .map(|v| ParamValue::Account(v.clone())),
            ParamId::ValuationReference => self
                .valuation_reference
                .staged()
                .map(|v| ParamValue::Reference(v.clone())),
        }
    }

    /// Earliest commit time of the pending value, `0` when none.
    pub fn staged_ready_at(&self, id: ParamId) -> Timestamp {
        with_param!(self, id, |p| p.staged_ready_at())
    }

    /// Stages `value` for `id`. The variant must match the parameter.
    pub fn stage(
        &mut self,
        id: ParamId,
        value: ParamValue,
        now: Timestamp,
        delay: u64,
    ) -> Result<Timestamp, GovernanceError> {
        let ready_at = match (id, value) {
            (ParamId::ManagementFee, ParamValue::Rate(v)) => self.management_fee.stage(v, now, delay),
            (ParamId::PerformanceFee, ParamValue::Rate(v)) => {
                self.performance_fee.stage(v, now, delay)
            }
            (ParamId::ProtocolFee, ParamValue::Rate(v)) => self.protocol_fee.stage(v, now, delay),
            (ParamId::FeeChargeThrottle, ParamValue::Seconds(v)) => {
                self.fee_charge_throttle.stage(v, now, delay)
            }
            (ParamId::StrategyTreasury, ParamValue::Account(v)) => {
                self.strategy_treasury.stage(v, now, delay)
            }
            (ParamId::PerformanceTreasury, ParamValue::Account(v)) => {
                self.performance_treasury.stage(v, now, delay)
            }
            (ParamId::ProtocolTreasury, ParamValue::Account(v)) => {
                self.protocol_treasury.stage(v, now, delay)
            }
            (ParamId::ValuationReference, ParamValue::Reference(v)) => {
                self.valuation_reference.stage(v, now, delay)
            }
            (param, _) => return Err(GovernanceError::TypeMismatch { param }),
        };
        Ok(ready_at)
    }

    /// Promotes the pending value of `id`.
    pub fn commit(&mut self, id: ParamId, now: Timestamp) -> Result<(), TimelockError> {
        with_param_mut!(self, id, |p| p.commit(now).map(|_| ()))
    }

    /// Discards the pending value of `id`. Returns whether one existed.
    pub fn rollback(&mut self, id: ParamId) -> bool {
        with_param_mut!(self, id, |p| p.rollback().is_some())
    }
}

// ---------------------------------------------------------------------------
// DepositLimits
// ---------------------------------------------------------------------------

/// Caps on share issuance, in share units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLimits {
    /// Maximum total supply after a deposit.
    pub token_limit: Amount,
    /// Maximum balance of the depositor after a deposit.
    pub token_limit_per_address: Amount,
}

impl Default for DepositLimits {
    fn default() -> Self {
        Self {
            token_limit: Amount::MAX,
            token_limit_per_address: Amount::MAX,
        }
    }
}

impl DepositLimits {
    /// Checks the supply and depositor balance a deposit would produce.
    pub fn check(&self, supply_after: Amount, balance_after: Amount) -> Result<(), VaultError> {
        if supply_after > self.token_limit {
            return Err(VaultError::LimitExceeded {
                limit: "token_limit",
                would_be: supply_after,
                max: self.token_limit,
            });
        }
        if balance_after > self.token_limit_per_address {
            return Err(VaultError::LimitExceeded {
                limit: "token_limit_per_address",
                would_be: balance_after,
                max: self.token_limit_per_address,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VaultGovernance
// ---------------------------------------------------------------------------

/// Parameters, roles and deposit policy of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultGovernance {
    params: FeeParameters,
    access: AccessTable,
    settings: GovernanceConfig,
    limits: DepositLimits,
    private_vault: bool,
    allowlist: BTreeSet<Account>,
}

impl VaultGovernance {
    /// Creates governance with `admin` as the only role holder.
    ///
    /// The initial schedule is held to the same caps as later stages.
    pub fn new(
        admin: &str,
        initial: FeeSchedule,
        settings: GovernanceConfig,
    ) -> Result<Self, GovernanceError> {
        for id in ParamId::ALL {
            validate_value(&settings, id, &initial.value(id))?;
        }
        Ok(Self {
            params: FeeParameters::new(initial),
            access: AccessTable::with_admin(admin),
            settings,
            limits: DepositLimits::default(),
            private_vault: false,
            allowlist: BTreeSet::new(),
        })
    }

    pub fn params(&self) -> &FeeParameters {
        &self.params
    }

    pub fn access(&self) -> &AccessTable {
        &self.access
    }

    pub fn settings(&self) -> &GovernanceConfig {
        &self.settings
    }

    /// Active fee values.
    pub fn schedule(&self) -> FeeSchedule {
        self.params.active()
    }

    pub fn deposit_limits(&self) -> DepositLimits {
        self.limits
    }

    pub fn is_private(&self) -> bool {
        self.private_vault
    }

    /// Whether `account` may deposit under the current policy.
    pub fn may_deposit(&self, account: &str) -> bool {
        !self.private_vault || self.allowlist.contains(account)
    }

    /// Fails unless `caller` may act on `id`.
    pub fn authorize(&self, caller: &str, id: ParamId) -> Result<(), GovernanceError> {
        self.access.require_any(caller, id.authorized_roles())?;
        Ok(())
    }

    /// Stages a new value. Returns the earliest commit time.
    pub fn stage(
        &mut self,
        caller: &str,
        id: ParamId,
        value: ParamValue,
        now: Timestamp,
    ) -> Result<Timestamp, GovernanceError> {
        self.authorize(caller, id)?;
        validate_value(&self.settings, id, &value)?;
        self.params
            .stage(id, value, now, self.settings.governance_delay)
    }

    /// Commits the pending value. Returns the new active value.
    pub fn commit(
        &mut self,
        caller: &str,
        id: ParamId,
        now: Timestamp,
    ) -> Result<ParamValue, GovernanceError> {
        self.authorize(caller, id)?;
        self.params.commit(id, now)?;
        Ok(self.params.active_value(id))
    }

    /// Discards the pending value. Returns whether one existed.
    pub fn rollback(&mut self, caller: &str, id: ParamId) -> Result<bool, GovernanceError> {
        self.authorize(caller, id)?;
        Ok(self.params.rollback(id))
    }

    pub fn grant_role(&mut self, caller: &str, account: &str, role: Role) -> Result<(), GovernanceError> {
        self.access.grant(caller, account, role)?;
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: &str, account: &str, role: Role) -> Result<(), GovernanceError> {
        self.access.revoke(caller, account, role)?;
        Ok(())
    }

    /// Replaces the deposit limits. Admin or strategist.
    pub fn set_deposit_limits(
        &mut self,
        caller: &str,
        limits: DepositLimits,
    ) -> Result<(), GovernanceError> {
        self.access
            .require_any(caller, &[Role::Admin, Role::Strategist])?;
        self.limits = limits;
        Ok(())
    }

    /// Turns the depositor allowlist on or off. Admin only.
    pub fn set_private(&mut self, caller: &str, private_vault: bool) -> Result<(), GovernanceError> {
        self.access.require_any(caller, &[Role::Admin])?;
        self.private_vault = private_vault;
        Ok(())
    }

    /// Adds or removes `account` from the allowlist. Admin only.
    pub fn set_depositor_allowed(
        &mut self,
        caller: &str,
        account: &str,
        allowed: bool,
    ) -> Result<(), GovernanceError> {
        self.access.require_any(caller, &[Role::Admin])?;
        if allowed {
            self.allowlist.insert(account.to_string());
        } else {
            self.allowlist.remove(account);
        }
        Ok(())
    }
}

fn validate_value(
    settings: &GovernanceConfig,
    id: ParamId,
    value: &ParamValue,
) -> Result<(), GovernanceError> {
    match (id, value) {
        (ParamId::ManagementFee, ParamValue::Rate(v)) => cap(id, *v, settings.max_management_fee),
        (ParamId::PerformanceFee, ParamValue::Rate(v)) => {
            cap(id, *v, settings.max_performance_fee)
        }
        (ParamId::ProtocolFee, ParamValue::Rate(v)) => cap(id, *v, settings.max_protocol_fee),
        (ParamId::FeeChargeThrottle, ParamValue::Seconds(_)) => Ok(()),
        (
            ParamId::StrategyTreasury | ParamId::PerformanceTreasury | ParamId::ProtocolTreasury,
            ParamValue::Account(account),
        ) => {
            if account.is_empty() {
                Err(GovernanceError::EmptyTreasury)
            } else {
                Ok(())
            }
        }
        (ParamId::ValuationReference, ParamValue::Reference(_)) => Ok(()),
        (param, _) => Err(GovernanceError::TypeMismatch { param }),
    }
}

fn cap(param: ParamId, value: u128, max: u128) -> Result<(), GovernanceError> {
    if value > max {
        return Err(GovernanceError::FeeTooHigh { param, value, max });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
