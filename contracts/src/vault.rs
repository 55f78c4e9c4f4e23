//! # Root Vault
//!
//! Ties governance, fee accrual, deposits and withdrawals to the external
//! collaborators: a [`Custody`] that moves assets, [`ValuationAdapter`]s that
//! price them and a [`Clock`].
//!
//! ## Serialization and reentrancy
//!
//! All state sits behind a `parking_lot::ReentrantMutex`. Calls from other
//! threads block until the running operation finishes, so two deposits are
//! always totally ordered. A call from the *same* thread (an adapter or
//! custody calling back while an operation is in flight) gets through the
//! mutex but finds the `entered` flag set. Mutating entry points and
//! [`RootVault::preview_fees`] then fail with [`VaultError::Reentrant`];
//! plain accessors answer from the last committed state.
//!
//! ## Atomicity
//!
//! A mutating operation works on a clone of the state. The clone replaces
//! the committed state only after every check and the custody transfer
//! succeeded; on any error it is dropped. Events and metrics are recorded
//! after the swap, so observers never see an operation that did not happen.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use kestrel_protocol::access::Role;
use kestrel_protocol::clock::{Clock, Timestamp};
use kestrel_protocol::config::VaultConfig;
use kestrel_protocol::custody::Custody;
use kestrel_protocol::events::{EventLog, VaultEvent};
use kestrel_protocol::ledger::{Amount, FixedPoint18, ShareLedger};
use kestrel_protocol::metrics::VaultMetrics;
use kestrel_protocol::storage::{StorageError, VaultStore};
use kestrel_protocol::valuation::{Tvl, ValuationAdapter};
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::deposit::plan_deposit;
use crate::error::{check_len, GovernanceError, VaultError};
use crate::fees::{charge_fees, preview_fees, FeeCharge};
use crate::governance::{DepositLimits, FeeSchedule, ParamId, ParamValue, VaultGovernance};
use crate::withdraw::plan_withdraw;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct VaultState {
    ledger: ShareLedger,
    governance: VaultGovernance,
}

struct VaultCell {
    entered: Cell<bool>,
    state: RefCell<VaultState>,
}

/// Clears the `entered` flag when an operation ends, including by panic.
struct EntryGuard<'a>(&'a Cell<bool>);

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Output of a mutating operation: its result plus the events to publish
/// once it is committed.
type Outcome<R> = Result<(R, Vec<VaultEvent>), VaultError>;

// ---------------------------------------------------------------------------
// RootVault
// ---------------------------------------------------------------------------

/// A multi-asset vault with timelocked fee governance.
pub struct RootVault {
    id: Uuid,
    config: VaultConfig,
    cell: ReentrantMutex<VaultCell>,
    adapters: RwLock<HashMap<String, Arc<dyn ValuationAdapter>>>,
    custody: Arc<dyn Custody>,
    clock: Arc<dyn Clock>,
    events: EventLog,
    metrics: VaultMetrics,
}

impl std::fmt::Debug for RootVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootVault")
            .field("id", &self.id)
            .field("tokens", &self.config.tokens)
            .finish_non_exhaustive()
    }
}

impl RootVault {
    /// Creates a vault with `admin` as its only role holder.
    ///
    /// `schedule.valuation_reference` must name `adapter`. The fee clock
    /// starts at the clock's current time.
    pub fn new(
        config: VaultConfig,
        admin: &str,
        schedule: FeeSchedule,
        adapter: Arc<dyn ValuationAdapter>,
        custody: Arc<dyn Custody>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        if schedule.valuation_reference != adapter.reference() {
            return Err(VaultError::UnknownAdapter(schedule.valuation_reference));
        }
        let governance = VaultGovernance::new(admin, schedule, config.governance.clone())?;
        let ledger = ShareLedger::new(clock.now());
        let vault = Self::from_parts(
            Uuid::new_v4(),
            config,
            ledger,
            governance,
            vec![adapter],
            custody,
            clock,
        )?;
        info!(vault = %vault.id, tokens = ?vault.config.tokens, "root vault created");
        Ok(vault)
    }

    fn from_parts(
        id: Uuid,
        config: VaultConfig,
        ledger: ShareLedger,
        governance: VaultGovernance,
        adapters: Vec<Arc<dyn ValuationAdapter>>,
        custody: Arc<dyn Custody>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        let metrics = VaultMetrics::new(id)?;
        metrics.record_supply(ledger.total_supply());
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.reference().to_string(), adapter))
            .collect();
        Ok(Self {
            id,
            config,
            cell: ReentrantMutex::new(VaultCell {
                entered: Cell::new(false),
                state: RefCell::new(VaultState { ledger, governance }),
            }),
            adapters: RwLock::new(adapters),
            custody,
            clock,
            events: EventLog::new(),
            metrics,
        })
    }

    // -- accessors --------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn metrics(&self) -> &VaultMetrics {
        &self.metrics
    }

    /// Snapshot of the committed ledger.
    pub fn ledger(&self) -> ShareLedger {
        self.read(|state| state.ledger.clone())
    }

    /// Snapshot of the committed governance state.
    pub fn governance(&self) -> VaultGovernance {
        self.read(|state| state.governance.clone())
    }

    pub fn total_supply(&self) -> Amount {
        self.read(|state| state.ledger.total_supply())
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.read(|state| state.ledger.balance_of(account))
    }

    pub fn high_water_mark_per_share(&self) -> FixedPoint18 {
        self.read(|state| state.ledger.high_water_mark_per_share())
    }

    pub fn last_fee_charge_at(&self) -> Timestamp {
        self.read(|state| state.ledger.last_fee_charge_at())
    }

    /// Active fee parameters.
    pub fn fee_schedule(&self) -> FeeSchedule {
        self.read(|state| state.governance.schedule())
    }

    fn read<R>(&self, f: impl FnOnce(&VaultState) -> R) -> R {
        let cell = self.cell.lock();
        let state = cell.state.borrow();
        f(&state)
    }

    // -- adapters ---------------------------------------------------------

    /// Makes `adapter` selectable through the valuation reference. Admin only.
    pub fn register_adapter(
        &self,
        caller: &str,
        adapter: Arc<dyn ValuationAdapter>,
    ) -> Result<(), VaultError> {
        self.read(|state| {
            state
                .governance
                .access()
                .require_any(caller, &[Role::Admin])
        })
        .map_err(GovernanceError::from)?;
        let reference = adapter.reference().to_string();
        debug!(vault = %self.id, %reference, "valuation adapter registered");
        self.adapters.write().insert(reference, adapter);
        Ok(())
    }

    fn adapter(&self, reference: &str) -> Result<Arc<dyn ValuationAdapter>, VaultError> {
        self.adapters
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| VaultError::UnknownAdapter(reference.to_string()))
    }

    /// Custody holdings and their valuation, both length-checked.
    fn valuation(
        &self,
        adapter: &dyn ValuationAdapter,
    ) -> Result<(Vec<Amount>, Tvl), VaultError> {
        let expected = self.config.token_count();
        let holdings = self.custody.holdings()?;
        check_len(expected, holdings.len())?;
        let tvl = adapter.tvl(&holdings)?;
        check_len(expected, tvl.lower.len())?;
        check_len(expected, tvl.upper.len())?;
        Ok((holdings, tvl))
    }

    // -- operation plumbing -----------------------------------------------

    /// Marks the vault as busy for the lifetime of the returned guard.
    ///
    /// Every path that hands control to an adapter or custody goes through
    /// here, so a same-thread callback finds the flag set.
    fn enter<'a>(
        &self,
        cell: &'a VaultCell,
        operation: &'static str,
    ) -> Result<EntryGuard<'a>, VaultError> {
        if cell.entered.get() {
            warn!(vault = %self.id, operation, "reentrant call rejected");
            self.metrics.rejected_operations_total.inc();
            return Err(VaultError::Reentrant);
        }
        cell.entered.set(true);
        Ok(EntryGuard(&cell.entered))
    }

    fn mutate<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut VaultState, Timestamp) -> Outcome<R>,
    ) -> Result<R, VaultError> {
        let cell = self.cell.lock();
        let _guard = self.enter(&cell, operation)?;

        let now = self.clock.now();
        let mut working = cell.state.borrow().clone();
        match f(&mut working, now) {
            Ok((output, events)) => {
                let supply = working.ledger.total_supply();
                *cell.state.borrow_mut() = working;
                for event in events {
                    self.events.emit(self.id, now, event);
                }
                self.metrics.record_supply(supply);
                Ok(output)
            }
            Err(error) => {
                warn!(vault = %self.id, operation, kind = error.kind(), %error, "operation rejected");
                self.metrics.rejected_operations_total.inc();
                Err(error)
            }
        }
    }

    fn fees_event(charge: &FeeCharge) -> VaultEvent {
        VaultEvent::FeesCharged {
            management: charge.management(),
            performance: charge.performance_minted,
            new_high_water_mark: charge.high_water_mark,
        }
    }

    // -- governance -------------------------------------------------------

    /// Stages `value` for `param`. Returns the earliest commit time.
    pub fn stage(
        &self,
        caller: &str,
        param: ParamId,
        value: ParamValue,
    ) -> Result<Timestamp, VaultError> {
        self.mutate("stage", |state, now| {
            if let ParamValue::Reference(reference) = &value {
                self.adapter(reference)?;
            }
            let ready_at = state.governance.stage(caller, param, value, now)?;
            info!(vault = %self.id, %param, ready_at, by = caller, "parameter staged");
            let event = VaultEvent::ParameterStaged {
                param: param.to_string(),
                ready_at,
                by: caller.to_string(),
            };
            Ok((ready_at, vec![event]))
        })
    }

    /// Commits the staged value of `param`. Returns the new active value.
    pub fn commit(&self, caller: &str, param: ParamId) -> Result<ParamValue, VaultError> {
        self.mutate("commit", |state, now| {
            let active = state.governance.commit(caller, param, now)?;
            info!(vault = %self.id, %param, value = ?active, by = caller, "parameter committed");
            let event = VaultEvent::ParameterCommitted {
                param: param.to_string(),
                by: caller.to_string(),
            };
            Ok((active, vec![event]))
        })
    }

    /// Discards the staged value of `param`. Returns whether one existed.
    pub fn rollback(&self, caller: &str, param: ParamId) -> Result<bool, VaultError> {
        self.mutate("rollback", |state, _now| {
            let existed = state.governance.rollback(caller, param)?;
            info!(vault = %self.id, %param, existed, by = caller, "parameter rolled back");
            let event = VaultEvent::ParameterRolledBack {
                param: param.to_string(),
                by: caller.to_string(),
            };
            Ok((existed, vec![event]))
        })
    }

    pub fn grant_role(&self, caller: &str, account: &str, role: Role) -> Result<(), VaultError> {
        self.mutate("grant_role", |state, _now| {
            state.governance.grant_role(caller, account, role)?;
            let event = VaultEvent::RoleGranted {
                account: account.to_string(),
                role,
            };
            Ok(((), vec![event]))
        })
    }

    pub fn revoke_role(&self, caller: &str, account: &str, role: Role) -> Result<(), VaultError> {
        self.mutate("revoke_role", |state, _now| {
            state.governance.revoke_role(caller, account, role)?;
            let event = VaultEvent::RoleRevoked {
                account: account.to_string(),
                role,
            };
            Ok(((), vec![event]))
        })
    }

    /// Replaces the deposit limits, effective immediately.
    pub fn set_deposit_limits(&self, caller: &str, limits: DepositLimits) -> Result<(), VaultError> {
        self.mutate("set_deposit_limits", |state, _now| {
            state.governance.set_deposit_limits(caller, limits)?;
            Ok(((), vec![limits_event(&state.governance)]))
        })
    }

    /// Restricts deposits to the allowlist, or lifts the restriction.
    pub fn set_private(&self, caller: &str, private_vault: bool) -> Result<(), VaultError> {
        self.mutate("set_private", |state, _now| {
            state.governance.set_private(caller, private_vault)?;
            Ok(((), vec![limits_event(&state.governance)]))
        })
    }

    pub fn set_depositor_allowed(
        &self,
        caller: &str,
        account: &str,
        allowed: bool,
    ) -> Result<(), VaultError> {
        self.mutate("set_depositor_allowed", |state, _now| {
            state
                .governance
                .set_depositor_allowed(caller, account, allowed)?;
            let event = VaultEvent::DepositorAllowlisted {
                account: account.to_string(),
                allowed,
            };
            Ok(((), vec![event]))
        })
    }

    // -- accounting -------------------------------------------------------

    /// Fees the next deposit or withdrawal would charge right now.
    ///
    /// Runs under the same entry guard as the mutating operations, so an
    /// adapter cannot change the ledger between snapshot and answer.
    pub fn preview_fees(&self) -> Result<FeeCharge, VaultError> {
        let cell = self.cell.lock();
        let _guard = self.enter(&cell, "preview_fees")?;
        let (ledger, schedule) = {
            let state = cell.state.borrow();
            (state.ledger.clone(), state.governance.schedule())
        };
        let adapter = self.adapter(&schedule.valuation_reference)?;
        let (_, tvl) = self.valuation(adapter.as_ref())?;
        preview_fees(
            &ledger,
            &schedule,
            &tvl.lower,
            &self.config.existentials,
            adapter.as_ref(),
            self.clock.now(),
        )
    }

    /// Deposits up to `amounts` from `caller`.
    ///
    /// Returns the shares minted and the amounts actually taken.
    pub fn deposit(
        &self,
        caller: &str,
        amounts: &[Amount],
        min_shares: Amount,
        deadline: Timestamp,
    ) -> Result<(Amount, Vec<Amount>), VaultError> {
        self.mutate("deposit", |state, now| {
            if now > deadline {
                return Err(VaultError::DeadlineExpired { deadline, now });
            }
            check_len(self.config.token_count(), amounts.len())?;
            if !state.governance.may_deposit(caller) {
                return Err(VaultError::DepositorNotAllowed(caller.to_string()));
            }

            let schedule = state.governance.schedule();
            let adapter = self.adapter(&schedule.valuation_reference)?;
            let (_, tvl) = self.valuation(adapter.as_ref())?;
            let existentials = &self.config.existentials;

            let charge = charge_fees(
                &mut state.ledger,
                &schedule,
                &tvl.lower,
                existentials,
                adapter.as_ref(),
                now,
            )?;
            let supply = state.ledger.total_supply();
            let plan = plan_deposit(&tvl.upper, amounts, supply, existentials)?;

            if plan.shares < min_shares {
                return Err(VaultError::SlippageExceeded {
                    what: "shares".to_string(),
                    actual: plan.shares,
                    minimum: min_shares,
                });
            }
            state.governance.deposit_limits().check(
                supply.saturating_add(plan.shares),
                state.ledger.balance_of(caller).saturating_add(plan.shares),
            )?;

            state.ledger.mint(caller, plan.shares)?;
            self.custody.pull(caller, &plan.amounts)?;

            self.metrics.record_fee_shares(charge.total());
            self.metrics.deposits_total.inc();
            info!(
                vault = %self.id,
                depositor = caller,
                shares = plan.shares,
                amounts = ?plan.amounts,
                "deposit committed"
            );
            let events = vec![
                Self::fees_event(&charge),
                VaultEvent::Deposited {
                    depositor: caller.to_string(),
                    shares_issued: plan.shares,
                    amounts_taken: plan.amounts.clone(),
                },
            ];
            Ok(((plan.shares, plan.amounts), events))
        })
    }

    /// Burns `shares` of `caller` and releases the assets to `recipient`.
    pub fn withdraw(
        &self,
        caller: &str,
        shares: Amount,
        min_amounts: &[Amount],
        recipient: &str,
    ) -> Result<Vec<Amount>, VaultError> {
        self.mutate("withdraw", |state, now| {
            check_len(self.config.token_count(), min_amounts.len())?;

            let schedule = state.governance.schedule();
            let adapter = self.adapter(&schedule.valuation_reference)?;
            let (holdings, tvl) = self.valuation(adapter.as_ref())?;

            let charge = charge_fees(
                &mut state.ledger,
                &schedule,
                &tvl.lower,
                &self.config.existentials,
                adapter.as_ref(),
                now,
            )?;
            let supply = state.ledger.total_supply();
            let amounts = plan_withdraw(&tvl.lower, &holdings, shares, supply, min_amounts)?;

            state.ledger.burn(caller, shares)?;
            self.custody.release(recipient, &amounts)?;

            self.metrics.record_fee_shares(charge.total());
            self.metrics.withdrawals_total.inc();
            info!(
                vault = %self.id,
                owner = caller,
                recipient,
                shares,
                amounts = ?amounts,
                "withdrawal committed"
            );
            let events = vec![
                Self::fees_event(&charge),
                VaultEvent::Withdrawn {
                    owner: caller.to_string(),
                    recipient: recipient.to_string(),
                    shares_burned: shares,
                    amounts_released: amounts.clone(),
                },
            ];
            Ok((amounts, events))
        })
    }

    /// Moves shares from `caller` to `to`.
    pub fn transfer_shares(&self, caller: &str, to: &str, amount: Amount) -> Result<(), VaultError> {
        self.mutate("transfer_shares", |state, _now| {
            state.ledger.transfer(caller, to, amount)?;
            debug!(vault = %self.id, from = caller, to, amount, "shares transferred");
            Ok(((), Vec::new()))
        })
    }

    // -- persistence ------------------------------------------------------

    /// Writes config, ledger and governance to `store` in one transaction.
    pub fn persist(&self, store: &VaultStore) -> Result<(), VaultError> {
        let (ledger, governance) =
            self.read(|state| (state.ledger.clone(), state.governance.clone()));
        store.put_vault(self.id, &self.config, &ledger, &governance)?;
        debug!(vault = %self.id, "vault persisted");
        Ok(())
    }

    /// Rebuilds a vault from `store`.
    ///
    /// The active valuation reference must be among `adapters`.
    pub fn restore(
        store: &VaultStore,
        id: Uuid,
        adapters: Vec<Arc<dyn ValuationAdapter>>,
        custody: Arc<dyn Custody>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        let record = store
            .get_vault::<VaultGovernance>(id)?
            .ok_or(StorageError::NotFound(id))?;
        record.config.validate()?;
        record.governance.settings().validate()?;
        let reference = record.governance.schedule().valuation_reference;
        if !adapters.iter().any(|a| a.reference() == reference) {
            return Err(VaultError::UnknownAdapter(reference));
        }
        let vault = Self::from_parts(
            id,
            record.config,
            record.ledger,
            record.governance,
            adapters,
            custody,
            clock,
        )?;
        info!(vault = %id, supply = vault.total_supply(), "root vault restored");
        Ok(vault)
    }
}

fn limits_event(governance: &VaultGovernance) -> VaultEvent {
    let limits = governance.deposit_limits();
    VaultEvent::DepositLimitsUpdated {
        token_limit: limits.token_limit,
        token_limit_per_address: limits.token_limit_per_address,
        private_vault: governance.is_private(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_protocol::clock::ManualClock;
    use kestrel_protocol::custody::InMemoryCustody;
    use kestrel_protocol::valuation::UnitPriceAdapter;

    fn setup() -> (RootVault, Arc<InMemoryCustody>, Arc<ManualClock>) {
        let config = VaultConfig::new(vec!["a".into(), "b".into()], vec![10, 10]);
        let custody = Arc::new(InMemoryCustody::new(2));
        let clock = Arc::new(ManualClock::new(1_000));
        let vault = RootVault::new(
            config,
            "admin",
            FeeSchedule::fee_free("treasury", "usd"),
            Arc::new(UnitPriceAdapter::at_par("usd", 2)),
            custody.clone(),
            clock.clone(),
        )
        .unwrap();
        custody.fund("alice", &[1_000_000, 1_000_000]).unwrap();
        (vault, custody, clock)
    }

    #[test]
    fn first_deposit_mints_max_amount() {
        let (vault, custody, _) = setup();
        let (shares, taken) = vault.deposit("alice", &[1_000, 2_000], 0, u64::MAX).unwrap();
        assert_eq!(shares, 2_000);
        assert_eq!(taken, vec![1_000, 2_000]);
        assert_eq!(custody.holdings().unwrap(), vec![1_000, 2_000]);
        assert_eq!(vault.balance_of("alice"), 2_000);
        assert_eq!(vault.events().len(), 2);
    }

    #[test]
    fn failed_deposit_changes_nothing() {
        let (vault, custody, _) = setup();
        let err = vault
            .deposit("alice", &[1_000, 2_000], 2_001, u64::MAX)
            .unwrap_err();
        assert!(matches!(err, VaultError::SlippageExceeded { .. }));
        assert_eq!(vault.total_supply(), 0);
        assert_eq!(custody.holdings().unwrap(), vec![0, 0]);
        assert!(vault.events().is_empty());
        assert_eq!(vault.metrics().rejected_operations_total.get(), 1);
    }

    #[test]
    fn expired_deadline_rejected() {
        let (vault, _, clock) = setup();
        clock.advance(10);
        assert!(matches!(
            vault.deposit("alice", &[1_000, 1_000], 0, 1_009),
            Err(VaultError::DeadlineExpired {
                deadline: 1_009,
                now: 1_010
            })
        ));
        assert!(vault.deposit("alice", &[1_000, 1_000], 0, 1_010).is_ok());
    }

    #[test]
    fn staging_unknown_adapter_fails() {
        let (vault, _, _) = setup();
        let err = vault
            .stage(
                "admin",
                ParamId::ValuationReference,
                ParamValue::Reference("eth".into()),
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::UnknownAdapter(r) if r == "eth"));

        vault
            .register_adapter("admin", Arc::new(UnitPriceAdapter::at_par("eth", 2)))
            .unwrap();
        assert!(vault
            .stage(
                "admin",
                ParamId::ValuationReference,
                ParamValue::Reference("eth".into()),
            )
            .is_ok());
    }

    #[test]
    fn withdraw_round_trip() {
        let (vault, custody, _) = setup();
        vault.deposit("alice", &[1_000, 1_000], 0, u64::MAX).unwrap();
        let released = vault.withdraw("alice", 500, &[500, 500], "bob").unwrap();
        assert_eq!(released, vec![500, 500]);
        assert_eq!(custody.wallet("bob"), vec![500, 500]);
        assert_eq!(vault.total_supply(), 500);
        assert!(vault.ledger().is_consistent());
    }

    #[test]
    fn withdraw_more_than_balance_is_insufficient() {
        let (vault, _, _) = setup();
        vault.deposit("alice", &[1_000, 1_000], 0, u64::MAX).unwrap();
        assert_unfunded_deposit_rolls_back(&vault, "carol");
        let err = vault.withdraw("alice", 1_001, &[0, 0], "alice").unwrap_err();
        assert!(matches!(err, VaultError::Ledger(_)));
        assert_eq!(vault.balance_of("alice"), 1_000);
    }

    fn assert_unfunded_deposit_rolls_back(vault: &RootVault, who: &str) {
        let before = vault.ledger();
        assert!(matches!(
            vault.deposit(who, &[100, 100], 0, u64::MAX),
            Err(VaultError::Custody(_))
        ));
        assert_eq!(vault.ledger(), before);
    }

    #[test]
    fn private_vault_blocks_strangers() {
        let (vault, _, _) = setup();
        vault.set_private("admin", true).unwrap();
        assert!(matches!(
            vault.deposit("alice", &[1_000, 1_000], 0, u64::MAX),
            Err(VaultError::DepositorNotAllowed(_))
        ));
        vault.set_depositor_allowed("admin", "alice", true).unwrap();
        assert!(vault.deposit("alice", &[1_000, 1_000], 0, u64::MAX).is_ok());
    }

    #[test]
    fn transfer_preserves_supply() {
        let (vault, _, _) = setup();
        vault.deposit("alice", &[1_000, 1_000], 0, u64::MAX).unwrap();
        vault.transfer_shares("alice", "bob", 400).unwrap();
        assert_eq!(vault.balance_of("bob"), 400);
        assert_eq!(vault.total_supply(), 1_000);
    }
}
