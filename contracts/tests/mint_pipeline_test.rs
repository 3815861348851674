//! Integration tests for the tiered mint pipeline.
//!
//! These walk the public contract surface the way a client would: buy F,
//! approve the ledger, then climb the tiers. Rejections are checked by
//! variant, and every rejection is followed by a check that nothing moved.

use tiermint_contracts::{LedgerError, LedgerEvent, MintCosts, TierMintContract};
use tiermint_protocol::types::{Address, CallContext, CallerKind, Tier};

/// Helper: deploys a contract with default costs.
fn deploy() -> TierMintContract {
    TierMintContract::deploy(Address::from_bytes([0xd0; 20]), 0, MintCosts::default()).unwrap()
}

fn alice() -> Address {
    Address::from_bytes([0xa1; 20])
}

fn bob() -> Address {
    Address::from_bytes([0xb0; 20])
}

/// Helper: buys `qty` F for `who` with the exact payment.
fn buy_f(contract: &mut TierMintContract, who: Address, qty: u64) {
    let value = contract.mint_token_f_cost() * qty as u128;
    contract
        .mint_token_f(&CallContext::external(who).with_value(value), qty)
        .unwrap();
}

/// Helper: approves the ledger as operator for `who`.
fn approve_ledger(contract: &mut TierMintContract, who: Address) {
    let ledger = contract.ledger_address();
    contract
        .set_approval_for_all(&CallContext::external(who), ledger, true)
        .unwrap();
}

// ---------------------------------------------------------------------------
// Tier F
// ---------------------------------------------------------------------------

#[test]
fn mint_f_hundred_with_exact_payment() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 100);
    assert_eq!(c.balance_of(&alice(), Tier::F), 100);
    assert_eq!(c.native_balance(), c.mint_token_f_cost() * 100);
}

#[test]
fn mint_f_after_a_full_balance_elsewhere() {
    let mut c = deploy();
    buy_f(&mut c, alice(), u64::MAX);
    buy_f(&mut c, bob(), 1);
    assert_eq!(c.balance_of(&bob(), Tier::F), 1);
    assert_eq!(c.ledger().total_supply(Tier::F), u64::MAX as u128 + 1);
}

#[test]
fn mint_f_with_tenfold_underpayment_fails() {
    let mut c = deploy();
    let value = c.mint_token_f_cost() * 100 / 10;
    let err = c
        .mint_token_f(&CallContext::external(alice()).with_value(value), 100)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientPayment { .. }));
    assert_eq!(err.reason(), "Not enough ether sent");
    assert_eq!(c.balance_of(&alice(), Tier::F), 0);
    assert_eq!(c.native_balance(), 0);
}

#[test]
fn mint_f_never_refunds_excess() {
    let mut c = deploy();
    let price = c.mint_token_f_cost();
    for (qty, extra) in [(1u64, 0u128), (2, 1), (7, price * 4), (0, price)] {
        let before = c.native_balance();
        let balance_before = c.balance_of(&bob(), Tier::F);
        let value = price * qty as u128 + extra;
        c.mint_token_f(&CallContext::external(bob()).with_value(value), qty)
            .unwrap();
        assert_eq!(c.native_balance() - before, value);
        assert_eq!(c.balance_of(&bob(), Tier::F) - balance_before, qty);
    }
}

// ---------------------------------------------------------------------------
// Tier N
// ---------------------------------------------------------------------------

#[test]
fn mint_n_without_approval_fails_even_when_funded() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 100);
    let err = c
        .mint_token_n(&CallContext::external(alice()), 3)
        .unwrap_err();
    assert_eq!(err, LedgerError::OperatorNotApproved);
    assert_eq!(err.reason(), "Not approved for transfer");
    assert_eq!(c.balance_of(&alice(), Tier::F), 100);
}

#[test]
fn approving_someone_else_does_not_count() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 100);
    c.set_approval_for_all(&CallContext::external(alice()), bob(), true)
        .unwrap();
    let err = c
        .mint_token_n(&CallContext::external(alice()), 1)
        .unwrap_err();
    assert_eq!(err, LedgerError::OperatorNotApproved);
}

#[test]
fn mint_n_with_insufficient_f_fails() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 8);
    approve_ledger(&mut c, alice());
    let err = c
        .mint_token_n(&CallContext::external(alice()), 3)
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientTierFBalance {
            required: 9,
            available: 8
        }
    );
    assert_eq!(err.reason(), "Not enough Token F sent");
    assert_eq!(c.balances_of(&alice()), [8, 0, 0]);
}

#[test]
fn mint_n_burns_exact_cost() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 9);
    approve_ledger(&mut c, alice());
    let receipt = c.mint_token_n(&CallContext::external(alice()), 3).unwrap();
    assert_eq!(c.balances_of(&alice()), [0, 3, 0]);
    assert_eq!(receipt.paid, 0);
    assert_eq!(
        receipt.events,
        vec![
            LedgerEvent::Burned {
                from: alice(),
                tier: Tier::F,
                qty: 9
            },
            LedgerEvent::Minted {
                to: alice(),
                tier: Tier::N,
                qty: 3
            },
        ]
    );
}

#[test]
fn revoked_approval_blocks_burns() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 30);
    approve_ledger(&mut c, alice());
    c.mint_token_n(&CallContext::external(alice()), 1).unwrap();

    let ledger = c.ledger_address();
    c.set_approval_for_all(&CallContext::external(alice()), ledger, false)
        .unwrap();
    assert!(!c.is_approved_for_all(&alice(), &ledger));
    let err = c
        .mint_token_n(&CallContext::external(alice()), 1)
        .unwrap_err();
    assert_eq!(err, LedgerError::OperatorNotApproved);
}

// ---------------------------------------------------------------------------
// Tier T
// ---------------------------------------------------------------------------

#[test]
fn mint_t_reports_f_shortfall_first() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 5);
    approve_ledger(&mut c, alice());
    // Short on both F (needs 10) and N (needs 1).
    let err = c
        .mint_token_t(&CallContext::external(alice()), 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientTierFBalance { .. }));
}

#[test]
fn mint_t_reports_n_shortfall_when_f_suffices() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 20);
    approve_ledger(&mut c, alice());
    let err = c
        .mint_token_t(&CallContext::external(alice()), 2)
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientTierNBalance {
            required: 2,
            available: 0
        }
    );
    assert_eq!(err.reason(), "Not enough Token N sent");
    assert_eq!(c.balances_of(&alice()), [20, 0, 0]);
}

#[test]
fn canonical_tier_climb() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 100);
    approve_ledger(&mut c, alice());

    c.mint_token_n(&CallContext::external(alice()), 3).unwrap();
    assert_eq!(c.balance_of(&alice(), Tier::F), 91);
    assert_eq!(c.balance_of(&alice(), Tier::N), 3);

    c.mint_token_t(&CallContext::external(alice()), 3).unwrap();
    assert_eq!(c.balance_of(&alice(), Tier::F), 61);
    assert_eq!(c.balance_of(&alice(), Tier::N), 0);
    assert_eq!(c.balance_of(&alice(), Tier::T), 3);

    assert!(c.ledger().check_conservation());
    assert_eq!(c.ledger().minted(Tier::F), 100);
    assert_eq!(c.ledger().burned(Tier::F), 39);
}

// ---------------------------------------------------------------------------
// Caller guard
// ---------------------------------------------------------------------------

#[test]
fn contract_caller_rejected_regardless_of_state() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 100);
    approve_ledger(&mut c, alice());

    let price = c.mint_token_f_cost();
    let ctx = CallContext::from_contract(alice());
    assert_eq!(
        c.mint_token_f(&ctx.with_value(price * 10), 1).unwrap_err(),
        LedgerError::ContractCallerRejected
    );
    assert_eq!(
        c.mint_token_n(&ctx, 1).unwrap_err(),
        LedgerError::ContractCallerRejected
    );
    assert_eq!(
        c.mint_token_t(&ctx, 1).unwrap_err(),
        LedgerError::ContractCallerRejected
    );
    assert_eq!(
        c.mint_token_f(&ctx, 1).unwrap_err().reason(),
        "Caller cannot be contract"
    );
    assert_eq!(c.balances_of(&alice()), [100, 0, 0]);
}

#[test]
fn unfunded_contract_caller_still_sees_guard_error() {
    let mut c = deploy();
    let ctx = CallContext::from_contract(bob());
    // No payment, no approval, no balance: the guard still fires first.
    assert_eq!(
        c.mint_token_f(&ctx, 5).unwrap_err(),
        LedgerError::ContractCallerRejected
    );
    assert_eq!(
        c.mint_token_t(&ctx, 5).unwrap_err(),
        LedgerError::ContractCallerRejected
    );
}

#[test]
fn constructing_caller_passes_guard() {
    let mut c = deploy();
    let price = c.mint_token_f_cost();
    let ctx = CallContext::external(bob())
        .with_kind(CallerKind::Constructing)
        .with_value(price * 2);
    c.mint_token_f(&ctx, 2).unwrap();
    assert_eq!(c.balance_of(&bob(), Tier::F), 2);
}

// ---------------------------------------------------------------------------
// Approvals and isolation
// ---------------------------------------------------------------------------

#[test]
fn self_approval_rejected() {
    let mut c = deploy();
    let err = c
        .set_approval_for_all(&CallContext::external(alice()), alice(), true)
        .unwrap_err();
    assert_eq!(err, LedgerError::SelfApproval);
}

#[test]
fn approval_event_is_logged() {
    let mut c = deploy();
    let operator = c.ledger_address();
    let event = c
        .set_approval_for_all(&CallContext::external(alice()), operator, true)
        .unwrap();
    assert_eq!(
        event,
        LedgerEvent::ApprovalForAll {
            owner: alice(),
            operator,
            approved: true
        }
    );
    assert_eq!(c.event_count(), 1);
}

#[test]
fn accounts_are_isolated() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 30);
    buy_f(&mut c, bob(), 3);
    approve_ledger(&mut c, alice());
    approve_ledger(&mut c, bob());

    c.mint_token_n(&CallContext::external(bob()), 1).unwrap();
    assert_eq!(c.balances_of(&alice()), [30, 0, 0]);
    assert_eq!(c.balances_of(&bob()), [0, 1, 0]);
    assert_eq!(c.ledger().holders().len(), 2);
}

#[test]
fn rejected_calls_leave_state_root_unchanged() {
    let mut c = deploy();
    buy_f(&mut c, alice(), 12);
    approve_ledger(&mut c, alice());
    let root = c.state_root();
    let events = c.event_count();

    assert!(c.mint_token_t(&CallContext::external(alice()), 1).is_err());
    assert!(c.mint_token_n(&CallContext::external(alice()), 5).is_err());
    assert!(c
        .mint_token_n(&CallContext::external(alice()).with_value(1), 1)
        .is_err());

    assert_eq!(c.state_root(), root);
    assert_eq!(c.event_count(), events);
}

#[test]
fn custom_costs_are_honoured() {
    let costs = MintCosts::new(1_000, 2, 4, 3).unwrap();
    let mut c = TierMintContract::deploy(Address::from_bytes([0x01; 20]), 7, costs).unwrap();
    let ctx = CallContext::external(alice());

    c.mint_token_f(&ctx.with_value(10_000), 10).unwrap();
    approve_ledger(&mut c, alice());
    c.mint_token_n(&ctx, 3).unwrap();
    assert_eq!(c.balances_of(&alice()), [4, 3, 0]);
    c.mint_token_t(&ctx, 1).unwrap();
    assert_eq!(c.balances_of(&alice()), [0, 0, 1]);
}
