// SPDX-License-Identifier: AGPL-3.0-only

#![allow(dead_code)]

use fixed_rate_swap::{
    client,
    error::{decode_swap_error, SwapError},
    instruction,
    runtime::{Runtime, TransactionError, TransactionReceipt},
    state::SwapState,
    token::{
        self,
        error::{decode_ledger_error, LedgerError},
        state::{Allowance, Balance, Ledger},
        DEFAULT_DECIMALS,
    },
};
use solana_program::{
    native_token::LAMPORTS_PER_SOL, program_pack::Pack, pubkey::Pubkey, system_instruction,
};

pub const TOKEN_NAME: &str = "DApp Token";
pub const TOKEN_SYMBOL: &str = "DAPP";
pub const FACILITY_NAME: &str = "Instant Exchange";
pub const RATE: u64 = 100;
pub const INITIAL_SUPPLY: u64 = 1_000_000;

/// Whole tokens to base units
pub fn tokens(amount: u64) -> u64 {
    amount * 10u64.pow(DEFAULT_DECIMALS as u32)
}

pub fn sol(amount: u64) -> u64 {
    amount * LAMPORTS_PER_SOL
}

pub fn swap_error(error: &TransactionError) -> Option<SwapError> {
    error.program_error().and_then(decode_swap_error)
}

pub fn ledger_error(error: &TransactionError) -> Option<LedgerError> {
    error.program_error().and_then(decode_ledger_error)
}

/// Creates a fresh account of `len` bytes owned by `owner`, funded by `payer`
pub fn create_account(runtime: &mut Runtime, payer: &Pubkey, len: usize, owner: &Pubkey) -> Pubkey {
    let account = Pubkey::new_unique();
    let lamports = runtime.rent().minimum_balance(len);

    let create_account_ix =
        system_instruction::create_account(payer, &account, lamports, len as u64, owner);

    runtime
        .process_transaction(&[create_account_ix], &[*payer, account])
        .unwrap();

    account
}

/// Deploys a ledger, minting `supply` to `deployer`. Returns the ledger and
/// the deployer's balance account.
pub fn create_ledger(
    runtime: &mut Runtime,
    deployer: &Pubkey,
    supply: u64,
    name: &str,
    symbol: &str,
) -> (Pubkey, Pubkey) {
    let ledger = Pubkey::new_unique();
    let balance = client::balance_address(&ledger, deployer);

    let instructions = [
        system_instruction::create_account(
            deployer,
            &ledger,
            runtime.rent().minimum_balance(Ledger::LEN),
            Ledger::LEN as u64,
            &token::id(),
        ),
        token::instruction::create_balance(&token::id(), deployer, &ledger, deployer).unwrap(),
        token::instruction::initialize_ledger(
            &token::id(),
            &ledger,
            &balance,
            deployer,
            DEFAULT_DECIMALS,
            supply,
            name,
            symbol,
        )
        .unwrap(),
    ];

    runtime
        .process_transaction(&instructions, &[*deployer, ledger])
        .unwrap();

    (ledger, balance)
}

/// Opens the empty balance account of `owner`, paid for by `payer`
pub fn try_create_balance(
    runtime: &mut Runtime,
    payer: &Pubkey,
    ledger: &Pubkey,
    owner: &Pubkey,
) -> Result<Pubkey, TransactionError> {
    let balance = client::balance_address(ledger, owner);
    let instructions = [
        token::instruction::create_balance(&token::id(), payer, ledger, owner).unwrap(),
        token::instruction::initialize_balance(&token::id(), &balance, ledger, owner).unwrap(),
    ];
    runtime.process_transaction(&instructions, &[*payer])?;
    Ok(balance)
}

pub fn create_balance(runtime: &mut Runtime, payer: &Pubkey, ledger: &Pubkey, owner: &Pubkey) -> Pubkey {
    try_create_balance(runtime, payer, ledger, owner).unwrap()
}

/// Creates the allowance account of (owner, spender); the first approve sets
/// it up
pub fn create_allowance(
    runtime: &mut Runtime,
    payer: &Pubkey,
    ledger: &Pubkey,
    owner: &Pubkey,
    spender: &Pubkey,
) -> Pubkey {
    let ix = token::instruction::create_allowance(&token::id(), payer, ledger, owner, spender).unwrap();
    runtime.process_transaction(&[ix], &[*payer]).unwrap();
    client::allowance_address(ledger, owner, spender)
}

pub fn transfer(
    runtime: &mut Runtime,
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<TransactionReceipt, TransactionError> {
    let ix = token::instruction::transfer(&token::id(), source, destination, owner, amount).unwrap();
    runtime.process_transaction(&[ix], &[*owner])
}

pub fn approve(
    runtime: &mut Runtime,
    ledger: &Pubkey,
    allowance: &Pubkey,
    spender: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<TransactionReceipt, TransactionError> {
    let ix =
        token::instruction::approve(&token::id(), ledger, allowance, spender, owner, amount).unwrap();
    runtime.process_transaction(&[ix], &[*owner])
}

pub fn transfer_from(
    runtime: &mut Runtime,
    source: &Pubkey,
    destination: &Pubkey,
    allowance: &Pubkey,
    spender: &Pubkey,
    amount: u64,
) -> Result<TransactionReceipt, TransactionError> {
    let ix = token::instruction::transfer_from(
        &token::id(),
        source,
        destination,
        allowance,
        spender,
        amount,
    )
    .unwrap();
    runtime.process_transaction(&[ix], &[*spender])
}

pub struct Facility {
    pub swap: Pubkey,
    pub authority: Pubkey,
    pub token_reserve: Pubkey,
}

/// Creates and initializes a facility trading `ledger`, with an empty reserve
pub fn create_facility(
    runtime: &mut Runtime,
    deployer: &Pubkey,
    ledger: &Pubkey,
    rate: u64,
    name: &str,
) -> Facility {
    let swap = create_account(runtime, deployer, SwapState::LEN, &fixed_rate_swap::id());
    let (authority, _) = client::facility_authority(&swap);
    let token_reserve = create_balance(runtime, deployer, ledger, &authority);

    let init_ix = instruction::initialize(
        &fixed_rate_swap::id(),
        &token::id(),
        &swap,
        &authority,
        ledger,
        &token_reserve,
        rate,
        name,
    )
    .unwrap();
    runtime.process_transaction(&[init_ix], &[]).unwrap();

    Facility {
        swap,
        authority,
        token_reserve,
    }
}

pub struct Investor {
    pub key: Pubkey,
    pub balance: Pubkey,
    pub allowance: Pubkey,
}

/// A deployed ledger and facility, with the whole supply in the facility's
/// reserve
pub struct Deployment {
    pub runtime: Runtime,
    pub deployer: Pubkey,
    pub ledger: Pubkey,
    pub deployer_balance: Pubkey,
    pub facility: Facility,
}

impl Deployment {
    pub fn new() -> Self {
        let mut runtime = Runtime::default();
        let deployer = Pubkey::new_unique();
        runtime.airdrop(&deployer, sol(10));

        let (ledger, deployer_balance) = create_ledger(
            &mut runtime,
            &deployer,
            tokens(INITIAL_SUPPLY),
            TOKEN_NAME,
            TOKEN_SYMBOL,
        );
        let facility = create_facility(&mut runtime, &deployer, &ledger, RATE, FACILITY_NAME);

        transfer(
            &mut runtime,
            &deployer_balance,
            &facility.token_reserve,
            &deployer,
            tokens(INITIAL_SUPPLY),
        )
        .unwrap();

        Self {
            runtime,
            deployer,
            ledger,
            deployer_balance,
            facility,
        }
    }

    /// Funds a new investor with `lamports` on top of what its accounts cost
    pub fn investor(&mut self, lamports: u64) -> Investor {
        let key = Pubkey::new_unique();
        let rent = self.runtime.rent();
        let overhead = rent.minimum_balance(Balance::LEN) + rent.minimum_balance(Allowance::LEN);
        self.runtime.airdrop(&key, lamports + overhead);

        let balance = create_balance(&mut self.runtime, &key, &self.ledger, &key);
        let allowance = create_allowance(
            &mut self.runtime,
            &key,
            &self.ledger,
            &key,
            &self.facility.authority,
        );
        Investor {
            key,
            balance,
            allowance,
        }
    }

    pub fn buy(&mut self, investor: &Investor, lamports: u64) -> Result<TransactionReceipt, TransactionError> {
        let ix = instruction::buy_tokens(
            &fixed_rate_swap::id(),
            &token::id(),
            &self.facility.swap,
            &self.facility.authority,
            &self.facility.token_reserve,
            &investor.key,
            &investor.balance,
            lamports,
        )
        .unwrap();
        self.runtime.process_transaction(&[ix], &[investor.key])
    }

    /// Lets the facility pull up to `amount` of the investor's tokens
    pub fn approve(&mut self, investor: &Investor, amount: u64) -> Result<TransactionReceipt, TransactionError> {
        approve(
            &mut self.runtime,
            &self.ledger,
            &investor.allowance,
            &self.facility.authority,
            &investor.key,
            amount,
        )
    }

    pub fn sell(&mut self, investor: &Investor, amount: u64) -> Result<TransactionReceipt, TransactionError> {
        let ix = instruction::sell_tokens(
            &fixed_rate_swap::id(),
            &token::id(),
            &self.facility.swap,
            &self.facility.authority,
            &self.facility.token_reserve,
            &investor.key,
            &investor.balance,
            &investor.allowance,
            amount,
        )
        .unwrap();
        self.runtime.process_transaction(&[ix], &[investor.key])
    }

    pub fn balance_of(&self, owner: &Pubkey) -> u64 {
        client::balance_of(&self.runtime, &self.ledger, owner)
    }

    pub fn token_reserve(&self) -> u64 {
        client::token_reserve(&self.runtime, &self.facility.swap).unwrap()
    }

    pub fn native_reserve(&self) -> u64 {
        client::native_reserve(&self.runtime, &self.facility.swap).unwrap()
    }
}
