// SPDX-License-Identifier: AGPL-3.0-only

//! Native host runtime.
//!
//! Holds the account store and executes transactions against it: every
//! instruction of a transaction runs against a working copy of the store,
//! which is committed only if all of them succeed.

mod invoke_context;
mod native_account_data;
pub mod system;

pub use {invoke_context::InvokeContext, native_account_data::NativeAccountData};

use {
    crate::{
        error::SwapError,
        event::{EmittedEvent, Event},
        processor::Processor as SwapProcessor,
        token::{self, error::LedgerError, processor::Processor as LedgerProcessor},
    },
    solana_program::{
        account_info::AccountInfo,
        entrypoint::ProgramResult,
        instruction::Instruction,
        program_error::{PrintProgramError, ProgramError},
        pubkey::Pubkey,
        rent::Rent,
        system_program,
    },
    std::collections::BTreeMap,
    thiserror::Error,
};

/// Reasons a transaction was rejected
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// An account marked as signer was not signed for
    #[error("missing signature for account {0}")]
    MissingSignature(Pubkey),
    /// An instruction failed; nothing was committed
    #[error("instruction {index} failed: {error}")]
    InstructionError {
        /// Position of the failing instruction in the transaction
        index: usize,
        /// Error returned by the program or by the runtime checks
        error: ProgramError,
    },
}

impl TransactionError {
    /// The program error behind a failed instruction
    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            TransactionError::InstructionError { error, .. } => Some(error),
            TransactionError::MissingSignature(_) => None,
        }
    }
}

/// Outcome of a committed transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Events in emission order, across all invoked programs
    pub events: Vec<EmittedEvent>,
}

impl TransactionReceipt {
    /// Events emitted by `program_id`
    pub fn events_from<'a>(&'a self, program_id: &Pubkey) -> impl Iterator<Item = &'a Event> + 'a {
        let program_id = *program_id;
        self.events
            .iter()
            .filter(move |emitted| emitted.program_id == program_id)
            .map(|emitted| &emitted.event)
    }
}

/// Routes an instruction to the program that handles it
pub(crate) fn dispatch(
    ctx: &mut InvokeContext,
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    input: &[u8],
) -> ProgramResult {
    if *program_id == crate::id() {
        SwapProcessor::process(ctx, program_id, accounts, input).map_err(|error| {
            error.print::<SwapError>();
            error
        })
    } else if *program_id == token::id() {
        LedgerProcessor::process(ctx, program_id, accounts, input).map_err(|error| {
            error.print::<LedgerError>();
            error
        })
    } else if *program_id == system_program::id() {
        system::process(ctx, accounts, input)
    } else {
        Err(ProgramError::IncorrectProgramId)
    }
}

/// In-process stand-in for the host ledger runtime
#[derive(Clone, Debug)]
pub struct Runtime {
    accounts: BTreeMap<Pubkey, NativeAccountData>,
    rent: Rent,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Rent::default())
    }
}

impl Runtime {
    /// Creates a runtime with the builtin programs deployed
    pub fn new(rent: Rent) -> Self {
        let accounts = [system_program::id(), token::id(), crate::id()]
            .into_iter()
            .map(|key| (key, NativeAccountData::new_program(key)))
            .collect();
        Self { accounts, rent }
    }

    /// Rent parameters
    pub fn rent(&self) -> &Rent {
        &self.rent
    }

    /// Looks up a committed account
    pub fn get_account(&self, key: &Pubkey) -> Option<&NativeAccountData> {
        self.accounts.get(key)
    }

    /// Native balance of `key`, zero for unknown accounts
    pub fn lamports(&self, key: &Pubkey) -> u64 {
        self.accounts.get(key).map_or(0, |account| account.lamports)
    }

    /// Total native units held across all accounts
    pub fn capitalization(&self) -> u128 {
        self.accounts
            .values()
            .map(|account| account.lamports as u128)
            .sum()
    }

    /// Accounts owned by `program_id`
    pub fn program_accounts<'a>(
        &'a self,
        program_id: &Pubkey,
    ) -> impl Iterator<Item = &'a NativeAccountData> + 'a {
        let program_id = *program_id;
        self.accounts
            .values()
            .filter(move |account| account.owner == program_id)
    }

    /// Credits native units out of thin air, creating a system account if needed
    pub fn airdrop(&mut self, to: &Pubkey, lamports: u64) {
        let account = self
            .accounts
            .entry(*to)
            .or_insert_with(|| NativeAccountData::new_system_account(*to, 0));
        account.lamports = account.lamports.saturating_add(lamports);
    }

    /// Executes `instructions` atomically. `signers` are the accounts whose
    /// signatures accompany the transaction.
    pub fn process_transaction(
        &mut self,
        instructions: &[Instruction],
        signers: &[Pubkey],
    ) -> Result<TransactionReceipt, TransactionError> {
        for meta in instructions.iter().flat_map(|ix| ix.accounts.iter()) {
            if meta.is_signer && !signers.contains(&meta.pubkey) {
                return Err(TransactionError::MissingSignature(meta.pubkey));
            }
        }

        let mut working = self.accounts.clone();
        let mut ctx = InvokeContext::new(self.rent.clone());

        for (index, instruction) in instructions.iter().enumerate() {
            Self::execute(&mut working, &mut ctx, instruction)
                .map_err(|error| TransactionError::InstructionError { index, error })?;
        }

        // zero-lamport accounts do not survive the transaction
        working.retain(|_, account| account.lamports > 0 || account.executable);
        self.accounts = working;

        Ok(TransactionReceipt {
            events: ctx.take_events(),
        })
    }

    fn execute(
        accounts: &mut BTreeMap<Pubkey, NativeAccountData>,
        ctx: &mut InvokeContext,
        instruction: &Instruction,
    ) -> ProgramResult {
        // approximate the logic in the actual runtime: each key is loaded
        // once and every reference to it shares the same account info
        let mut keys: Vec<Pubkey> = Vec::with_capacity(instruction.accounts.len());
        let mut positions = Vec::with_capacity(instruction.accounts.len());
        for meta in instruction.accounts.iter() {
            match keys.iter().position(|key| *key == meta.pubkey) {
                Some(position) => positions.push(position),
                None => {
                    positions.push(keys.len());
                    keys.push(meta.pubkey);
                }
            }
        }

        let mut account_data = keys
            .iter()
            .map(|key| {
                let mut account = accounts
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| NativeAccountData::new_system_account(*key, 0));
                let metas = instruction.accounts.iter().filter(|meta| meta.pubkey == *key);
                account.is_signer = metas.clone().any(|meta| meta.is_signer);
                account.is_writable = metas.clone().any(|meta| meta.is_writable);
                account
            })
            .collect::<Vec<_>>();

        {
            let unique_infos = account_data
                .iter_mut()
                .map(NativeAccountData::as_account_info)
                .collect::<Vec<_>>();
            let account_infos = positions
                .iter()
                .map(|position| unique_infos[*position].clone())
                .collect::<Vec<_>>();
            ctx.process_instruction(&instruction.program_id, &account_infos, &instruction.data)?;
        }

        // account data cannot grow while programs hold it, so new accounts
        // take their shape only now
        for allocation in ctx.take_allocations() {
            if let Some(account) = account_data
                .iter_mut()
                .find(|account| account.key == allocation.key)
            {
                if let Some(space) = allocation.space {
                    account.data = vec![0; space];
                }
                if let Some(owner) = allocation.owner {
                    account.owner = owner;
                }
            }
        }

        for mut account in account_data {
            account.is_signer = false;
            account.is_writable = false;
            accounts.insert(account.key, account);
        }
        Ok(())
    }
}
