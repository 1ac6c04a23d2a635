// SPDX-License-Identifier: AGPL-3.0-only

//! Execution context handed to every processor.

use {
    crate::event::{EmittedEvent, Event},
    solana_program::{
        account_info::AccountInfo, entrypoint::ProgramResult, instruction::Instruction, msg,
        program_error::ProgramError, pubkey::Pubkey, rent::Rent,
    },
};

/// Account state captured when a program frame starts
#[derive(Clone, Debug)]
struct PreAccount {
    key: Pubkey,
    owner: Pubkey,
    is_writable: bool,
    lamports: u64,
    data: Vec<u8>,
}

impl PreAccount {
    fn capture(account_info: &AccountInfo) -> Result<Self, ProgramError> {
        Ok(Self {
            key: *account_info.key,
            owner: *account_info.owner,
            is_writable: account_info.is_writable,
            lamports: account_info.try_lamports()?,
            data: account_info.try_borrow_data()?.to_vec(),
        })
    }

    /// Checks the changes made by `program_id` since capture
    fn verify(&self, program_id: &Pubkey, account_info: &AccountInfo) -> ProgramResult {
        let lamports = account_info.try_lamports()?;
        let data_changed = **account_info.try_borrow_data()? != self.data[..];

        if !self.is_writable && (lamports != self.lamports || data_changed) {
            msg!("Read-only account {} was modified", self.key);
            return Err(ProgramError::InvalidArgument);
        }
        if self.owner != *program_id {
            if data_changed {
                msg!("Program {} modified data of {} it does not own", program_id, self.key);
                return Err(ProgramError::IllegalOwner);
            }
            if lamports < self.lamports {
                msg!("Program {} debited {} it does not own", program_id, self.key);
                return Err(ProgramError::IllegalOwner);
            }
        }
        Ok(())
    }
}

struct Frame {
    program_id: Pubkey,
    pre_accounts: Vec<PreAccount>,
}

impl Frame {
    fn new(program_id: &Pubkey, accounts: &[AccountInfo]) -> Result<Self, ProgramError> {
        let mut pre_accounts: Vec<PreAccount> = Vec::with_capacity(accounts.len());
        for account_info in accounts {
            match pre_accounts.iter_mut().find(|pre| pre.key == *account_info.key) {
                Some(pre) => pre.is_writable |= account_info.is_writable,
                None => pre_accounts.push(PreAccount::capture(account_info)?),
            }
        }
        Ok(Self {
            program_id: *program_id,
            pre_accounts,
        })
    }

    fn verify(&self, accounts: &[AccountInfo]) -> ProgramResult {
        for pre in &self.pre_accounts {
            if let Some(account_info) = accounts.iter().find(|a| *a.key == pre.key) {
                pre.verify(&self.program_id, account_info)?;
            }
        }
        Ok(())
    }

    /// Accepts changes made by a callee as the new baseline
    fn refresh(&mut self, accounts: &[AccountInfo]) -> ProgramResult {
        for pre in self.pre_accounts.iter_mut() {
            if let Some(account_info) = accounts.iter().find(|a| *a.key == pre.key) {
                pre.lamports = account_info.try_lamports()?;
                pre.data = account_info.try_borrow_data()?.to_vec();
            }
        }
        Ok(())
    }

    fn lamports(&self) -> u128 {
        self.pre_accounts.iter().map(|pre| pre.lamports as u128).sum()
    }
}

/// Account allocation requested by `CreateAccount`, applied once the
/// top-level instruction succeeds
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Allocation {
    pub key: Pubkey,
    pub space: Option<usize>,
    pub owner: Option<Pubkey>,
}

/// Explicit execution context for one transaction.
///
/// Tracks the program call stack, supplies rent parameters, collects emitted
/// events and performs cross-program invocations on behalf of processors.
pub struct InvokeContext {
    rent: Rent,
    frames: Vec<Frame>,
    events: Vec<EmittedEvent>,
    allocations: Vec<Allocation>,
}

impl InvokeContext {
    /// Maximum cross-program invocation depth, top-level instruction included
    pub const MAX_INVOKE_DEPTH: usize = 5;

    /// Creates a context for a new transaction
    pub fn new(rent: Rent) -> Self {
        Self {
            rent,
            frames: vec![],
            events: vec![],
            allocations: vec![],
        }
    }

    /// Rent parameters of the host runtime
    pub fn rent(&self) -> &Rent {
        &self.rent
    }

    /// Program currently executing, if any
    pub fn current_program_id(&self) -> Option<&Pubkey> {
        self.frames.last().map(|frame| &frame.program_id)
    }

    /// Records an event on behalf of the executing program
    pub fn emit(&mut self, event: Event) {
        if let Some(program_id) = self.current_program_id().copied() {
            self.events.push(EmittedEvent { program_id, event });
        }
    }

    /// Hands over the events of the committed transaction
    pub fn take_events(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn allocate(&mut self, key: &Pubkey, space: Option<usize>, owner: Option<Pubkey>) {
        self.allocations.push(Allocation {
            key: *key,
            space,
            owner,
        });
    }

    /// Whether `key` already has data space pending
    pub(crate) fn is_allocating(&self, key: &Pubkey) -> bool {
        self.allocations
            .iter()
            .any(|allocation| allocation.key == *key && allocation.space.is_some())
    }

    /// Whether `key` already has a new owner pending
    pub(crate) fn is_assigning(&self, key: &Pubkey) -> bool {
        self.allocations
            .iter()
            .any(|allocation| allocation.key == *key && allocation.owner.is_some())
    }

    pub(crate) fn take_allocations(&mut self) -> Vec<Allocation> {
        std::mem::take(&mut self.allocations)
    }

    /// Runs `program_id` against `accounts` and checks the account rules on
    /// the way out. Events and allocations of a failing program are dropped.
    pub fn process_instruction(
        &mut self,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        input: &[u8],
    ) -> ProgramResult {
        if self.frames.len() >= Self::MAX_INVOKE_DEPTH {
            msg!("Invoke depth exceeded calling {}", program_id);
            return Err(ProgramError::InvalidArgument);
        }

        let frame = Frame::new(program_id, accounts)?;
        let is_top_level = self.frames.is_empty();
        let pre_lamports = frame.lamports();
        let events_len = self.events.len();
        let allocations_len = self.allocations.len();

        self.frames.push(frame);
        let result = super::dispatch(self, program_id, accounts, input);
        let frame = self.frames.pop();

        let result = result.and_then(|()| match frame {
            Some(frame) => {
                frame.verify(accounts)?;
                if is_top_level {
                    let mut post = frame;
                    post.refresh(accounts)?;
                    if post.lamports() != pre_lamports {
                        msg!("Instruction changed the total lamports of its accounts");
                        return Err(ProgramError::InvalidArgument);
                    }
                }
                Ok(())
            }
            None => Err(ProgramError::InvalidArgument),
        });

        if result.is_err() {
            self.events.truncate(events_len);
            self.allocations.truncate(allocations_len);
        }
        result
    }

    /// Invokes another program with the caller's privileges
    pub fn invoke(&mut self, instruction: &Instruction, account_infos: &[AccountInfo]) -> ProgramResult {
        self.invoke_signed(instruction, account_infos, &[])
    }

    /// Invokes another program, adding signatures for the caller's
    /// program-derived addresses described by `signers_seeds`
    pub fn invoke_signed(
        &mut self,
        instruction: &Instruction,
        account_infos: &[AccountInfo],
        signers_seeds: &[&[&[u8]]],
    ) -> ProgramResult {
        let caller = self
            .current_program_id()
            .copied()
            .ok_or(ProgramError::InvalidArgument)?;

        // mimic check for the callee program in accounts
        if !account_infos
            .iter()
            .any(|account_info| *account_info.key == instruction.program_id)
        {
            return Err(ProgramError::InvalidAccountData);
        }

        let signers = signers_seeds
            .iter()
            .map(|seeds| Pubkey::create_program_address(seeds, &caller))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ProgramError::InvalidSeeds)?;

        let mut callee_infos = Vec::with_capacity(instruction.accounts.len());
        for meta in instruction.accounts.iter() {
            let account_info = account_infos
                .iter()
                .find(|account_info| *account_info.key == meta.pubkey)
                .ok_or(ProgramError::NotEnoughAccountKeys)?;
            let has_signature = account_info.is_signer || signers.contains(account_info.key);
            if meta.is_signer && !has_signature {
                msg!("{}'s signer privilege escalated", meta.pubkey);
                return Err(ProgramError::MissingRequiredSignature);
            }
            if meta.is_writable && !account_info.is_writable {
                msg!("{}'s writable privilege escalated", meta.pubkey);
                return Err(ProgramError::InvalidArgument);
            }
            let mut callee_info = account_info.clone();
            callee_info.is_signer = meta.is_signer;
            callee_info.is_writable = meta.is_writable;
            callee_infos.push(callee_info);
        }

        if let Some(frame) = self.frames.last() {
            frame.verify(&callee_infos)?;
        }

        self.process_instruction(&instruction.program_id, &callee_infos, &instruction.data)?;

        match self.frames.last_mut() {
            Some(frame) => frame.refresh(&callee_infos),
            None => Ok(()),
        }
    }
}
