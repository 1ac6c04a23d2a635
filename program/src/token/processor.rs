// SPDX-License-Identifier: AGPL-3.0-only

//! Program state processor

use {
    crate::{
        event::Event,
        runtime::InvokeContext,
        token::{
            error::LedgerError,
            instruction::LedgerInstruction,
            state::{Allowance, Balance, Ledger, NAME_LEN, SYMBOL_LEN},
            MAX_DECIMALS,
        },
    },
    solana_program::{
        account_info::{next_account_info, AccountInfo},
        entrypoint::ProgramResult,
        msg,
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack},
        pubkey::Pubkey,
        system_instruction, system_program,
    },
};

/// Program state handler.
pub struct Processor {}
impl Processor {
    /// Processes an [InitializeLedger](enum.LedgerInstruction.html) instruction.
    pub fn process_initialize_ledger(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        decimals: u8,
        supply: u64,
        name: [u8; NAME_LEN],
        symbol: [u8; SYMBOL_LEN],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let ledger_info = next_account_info(account_info_iter)?;
        let balance_info = next_account_info(account_info_iter)?;
        let owner_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, ledger_info)?;
        Self::check_account_owner(program_id, balance_info)?;
        Self::check_balance_address(program_id, balance_info, ledger_info.key, owner_info.key)?;
        if decimals > MAX_DECIMALS {
            return Err(LedgerError::InvalidDecimals.into());
        }

        let ledger = Ledger::unpack_unchecked(&ledger_info.data.borrow())?;
        if ledger.is_initialized {
            return Err(LedgerError::AlreadyInUse.into());
        }
        let balance = Balance::unpack_unchecked(&balance_info.data.borrow())?;
        if balance.is_initialized {
            return Err(LedgerError::AlreadyInUse.into());
        }

        let ledger = Ledger {
            is_initialized: true,
            decimals,
            supply,
            name,
            symbol,
        };
        ledger.name()?;
        ledger.symbol()?;

        Ledger::pack(ledger, &mut ledger_info.data.borrow_mut())?;
        Balance::pack(
            Balance {
                is_initialized: true,
                ledger: *ledger_info.key,
                owner: *owner_info.key,
                amount: supply,
            },
            &mut balance_info.data.borrow_mut(),
        )?;

        ctx.emit(Event::Transfer {
            ledger: *ledger_info.key,
            from: None,
            to: *owner_info.key,
            amount: supply,
        });

        Ok(())
    }

    /// Processes an [InitializeBalance](enum.LedgerInstruction.html) instruction.
    pub fn process_initialize_balance(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let balance_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, balance_info)?;
        Self::check_account_owner(program_id, ledger_info)?;
        Self::check_balance_address(program_id, balance_info, ledger_info.key, owner)?;

        let balance = Balance::unpack_unchecked(&balance_info.data.borrow())?;
        if balance.is_initialized {
            return Err(LedgerError::AlreadyInUse.into());
        }
        Self::unpack_ledger(ledger_info)?;

        Balance::pack(
            Balance {
                is_initialized: true,
                ledger: *ledger_info.key,
                owner: *owner,
                amount: 0,
            },
            &mut balance_info.data.borrow_mut(),
        )?;

        Ok(())
    }

    /// Processes a [Transfer](enum.LedgerInstruction.html) instruction.
    pub fn process_transfer(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let source_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, source_info)?;
        Self::check_account_owner(program_id, destination_info)?;

        let mut source = Self::unpack_balance(source_info)?;
        let mut destination = Self::unpack_balance(destination_info)?;

        if source.ledger != destination.ledger {
            return Err(LedgerError::LedgerMismatch.into());
        }
        if source.amount < amount {
            return Err(LedgerError::InsufficientBalance.into());
        }
        Self::validate_owner(&source.owner, authority_info)?;

        let event = Event::Transfer {
            ledger: source.ledger,
            from: Some(source.owner),
            to: destination.owner,
            amount,
        };

        // This check MUST occur just before the amounts are manipulated
        // to ensure self-transfers are fully validated
        if source_info.key == destination_info.key {
            ctx.emit(event);
            return Ok(());
        }

        source.amount = source
            .amount
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        destination.amount = destination
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        Balance::pack(source, &mut source_info.data.borrow_mut())?;
        Balance::pack(destination, &mut destination_info.data.borrow_mut())?;

        ctx.emit(event);
        Ok(())
    }

    /// Processes an [Approve](enum.LedgerInstruction.html) instruction.
    pub fn process_approve(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        spender: &Pubkey,
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let ledger_info = next_account_info(account_info_iter)?;
        let allowance_info = next_account_info(account_info_iter)?;
        let owner_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, ledger_info)?;
        Self::check_account_owner(program_id, allowance_info)?;
        Self::unpack_ledger(ledger_info)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        let (allowance_address, _) =
            Allowance::derive_address(program_id, ledger_info.key, owner_info.key, spender);
        if *allowance_info.key != allowance_address {
            return Err(LedgerError::InvalidAddress.into());
        }

        let mut allowance = Allowance::unpack_unchecked(&allowance_info.data.borrow())?;
        if allowance.is_initialized() {
            if allowance.ledger != *ledger_info.key {
                return Err(LedgerError::LedgerMismatch.into());
            }
            if allowance.owner != *owner_info.key {
                return Err(LedgerError::OwnerMismatch.into());
            }
            if allowance.spender != *spender {
                return Err(LedgerError::SpenderMismatch.into());
            }
        } else {
            allowance.is_initialized = true;
            allowance.ledger = *ledger_info.key;
            allowance.owner = *owner_info.key;
            allowance.spender = *spender;
        }
        allowance.amount = amount;

        Allowance::pack(allowance, &mut allowance_info.data.borrow_mut())?;

        ctx.emit(Event::Approval {
            ledger: allowance.ledger,
            owner: allowance.owner,
            spender: allowance.spender,
            amount,
        });

        Ok(())
    }

    /// Processes a [TransferFrom](enum.LedgerInstruction.html) instruction.
    pub fn process_transfer_from(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let source_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;
        let allowance_info = next_account_info(account_info_iter)?;
        let spender_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, source_info)?;
        Self::check_account_owner(program_id, destination_info)?;
        Self::check_account_owner(program_id, allowance_info)?;

        let mut source = Self::unpack_balance(source_info)?;
        let mut destination = Self::unpack_balance(destination_info)?;
        let mut allowance = Allowance::unpack_unchecked(&allowance_info.data.borrow())?;
        if !allowance.is_initialized() {
            return Err(LedgerError::UninitializedState.into());
        }

        if source.ledger != destination.ledger || allowance.ledger != source.ledger {
            return Err(LedgerError::LedgerMismatch.into());
        }
        if allowance.owner != source.owner {
            return Err(LedgerError::OwnerMismatch.into());
        }
        if allowance.spender != *spender_info.key {
            return Err(LedgerError::SpenderMismatch.into());
        }
        let (allowance_address, _) =
            Allowance::derive_address(program_id, &source.ledger, &source.owner, spender_info.key);
        if *allowance_info.key != allowance_address {
            return Err(LedgerError::InvalidAddress.into());
        }
        if !spender_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        if allowance.amount < amount {
            return Err(LedgerError::InsufficientAllowance.into());
        }
        if source.amount < amount {
            return Err(LedgerError::InsufficientBalance.into());
        }

        allowance.amount = allowance
            .amount
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        Allowance::pack(allowance, &mut allowance_info.data.borrow_mut())?;

        let event = Event::Transfer {
            ledger: source.ledger,
            from: Some(source.owner),
            to: destination.owner,
            amount,
        };

        if source_info.key != destination_info.key {
            source.amount = source
                .amount
                .checked_sub(amount)
                .ok_or(LedgerError::Overflow)?;
            destination.amount = destination
                .amount
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;

            Balance::pack(source, &mut source_info.data.borrow_mut())?;
            Balance::pack(destination, &mut destination_info.data.borrow_mut())?;
        }

        ctx.emit(event);
        Ok(())
    }

    /// Processes a [CreateBalance](enum.LedgerInstruction.html) instruction.
    pub fn process_create_balance(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let balance_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        // the ledger may still be uninitialized: its supply lands here
        Self::check_account_owner(program_id, ledger_info)?;
        let bump_seed = Self::check_balance_address(program_id, balance_info, ledger_info.key, owner)?;

        let ledger_bytes = ledger_info.key.to_bytes();
        let owner_bytes = owner.to_bytes();
        Self::create_derived_account(
            ctx,
            program_id,
            payer_info,
            balance_info,
            system_program_info,
            &[Balance::BALANCE_SEED, &ledger_bytes, &owner_bytes, &[bump_seed]],
            Balance::LEN,
        )
    }

    /// Processes a [CreateAllowance](enum.LedgerInstruction.html) instruction.
    pub fn process_create_allowance(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: &Pubkey,
        spender: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let allowance_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        Self::check_account_owner(program_id, ledger_info)?;
        Self::unpack_ledger(ledger_info)?;
        let (allowance_address, bump_seed) =
            Allowance::derive_address(program_id, ledger_info.key, owner, spender);
        if *allowance_info.key != allowance_address {
            return Err(LedgerError::InvalidAddress.into());
        }

        let ledger_bytes = ledger_info.key.to_bytes();
        let owner_bytes = owner.to_bytes();
        let spender_bytes = spender.to_bytes();
        Self::create_derived_account(
            ctx,
            program_id,
            payer_info,
            allowance_info,
            system_program_info,
            &[
                Allowance::ALLOWANCE_SEED,
                &ledger_bytes,
                &owner_bytes,
                &spender_bytes,
                &[bump_seed],
            ],
            Allowance::LEN,
        )
    }

    /// Processes an [Instruction](enum.Instruction.html).
    pub fn process(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        input: &[u8],
    ) -> ProgramResult {
        let instruction = LedgerInstruction::unpack(input)?;

        match instruction {
            LedgerInstruction::InitializeLedger {
                decimals,
                supply,
                name,
                symbol,
            } => {
                msg!("Instruction: InitializeLedger");
                Self::process_initialize_ledger(
                    ctx, program_id, accounts, decimals, supply, name, symbol,
                )
            }
            LedgerInstruction::InitializeBalance { owner } => {
                msg!("Instruction: InitializeBalance");
                Self::process_initialize_balance(program_id, accounts, &owner)
            }
            LedgerInstruction::Transfer { amount } => {
                msg!("Instruction: Transfer");
                Self::process_transfer(ctx, program_id, accounts, amount)
            }
            LedgerInstruction::Approve { spender, amount } => {
                msg!("Instruction: Approve");
                Self::process_approve(ctx, program_id, accounts, &spender, amount)
            }
            LedgerInstruction::TransferFrom { amount } => {
                msg!("Instruction: TransferFrom");
                Self::process_transfer_from(ctx, program_id, accounts, amount)
            }
            LedgerInstruction::CreateBalance { owner } => {
                msg!("Instruction: CreateBalance");
                Self::process_create_balance(ctx, program_id, accounts, &owner)
            }
            LedgerInstruction::CreateAllowance { owner, spender } => {
                msg!("Instruction: CreateAllowance");
                Self::process_create_allowance(ctx, program_id, accounts, &owner, &spender)
            }
        }
    }

    /// Checks that the account is owned by the ledger program
    pub fn check_account_owner(program_id: &Pubkey, account_info: &AccountInfo) -> ProgramResult {
        if program_id != account_info.owner {
            Err(ProgramError::IncorrectProgramId)
        } else {
            Ok(())
        }
    }

    /// Validates owner signed the instruction
    pub fn validate_owner(expected_owner: &Pubkey, owner_account_info: &AccountInfo) -> ProgramResult {
        if expected_owner != owner_account_info.key {
            return Err(LedgerError::OwnerMismatch.into());
        }
        if !owner_account_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        Ok(())
    }

    /// Checks that `balance_info` sits at the derived balance address of
    /// `owner` on `ledger`, returning its bump seed
    fn check_balance_address(
        program_id: &Pubkey,
        balance_info: &AccountInfo,
        ledger: &Pubkey,
        owner: &Pubkey,
    ) -> Result<u8, ProgramError> {
        let (balance_address, bump_seed) = Balance::derive_address(program_id, ledger, owner);
        if *balance_info.key != balance_address {
            msg!("Balance {} is not the derived address {}", balance_info.key, balance_address);
            return Err(LedgerError::InvalidAddress.into());
        }
        Ok(bump_seed)
    }

    /// Funds and allocates a program-derived account through the system
    /// program, signing with `seeds`. An address that was funded ahead of
    /// creation is topped up, allocated and assigned instead.
    fn create_derived_account<'a>(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        payer_info: &AccountInfo<'a>,
        account_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        seeds: &[&[u8]],
        len: usize,
    ) -> ProgramResult {
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let required_lamports = ctx.rent().minimum_balance(len);
        let current_lamports = account_info.lamports();

        if current_lamports == 0 {
            let ix = system_instruction::create_account(
                payer_info.key,
                account_info.key,
                required_lamports,
                len as u64,
                program_id,
            );
            return ctx.invoke_signed(
                &ix,
                &[
                    payer_info.clone(),
                    account_info.clone(),
                    system_program_info.clone(),
                ],
                &[seeds],
            );
        }

        let top_up = required_lamports.saturating_sub(current_lamports);
        if top_up > 0 {
            ctx.invoke(
                &system_instruction::transfer(payer_info.key, account_info.key, top_up),
                &[
                    payer_info.clone(),
                    account_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        ctx.invoke_signed(
            &system_instruction::allocate(account_info.key, len as u64),
            &[account_info.clone(), system_program_info.clone()],
            &[seeds],
        )?;
        ctx.invoke_signed(
            &system_instruction::assign(account_info.key, program_id),
            &[account_info.clone(), system_program_info.clone()],
            &[seeds],
        )
    }

    fn unpack_balance(balance_info: &AccountInfo) -> Result<Balance, ProgramError> {
        let balance = Balance::unpack_unchecked(&balance_info.data.borrow())?;
        if !balance.is_initialized() {
            return Err(LedgerError::UninitializedState.into());
        }
        Ok(balance)
    }

    fn unpack_ledger(ledger_info: &AccountInfo) -> Result<Ledger, ProgramError> {
        let ledger = Ledger::unpack_unchecked(&ledger_info.data.borrow())?;
        if !ledger.is_initialized() {
            return Err(LedgerError::UninitializedState.into());
        }
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::runtime::NativeAccountData,
        solana_program::rent::Rent,
    };

    fn ledger_account<T: Pack>(key: Pubkey, state: T) -> NativeAccountData {
        let mut account = NativeAccountData::new_system_account(key, 1);
        account.owner = crate::token::id();
        account.data = vec![0; T::LEN];
        T::pack(state, &mut account.data).unwrap();
        account.is_writable = true;
        account
    }

    #[test]
    fn transfer_from_needs_the_derived_allowance() {
        let program_id = crate::token::id();
        let ledger = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let spender_key = Pubkey::new_unique();

        let (source_key, _) = Balance::derive_address(&program_id, &ledger, &owner);
        let mut source = ledger_account(
            source_key,
            Balance {
                is_initialized: true,
                ledger,
                owner,
                amount: 10,
            },
        );
        let (destination_key, _) = Balance::derive_address(&program_id, &ledger, &spender_key);
        let mut destination = ledger_account(
            destination_key,
            Balance {
                is_initialized: true,
                ledger,
                owner: spender_key,
                amount: 0,
            },
        );
        let allowance = Allowance {
            is_initialized: true,
            ledger,
            owner,
            spender: spender_key,
            amount: 10,
        };
        let mut stray = ledger_account(Pubkey::new_unique(), allowance);
        let mut spender = NativeAccountData::new_system_account(spender_key, 0);
        spender.is_signer = true;

        let mut ctx = InvokeContext::new(Rent::default());
        let accounts = [
            source.as_account_info(),
            destination.as_account_info(),
            stray.as_account_info(),
            spender.as_account_info(),
        ];
        assert_eq!(
            Processor::process_transfer_from(&mut ctx, &program_id, &accounts, 5),
            Err(LedgerError::InvalidAddress.into())
        );
        assert_eq!(Balance::unpack(&accounts[0].data.borrow()).unwrap().amount, 10);
    }
}
