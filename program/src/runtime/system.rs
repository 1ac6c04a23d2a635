// SPDX-License-Identifier: AGPL-3.0-only

//! The subset of the system program the runtime understands.

use {
    super::InvokeContext,
    solana_program::{
        account_info::{next_account_info, AccountInfo},
        entrypoint::ProgramResult,
        msg,
        program_error::ProgramError,
        pubkey::Pubkey,
        system_instruction::{SystemError, SystemInstruction, MAX_PERMITTED_DATA_LENGTH},
        system_program::ID as SYSTEM_PROGRAM_ID,
    },
};

fn system_error(error: SystemError) -> ProgramError {
    ProgramError::Custom(error as u32)
}

/// Decodes a system instruction
pub fn unpack(input: &[u8]) -> Result<SystemInstruction, ProgramError> {
    bincode::deserialize(input).map_err(|_| ProgramError::InvalidInstructionData)
}

/// Processes a system instruction reached through account infos, either at
/// the top level or by cross-program invocation.
pub fn process(ctx: &mut InvokeContext, accounts: &[AccountInfo], input: &[u8]) -> ProgramResult {
    match unpack(input)? {
        SystemInstruction::Transfer { lamports } => {
            msg!("Instruction: Transfer");
            process_transfer(accounts, lamports)
        }
        SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } => {
            msg!("Instruction: CreateAccount");
            process_create_account(ctx, accounts, lamports, space, &owner)
        }
        SystemInstruction::Allocate { space } => {
            msg!("Instruction: Allocate");
            process_allocate(ctx, accounts, space)
        }
        SystemInstruction::Assign { owner } => {
            msg!("Instruction: Assign");
            process_assign(ctx, accounts, &owner)
        }
        _ => {
            msg!("Unsupported system instruction");
            Err(ProgramError::InvalidInstructionData)
        }
    }
}

fn check_funding(from_info: &AccountInfo, lamports: u64) -> ProgramResult {
    if !from_info.is_signer {
        msg!("`from` account {} must sign", from_info.key);
        return Err(ProgramError::MissingRequiredSignature);
    }
    if *from_info.owner != SYSTEM_PROGRAM_ID || !from_info.data_is_empty() {
        msg!("`from` must not carry data");
        return Err(ProgramError::InvalidArgument);
    }
    if from_info.lamports() < lamports {
        msg!(
            "insufficient lamports {}, need {}",
            from_info.lamports(),
            lamports
        );
        return Err(system_error(SystemError::ResultWithNegativeLamports));
    }
    Ok(())
}

fn move_lamports(from_info: &AccountInfo, to_info: &AccountInfo, lamports: u64) -> ProgramResult {
    let to_lamports = to_info
        .lamports()
        .checked_add(lamports)
        .ok_or(ProgramError::InvalidArgument)?;
    **from_info.try_borrow_mut_lamports()? -= lamports;
    **to_info.try_borrow_mut_lamports()? = to_lamports;
    Ok(())
}

fn process_transfer(accounts: &[AccountInfo], lamports: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let from_info = next_account_info(account_info_iter)?;
    let to_info = next_account_info(account_info_iter)?;

    check_funding(from_info, lamports)?;
    if from_info.key == to_info.key {
        return Ok(());
    }
    move_lamports(from_info, to_info, lamports)
}

fn check_space(space: u64) -> Result<usize, ProgramError> {
    if space > MAX_PERMITTED_DATA_LENGTH {
        msg!(
            "requested {} bytes, max {}",
            space,
            MAX_PERMITTED_DATA_LENGTH
        );
        return Err(system_error(SystemError::InvalidAccountDataLength));
    }
    Ok(space as usize)
}

/// Checks that a signing system account may still take on data
fn check_allocatable(ctx: &InvokeContext, account_info: &AccountInfo) -> ProgramResult {
    if !account_info.is_signer {
        msg!("account {} must sign", account_info.key);
        return Err(ProgramError::MissingRequiredSignature);
    }
    if !account_info.data_is_empty()
        || *account_info.owner != SYSTEM_PROGRAM_ID
        || ctx.is_allocating(account_info.key)
    {
        msg!("account {} already in use", account_info.key);
        return Err(system_error(SystemError::AccountAlreadyInUse));
    }
    Ok(())
}

/// Funds a new account and schedules its allocation. Data and owner are
/// applied when the enclosing top-level instruction succeeds, so the account
/// is usable from the next instruction of the transaction on.
fn process_create_account(
    ctx: &mut InvokeContext,
    accounts: &[AccountInfo],
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let from_info = next_account_info(account_info_iter)?;
    let to_info = next_account_info(account_info_iter)?;

    check_allocatable(ctx, to_info)?;
    if to_info.lamports() > 0 {
        msg!("CreateAccount: account {} already in use", to_info.key);
        return Err(system_error(SystemError::AccountAlreadyInUse));
    }
    let space = check_space(space)?;
    if lamports < ctx.rent().minimum_balance(space) {
        return Err(ProgramError::AccountNotRentExempt);
    }
    check_funding(from_info, lamports)?;
    if from_info.key == to_info.key {
        return Err(system_error(SystemError::AccountAlreadyInUse));
    }

    move_lamports(from_info, to_info, lamports)?;
    ctx.allocate(to_info.key, Some(space), Some(*owner));
    Ok(())
}

/// Schedules data space for an already funded account
fn process_allocate(ctx: &mut InvokeContext, accounts: &[AccountInfo], space: u64) -> ProgramResult {
    let account_info = next_account_info(&mut accounts.iter())?;

    check_allocatable(ctx, account_info)?;
    let space = check_space(space)?;
    if account_info.lamports() < ctx.rent().minimum_balance(space) {
        return Err(ProgramError::AccountNotRentExempt);
    }

    ctx.allocate(account_info.key, Some(space), None);
    Ok(())
}

/// Schedules a new owner for a system account
fn process_assign(ctx: &mut InvokeContext, accounts: &[AccountInfo], owner: &Pubkey) -> ProgramResult {
    let account_info = next_account_info(&mut accounts.iter())?;

    if !account_info.is_signer {
        msg!("Assign: account {} must sign", account_info.key);
        return Err(ProgramError::MissingRequiredSignature);
    }
    if *account_info.owner != SYSTEM_PROGRAM_ID || ctx.is_assigning(account_info.key) {
        return Err(ProgramError::IllegalOwner);
    }
    if *owner == SYSTEM_PROGRAM_ID {
        return Ok(());
    }

    ctx.allocate(account_info.key, None, Some(*owner));
    Ok(())
}
