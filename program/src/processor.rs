// SPDX-License-Identifier: AGPL-3.0-only

//! Program state processor

use {
    crate::{
        constraints::{SwapConstraints, SWAP_CONSTRAINTS},
        curve::{calculator::TradeDirection, fixed_rate::FixedRateCurve},
        error::SwapError,
        event::{Event, TradeEvent},
        instruction::{BuyTokens, Initialize, SellTokens, SwapInstruction, NAME_LEN},
        runtime::InvokeContext,
        state::SwapState,
        token::{self, state::Balance},
    },
    solana_program::{
        account_info::{next_account_info, AccountInfo},
        entrypoint::ProgramResult,
        msg,
        program_error::ProgramError,
        program_pack::{IsInitialized, Pack},
        pubkey::Pubkey,
        system_instruction,
    },
};

/// Program state handler.
pub struct Processor {}
impl Processor {
    /// Unpacks the facility state, failing if it was never initialized
    pub fn unpack_swap_state(swap_info: &AccountInfo) -> Result<SwapState, ProgramError> {
        let swap = SwapState::unpack_unchecked(&swap_info.data.borrow())?;
        if !swap.is_initialized() {
            return Err(SwapError::UninitializedState.into());
        }
        Ok(swap)
    }

    /// Unpacks a ledger balance account
    pub fn unpack_balance(
        account_info: &AccountInfo,
        token_program_id: &Pubkey,
    ) -> Result<Balance, SwapError> {
        if account_info.owner != token_program_id {
            Err(SwapError::IncorrectTokenProgramId)
        } else {
            let balance = Balance::unpack(&account_info.data.borrow())
                .map_err(|_| SwapError::ExpectedAccount)?;
            Ok(balance)
        }
    }

    /// Calculates the authority id by generating a program address.
    pub fn authority_id(
        program_id: &Pubkey,
        my_info: &Pubkey,
        bump_seed: u8,
    ) -> Result<Pubkey, SwapError> {
        Pubkey::create_program_address(&[&my_info.to_bytes()[..32], &[bump_seed]], program_id)
            .or(Err(SwapError::InvalidProgramAddress))
    }

    /// Checks that the accounts passed to a trade match the facility state
    fn check_trade_accounts(
        program_id: &Pubkey,
        swap: &SwapState,
        swap_info: &AccountInfo,
        authority_info: &AccountInfo,
        token_reserve_info: &AccountInfo,
        token_program_info: &AccountInfo,
    ) -> ProgramResult {
        if swap_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *authority_info.key != Self::authority_id(program_id, swap_info.key, swap.bump_seed)? {
            return Err(SwapError::InvalidProgramAddress.into());
        }
        if *token_reserve_info.key != swap.token_reserve {
            return Err(SwapError::IncorrectReserveAccount.into());
        }
        if *token_program_info.key != swap.token_program_id {
            return Err(SwapError::IncorrectTokenProgramId.into());
        }
        Ok(())
    }

    /// Checks that a trader's balance is held by the trader on the traded
    /// ledger
    fn check_trader_balance(
        swap: &SwapState,
        trader_info: &AccountInfo,
        balance_info: &AccountInfo,
    ) -> ProgramResult {
        let balance = Self::unpack_balance(balance_info, &swap.token_program_id)?;
        if balance.owner != *trader_info.key {
            msg!("Balance {} is not held by {}", balance_info.key, trader_info.key);
            return Err(SwapError::InvalidOwner.into());
        }
        if balance.ledger != swap.ledger {
            return Err(SwapError::IncorrectLedger.into());
        }
        Ok(())
    }

    /// Processes an [Initialize](enum.Instruction.html).
    pub fn process_initialize(
        program_id: &Pubkey,
        rate: u64,
        name: [u8; NAME_LEN],
        accounts: &[AccountInfo],
        swap_constraints: &Option<SwapConstraints>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let swap_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let token_reserve_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if swap_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let swap = SwapState::unpack_unchecked(&swap_info.data.borrow())?;
        if swap.is_initialized() {
            return Err(SwapError::AlreadyInUse.into());
        }

        let (swap_authority, bump_seed) =
            Pubkey::find_program_address(&[&swap_info.key.to_bytes()], program_id);
        if *authority_info.key != swap_authority {
            return Err(SwapError::InvalidProgramAddress.into());
        }

        if ledger_info.owner != token_program_info.key {
            return Err(SwapError::IncorrectTokenProgramId.into());
        }
        let token_reserve = Self::unpack_balance(token_reserve_info, token_program_info.key)?;
        if *authority_info.key != token_reserve.owner {
            return Err(SwapError::InvalidOwner.into());
        }
        if *ledger_info.key != token_reserve.ledger {
            return Err(SwapError::IncorrectLedger.into());
        }

        let curve = FixedRateCurve { rate };
        curve.validate()?;

        let state = SwapState {
            is_initialized: true,
            bump_seed,
            token_program_id: *token_program_info.key,
            ledger: *ledger_info.key,
            token_reserve: *token_reserve_info.key,
            curve,
            name,
        };
        let display_name = state.name()?;
        if display_name.is_empty() {
            return Err(SwapError::InvalidName.into());
        }

        if let Some(swap_constraints) = swap_constraints {
            swap_constraints.validate_curve(&curve)?;
            swap_constraints.validate_name(&display_name)?;
        }

        SwapState::pack(state, &mut swap_info.data.borrow_mut())?;
        Ok(())
    }

    /// Processes a [BuyTokens](enum.Instruction.html).
    pub fn process_buy_tokens(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        lamports: u64,
        accounts: &[AccountInfo],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let swap_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let token_reserve_info = next_account_info(account_info_iter)?;
        let buyer_info = next_account_info(account_info_iter)?;
        let buyer_balance_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        let swap = Self::unpack_swap_state(swap_info)?;
        Self::check_trade_accounts(
            program_id,
            &swap,
            swap_info,
            authority_info,
            token_reserve_info,
            token_program_info,
        )?;
        if !buyer_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        Self::check_trader_balance(&swap, buyer_info, buyer_balance_info)?;

        let result = swap
            .curve
            .swap(lamports, TradeDirection::NativeToToken)
            .ok_or(SwapError::ZeroTradingTokens)?;
        let tokens = result.destination_amount_swapped;

        ctx.invoke(
            &system_instruction::transfer(buyer_info.key, swap_info.key, lamports),
            &[
                buyer_info.clone(),
                swap_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        let swap_bytes = swap_info.key.to_bytes();
        let authority_signature_seeds = [&swap_bytes[..32], &[swap.bump_seed]];
        let signers = &[&authority_signature_seeds[..]];
        ctx.invoke_signed(
            &token::instruction::transfer(
                token_program_info.key,
                token_reserve_info.key,
                buyer_balance_info.key,
                authority_info.key,
                tokens,
            )?,
            &[
                token_reserve_info.clone(),
                buyer_balance_info.clone(),
                authority_info.clone(),
                token_program_info.clone(),
            ],
            signers,
        )?;

        ctx.emit(Event::Bought(TradeEvent {
            account: *buyer_info.key,
            token: swap.ledger,
            amount: tokens,
            rate: swap.rate(),
        }));

        Ok(())
    }

    /// Processes a [SellTokens](enum.Instruction.html).
    pub fn process_sell_tokens(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        amount: u64,
        accounts: &[AccountInfo],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let swap_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let token_reserve_info = next_account_info(account_info_iter)?;
        let seller_info = next_account_info(account_info_iter)?;
        let seller_balance_info = next_account_info(account_info_iter)?;
        let allowance_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        let swap = Self::unpack_swap_state(swap_info)?;
        Self::check_trade_accounts(
            program_id,
            &swap,
            swap_info,
            authority_info,
            token_reserve_info,
            token_program_info,
        )?;
        if !seller_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        Self::check_trader_balance(&swap, seller_info, seller_balance_info)?;

        let result = swap
            .curve
            .swap(amount, TradeDirection::TokenToNative)
            .ok_or(SwapError::ZeroTradingTokens)?;
        let payout = result.destination_amount_swapped;

        // The payout must be covered before any tokens move
        let native_reserve = SwapState::native_reserve(swap_info.lamports(), ctx.rent());
        if native_reserve < payout {
            msg!(
                "Native reserve {} cannot cover payout {}",
                native_reserve,
                payout
            );
            return Err(SwapError::InsufficientBalance.into());
        }

        let swap_bytes = swap_info.key.to_bytes();
        let authority_signature_seeds = [&swap_bytes[..32], &[swap.bump_seed]];
        let signers = &[&authority_signature_seeds[..]];
        ctx.invoke_signed(
            &token::instruction::transfer_from(
                token_program_info.key,
                seller_balance_info.key,
                token_reserve_info.key,
                allowance_info.key,
                authority_info.key,
                result.source_amount_swapped,
            )?,
            &[
                seller_balance_info.clone(),
                token_reserve_info.clone(),
                allowance_info.clone(),
                authority_info.clone(),
                token_program_info.clone(),
            ],
            signers,
        )?;

        let swap_lamports = swap_info
            .lamports()
            .checked_sub(payout)
            .ok_or(SwapError::CalculationFailure)?;
        let seller_lamports = seller_info
            .lamports()
            .checked_add(payout)
            .ok_or(SwapError::CalculationFailure)?;
        **swap_info.try_borrow_mut_lamports()? = swap_lamports;
        **seller_info.try_borrow_mut_lamports()? = seller_lamports;

        ctx.emit(Event::Sold(TradeEvent {
            account: *seller_info.key,
            token: swap.ledger,
            amount: result.source_amount_swapped,
            rate: swap.rate(),
        }));

        Ok(())
    }

    /// Processes an [Instruction](enum.Instruction.html).
    pub fn process(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        input: &[u8],
    ) -> ProgramResult {
        Self::process_with_constraints(ctx, program_id, accounts, input, &SWAP_CONSTRAINTS)
    }

    /// Processes an instruction given extra constraint
    pub fn process_with_constraints(
        ctx: &mut InvokeContext,
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        input: &[u8],
        swap_constraints: &Option<SwapConstraints>,
    ) -> ProgramResult {
        let instruction = SwapInstruction::unpack(input)?;
        match instruction {
            SwapInstruction::Initialize(Initialize { rate, name }) => {
                msg!("Instruction: Init");
                Self::process_initialize(program_id, rate, name, accounts, swap_constraints)
            }
            SwapInstruction::BuyTokens(BuyTokens { lamports }) => {
                msg!("Instruction: BuyTokens");
                Self::process_buy_tokens(ctx, program_id, lamports, accounts)
            }
            SwapInstruction::SellTokens(SellTokens { amount }) => {
                msg!("Instruction: SellTokens");
                Self::process_sell_tokens(ctx, program_id, amount, accounts)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            runtime::NativeAccountData,
            token::state::{pack_str, Ledger},
        },
    };

    struct InitAccounts {
        swap: NativeAccountData,
        authority: NativeAccountData,
        ledger: NativeAccountData,
        reserve: NativeAccountData,
        token_program: NativeAccountData,
    }

    impl InitAccounts {
        fn new() -> Self {
            let swap_key = Pubkey::new_unique();
            let (authority_key, _) =
                Pubkey::find_program_address(&[&swap_key.to_bytes()], &crate::id());
            let ledger_key = Pubkey::new_unique();

            let mut swap = NativeAccountData::new_system_account(swap_key, 1);
            swap.owner = crate::id();
            swap.data = vec![0; SwapState::LEN];
            swap.is_writable = true;

            let authority = NativeAccountData::new_system_account(authority_key, 0);

            let mut ledger = NativeAccountData::new_system_account(ledger_key, 1);
            ledger.owner = token::id();
            ledger.data = vec![0; Ledger::LEN];
            Ledger::pack(
                Ledger {
                    is_initialized: true,
                    decimals: 9,
                    supply: 1_000,
                    name: pack_str("DApp Token").unwrap(),
                    symbol: pack_str("DAPP").unwrap(),
                },
                &mut ledger.data,
            )
            .unwrap();

            let mut reserve = NativeAccountData::new_system_account(Pubkey::new_unique(), 1);
            reserve.owner = token::id();
            reserve.data = vec![0; Balance::LEN];
            Balance::pack(
                Balance {
                    is_initialized: true,
                    ledger: ledger_key,
                    owner: authority_key,
                    amount: 1_000,
                },
                &mut reserve.data,
            )
            .unwrap();

            Self {
                swap,
                authority,
                ledger,
                reserve,
                token_program: NativeAccountData::new_program(token::id()),
            }
        }

        fn initialize(
            &mut self,
            rate: u64,
            name: &str,
            constraints: &Option<SwapConstraints>,
        ) -> ProgramResult {
            let name = pack_str::<NAME_LEN>(name).unwrap();
            let accounts = [
                self.swap.as_account_info(),
                self.authority.as_account_info(),
                self.ledger.as_account_info(),
                self.reserve.as_account_info(),
                self.token_program.as_account_info(),
            ];
            Processor::process_initialize(&crate::id(), rate, name, &accounts, constraints)
        }
    }

    #[test]
    fn initialize_stores_state() {
        let mut accounts = InitAccounts::new();
        accounts.initialize(100, "Instant Exchange", &None).unwrap();

        let state = SwapState::unpack(&accounts.swap.data).unwrap();
        assert_eq!(state.rate(), 100);
        assert_eq!(state.name().unwrap(), "Instant Exchange");
        assert_eq!(state.ledger, accounts.ledger.key);
        assert_eq!(state.token_reserve, accounts.reserve.key);
        assert_eq!(state.token_program_id, token::id());
        assert_eq!(
            Processor::authority_id(&crate::id(), &accounts.swap.key, state.bump_seed).unwrap(),
            accounts.authority.key
        );

        assert_eq!(
            accounts.initialize(100, "Instant Exchange", &None),
            Err(SwapError::AlreadyInUse.into())
        );
    }

    #[test]
    fn initialize_rejects_bad_parameters() {
        let mut accounts = InitAccounts::new();
        assert_eq!(
            accounts.initialize(0, "Instant Exchange", &None),
            Err(SwapError::InvalidRate.into())
        );
        assert_eq!(
            accounts.initialize(100, "", &None),
            Err(SwapError::InvalidName.into())
        );

        let constraints = Some(SwapConstraints {
            min_rate: 1,
            max_rate: 50,
            valid_names: &[],
        });
        assert_eq!(
            accounts.initialize(100, "Instant Exchange", &constraints),
            Err(SwapError::UnsupportedRate.into())
        );
    }

    #[test]
    fn initialize_rejects_foreign_reserve() {
        let mut accounts = InitAccounts::new();
        let mut balance = Balance::unpack(&accounts.reserve.data).unwrap();
        balance.owner = Pubkey::new_unique();
        Balance::pack(balance, &mut accounts.reserve.data).unwrap();
        assert_eq!(
            accounts.initialize(100, "Instant Exchange", &None),
            Err(SwapError::InvalidOwner.into())
        );

        let mut accounts = InitAccounts::new();
        let mut balance = Balance::unpack(&accounts.reserve.data).unwrap();
        balance.ledger = Pubkey::new_unique();
        Balance::pack(balance, &mut accounts.reserve.data).unwrap();
        assert_eq!(
            accounts.initialize(100, "Instant Exchange", &None),
            Err(SwapError::IncorrectLedger.into())
        );

        let mut accounts = InitAccounts::new();
        accounts.authority.key = Pubkey::new_unique();
        assert_eq!(
            accounts.initialize(100, "Instant Exchange", &None),
            Err(SwapError::InvalidProgramAddress.into())
        );
    }
}
