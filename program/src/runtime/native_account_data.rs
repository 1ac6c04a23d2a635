// SPDX-License-Identifier: AGPL-3.0-only

use solana_program::{
    account_info::AccountInfo, bpf_loader::ID as BPF_LOADER_PROGRAM_ID, clock::Epoch,
    pubkey::Pubkey, system_program::ID as SYSTEM_PROGRAM_ID,
};

/// An account as held by the native runtime
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NativeAccountData {
    /// Address
    pub key: Pubkey,
    /// Native balance
    pub lamports: u64,
    /// Program-defined data
    pub data: Vec<u8>,
    /// Program allowed to modify the data and debit the lamports
    pub owner: Pubkey,
    /// Whether the account holds a program
    pub executable: bool,
    /// Signer flag for the instruction currently executing
    pub is_signer: bool,
    /// Writable flag for the instruction currently executing
    pub is_writable: bool,
}

impl NativeAccountData {
    /// A zero-data account owned by the system program
    pub fn new_system_account(key: Pubkey, lamports: u64) -> Self {
        Self {
            key,
            lamports,
            data: vec![],
            owner: SYSTEM_PROGRAM_ID,
            ..Self::default()
        }
    }

    /// An executable account standing in for a builtin program
    pub fn new_program(key: Pubkey) -> Self {
        Self {
            key,
            lamports: 1,
            data: vec![0; 21],
            owner: BPF_LOADER_PROGRAM_ID,
            executable: true,
            ..Self::default()
        }
    }

    /// Borrows the account as an `AccountInfo` for program execution
    pub fn as_account_info(&mut self) -> AccountInfo {
        AccountInfo::new(
            &self.key,
            self.is_signer,
            self.is_writable,
            &mut self.lamports,
            &mut self.data[..],
            &self.owner,
            self.executable,
            Epoch::default(),
        )
    }
}
