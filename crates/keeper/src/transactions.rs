//! Operation batches and the packer that folds them into as few transactions
//! as the packet limits allow.

use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use crate::errors::{KeeperError, Result};

pub const MAX_INSTRUCTIONS: usize = 10;
pub const SIGNATURE_SIZE: usize = 64;

/// An ordered list of instructions, the payer that funds them, and the other
/// identities that will sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationBatch {
    payer: Pubkey,
    instructions: Vec<Instruction>,
    signers: Vec<Pubkey>,
}

impl OperationBatch {
    pub fn new(payer: Pubkey, instructions: Vec<Instruction>, signers: Vec<Pubkey>) -> Result<Self> {
        let signers = dedup(signers);
        Self::verify(&payer, &instructions, &signers)?;
        Ok(Self {
            payer,
            instructions,
            signers,
        })
    }

    pub fn payer(&self) -> &Pubkey {
        &self.payer
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn signers(&self) -> &[Pubkey] {
        &self.signers
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Prepends instructions. Leaves the batch untouched on failure.
    pub fn unshift(&mut self, instructions: Vec<Instruction>, signers: &[Pubkey]) -> Result<()> {
        let mut next = instructions;
        next.extend(self.instructions.iter().cloned());
        self.replace(next, signers)
    }

    /// Appends instructions. Leaves the batch untouched on failure.
    pub fn add(&mut self, instructions: Vec<Instruction>, signers: &[Pubkey]) -> Result<()> {
        let mut next = self.instructions.clone();
        next.extend(instructions);
        self.replace(next, signers)
    }

    fn replace(&mut self, instructions: Vec<Instruction>, signers: &[Pubkey]) -> Result<()> {
        let mut next_signers = self.signers.clone();
        next_signers.extend_from_slice(signers);
        let next_signers = dedup(next_signers);

        Self::verify(&self.payer, &instructions, &next_signers)?;
        self.instructions = instructions;
        self.signers = next_signers;
        Ok(())
    }

    /// `self` followed by `other`, under one payer.
    pub fn combine(&self, other: &OperationBatch) -> Result<OperationBatch> {
        if self.payer != other.payer {
            return Err(KeeperError::PayerMismatch {
                left: self.payer,
                right: other.payer,
            });
        }
        let mut merged = self.clone();
        merged.add(other.instructions.clone(), &other.signers)?;
        Ok(merged)
    }

    pub fn verify(payer: &Pubkey, instructions: &[Instruction], signers: &[Pubkey]) -> Result<()> {
        if *payer == Pubkey::default() {
            return Err(KeeperError::ReadOnlyPayer);
        }
        if instructions.is_empty() {
            return Ok(());
        }
        if instructions.len() > MAX_INSTRUCTIONS {
            return Err(KeeperError::InstructionOverflow(instructions.len()));
        }

        let size = Self::size(payer, instructions);
        if size > PACKET_DATA_SIZE {
            return Err(KeeperError::SerializationOverflow(size));
        }

        let missing: Vec<Pubkey> = required_signers(instructions)
            .into_iter()
            .filter(|key| key != payer && !signers.contains(key))
            .collect();
        if !missing.is_empty() {
            return Err(KeeperError::MissingSigners(missing));
        }
        Ok(())
    }

    /// Wire size of a transaction `payer` funds carrying `instructions`: the
    /// legacy message, one signature per required signer (the payer always
    /// among them), and the compact-u16 signature count.
    pub fn size(payer: &Pubkey, instructions: &[Instruction]) -> usize {
        let message = Message::new_with_blockhash(instructions, Some(payer), &Hash::default());
        let required = message.header.num_required_signatures as usize;

        message.serialize().len() + required * SIGNATURE_SIZE + short_vec_len(required)
    }

    pub fn to_transaction(&self, blockhash: Hash) -> Transaction {
        let message = Message::new_with_blockhash(&self.instructions, Some(&self.payer), &blockhash);
        Transaction::new_unsigned(message)
    }

    /// Signs with the keypairs covering the payer and every required signer.
    /// Extra keypairs are ignored.
    pub fn sign(&self, blockhash: Hash, keypairs: &[&Keypair]) -> Result<Transaction> {
        let mut transaction = self.to_transaction(blockhash);
        let num_signers = transaction.message.header.num_required_signatures as usize;
        let signer_keys = &transaction.message.account_keys[..num_signers];

        let missing: Vec<Pubkey> = signer_keys
            .iter()
            .filter(|key| !keypairs.iter().any(|kp| kp.pubkey() == **key))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(KeeperError::MissingSigners(missing));
        }

        let used: Vec<&Keypair> = keypairs
            .iter()
            .filter(|kp| signer_keys.contains(&kp.pubkey()))
            .copied()
            .collect();
        transaction.try_sign(used.as_slice(), blockhash)?;
        Ok(transaction)
    }
}

/// Greedy left fold: each batch is merged into the running accumulator when
/// the result still verifies, otherwise the accumulator is closed and the
/// batch starts the next one. Never reorders.
pub fn pack(batches: Vec<OperationBatch>) -> Result<Vec<OperationBatch>> {
    let mut batches = batches.into_iter();
    let mut current = batches.next().ok_or(KeeperError::NothingToPack)?;
    let mut packed = Vec::new();

    for batch in batches {
        match current.combine(&batch) {
            Ok(merged) => current = merged,
            Err(err) => {
                tracing::debug!(error = %err, "closing batch");
                packed.push(std::mem::replace(&mut current, batch));
            }
        }
    }
    packed.push(current);
    Ok(packed)
}

/// Packs single instructions signed only by `payer`.
pub fn pack_instructions(payer: Pubkey, instructions: Vec<Instruction>) -> Result<Vec<OperationBatch>> {
    let mut packed = Vec::new();
    let mut current = OperationBatch::new(payer, vec![], vec![])?;

    for ix in instructions {
        if current.add(vec![ix.clone()], &[]).is_ok() {
            continue;
        }
        let alone = OperationBatch::new(payer, vec![ix], vec![]).map_err(|err| match err {
            KeeperError::MissingSigners(_) => err,
            other => KeeperError::InstructionsPacking(other.to_string()),
        })?;
        packed.push(std::mem::replace(&mut current, alone));
    }

    if !current.is_empty() {
        packed.push(current);
    }
    Ok(packed)
}

/// Distinct must-sign addresses, in first-seen order.
pub fn required_signers(instructions: &[Instruction]) -> Vec<Pubkey> {
    dedup(
        instructions
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect(),
    )
}

fn dedup(keys: Vec<Pubkey>) -> Vec<Pubkey> {
    let mut out: Vec<Pubkey> = Vec::with_capacity(keys.len());
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

fn short_vec_len(mut len: usize) -> usize {
    let mut bytes = 1;
    while len >= 0x80 {
        len >>= 7;
        bytes += 1;
    }
    bytes
}
