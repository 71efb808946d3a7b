//! Packing crank instructions into transactions and signing them against an
//! in-memory ledger.

#[cfg(test)]
mod tests {
    use crank_keeper::prelude::*;
    use crank_keeper::transactions::MAX_INSTRUCTIONS;
    use oracle::state::{CrankAccountData, OracleQueueAccountData};
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        packet::PACKET_DATA_SIZE,
    };

    fn scheduler() -> CrankScheduler {
        let crank = CrankAccountData {
            queue_pubkey: Pubkey::new_unique(),
            data_buffer: Pubkey::new_unique(),
            max_rows: 100,
            ..Default::default()
        };
        let queue = OracleQueueAccountData {
            authority: Pubkey::new_unique(),
            data_buffer: Pubkey::new_unique(),
            ..Default::default()
        };
        CrankScheduler::new(CrankContext::new(
            DEVNET_PROGRAM_ID,
            Pubkey::new_unique(),
            &crank,
            &queue,
        ))
    }

    fn authorized(authority: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            DEVNET_PROGRAM_ID,
            &[1, 2, 3],
            vec![
                AccountMeta::new(Pubkey::new_unique(), false),
                AccountMeta::new_readonly(*authority, true),
            ],
        )
    }

    #[test]
    fn test_pushes_pack_in_order_within_limits() {
        let scheduler = scheduler();
        let payer = Keypair::new();
        let pushes: Vec<Instruction> = (0..25)
            .map(|_| scheduler.push_instruction(&Pubkey::new_unique()).unwrap())
            .collect();

        let batches = pack_instructions(payer.pubkey(), pushes.clone()).unwrap();
        assert!(batches.len() > 1);

        let mut flattened = Vec::new();
        for batch in &batches {
            assert!(!batch.is_empty());
            assert!(batch.len() <= MAX_INSTRUCTIONS);
            assert!(OperationBatch::size(batch.payer(), batch.instructions()) <= PACKET_DATA_SIZE);
            OperationBatch::verify(batch.payer(), batch.instructions(), batch.signers()).unwrap();
            flattened.extend(batch.instructions().iter().cloned());
        }
        assert_eq!(flattened, pushes);

        // Greedy: no batch could have taken the next batch's first instruction.
        for pair in batches.windows(2) {
            let mut grown = pair[0].clone();
            assert!(grown
                .add(vec![pair[1].instructions()[0].clone()], &[])
                .is_err());
        }
    }

    #[test]
    fn test_pack_batches_keeps_signers() {
        let payer = Keypair::new();
        let authority = Keypair::new();
        let scheduler = scheduler();

        let push = OperationBatch::new(
            payer.pubkey(),
            vec![scheduler.push_instruction(&Pubkey::new_unique()).unwrap()],
            vec![],
        )
        .unwrap();
        let admin = OperationBatch::new(
            payer.pubkey(),
            vec![authorized(&authority.pubkey())],
            vec![authority.pubkey()],
        )
        .unwrap();

        let packed = pack(vec![push.clone(), admin.clone(), push]).unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].len(), 3);
        assert_eq!(packed[0].signers(), &[authority.pubkey()]);
    }

    #[test]
    fn test_foreign_payers_never_merge() {
        let authority = Pubkey::new_unique();
        let batch = |payer: Pubkey| {
            OperationBatch::new(payer, vec![authorized(&authority)], vec![authority]).unwrap()
        };
        let (first, second) = (batch(Pubkey::new_unique()), batch(Pubkey::new_unique()));

        let packed = pack(vec![first.clone(), second.clone()]).unwrap();
        assert_eq!(packed, vec![first, second]);
        assert!(matches!(pack(vec![]), Err(KeeperError::NothingToPack)));
    }

    #[test]
    fn test_unsigned_instruction_is_not_packed() {
        let payer = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        let err = pack_instructions(payer, vec![authorized(&authority)]).unwrap_err();
        assert!(matches!(err, KeeperError::MissingSigners(ref keys) if keys == &vec![authority]));
        assert_eq!(err.kind(), ErrorKind::SignerCoverage);
    }

    #[tokio::test]
    async fn test_ledger_requires_every_signer() {
        let ledger = MemoryLedger::new();
        let payer = Keypair::new();
        let authority = Keypair::new();
        let batch = OperationBatch::new(
            payer.pubkey(),
            vec![authorized(&authority.pubkey())],
            vec![authority.pubkey()],
        )
        .unwrap();

        let err = ledger.submit(&batch, &[&payer]).await.unwrap_err();
        assert!(matches!(err, KeeperError::MissingSigners(ref keys) if keys == &vec![authority.pubkey()]));
        assert!(ledger.submitted().is_empty());

        let bystander = Keypair::new();
        ledger
            .submit(&batch, &[&bystander, &authority, &payer])
            .await
            .unwrap();
        assert_eq!(ledger.submitted(), vec![batch.clone()]);

        let signed = batch.sign(Hash::new_unique(), &[&payer, &authority]).unwrap();
        assert_eq!(signed.signatures.len(), 2);
        signed.verify().unwrap();
    }
}
