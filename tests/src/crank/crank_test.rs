//! Crank scheduling tests: readiness, pop/push round trips and the account
//! lists the keeper submits.

#[cfg(test)]
mod tests {
    use crate::crank::fixture::CrankFixture;
    use crank_keeper::prelude::*;
    use oracle::state::AggregatorAccountData;
    use spl_associated_token_account::get_associated_token_address;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pop_push_round_trip() {
        let fixture = CrankFixture::new(2, 150);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        fixture.add_feed(a);
        fixture.add_feed(b);
        fixture.set_rows(&[CrankRow::new(a, 100), CrankRow::new(b, 200)]);

        assert_eq!(fixture.keeper.ready_feeds(150).await.unwrap(), vec![a]);

        let report = fixture.keeper.tick().await.unwrap();
        assert_eq!(report.popped, vec![a]);
        assert_eq!(fixture.ledger().submitted().len(), 1);

        // Still listed until the ledger confirms the pop.
        let snapshot = fixture.keeper.load().await.unwrap();
        assert!(CrankScheduler::is_on_crank(&snapshot.buffer, &a).unwrap());

        // The pop lands at 200 and the ledger drains everything due by then.
        assert_eq!(fixture.settle_pop(200), vec![a, b]);
        let snapshot = fixture.keeper.load().await.unwrap();
        assert!(!CrankScheduler::is_on_crank(&snapshot.buffer, &a).unwrap());

        fixture.keeper.push_batch(&a).await.unwrap();
        fixture.settle_push(a, 300);

        assert!(fixture.peek_ready(250).is_empty());
        assert!(fixture.keeper.ready_feeds(250).await.unwrap().is_empty());
        assert_eq!(fixture.keeper.ready_feeds(300).await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn test_ready_rows_follow_physical_order() {
        let fixture = CrankFixture::new(4, 1_000);
        let feeds: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        fixture.set_rows(&[
            CrankRow::new(feeds[0], 900),
            CrankRow::new(feeds[1], 1_500),
            CrankRow::new(feeds[2], 100),
            CrankRow::new(feeds[3], 900),
        ]);

        // Later-physical rows are not promoted for being more overdue.
        assert_eq!(
            fixture.peek_ready(1_000),
            vec![feeds[0], feeds[2], feeds[3]]
        );

        let data = fixture
            .ledger()
            .get(&fixture.context.crank_data_buffer)
            .unwrap();
        let limited = CrankScheduler::peek_ready(&data, 1_000, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].pubkey, feeds[0]);
        assert_eq!(limited[1].pubkey, feeds[2]);
        assert!(CrankScheduler::peek_ready(&data, 1_000, 0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_crank_is_idle() {
        let fixture = CrankFixture::new(2, 10_000);
        assert!(fixture.peek_ready(i64::MAX).is_empty());

        let report = fixture.keeper.tick().await.unwrap();
        assert!(report.is_idle());
        assert!(fixture.ledger().submitted().is_empty());

        let err = fixture.keeper.pop_batches(10_000).await.unwrap_err();
        assert!(matches!(err, KeeperError::Oracle(OracleError::CrankEmpty)));
        assert_eq!(err.kind(), ErrorKind::ProtocolPrecondition);
    }

    #[tokio::test]
    async fn test_pop_accounts_and_payout() {
        let fixture = CrankFixture::new(3, 500);
        let feeds: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        for feed in &feeds {
            fixture.add_feed(*feed);
        }
        fixture.set_rows(&[
            CrankRow::new(feeds[0], 100),
            CrankRow::new(feeds[1], 200),
            CrankRow::new(feeds[2], 300),
        ]);

        let batches = fixture.keeper.pop_batches(500).await.unwrap();
        assert_eq!(batches.len(), 1);
        let ix = &batches[0].instructions()[0];
        assert_eq!(ix.program_id, fixture.context.program_id);

        let payout = get_associated_token_address(&fixture.keeper.payer(), &fixture.context.mint);
        assert!(ix.accounts.iter().any(|meta| meta.pubkey == payout));

        // Four operands per feed, byte-sorted, after the fixed accounts.
        let operands: Vec<Pubkey> = ix.accounts[ix.accounts.len() - 12..]
            .iter()
            .map(|meta| meta.pubkey)
            .collect();
        let mut sorted = operands.clone();
        sorted.sort_by_key(|key| key.to_bytes());
        assert_eq!(operands, sorted);
        for feed in &feeds {
            let companions = fixture.context.companions(feed);
            for operand in companions.pop_operands() {
                assert!(operands.contains(&operand));
            }
        }
    }

    #[tokio::test]
    async fn test_missing_lease_blocks_pop() {
        let fixture = CrankFixture::new(2, 500);
        let feed = Pubkey::new_unique();
        fixture.set_rows(&[CrankRow::new(feed, 100)]);

        let lease = fixture.context.companions(&feed).lease;
        let err = fixture.keeper.pop_batches(500).await.unwrap_err();
        assert!(matches!(err, KeeperError::AccountNotFound(key) if key == lease));
        assert!(fixture.ledger().submitted().is_empty());
    }

    #[tokio::test]
    async fn test_push_rejects_listed_feed() {
        let fixture = CrankFixture::new(2, 500);
        let feed = Pubkey::new_unique();
        fixture.add_feed(feed);
        fixture.set_rows(&[CrankRow::new(feed, 900)]);

        let err = fixture.keeper.push_batch(&feed).await.unwrap_err();
        assert!(matches!(err, KeeperError::AlreadyOnCrank(key) if key == feed));
    }

    #[tokio::test]
    async fn test_await_round_sees_confirmation() {
        let fixture = CrankFixture::new(2, 500);
        let feed = Pubkey::new_unique();
        fixture.add_feed(feed);

        let waiter = {
            let keeper = &fixture.keeper;
            async move { keeper.await_round(&feed, Duration::from_secs(5)).await }
        };
        let writer = async {
            tokio::task::yield_now().await;
            let data = fixture.ledger().get(&feed).unwrap();
            let mut aggregator = AggregatorAccountData::decode(&data).unwrap();
            aggregator.latest_confirmed_round.num_success = 1;
            aggregator.latest_confirmed_round.round_open_slot = 42;
            aggregator.latest_confirmed_round.round_open_timestamp = 480;
            aggregator.latest_confirmed_round.result = Decimal::new(1_234, 2);
            fixture.ledger().set_account(feed, aggregator.encode().unwrap());
        };

        let (round, ()) = tokio::join!(waiter, writer);
        let round = round.unwrap();
        assert_eq!(round.result, Decimal::new(1_234, 2));
        assert_eq!(round.open_slot, 42);
    }

    #[tokio::test]
    async fn test_await_round_times_out() {
        let fixture = CrankFixture::new(2, 500);
        let feed = Pubkey::new_unique();
        fixture.add_feed(feed);

        let err = fixture
            .keeper
            .await_round(&feed, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, KeeperError::Timeout(_)));
    }
}
