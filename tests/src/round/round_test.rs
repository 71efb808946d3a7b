//! Round lifecycle across the oracle and library crates: consensus driven
//! through `apply`, and the history account it writes.

#[cfg(test)]
mod tests {
    use library::codec::HistorySample;
    use library::ring::RingWriter;
    use library::Decimal;
    use oracle::history::{decode_history, HistoryBuffer};
    use oracle::prelude::*;
    use oracle::round::OracleAssignment;
    use oracle::state::AggregatorAccountData;
    use solana_sdk::pubkey::Pubkey;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn feed(batch_size: u32, min_oracle_results: u32) -> FeedConfig {
        FeedConfig {
            address: Pubkey::new_unique(),
            queue: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            batch_size,
            min_oracle_results,
            min_job_results: 1,
            min_update_delay_seconds: 10,
            variance_threshold: Decimal::ZERO,
            force_report_period: 0,
            is_locked: false,
            job_count: 1,
            crank: None,
            history_buffer: None,
        }
    }

    fn open(now: i64, batch: usize) -> RoundAction {
        RoundAction::Open {
            assignment: (0..batch)
                .map(|_| OracleAssignment::from(Pubkey::new_unique()))
                .collect(),
            now,
            slot: now as u64,
        }
    }

    fn submit(oracle_idx: u32, v: &str) -> RoundAction {
        RoundAction::Submit {
            oracle_idx,
            value: dec(v),
            min_response: dec(v),
            max_response: dec(v),
            is_error: false,
        }
    }

    fn error(oracle_idx: u32) -> RoundAction {
        RoundAction::Submit {
            oracle_idx,
            value: Decimal::ZERO,
            min_response: Decimal::ZERO,
            max_response: Decimal::ZERO,
            is_error: true,
        }
    }

    #[test]
    fn test_history_wrap_scenario() {
        let s: Vec<HistorySample> = (0..4)
            .map(|i| HistorySample::new(1_000 + i, Decimal::from_integer(i)))
            .collect();

        let mut writer = RingWriter::with_capacity(3).unwrap();
        for sample in &s {
            writer.push(*sample);
        }
        assert_eq!(writer.cursor(), Some(0));

        let data = writer.to_bytes().unwrap();
        assert_eq!(decode_history(&data).unwrap(), vec![s[1], s[2], s[3]]);
        assert_eq!(
            HistoryBuffer::from_account_data(&data).unwrap().samples(),
            vec![s[1], s[2], s[3]]
        );
    }

    #[test]
    fn test_quorum_counts_never_decrease() {
        let mut consensus = RoundConsensus::new(feed(5, 3));
        (consensus, _) = consensus.apply(open(1_000, 5)).unwrap();

        let steps = [submit(0, "7"), error(1), submit(2, "8"), error(3), submit(4, "9")];
        let mut last = (0, 0);
        for step in steps {
            let (next, event) = consensus.apply(step).unwrap();
            let round = next.current().unwrap();
            assert!(round.num_success >= last.0);
            assert!(round.num_error >= last.1);
            assert!(round.num_success + round.num_error > last.0 + last.1);
            last = (round.num_success, round.num_error);
            consensus = next;

            if let RoundEvent::Confirmed(confirmed) = event {
                assert_eq!(confirmed.num_success, 3);
                assert_eq!(confirmed.num_error, 2);
                assert_eq!(confirmed.result, dec("8"));
            }
        }
        assert_eq!(consensus.phase(), RoundPhase::Confirmed);

        // A rejected submission leaves the counts where they were.
        let err = consensus.apply(submit(0, "100")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolPrecondition);
        assert_eq!(consensus.current().unwrap().num_success, 3);
    }

    #[test]
    fn test_confirmed_rounds_fill_history_account() {
        let mut consensus =
            RoundConsensus::new(feed(1, 1)).with_history(HistoryBuffer::with_capacity(3).unwrap());

        let mut now = 1_000;
        for v in ["1", "2", "3", "4", "5"] {
            (consensus, _) = consensus.apply(open(now, 1)).unwrap();
            let (next, event) = consensus.apply(submit(0, v)).unwrap();
            assert!(matches!(event, RoundEvent::Confirmed(_)));
            consensus = next;
            now += 10;
        }

        assert_eq!(consensus.latest_value(), Some(dec("5")));
        assert_eq!(consensus.previous_confirmed().unwrap().result, dec("4"));

        let data = consensus.history().unwrap().to_account_data().unwrap();
        assert_eq!(data.len(), HistoryBuffer::account_size(3).unwrap());
        let values: Vec<Decimal> = decode_history(&data)
            .unwrap()
            .into_iter()
            .map(|sample| sample.value)
            .collect();
        assert_eq!(values, vec![dec("3"), dec("4"), dec("5")]);

        let history = consensus.history().unwrap();
        assert_eq!(history.lower_bound(1_035).unwrap().value, dec("4"));
        assert!(history.lower_bound(1_000).is_none());
    }

    #[test]
    fn test_reopen_waits_for_update_delay() {
        let consensus = RoundConsensus::new(feed(1, 1));
        let (consensus, _) = consensus.apply(open(1_000, 1)).unwrap();

        let err = consensus.apply(open(1_009, 1)).unwrap_err();
        assert_eq!(
            err,
            OracleError::IllegalOpenCall {
                now: 1_009,
                next_allowed: 1_010
            }
        );
        let (consensus, event) = consensus.apply(open(1_010, 1)).unwrap();
        assert!(matches!(event, RoundEvent::Opened { open_timestamp: 1_010, .. }));
        assert_eq!(consensus.phase(), RoundPhase::Open);
    }

    #[test]
    fn test_snapshot_from_encoded_aggregator() {
        let mut data = AggregatorAccountData {
            oracle_request_batch_size: 1,
            min_oracle_results: 1,
            min_update_delay_seconds: 10,
            next_allowed_update_time: 2_000,
            ..Default::default()
        };
        data.latest_confirmed_round.num_success = 1;
        data.latest_confirmed_round.round_open_slot = 9;
        data.latest_confirmed_round.round_open_timestamp = 1_990;
        data.latest_confirmed_round.result = dec("42.5");

        let account = LedgerAccount::decode(&data.encode().unwrap()).unwrap();
        assert_eq!(account.kind(), AccountKind::Aggregator);
        let LedgerAccount::Aggregator(decoded) = account else {
            panic!("expected an aggregator");
        };

        let consensus = RoundConsensus::from_account(Pubkey::new_unique(), &decoded, None).unwrap();
        assert_eq!(consensus.get_result().unwrap(), dec("42.5"));
        assert_eq!(consensus.check_staleness(2_050, 100), Ok(()));
        assert!(matches!(
            consensus.check_staleness(2_200, 100),
            Err(OracleError::StaleFeed { .. })
        ));
        assert!(matches!(
            consensus.apply(open(1_999, 1)),
            Err(OracleError::IllegalOpenCall { .. })
        ));
    }
}
