//! Crank test fixture
//!
//! Seeds a [`MemoryLedger`] with a queue, a crank and its row buffer, and
//! plays the ledger's part when a pop or push lands.

use {
    crank_keeper::prelude::*,
    library::codec::{encode_rows, BUFFER_DISCRIMINATOR},
    oracle::state::{AggregatorAccountData, CrankAccountData, OracleQueueAccountData},
    spl_associated_token_account::get_associated_token_address,
};

pub const PROGRAM_ID: Pubkey = DEVNET_PROGRAM_ID;
pub const LOCAL_RPC_URL: &str = "http://localhost:8899";

/// Crank test fixture
pub struct CrankFixture {
    pub keeper: CrankKeeper<MemoryLedger>,
    pub context: CrankContext,
    pub capacity: usize,
}

impl CrankFixture {
    pub fn new(capacity: usize, now: i64) -> Self {
        let ledger = MemoryLedger::new().with_timestamp(now);
        let crank = Pubkey::new_unique();
        let queue = Pubkey::new_unique();

        let crank_data = CrankAccountData {
            queue_pubkey: queue,
            data_buffer: Pubkey::new_unique(),
            max_rows: capacity as u32,
            ..Default::default()
        };
        let queue_data = OracleQueueAccountData {
            authority: Pubkey::new_unique(),
            data_buffer: Pubkey::new_unique(),
            size: 4,
            max_size: 4,
            ..Default::default()
        };
        ledger.set_account(crank, crank_data.encode().unwrap());
        ledger.set_account(queue, queue_data.encode().unwrap());

        let context = CrankContext::new(PROGRAM_ID, crank, &crank_data, &queue_data);

        let mut config = KeeperConfig::new(crank);
        config.program_id = PROGRAM_ID;
        config.rpc_url = LOCAL_RPC_URL.to_string();

        // The payer already holds its payout token account.
        let payer = Keypair::new();
        ledger.set_account(
            get_associated_token_address(&payer.pubkey(), &context.mint),
            vec![1],
        );

        let fixture = Self {
            keeper: CrankKeeper::new(ledger, config, payer),
            context,
            capacity,
        };
        fixture.set_rows(&[]);
        fixture
    }

    pub fn ledger(&self) -> &MemoryLedger {
        self.keeper.ledger()
    }

    /// Registers `feed` on the queue: aggregator, lease, escrow and permission.
    pub fn add_feed(&self, feed: Pubkey) {
        let aggregator = AggregatorAccountData {
            queue_pubkey: self.context.queue,
            crank_pubkey: self.context.crank,
            oracle_request_batch_size: 1,
            min_oracle_results: 1,
            min_update_delay_seconds: 30,
            ..Default::default()
        };
        self.ledger().set_account(feed, aggregator.encode().unwrap());

        let companions = self.context.companions(&feed);
        self.ledger().set_account(companions.lease, vec![1]);
        self.ledger().set_account(companions.escrow, vec![1]);
        self.ledger().set_account(companions.permission, vec![1]);
    }

    pub fn set_rows(&self, rows: &[CrankRow]) {
        assert!(rows.len() <= self.capacity, "crank over capacity");
        let mut data = BUFFER_DISCRIMINATOR.to_vec();
        data.extend(encode_rows(rows));
        data.resize(8 + self.capacity * 40, 0);
        self.ledger().set_account(self.context.crank_data_buffer, data);
    }

    /// Rows as the ledger holds them now.
    pub fn rows(&self) -> Vec<CrankRow> {
        let data = self.ledger().get(&self.context.crank_data_buffer).unwrap();
        oracle::crank::decode_crank(&data).unwrap()
    }

    /// Ledger side of a pop executed at `executed_at`: every row due by then,
    /// up to the ledger's own limit, leaves the crank.
    pub fn settle_pop(&self, executed_at: i64) -> Vec<Pubkey> {
        let mut popped = Vec::new();
        let remaining: Vec<CrankRow> = self
            .rows()
            .into_iter()
            .filter(|row| {
                if row.next_timestamp <= executed_at && popped.len() < DEFAULT_POP_LIMIT {
                    popped.push(row.pubkey);
                    false
                } else {
                    true
                }
            })
            .collect();
        self.set_rows(&remaining);
        popped
    }

    /// Ledger side of a push landing with `next_timestamp`.
    pub fn settle_push(&self, feed: Pubkey, next_timestamp: i64) {
        let mut rows = self.rows();
        rows.push(CrankRow::new(feed, next_timestamp));
        self.set_rows(&rows);
    }

    pub fn peek_ready(&self, now: i64) -> Vec<Pubkey> {
        let data = self.ledger().get(&self.context.crank_data_buffer).unwrap();
        CrankScheduler::peek_ready(&data, now, DEFAULT_POP_LIMIT)
            .unwrap()
            .into_iter()
            .map(|row| row.pubkey)
            .collect()
    }
}
