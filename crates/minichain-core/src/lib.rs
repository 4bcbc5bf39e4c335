use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod mine;

pub use constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF, POW_DIFFICULTY};

/// A transfer waiting in the pool or sealed into a block.
///
/// Fields are declared in lexicographic order: the JSON emitted by serde is
/// the canonical form hashed by [`Block::hash`], so the order is load-bearing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub amount: u64,
    pub recipient: String,
    pub sender: String,
}

/// An immutable element of the chain. Same rule as [`Transaction`]: field
/// order is the canonical hashing order, do not reorder.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub proof: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// SHA-256 over the block's canonical JSON serialization, as lowercase hex.
    pub fn hash(&self) -> String {
        let bytes = serde_json::to_vec(self).expect("block serialization cannot fail");
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid transaction: {0}")]
    Validation(&'static str),

    #[error("proof {candidate} does not satisfy the puzzle against tip proof {tip_proof}")]
    StaleProof { tip_proof: u64, candidate: u64 },

    #[error("chain has no blocks")]
    EmptyChain,
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

pub mod pow {
    use sha2::{Digest, Sha256};

    /// Number of leading `'0'` characters in the hex rendering of `hash`.
    pub fn leading_zero_chars(hash: &[u8; 32]) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else {
                if b >> 4 == 0 {
                    total += 1;
                }
                break;
            }
        }
        total
    }

    fn guess_hash(previous_proof: u64, candidate: u64) -> [u8; 32] {
        // The puzzle input is the two decimal representations back to back,
        // no separator.
        let mut hasher = Sha256::new();
        hasher.update(previous_proof.to_string().as_bytes());
        hasher.update(candidate.to_string().as_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }

    /// Cheap half of the puzzle: one hash, true iff the digest of
    /// `{previous_proof}{candidate}` starts with `difficulty` zero hex chars.
    pub fn is_valid(previous_proof: u64, candidate: u64, difficulty: u32) -> bool {
        leading_zero_chars(&guess_hash(previous_proof, candidate)) >= difficulty
    }

    /// Expensive half: scan candidates from 0 upward and return the first
    /// that satisfies [`is_valid`]. Expected cost is O(16^difficulty) hashes.
    pub fn find(previous_proof: u64, difficulty: u32) -> u64 {
        let mut candidate = 0u64;
        while !is_valid(previous_proof, candidate, difficulty) {
            candidate += 1;
        }
        candidate
    }
}

pub mod chain {
    use super::{pow, unix_now, Block, LedgerError, Transaction};
    use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF, POW_DIFFICULTY};
    use std::sync::Mutex;

    /// Transactions submitted since the last seal, in submission order.
    #[derive(Debug, Default)]
    pub struct TransactionPool {
        pending: Vec<Transaction>,
    }

    impl TransactionPool {
        pub fn new() -> Self {
            Self::default()
        }

        /// Appends and returns the pool size after the append.
        pub fn submit(&mut self, tx: Transaction) -> usize {
            self.pending.push(tx);
            self.pending.len()
        }

        /// Takes every pending transaction, leaving the pool empty. A
        /// transaction handed out here is never handed out again.
        pub fn drain(&mut self) -> Vec<Transaction> {
            std::mem::take(&mut self.pending)
        }

        pub fn len(&self) -> usize {
            self.pending.len()
        }

        pub fn is_empty(&self) -> bool {
            self.pending.is_empty()
        }
    }

    #[derive(Debug)]
    struct LedgerInner {
        blocks: Vec<Block>,
        pool: TransactionPool,
    }

    /// The chain plus its pending pool, behind one mutex. Submissions and
    /// seals serialize on that mutex; at most one seal is ever in flight.
    ///
    /// The proof *search* takes no lock: callers snapshot `tip().proof`,
    /// run [`pow::find`] outside, and present the result to [`seal_block`],
    /// which re-checks it against whatever the tip is by then.
    #[derive(Debug)]
    pub struct Ledger {
        difficulty: u32,
        inner: Mutex<LedgerInner>,
    }

    impl Ledger {
        pub fn new() -> Self {
            Self::with_difficulty(POW_DIFFICULTY)
        }

        pub fn with_difficulty(difficulty: u32) -> Self {
            let genesis = Block {
                index: 1,
                previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
                proof: GENESIS_PROOF,
                timestamp: unix_now(),
                transactions: Vec::new(),
            };
            Self {
                difficulty,
                inner: Mutex::new(LedgerInner {
                    blocks: vec![genesis],
                    pool: TransactionPool::new(),
                }),
            }
        }

        pub fn difficulty(&self) -> u32 {
            self.difficulty
        }

        /// Queues a transaction for the next block and returns the index of
        /// the block that will hold it.
        pub fn submit_transaction(
            &self,
            sender: &str,
            recipient: &str,
            amount: u64,
        ) -> Result<u64, LedgerError> {
            if sender.is_empty() {
                return Err(LedgerError::Validation("sender must not be empty"));
            }
            if recipient.is_empty() {
                return Err(LedgerError::Validation("recipient must not be empty"));
            }
            let mut inner = self.inner.lock().expect("ledger mutex poisoned");
            inner.pool.submit(Transaction {
                amount,
                recipient: recipient.to_string(),
                sender: sender.to_string(),
            });
            Ok(inner.blocks.len() as u64 + 1)
        }

        /// Drains the pool into a new block linked to the current tip and
        /// appends it. The proof is re-verified against the tip's proof
        /// before anything is touched, so a stale or bogus proof leaves both
        /// the chain and the pool exactly as they were.
        pub fn seal_block(&self, proof: u64) -> Result<Block, LedgerError> {
            let mut guard = self.inner.lock().expect("ledger mutex poisoned");
            let inner = &mut *guard;

            let tip = inner.blocks.last().ok_or(LedgerError::EmptyChain)?;
            if !pow::is_valid(tip.proof, proof, self.difficulty) {
                return Err(LedgerError::StaleProof {
                    tip_proof: tip.proof,
                    candidate: proof,
                });
            }
            let previous_hash = tip.hash();

            let block = Block {
                index: inner.blocks.len() as u64 + 1,
                previous_hash,
                proof,
                timestamp: unix_now(),
                transactions: inner.pool.drain(),
            };
            inner.blocks.push(block.clone());
            Ok(block)
        }

        /// Last block of the chain. `EmptyChain` is unreachable through the
        /// public API (construction plants genesis) and would mean a broken
        /// invariant, not a recoverable condition.
        pub fn tip(&self) -> Result<Block, LedgerError> {
            let inner = self.inner.lock().expect("ledger mutex poisoned");
            inner.blocks.last().cloned().ok_or(LedgerError::EmptyChain)
        }

        /// Full ordered snapshot of the chain.
        pub fn chain(&self) -> Vec<Block> {
            self.inner
                .lock()
                .expect("ledger mutex poisoned")
                .blocks
                .clone()
        }

        pub fn len(&self) -> usize {
            self.inner.lock().expect("ledger mutex poisoned").blocks.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn hash_of(&self, block: &Block) -> String {
            block.hash()
        }
    }

    impl Default for Ledger {
        fn default() -> Self {
            Self::new()
        }
    }
}
