use crate::{chain::Ledger, pow, Block, LedgerError};
use tracing::info;

/// Sender recorded on mining-reward transactions, marking freshly created
/// value rather than a transfer.
pub const REWARD_SENDER: &str = "0";
pub const REWARD_AMOUNT: u64 = 1;

/// Runs one full mining cycle: snapshot the tip's proof, search for the next
/// proof with no ledger lock held, credit the reward, seal.
///
/// If another seal lands between the snapshot and ours, the found proof no
/// longer solves the puzzle against the new tip and [`Ledger::seal_block`]
/// returns [`LedgerError::StaleProof`]. The reward transaction stays in the
/// pool in that case and rides along in the next sealed block; callers may
/// simply retry the cycle.
pub fn mine_next_block(ledger: &Ledger, reward_recipient: &str) -> Result<Block, LedgerError> {
    let tip_proof = ledger.tip()?.proof;
    let proof = pow::find(tip_proof, ledger.difficulty());

    ledger.submit_transaction(REWARD_SENDER, reward_recipient, REWARD_AMOUNT)?;
    let block = ledger.seal_block(proof)?;
    info!(
        index = block.index,
        proof = block.proof,
        transactions = block.transactions.len(),
        "sealed block"
    );
    Ok(block)
}
