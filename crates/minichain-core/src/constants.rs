pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero hex characters required of a valid proof's digest.
pub const POW_DIFFICULTY: u32 = 4;

/// Proof carried by the genesis block. Not a solution to any puzzle; it is
/// only the reference value the first real proof is searched against.
pub const GENESIS_PROOF: u64 = 100;

/// Sentinel `previous_hash` of the genesis block. One character long, so it
/// can never collide with a real 64-char hex digest.
pub const GENESIS_PREVIOUS_HASH: &str = "1";
