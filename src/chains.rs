// =============================================================================
// chains.rs — WHICH EXPLORER LIVES ON WHICH CHAIN
// =============================================================================
//
// The scrapers drop their output under a directory named after the explorer
// they scraped (etherscan/, basescan/, ...). That directory name is the ONLY
// place the chain lives. This table turns it into a chain ID.
//
// Keys are stored lower-case and looked up lower-cased, so Etherscan/,
// ETHERSCAN/ and etherscan/ are all mainnet. Anything not in here is simply
// unknown: no panic, no error, just None for the caller to deal with.
// =============================================================================

/// Explorer directory name → EVM chain ID. Immutable for the life of the
/// process. Order is only used for `--list-chains`.
pub const CHAIN_IDS: &[(&str, u64)] = &[
    ("etherscan", 1),
    ("arbiscan", 42161),
    ("basescan", 8453),
    ("bscscan", 56),
    ("celo", 42220),
    ("gnosis", 100),
    ("optimism", 10),
];

/// Resolve an explorer directory name to its chain ID, ignoring case.
pub fn chain_id_for(explorer: &str) -> Option<u64> {
    let needle = explorer.to_lowercase();
    CHAIN_IDS
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, id)| *id)
}

/// Every known explorer with its chain ID.
pub fn known_explorers() -> impl Iterator<Item = (&'static str, u64)> {
    CHAIN_IDS.iter().copied()
}
