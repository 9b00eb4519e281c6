//! Known Tokens
//!
//! Mints the router knows by symbol, with their decimals.

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// USDT mint
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
/// JUP mint
pub const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";
/// BONK mint
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

/// Static token metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub mint: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

pub const KNOWN_TOKENS: &[TokenInfo] = &[
    TokenInfo { mint: SOL_MINT, symbol: "SOL", decimals: 9 },
    TokenInfo { mint: USDC_MINT, symbol: "USDC", decimals: 6 },
    TokenInfo { mint: USDT_MINT, symbol: "USDT", decimals: 6 },
    TokenInfo { mint: JUP_MINT, symbol: "JUP", decimals: 6 },
    TokenInfo { mint: BONK_MINT, symbol: "BONK", decimals: 5 },
];

/// Stablecoins priced at exactly $1
pub const STABLECOINS: &[&str] = &[USDC_MINT, USDT_MINT];

pub fn by_mint(mint: &str) -> Option<&'static TokenInfo> {
    KNOWN_TOKENS.iter().find(|t| t.mint == mint)
}

pub fn by_symbol(symbol: &str) -> Option<&'static TokenInfo> {
    KNOWN_TOKENS.iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

/// Resolve a symbol or raw mint address to a mint
pub fn resolve_mint(symbol_or_mint: &str) -> String {
    by_symbol(symbol_or_mint)
        .map(|t| t.mint.to_string())
        .unwrap_or_else(|| symbol_or_mint.to_string())
}

pub fn is_stablecoin(mint: &str) -> bool {
    STABLECOINS.contains(&mint)
}
