//! Network parameters
//!
//! Version bytes and bech32 prefixes are protocol constants; the only
//! runtime choice is which network they are taken from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bitcoin network an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Regtest,
}

/// Address prefixes for one network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Base58Check version byte for P2PKH
    pub p2pkh_version: u8,
    /// Base58Check version byte for P2SH
    pub p2sh_version: u8,
    /// Bech32 human-readable part
    pub bech32_hrp: &'static str,
}

const MAINNET: NetworkParams = NetworkParams {
    p2pkh_version: 0x00,
    p2sh_version: 0x05,
    bech32_hrp: "bc",
};

const TESTNET: NetworkParams = NetworkParams {
    p2pkh_version: 0x6f,
    p2sh_version: 0xc4,
    bech32_hrp: "tb",
};

const REGTEST: NetworkParams = NetworkParams {
    p2pkh_version: 0x6f,
    p2sh_version: 0xc4,
    bech32_hrp: "bcrt",
};

impl Network {
    /// All supported networks, in lookup order
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Regtest];

    pub fn params(&self) -> &'static NetworkParams {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
            Network::Regtest => &REGTEST,
        }
    }

    pub fn p2pkh_version(&self) -> u8 {
        self.params().p2pkh_version
    }

    pub fn p2sh_version(&self) -> u8 {
        self.params().p2sh_version
    }

    pub fn bech32_hrp(&self) -> &'static str {
        self.params().bech32_hrp
    }

    /// Network owning a bech32 human-readable part
    pub fn from_hrp(hrp: &str) -> Option<Network> {
        let hrp = hrp.to_ascii_lowercase();
        Self::ALL.into_iter().find(|n| n.bech32_hrp() == hrp)
    }

    /// Network and P2SH flag for a Base58Check version byte.
    ///
    /// Testnet and regtest share version bytes; testnet is reported.
    pub fn from_base58_version(version: u8) -> Option<(Network, bool)> {
        match version {
            0x00 => Some((Network::Mainnet, false)),
            0x05 => Some((Network::Mainnet, true)),
            0x6f => Some((Network::Testnet, false)),
            0xc4 => Some((Network::Testnet, true)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unsupported network name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}
