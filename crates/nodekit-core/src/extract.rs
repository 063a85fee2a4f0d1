//! Recovering a deployed contract address from migration output
//!
//! Build output differs between toolchain versions, so no single source is
//! trusted. An [`AddressExtractor`] runs an ordered list of
//! [`AddressStrategy`] tiers and returns the first well-formed address:
//!
//! 1. [`LogScan`] - the captured migration log (`<build_dir>/deploy.log`)
//! 2. [`StructuredArtifacts`] - `networks.*.address` in `<Name>.json` artifacts
//! 3. [`RawText`] - any `"address":` line near a mention of the contract
//!
//! An empty result is not an error; callers fall back to asking the operator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::validate::is_valid_address;

/// File the migration output is captured to, relative to the build dir
pub const DEPLOY_LOG: &str = "deploy.log";

/// Compiled artifact directory, relative to the build dir
pub const CONTRACTS_DIR: &str = "build/contracts";

/// How many lines after a deployment header may hold its address
const LOG_LOOKAHEAD: usize = 10;

/// How many lines around an `"address":` line may mention the contract
const RAW_CONTEXT: usize = 5;

static RAW_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""address"\s*:\s*"(0x[0-9a-fA-F]{40})""#).expect("static regex is valid")
});

// =============================================================================
// Trait Definition
// =============================================================================

/// One way of finding a deployed contract's address
pub trait AddressStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Look for the address of `contract`. `Ok(None)` means nothing found.
    fn extract(&self, contract: &str) -> Result<Option<String>>;
}

// =============================================================================
// Extractor
// =============================================================================

/// Ordered chain of strategies, short-circuiting on the first hit
pub struct AddressExtractor {
    strategies: Vec<Box<dyn AddressStrategy>>,
}

impl AddressExtractor {
    pub fn new(strategies: Vec<Box<dyn AddressStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default three tiers, all rooted at `build_dir`
    pub fn standard(build_dir: &Path) -> Self {
        let contracts_dir = build_dir.join(CONTRACTS_DIR);
        Self::new(vec![
            Box::new(LogScan::new(build_dir.join(DEPLOY_LOG))),
            Box::new(StructuredArtifacts::new(contracts_dir.clone())),
            Box::new(RawText::new(contracts_dir)),
        ])
    }

    /// Names of the configured tiers, in order
    pub fn tiers(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Address of `contract`, or `None` when every tier comes up empty.
    pub fn extract(&self, contract: &str) -> Option<String> {
        self.extract_with_tier(contract).map(|(_, address)| address)
    }

    /// Like [`AddressExtractor::extract`], also naming the tier that answered.
    pub fn extract_with_tier(&self, contract: &str) -> Option<(&'static str, String)> {
        for strategy in &self.strategies {
            match strategy.extract(contract) {
                Ok(Some(address)) if is_valid_address(&address) => {
                    debug!(tier = strategy.name(), %address, contract, "address found");
                    return Some((strategy.name(), address));
                }
                Ok(Some(candidate)) => {
                    debug!(tier = strategy.name(), %candidate, "discarding malformed address");
                }
                Ok(None) => trace!(tier = strategy.name(), contract, "no address"),
                Err(e) => debug!(tier = strategy.name(), error = %e, "tier failed, skipping"),
            }
        }
        None
    }
}

// =============================================================================
// Tier 1: migration log
// =============================================================================

/// Scans the captured migration output for the contract's deployment block
#[derive(Debug, Clone)]
pub struct LogScan {
    log_path: PathBuf,
}

impl LogScan {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }
}

impl AddressStrategy for LogScan {
    fn name(&self) -> &'static str {
        "log"
    }

    fn extract(&self, contract: &str) -> Result<Option<String>> {
        if !self.log_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.log_path)?;
        let lines: Vec<&str> = content.lines().collect();
        let headers = [
            format!("Deploying '{}'", contract),
            format!("Replacing '{}'", contract),
        ];

        for (i, line) in lines.iter().enumerate() {
            if !headers.iter().any(|h| line.contains(h.as_str())) {
                continue;
            }

            // Stop at the next deployment block so a neighbour's address is never taken
            let candidate = lines[i + 1..]
                .iter()
                .take(LOG_LOOKAHEAD)
                .take_while(|l| !is_deployment_header(l))
                .find(|l| l.contains("contract address:"))
                .and_then(|l| l.split_whitespace().last());

            if let Some(address) = candidate.filter(|a| is_valid_address(a)) {
                return Ok(Some(address.to_string()));
            }
        }

        Ok(None)
    }
}

fn is_deployment_header(line: &str) -> bool {
    line.contains("Deploying '") || line.contains("Replacing '")
}

// =============================================================================
// Tier 2: structured artifacts
// =============================================================================

#[derive(Debug, Deserialize)]
struct ArtifactRecord {
    #[serde(default)]
    networks: BTreeMap<String, NetworkRecord>,
}

#[derive(Debug, Deserialize)]
struct NetworkRecord {
    #[serde(default)]
    address: Option<String>,
}

/// Reads `networks.<id>.address` from every `<Name>.json` artifact
#[derive(Debug, Clone)]
pub struct StructuredArtifacts {
    contracts_dir: PathBuf,
}

impl StructuredArtifacts {
    pub fn new(contracts_dir: PathBuf) -> Self {
        Self { contracts_dir }
    }
}

impl AddressStrategy for StructuredArtifacts {
    fn name(&self) -> &'static str {
        "artifact"
    }

    fn extract(&self, contract: &str) -> Result<Option<String>> {
        let file_name = format!("{}.json", contract);
        let files = list_files(&self.contracts_dir)?;

        for path in files
            .iter()
            .filter(|p| p.file_name().is_some_and(|n| n == file_name.as_str()))
        {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable artifact");
                    continue;
                }
            };
            let record: ArtifactRecord = match serde_json::from_str(&content) {
                Ok(record) => record,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unparseable artifact");
                    continue;
                }
            };

            let address = record
                .networks
                .into_values()
                .filter_map(|n| n.address)
                .find(|a| is_valid_address(a));

            if address.is_some() {
                return Ok(address);
            }
        }

        Ok(None)
    }
}

// =============================================================================
// Tier 3: raw text
// =============================================================================

/// Greps every artifact for an `"address":` entry near the contract name
#[derive(Debug, Clone)]
pub struct RawText {
    contracts_dir: PathBuf,
}

impl RawText {
    pub fn new(contracts_dir: PathBuf) -> Self {
        Self { contracts_dir }
    }
}

impl AddressStrategy for RawText {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn extract(&self, contract: &str) -> Result<Option<String>> {
        if contract.is_empty() {
            return Ok(None);
        }

        // Whole-word match so `Client` never picks up `ClientFactory`
        let name = Regex::new(&format!(r"\b{}\b", regex::escape(contract)))
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;

        for path in list_files(&self.contracts_dir)? {
            // Binary or non-UTF-8 files can't hold the entry we're after
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };

            let named_file = path.file_stem().is_some_and(|stem| stem == contract);
            let lines: Vec<&str> = content.lines().collect();

            for (i, line) in lines.iter().enumerate() {
                if !line.contains("\"address\":") {
                    continue;
                }

                let start = i.saturating_sub(RAW_CONTEXT);
                let end = (i + RAW_CONTEXT + 1).min(lines.len());
                let mentioned = named_file || lines[start..end].iter().any(|l| name.is_match(l));
                if !mentioned {
                    continue;
                }

                if let Some(caps) = RAW_ADDRESS.captures(line) {
                    return Ok(Some(caps[1].to_string()));
                }
            }
        }

        Ok(None)
    }
}

/// All regular files below `dir`, sorted by path. A missing dir is empty.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        collect_files(dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const ADDR_C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    fn migration_log(contract: &str, address: &str) -> String {
        format!(
            r#"
Starting migrations...
======================
> Network name:    'testnet'

2_deploy_client.js
==================

   Deploying '{contract}'
   ----------------------
   > transaction hash:    0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef
   > Blocks: 1            Seconds: 12
   > contract address:    {address}
   > block number:        1234
"#
        )
    }

    fn write_artifact(build_dir: &Path, contract: &str, address: &str) {
        let dir = build_dir.join(CONTRACTS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let json = format!(
            r#"{{
  "contractName": "{contract}",
  "abi": [],
  "networks": {{
    "11155111": {{
      "events": {{}},
      "links": {{}},
      "address": "{address}",
      "transactionHash": "0x01"
    }}
  }}
}}"#
        );
        std::fs::write(dir.join(format!("{}.json", contract)), json).unwrap();
    }

    #[test]
    fn test_log_tier_wins_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEPLOY_LOG), migration_log("Client", ADDR_A)).unwrap();
        write_artifact(dir.path(), "Client", ADDR_B);

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(
            extractor.extract_with_tier("Client"),
            Some(("log", ADDR_A.to_string()))
        );
    }

    #[test]
    fn test_artifact_tier_without_log() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "Client", ADDR_B);

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(
            extractor.extract_with_tier("Client"),
            Some(("artifact", ADDR_B.to_string()))
        );
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(&contracts).unwrap();
        std::fs::write(dir.path().join(DEPLOY_LOG), "Compiling your contracts...\n").unwrap();
        std::fs::write(
            contracts.join("Migrations.json"),
            format!("{{\n  \"address\": \"{}\"\n}}\n", ADDR_C),
        )
        .unwrap();

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(extractor.extract("Client"), None);
    }

    #[test]
    fn test_missing_build_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = AddressExtractor::standard(&dir.path().join("nope"));

        assert_eq!(extractor.extract("Client"), None);
        assert_eq!(extractor.tiers(), vec!["log", "artifact", "raw"]);
    }

    #[test]
    fn test_log_ignores_other_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let log = format!(
            "{}{}",
            migration_log("Migrations", ADDR_C),
            migration_log("Client", ADDR_A)
        );
        std::fs::write(dir.path().join(DEPLOY_LOG), log).unwrap();

        let scan = LogScan::new(dir.path().join(DEPLOY_LOG));

        assert_eq!(scan.extract("Client").unwrap(), Some(ADDR_A.to_string()));
        assert_eq!(scan.extract("Migrations").unwrap(), Some(ADDR_C.to_string()));
    }

    #[test]
    fn test_log_does_not_cross_into_next_block() {
        let dir = tempfile::tempdir().unwrap();
        let log = "   Deploying 'Client'\n   > transaction hash: 0x01\n   Error: out of gas\n"
            .to_string()
            + &migration_log("Other", ADDR_C);
        std::fs::write(dir.path().join(DEPLOY_LOG), log).unwrap();

        let scan = LogScan::new(dir.path().join(DEPLOY_LOG));

        assert_eq!(scan.extract("Client").unwrap(), None);
    }

    #[test]
    fn test_log_replacing_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = migration_log("Client", ADDR_A).replace("Deploying", "Replacing");
        std::fs::write(dir.path().join(DEPLOY_LOG), log).unwrap();

        let scan = LogScan::new(dir.path().join(DEPLOY_LOG));

        assert_eq!(scan.extract("Client").unwrap(), Some(ADDR_A.to_string()));
    }

    #[test]
    fn test_malformed_log_address_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEPLOY_LOG), migration_log("Client", "0xdead")).unwrap();
        write_artifact(dir.path(), "Client", ADDR_B);

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(extractor.extract("Client"), Some(ADDR_B.to_string()));
    }

    #[test]
    fn test_artifact_skips_networks_without_address() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(contracts.join("nested")).unwrap();
        std::fs::write(contracts.join("broken.json"), "{ not json").unwrap();
        std::fs::write(
            contracts.join("nested").join("Client.json"),
            format!(
                r#"{{"networks": {{"1": {{"events": {{}}}}, "5": {{"address": "{}"}}}}}}"#,
                ADDR_B
            ),
        )
        .unwrap();

        let tier = StructuredArtifacts::new(contracts);

        assert_eq!(tier.extract("Client").unwrap(), Some(ADDR_B.to_string()));
    }

    #[test]
    fn test_raw_tier_when_json_is_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(&contracts).unwrap();
        // Truncated artifact: serde gives up, the text is still there
        std::fs::write(
            contracts.join("Client.json"),
            format!(
                "{{\n  \"networks\": {{\n    \"5\": {{\n      \"address\": \"{}\",\n",
                ADDR_C
            ),
        )
        .unwrap();

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(
            extractor.extract_with_tier("Client"),
            Some(("raw", ADDR_C.to_string()))
        );
    }

    #[test]
    fn test_raw_tier_uses_surrounding_lines() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(&contracts).unwrap();
        std::fs::write(
            contracts.join("deployments.txt"),
            format!(
                "name: Other\n\"address\": \"{}\"\n\n\n\n\n\n\nname: Client\n\"address\": \"{}\"\n",
                ADDR_C, ADDR_A
            ),
        )
        .unwrap();

        let tier = RawText::new(contracts);

        assert_eq!(tier.extract("Client").unwrap(), Some(ADDR_A.to_string()));
    }

    #[test]
    fn test_raw_tier_ignores_longer_contract_names() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(&contracts).unwrap();
        std::fs::write(
            contracts.join("ClientFactory.json"),
            "{\n  \"address\": \"0x1111111111111111111111111111111111111111\"\n}\n",
        )
        .unwrap();

        let extractor = AddressExtractor::standard(dir.path());

        assert_eq!(extractor.extract_with_tier("Client"), None);
    }

    #[test]
    fn test_log_lookahead_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join(DEPLOY_LOG);
        let block = |fillers: usize| {
            let mut log = String::from("   Deploying 'Client'\n");
            for _ in 0..fillers {
                log.push_str("   > waiting for receipt\n");
            }
            log.push_str(&format!("   > contract address:    {}\n", ADDR_A));
            log
        };
        let scan = LogScan::new(log_path.clone());

        // Tenth line after the header
        std::fs::write(&log_path, block(9)).unwrap();
        assert_eq!(scan.extract("Client").unwrap(), Some(ADDR_A.to_string()));

        // Eleventh
        std::fs::write(&log_path, block(10)).unwrap();
        assert_eq!(scan.extract("Client").unwrap(), None);
    }

    #[test]
    fn test_artifact_skips_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let contracts = dir.path().join(CONTRACTS_DIR);
        std::fs::create_dir_all(contracts.join("nested")).unwrap();
        // Not UTF-8, so reading it as text fails; sorts before the nested copy
        std::fs::write(contracts.join("Client.json"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        std::fs::write(
            contracts.join("nested").join("Client.json"),
            format!(r#"{{"networks": {{"5": {{"address": "{}"}}}}}}"#, ADDR_B),
        )
        .unwrap();

        let tier = StructuredArtifacts::new(contracts);

        assert_eq!(tier.extract("Client").unwrap(), Some(ADDR_B.to_string()));
    }

    struct Fixed(&'static str, Option<&'static str>);

    struct Failing;

    impl AddressStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract(&self, _contract: &str) -> Result<Option<String>> {
            Err(Error::Validation("boom".into()))
        }
    }

    impl AddressStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn extract(&self, _contract: &str) -> Result<Option<String>> {
            Ok(self.1.map(String::from))
        }
    }

    #[test]
    fn test_custom_chain_order() {
        let extractor = AddressExtractor::new(vec![
            Box::new(Fixed("first", None)),
            Box::new(Fixed("second", Some(ADDR_B))),
            Box::new(Fixed("third", Some(ADDR_C))),
        ]);

        assert_eq!(
            extractor.extract_with_tier("X"),
            Some(("second", ADDR_B.to_string()))
        );
    }

    #[test]
    fn test_failing_tier_is_skipped() {
        let extractor = AddressExtractor::new(vec![
            Box::new(Failing),
            Box::new(Fixed("fallback", Some(ADDR_C))),
        ]);

        assert_eq!(
            extractor.extract_with_tier("Client"),
            Some(("fallback", ADDR_C.to_string()))
        );
    }
}
