//! Contract sources and their bytecode kind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Bytecode family a contract source compiles to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Solidity, compiled to EVM bytecode.
    Solidity,
    /// Move, for the network's second VM. Not deployable by this engine.
    Move,
}

impl ContractKind {
    /// Classify source text. A `module` declaration or a `script` block outside
    /// a `//` comment marks the source as Move.
    pub fn detect(source: &str) -> Self {
        let is_move = source.lines().map(strip_line_comment).any(|code| {
            keyword_followed_by(code, "module", |rest| rest.starts_with(char::is_whitespace))
                || keyword_followed_by(code, "script", |rest| rest.trim_start().starts_with('{'))
        });

        if is_move {
            Self::Move
        } else {
            Self::Solidity
        }
    }
}

fn strip_line_comment(line: &str) -> &str {
    line.find("//").map_or(line, |at| &line[..at])
}

/// Whether `keyword` appears as a whole word and the text after it satisfies `follows`.
fn keyword_followed_by(code: &str, keyword: &str, follows: impl Fn(&str) -> bool) -> bool {
    code.match_indices(keyword).any(|(at, _)| {
        let boundary = code[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        boundary && follows(&code[at + keyword.len()..])
    })
}

/// A named contract source, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    pub name: String,
    pub source: String,
    /// Kind implied by where the source came from, e.g. a `.move` file.
    declared: Option<ContractKind>,
}

/// File extensions picked up when scanning a contracts directory.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["sol", "move"];

impl ContractSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            declared: None,
        }
    }

    /// Fix the kind instead of detecting it from the source text.
    pub fn with_kind(mut self, kind: ContractKind) -> Self {
        self.declared = Some(kind);
        self
    }

    pub fn kind(&self) -> ContractKind {
        self.declared
            .unwrap_or_else(|| ContractKind::detect(&self.source))
    }

    /// Load a contract from a file. The contract is named after the file stem.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| format!("Cannot derive a contract name from {}", path.display()))?;

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read contract source {}", path.display()))?;

        let contract = Self::new(name, source);
        if path.extension().is_some_and(|ext| ext == "move") {
            return Ok(contract.with_kind(ContractKind::Move));
        }
        Ok(contract)
    }

    /// Load every contract source in a directory, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read contracts directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
            })
            .collect();
        paths.sort();

        tracing::debug!(dir = %dir.display(), count = paths.len(), "Found contract sources");

        paths.iter().map(|path| Self::from_file(path)).collect()
    }

    /// Load contracts from a mix of files and directories, keeping the given order.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Vec<Self>> {
        let mut contracts = Vec::new();
        for path in paths {
            if path.is_dir() {
                contracts.extend(Self::from_dir(path)?);
            } else {
                contracts.push(Self::from_file(path)?);
            }
        }
        Ok(contracts)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    const TOKEN: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

contract SimpleToken {
    uint256 public totalSupply = 1000000;
}"#;

    const COUNTER_MOVE: &str =
        "module 0x1::counter {\n    struct Counter has key { value: u64 }\n}\n";

    #[test]
    fn test_detect_kind() {
        assert_eq!(ContractKind::detect(TOKEN), ContractKind::Solidity);
        assert_eq!(ContractKind::detect(COUNTER_MOVE), ContractKind::Move);
        assert_eq!(
            ContractKind::detect("address 0x1 {\n    module counter {}\n}"),
            ContractKind::Move
        );
    }

    #[test]
    fn test_module_inside_a_comment_line_is_not_move() {
        let source = "// this contract is a module for tokens\ncontract Token {}";
        assert_eq!(ContractKind::detect(source), ContractKind::Solidity);
    }

    #[test]
    fn test_detect_inline_module_and_script() {
        assert_eq!(
            ContractKind::detect("address 0x1 { module counter { } }"),
            ContractKind::Move
        );
        assert_eq!(
            ContractKind::detect("script {\n    fun main(account: signer) {}\n}"),
            ContractKind::Move
        );
        assert_eq!(
            ContractKind::detect("contract Submodule { uint256 submodule ; }"),
            ContractKind::Solidity
        );
        assert_eq!(
            ContractKind::detect("contract Runner {\n    function script() public {}\n}"),
            ContractKind::Solidity
        );
    }

    #[test]
    fn test_move_extension_wins_over_detection() {
        let dir = TempDir::new("umikit-contracts").unwrap();
        let path = dir.path().join("Empty.move");
        std::fs::write(&path, "// nothing declared yet\n").unwrap();

        let contract = ContractSource::from_file(&path).unwrap();
        assert_eq!(contract.kind(), ContractKind::Move);
        assert_eq!(ContractSource::new("Empty", "").kind(), ContractKind::Solidity);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ContractKind::Solidity.to_string(), "solidity");
        assert_eq!(
            serde_json::to_value(ContractKind::Move).unwrap(),
            serde_json::json!("move")
        );
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new("umikit-contracts").unwrap();
        std::fs::write(dir.path().join("SimpleToken.sol"), TOKEN).unwrap();
        std::fs::write(dir.path().join("Counter.move"), COUNTER_MOVE).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a contract").unwrap();

        let contracts = ContractSource::from_dir(dir.path()).unwrap();
        let names: Vec<_> = contracts.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["Counter", "SimpleToken"]);
        assert_eq!(contracts[0].kind(), ContractKind::Move);
        assert_eq!(contracts[1].source, TOKEN);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ContractSource::from_file(Path::new("/nonexistent/Token.sol")).unwrap_err();
        assert!(err.to_string().contains("Failed to read contract source"));
    }
}
