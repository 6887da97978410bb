//! Source-to-bytecode compilation.

use std::{future::Future, path::PathBuf, process::Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::contract::ContractSource;

/// Severity of a compiler diagnostic. Only `Error` is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// The compiler reported at least one fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Compilation failed: {}", join_errors(.diagnostics))]
pub struct CompilationError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![Diagnostic::error(message)],
        }
    }
}

fn join_errors(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub name: String,
    pub abi: Value,
    /// Creation bytecode as hex, with or without a `0x` prefix.
    pub bytecode: String,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Diagnostic>,
}

/// Turns a contract source into deployable bytecode.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        contract: &ContractSource,
    ) -> impl Future<Output = Result<CompiledContract, CompilationError>> + Send;
}

impl<C: Compiler> Compiler for &C {
    fn compile(
        &self,
        contract: &ContractSource,
    ) -> impl Future<Output = Result<CompiledContract, CompilationError>> + Send {
        (**self).compile(contract)
    }
}

/// Compiles Solidity by running `solc --standard-json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolcCompiler {
    pub solc_path: PathBuf,
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self {
            solc_path: PathBuf::from("solc"),
        }
    }
}

impl SolcCompiler {
    pub fn new(solc_path: impl Into<PathBuf>) -> Self {
        Self {
            solc_path: solc_path.into(),
        }
    }
}

impl Compiler for SolcCompiler {
    async fn compile(
        &self,
        contract: &ContractSource,
    ) -> Result<CompiledContract, CompilationError> {
        tracing::info!(
            contract = %contract.name,
            solc = %self.solc_path.display(),
            "Compiling Solidity contract..."
        );

        let input = serde_json::to_vec(&standard_json_input(contract))
            .map_err(|e| CompilationError::new(format!("failed to encode compiler input: {e}")))?;

        let mut child = tokio::process::Command::new(&self.solc_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CompilationError::new(format!(
                    "failed to run {}: {e}",
                    self.solc_path.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| {
                    CompilationError::new(format!("failed to write compiler input: {e}"))
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CompilationError::new(format!("failed to wait for solc: {e}")))?;

        if !output.status.success() && output.stdout.is_empty() {
            return Err(CompilationError::new(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_standard_json_output(&contract.name, &output.stdout)
    }
}

/// File name under which a contract's source is submitted to solc.
fn source_file_name(contract_name: &str) -> String {
    format!("{contract_name}.sol")
}

pub(crate) fn standard_json_input(contract: &ContractSource) -> Value {
    serde_json::json!({
        "language": "Solidity",
        "sources": {
            source_file_name(&contract.name): { "content": contract.source }
        },
        "settings": {
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode"] }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct SolcError {
    severity: Severity,
    message: String,
    #[serde(rename = "formattedMessage")]
    formatted_message: Option<String>,
}

pub(crate) fn parse_standard_json_output(
    contract_name: &str,
    stdout: &[u8],
) -> Result<CompiledContract, CompilationError> {
    let output: Value = serde_json::from_slice(stdout)
        .map_err(|e| CompilationError::new(format!("invalid solc output: {e}")))?;

    let diagnostics: Vec<Diagnostic> = match output.get("errors") {
        Some(errors) => serde_json::from_value::<Vec<SolcError>>(errors.clone())
            .map_err(|e| CompilationError::new(format!("invalid solc diagnostics: {e}")))?
            .into_iter()
            .map(|e| Diagnostic {
                severity: e.severity,
                message: match e.severity {
                    Severity::Error => e.message,
                    _ => e.formatted_message.unwrap_or(e.message),
                },
            })
            .collect(),
        None => Vec::new(),
    };

    if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        return Err(CompilationError { diagnostics });
    }

    let compiled = &output["contracts"][source_file_name(contract_name)][contract_name];
    let bytecode = compiled["evm"]["bytecode"]["object"]
        .as_str()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            CompilationError::new(format!(
                "contract {contract_name} not found in compiler output"
            ))
        })?;

    Ok(CompiledContract {
        name: contract_name.to_string(),
        abi: compiled["abi"].clone(),
        bytecode: bytecode.to_string(),
        warnings: diagnostics,
    })
}
