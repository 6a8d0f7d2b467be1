// SPDX-License-Identifier: MIT
use std::future::Future;
use std::path::PathBuf;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use vault_types::types::SpellResult;

/// The attestation embedded in a transaction could not be verified.
///
/// Always fatal: a transaction whose spell fails verification is never
/// treated as a transaction without state.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("spell verifier is unavailable: {0}")]
    Unavailable(String),

    #[error("spell rejected: {0}")]
    Rejected(String),

    #[error("spell verifier returned malformed output: {0}")]
    MalformedOutput(String),
}

/// Parses and verifies the spell carried by a raw transaction.
///
/// Verification may run an external prover check, so it is async like the
/// node calls and must not block the runtime.
pub trait SpellVerifier {
    /// Verify the spell in `raw_tx`.
    ///
    /// With `strict` unset, the verifier may accept mock proofs (test networks).
    fn verify(
        &self,
        raw_tx: &[u8],
        strict: bool,
    ) -> impl Future<Output = Result<SpellResult, VerificationError>> + Send;
}

/// Parse the verifier's normalized JSON spell.
pub fn parse_spell_json(json: &str) -> Result<SpellResult, VerificationError> {
    serde_json::from_str(json).map_err(|e| VerificationError::MalformedOutput(e.to_string()))
}

/// Verifier backed by an external program, by default the `charms` CLI.
///
/// The program is invoked as `<program> <args...> --tx <hex> [--mock]` and
/// must print the verified spell as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandSpellVerifier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpellVerifier {
    pub const DEFAULT_PROGRAM: &'static str = "charms";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "tx".to_string(),
                "show-spell".to_string(),
                "--json".to_string(),
            ],
        }
    }

    /// Replace the arguments placed before `--tx`.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl Default for CommandSpellVerifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl SpellVerifier for CommandSpellVerifier {
    async fn verify(&self, raw_tx: &[u8], strict: bool) -> Result<SpellResult, VerificationError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--tx")
            .arg(hex::encode(raw_tx))
            .kill_on_drop(true);
        if !strict {
            command.arg("--mock");
        }

        debug!(program = %self.program.display(), strict, "Running spell verifier");

        let output = command.output().await.map_err(|e| {
            VerificationError::Unavailable(format!(
                "failed to execute {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerificationError::Rejected(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| VerificationError::MalformedOutput("stdout is not UTF-8".to_string()))?;
        parse_spell_json(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPELL_JSON: &str = r#"{"version":4,"tx":{"ins":[],"outs":[{"0":{"owner":"O","beneficiary":"B","last_heartbeat_block":1,"heartbeat_interval":2}}]}}"#;

    #[test]
    fn test_parse_spell_json() {
        let spell = parse_spell_json(SPELL_JSON).unwrap();
        assert_eq!(spell.version, 4);
        assert_eq!(spell.tx.outs.len(), 1);
    }

    #[test]
    fn test_parse_spell_json_malformed() {
        assert!(matches!(
            parse_spell_json("{\"tx\": 3}"),
            Err(VerificationError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_duplicate_key_is_malformed() {
        let json = r#"{"version":4,"tx":{"ins":[],"outs":[{"0":{"owner":"O","owner":"X","beneficiary":"B","last_heartbeat_block":1,"heartbeat_interval":2}}]}}"#;
        match parse_spell_json(json) {
            Err(VerificationError::MalformedOutput(msg)) => {
                assert!(msg.contains("duplicate key 'owner'"))
            }
            other => panic!("expected malformed output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let verifier = CommandSpellVerifier::new("/nonexistent/charms-verifier");
        assert!(matches!(
            verifier.verify(&[0x02, 0x00], true).await,
            Err(VerificationError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_output_is_parsed() {
        // Trailing `--tx <hex>` become positional parameters of the script.
        let verifier = CommandSpellVerifier::new("sh").with_args(vec![
            "-c".to_string(),
            format!("printf '%s' '{SPELL_JSON}'"),
            "verifier".to_string(),
        ]);
        let spell = verifier.verify(&[0x02, 0x00], true).await.unwrap();
        assert_eq!(spell.version, 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mock_flag_passed_when_not_strict() {
        let verifier = CommandSpellVerifier::new("sh").with_args(vec![
            "-c".to_string(),
            format!("[ \"$3\" = \"--mock\" ] && printf '%s' '{SPELL_JSON}'"),
            "verifier".to_string(),
        ]);
        assert!(verifier.verify(&[0x02], false).await.is_ok());
        assert!(matches!(
            verifier.verify(&[0x02], true).await,
            Err(VerificationError::Rejected(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_verifier_does_not_block_runtime() {
        let verifier = CommandSpellVerifier::new("sh").with_args(vec![
            "-c".to_string(),
            format!("sleep 1; printf '%s' '{SPELL_JSON}'"),
            "verifier".to_string(),
        ]);
        let verify = verifier.verify(&[0x02], true);
        let timer_fired_first = tokio::select! {
            biased;
            _ = verify => false,
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => true,
        };
        assert!(timer_fired_first);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_rejected() {
        let verifier = CommandSpellVerifier::new("sh").with_args(vec![
            "-c".to_string(),
            "echo 'proof does not verify' >&2; exit 3".to_string(),
            "verifier".to_string(),
        ]);
        match verifier.verify(&[0x02], true).await {
            Err(VerificationError::Rejected(msg)) => {
                assert!(msg.contains("proof does not verify"))
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
