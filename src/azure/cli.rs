//! Azure CLI command execution.
//!
//! Provides utilities for running `az` commands and parsing their output.

use crate::config::MAX_STDOUT_BYTES;
use crate::error::{CliError, CliResult};
use colored::Colorize;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::process::Command;
use std::sync::OnceLock;

/// Regex for splitting command strings while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
/// Regex matching the provider's "resource does not exist" answers.
static NOT_FOUND_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|\"([^\"]*)\"\s*|([^'\s]*)\s*"#).expect("Invalid Regex")
    })
}

fn get_not_found_regex() -> &'static Regex {
    NOT_FOUND_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(ResourceNotFound|NotFound|ResourceGroupNotFound)\b|was not found")
            .expect("Invalid Regex")
    })
}

/// True when `az` stderr says the resource does not exist.
pub fn is_not_found(stderr: &str) -> bool {
    get_not_found_regex().is_match(stderr)
}

/// Run a shell command and return its stdout.
///
/// The command string is split on spaces, with quoted substrings preserved.
/// A non-zero exit status is returned as [`CliError::Failed`] carrying stderr.
pub fn run(cmd: &str) -> CliResult<String> {
    log::debug!("run({cmd})", cmd = cmd.on_blue());

    let cmds: Vec<&str> = split_and_strip(cmd);
    log::trace!("split cmds={:?}", cmds);

    let (program, args) = cmds.split_first().ok_or(CliError::Empty)?;
    let mut command = Command::new(program);
    command.args(args);

    let output = command.output().map_err(|e| {
        log::error!("Command execution failed: {}", e);
        CliError::Spawn {
            cmd: cmd.to_string(),
            source: e,
        }
    })?;

    if output.status.success() {
        log::debug!("Success cmd: {cmd}");
        log::debug!("Success output.stdout.len(): {}", output.stdout.len());

        if output.stdout.len() > MAX_STDOUT_BYTES {
            return Err(CliError::TooLarge {
                cmd: cmd.to_string(),
                len: output.stdout.len(),
            });
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        log::trace!(
            "code={code:?}, status={status}\n┎######\nstderr=\n{stderr}\n┖######",
            code = output.status.code(),
            status = output.status,
            stderr = stderr.red()
        );
        log::warn!(
            "{failed} to run {cmd}",
            failed = "failed".on_red(),
            cmd = cmd.on_blue()
        );
        return Err(CliError::Failed {
            cmd: cmd.to_string(),
            code: output.status.code(),
            stderr,
        });
    }

    String::from_utf8(output.stdout).map_err(|_| CliError::Utf8 {
        cmd: cmd.to_string(),
    })
}

/// Run a command and deserialize its JSON stdout.
pub fn run_json<T: DeserializeOwned>(cmd: &str) -> CliResult<T> {
    let output = run(cmd)?;
    parse_json(cmd, &output)
}

/// Deserialize `az` output, reporting the JSON path on failure.
pub fn parse_json<T: DeserializeOwned>(cmd: &str, output: &str) -> CliResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(output);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::error!("OUTPUT START:\n\n{}\n\nOUTPUT END\n", output);
        CliError::Json {
            cmd: cmd.to_string(),
            path: e.path().to_string(),
            message: e.inner().to_string(),
        }
    })
}

/// Make sure the `az` client is installed, returning its version.
pub fn check_az_cli() -> CliResult<String> {
    #[derive(serde::Deserialize)]
    struct AzVersion {
        #[serde(rename = "azure-cli")]
        azure_cli: String,
    }
    let version: AzVersion = run_json("az version --output json")?;
    log::info!("Found azure-cli {}", version.azure_cli.green());
    Ok(version.azure_cli)
}

/// Split a command string on spaces, preserving quoted substrings.
fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim().trim_matches('\'').trim_matches('"'))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_strip_complex() {
        let input = "Hello 'World War'  'fail' Rust";
        let expected = vec!["Hello", "World War", "fail", "Rust"];
        assert_eq!(split_and_strip(input), expected);
    }

    #[test]
    fn test_split_and_strip_nospaces() {
        let input = "NoSpacesHere";
        let expected = vec!["NoSpacesHere"];
        assert_eq!(split_and_strip(input), expected);
    }

    #[test]
    fn test_split_az_command() {
        let input = "az network nic show -g 'my rg' -n vm1-nic --output json";
        let expected = vec![
            "az", "network", "nic", "show", "-g", "my rg", "-n", "vm1-nic", "--output", "json",
        ];
        assert_eq!(split_and_strip(input), expected);
    }

    #[test]
    fn test_is_not_found() {
        assert!(is_not_found(
            "ERROR: (ResourceNotFound) The Resource 'Microsoft.Network/networkInterfaces/x' under resource group 'rg1' was not found."
        ));
        assert!(is_not_found("ERROR: (NotFound) Resource x not found"));
        assert!(!is_not_found("ERROR: (AuthorizationFailed) no access"));
    }

    #[test]
    fn test_parse_json_reports_path() {
        #[derive(serde::Deserialize, Debug)]
        struct Probe {
            #[allow(dead_code)]
            count: u32,
        }
        let err = parse_json::<Probe>("az test", r#"{"count":"x"}"#).unwrap_err();
        match err {
            CliError::Json { path, .. } => assert_eq!(path, "count"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_run_empty_command() {
        assert!(matches!(run("   "), Err(CliError::Empty)));
    }
}
