use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use log::{error, info};

use crate::auth::{SystemClock, TokenProvider};
use crate::concourse::client::build_http_client;
use crate::concourse::scanner::DEFAULT_RESOURCE_NAME;
use crate::concourse::{BuildScanner, ConcourseClient, ScanReport};
use crate::error::PipeScanError;

#[derive(Parser)]
#[command(name = "pipescan")]
#[command(author, version, about = "Trace artifact version propagation through Concourse pipelines", long_about = None)]
pub struct Cli {
    /// Pipeline to scan
    pipeline: String,

    /// Resource version number to look for
    #[arg(value_name = "VERSION")]
    target_version: String,

    #[arg(long, env = "CONCOURSE_HOST")]
    host: String,

    #[arg(long, env = "CONCOURSE_TEAM")]
    team: String,

    /// Omit together with --password to query anonymously
    #[arg(long, env = "CONCOURSE_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "CONCOURSE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Resource whose version inputs are inspected
    #[arg(short, long, default_value = DEFAULT_RESOURCE_NAME)]
    resource: String,

    /// Write matches as JSON to this path instead of only printing them
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    pretty: bool,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        info!(
            "Scanning pipeline {} for {} version {}",
            self.pipeline, self.resource, self.target_version
        );

        let http = build_http_client()?;

        let token_provider = match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Arc::new(TokenProvider::new(
                &self.host,
                &self.team,
                username.clone(),
                password.clone(),
                http.clone(),
                Arc::new(SystemClock),
            ))),
            (None, None) => None,
            _ => {
                return Err(PipeScanError::Config(
                    "username and password must be provided together".to_string(),
                )
                .into())
            }
        };

        let client = ConcourseClient::new(&self.host, self.team.clone(), http, token_provider)?;
        let scanner = BuildScanner::new(Arc::new(client));

        let report = scanner
            .find_matching_builds(&self.pipeline, &self.resource, &self.target_version)
            .await?;

        self.report(&report)?;

        if !report.failures.is_empty() {
            bail!(
                "{} of {} job scans failed",
                report.failures.len(),
                report.jobs_scanned
            );
        }

        Ok(())
    }

    /// Prints every match, exports them if requested, then logs failures.
    /// Runs before the failure exit so partial results are never lost.
    fn report(&self, report: &ScanReport) -> Result<()> {
        for found in &report.matches {
            println!("{}/{} has {}", found.pipeline, found.job, found.status);
        }

        if let Some(output_path) = &self.output {
            let json_output = if self.pretty {
                serde_json::to_string_pretty(&report.matches)?
            } else {
                serde_json::to_string(&report.matches)?
            };

            std::fs::write(output_path, json_output)?;
            info!("Matches written to: {}", output_path.display());
        }

        for failure in &report.failures {
            error!("Scan of job {} failed: {}", failure.job, failure.error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    // Runs clap's debug assertions, which reject duplicate argument ids such
    // as a user-defined arg shadowing the generated --version flag.
    #[test]
    fn argument_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resource_defaults_to_product_version() {
        let cli = Cli::parse_from([
            "pipescan",
            "p1",
            "42",
            "--host",
            "https://ci.example.com",
            "--team",
            "main",
        ]);

        assert_eq!(cli.resource, "product-version");
        assert_eq!(cli.pipeline, "p1");
        assert_eq!(cli.target_version, "42");
    }

    #[tokio::test]
    async fn rejects_username_without_password() {
        let cli = Cli::parse_from([
            "pipescan",
            "p1",
            "42",
            "--host",
            "https://ci.example.com",
            "--team",
            "main",
            "--username",
            "user",
        ]);

        let err = cli.execute().await.unwrap_err();
        assert!(err.to_string().contains("provided together"));
    }
}
