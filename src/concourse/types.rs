//! Wire types for the Concourse v1 API.
//!
//! Field names follow the JSON the server emits (`team_name`, `api_url`,
//! singular `output` on jobs). Everything is an immutable snapshot decoded
//! per request; nothing here is cached between calls.

use serde::{Deserialize, Serialize};

/// A named pipeline on the Concourse server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// A display grouping of job names within a pipeline. Groups do not affect
/// job identity; jobs are keyed by name within their pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(rename = "jobs", default)]
    pub job_names: Vec<String>,
}

/// One pipeline step, with its most recent build state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub finished_build: Option<Build>,
    #[serde(default)]
    pub next_build: Option<Build>,
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(rename = "output", default)]
    pub outputs: Vec<Output>,
}

/// One execution instance of a job.
///
/// `status` is an open set of strings ("succeeded", "failed", "errored",
/// "aborted", "pending", ...); unrecognized values pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub pipeline_name: String,
    #[serde(rename = "team_name", default)]
    pub team: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
}

/// The resource versions one build consumed and produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub inputs: Vec<Input>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// A resource version consumed by a build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    #[serde(default)]
    pub pipeline_id: i64,
    #[serde(default)]
    pub first_occurrence: bool,
    #[serde(default)]
    pub trigger: bool,
    #[serde(default)]
    pub passed: Vec<String>,
}

/// A resource version produced by a build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

/// A resource version identifier. `number` is the field compared against the
/// caller's target version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub number: String,
}

/// Free-form key/value annotation on a resource version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}
