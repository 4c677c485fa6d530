//! Container listing via the docker CLI.

use serde::{Deserialize, Serialize};

use crate::collectors::{run_tool, DOCKER_TIMEOUT};
use crate::error::CollectError;

/// One JSON object per container, shaped by docker's format template so the
/// output parses without knowing the full `docker ps` schema.
const PS_FORMAT: &str = r#"{"id":"{{.ID}}","name":"{{.Names}}","image":"{{.Image}}","status":"{{.Status}}","ports":"{{.Ports}}","state":"{{.State}}"}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerMetrics {
    pub available: bool,
    pub containers: Vec<DockerContainer>,
    pub container_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub ports: String,
    pub state: String,
}

/// List all containers (running and stopped).
///
/// A missing binary, an unreachable daemon, or a timeout all surface as
/// `CollectError`; the aggregator turns that into an absent `docker` field.
pub async fn collect() -> Result<DockerMetrics, CollectError> {
    let output = run_tool("docker", &["ps", "-a", "--format", PS_FORMAT], DOCKER_TIMEOUT).await?;

    let containers = parse_container_lines(&output)?;
    let container_count = containers.len();

    Ok(DockerMetrics {
        available: true,
        containers,
        container_count,
    })
}

fn parse_container_lines(output: &str) -> Result<Vec<DockerContainer>, CollectError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|_| CollectError::parse("docker ps output"))
        })
        .collect()
}
