//! GitHub README source adapter.
//!
//! Fetches a repository's `README.md` from the raw-content host and splits
//! it into one segment per level-1 or level-2 heading section, so each
//! section becomes its own chunk.

use anyhow::{bail, Context, Result};
use pagewise_core::models::RawDocument;
use tracing::info;

use crate::config::GithubConfig;

/// Parse `owner/repo` or a `https://github.com/owner/repo` URL.
pub fn parse_repo(input: &str) -> Result<(String, String)> {
    let trimmed = input
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches('/')
        .trim_end_matches(".git");

    let mut parts = trimmed.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("Expected a repository as owner/repo, got '{}'", input),
    }
}

pub fn readme_url(config: &GithubConfig, owner: &str, repo: &str) -> String {
    format!(
        "{}/{}/{}/{}/README.md",
        config.raw_base_url.trim_end_matches('/'),
        owner,
        repo,
        config.branch
    )
}

/// Download a repository README as a sectioned [`RawDocument`].
pub async fn fetch_readme(
    client: &reqwest::Client,
    config: &GithubConfig,
    repo: &str,
) -> Result<RawDocument> {
    let (owner, repo) = parse_repo(repo)?;
    let url = readme_url(config, &owner, &repo);

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    let status = response.status();
    if !status.is_success() {
        bail!("Fetching {} returned HTTP {}", url, status);
    }
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))?;

    let sections = split_markdown_sections(&text);
    info!(%url, sections = sections.len(), "fetched README");
    Ok(RawDocument::new(
        format!("github.com/{}/{}/README.md", owner, repo),
        sections,
    ))
}

/// Split markdown at `#` and `##` headings, ignoring headings inside code fences.
///
/// Text before the first heading forms its own section. Each heading stays
/// with the section it opens.
pub fn split_markdown_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        let is_heading = !in_fence && (trimmed.starts_with("# ") || trimmed.starts_with("## "));
        if is_heading && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }

    sections
}
