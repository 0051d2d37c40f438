//! Word cloud tool handlers.
//!
//! Every mutating tool goes through [`CloudState::apply`], so viewers are
//! notified exactly when a change is committed. Handlers return structured
//! JSON; failures come back as [`ToolError`] values and never abort the
//! dispatcher.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use wordcloud_core::types::clamp_size;
use wordcloud_core::{category, Error, NewWord, Snapshot, Upsert, Word, CATEGORIES};
use wordcloud_storage::CloudState;

use crate::protocol::ToolDefinition;
use crate::registry::{parse_args, tool, Param, ToolError, ToolRegistry, ToolResult};

/// Size given to MCP server words when the caller does not pick one.
const DEFAULT_MCP_SERVER_SIZE: f64 = 7.0;

/// Number of example keywords shown per category.
const CATEGORY_EXAMPLES: usize = 5;

#[derive(Debug, Deserialize)]
struct AddWordParams {
    word: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    size: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WordParams {
    word: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionParams {
    source: String,
    target: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct ClearParams {
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AddMcpServersParams {
    #[serde(default)]
    size: Option<f64>,
}

/// The word cloud tool set.
pub struct WordCloudTools {
    state: CloudState,
    viewer_url: String,
    claude_desktop_config: Option<PathBuf>,
}

type Method = fn(&WordCloudTools, Value) -> ToolResult;

impl WordCloudTools {
    pub fn new(state: CloudState, viewer_url: impl Into<String>) -> Self {
        Self {
            state,
            viewer_url: viewer_url.into(),
            claude_desktop_config: None,
        }
    }

    /// Where `add_mcp_servers` looks for installed servers.
    pub fn with_claude_desktop_config(mut self, path: Option<PathBuf>) -> Self {
        self.claude_desktop_config = path;
        self
    }

    /// Register every word cloud tool, in catalogue order.
    pub fn register(self, registry: &mut ToolRegistry) -> Result<(), ToolError> {
        let tools = Arc::new(self);

        let catalogue: [(ToolDefinition, Method); 10] = [
            (
                tool(
                    "add_word",
                    "Add a word to the word cloud with optional category/description",
                    &[
                        Param::string("word", "The word to add to the cloud").required(),
                        Param::string(
                            "description",
                            "Description or category of the word (e.g., 'tool', 'concept', 'technology')",
                        ),
                        Param::number("size", "Relative size/importance (1-10, default: 5)")
                            .default(json!(5)),
                    ],
                ),
                Self::add_word,
            ),
            (
                tool(
                    "remove_word",
                    "Remove a word and its connections from the word cloud",
                    &[Param::string("word", "The word to remove").required()],
                ),
                Self::remove_word,
            ),
            (
                tool(
                    "add_connection",
                    "Create a directed connection (arrow) between two words",
                    &[
                        Param::string("source", "The source word (where the arrow starts)")
                            .required(),
                        Param::string("target", "The target word (where the arrow ends)")
                            .required(),
                        Param::string(
                            "label",
                            "Optional label for the connection (e.g., 'uses', 'is a')",
                        ),
                    ],
                ),
                Self::add_connection,
            ),
            (
                tool(
                    "remove_connection",
                    "Remove a connection between two words",
                    &[
                        Param::string("source", "The source word").required(),
                        Param::string("target", "The target word").required(),
                    ],
                ),
                Self::remove_connection,
            ),
            (
                tool(
                    "clear_cloud",
                    "Clear all words and connections from the cloud",
                    &[Param::boolean("confirm", "Must be true to confirm clearing")
                        .default(json!(false))
                        .required()],
                ),
                Self::clear_cloud,
            ),
            (
                tool("list_words", "List all words currently in the cloud", &[]),
                Self::list_words,
            ),
            (
                tool(
                    "list_categories",
                    "List all available categories and their descriptions",
                    &[],
                ),
                Self::list_categories,
            ),
            (
                tool(
                    "list_by_category",
                    "List words grouped by their categories in a structured format",
                    &[],
                ),
                Self::list_by_category,
            ),
            (
                tool(
                    "add_mcp_servers",
                    "Add all MCP servers installed in Claude Desktop to the word cloud",
                    &[Param::number(
                        "size",
                        "Size for all MCP server words (1-10, default: 7)",
                    )
                    .default(json!(7))],
                ),
                Self::add_mcp_servers,
            ),
            (
                tool(
                    "viewer_url",
                    "Get the URL of the live word cloud viewer",
                    &[],
                ),
                Self::viewer_url,
            ),
        ];

        for (definition, method) in catalogue {
            let tools = Arc::clone(&tools);
            registry.register(definition, move |args| method(&tools, args))?;
        }

        Ok(())
    }

    fn add_word(&self, args: Value) -> ToolResult {
        let params: AddWordParams = parse_args(args)?;
        let key = require("word", &params.word)?.to_string();

        let mut input = NewWord::new(key.clone()).description(params.description);
        if let Some(size) = params.size {
            input = input.size(clamp_size(size));
        }

        let (action, word, total) = self.state.apply(|cloud| {
            let action = cloud.upsert_word(input)?;
            let word = cloud
                .find_word(&key)
                .cloned()
                .ok_or_else(|| Error::WordNotFound(key.clone()))?;
            Ok((action, word, cloud.words.len()))
        })?;

        tracing::info!(word = %word.word, ?action, "Word stored");

        Ok(json!({
            "action": action,
            "category_label": category::find(&word.category).map(|c| c.label),
            "word": word,
            "total_words": total,
            "viewer": self.viewer_url,
        }))
    }

    fn remove_word(&self, args: Value) -> ToolResult {
        let params: WordParams = parse_args(args)?;
        let key = require("word", &params.word)?;

        let (removed, remaining) = self.state.apply(|cloud| {
            let removed = cloud.remove_word(key)?;
            Ok((removed, cloud.words.len()))
        })?;

        Ok(json!({
            "removed": key,
            "connections_removed": removed,
            "remaining_words": remaining,
        }))
    }

    fn add_connection(&self, args: Value) -> ToolResult {
        let params: ConnectionParams = parse_args(args)?;
        let source = require("source", &params.source)?;
        let target = require("target", &params.target)?;

        let (action, connection) = self.state.apply(|cloud| {
            let action = cloud.add_connection(source, target, &params.label)?;
            let connection = cloud
                .find_connection(source, target)
                .cloned()
                .ok_or_else(|| Error::ConnectionNotFound {
                    from: source.to_string(),
                    to: target.to_string(),
                })?;
            Ok((action, connection))
        })?;

        Ok(json!({
            "action": action,
            "connection": connection,
        }))
    }

    fn remove_connection(&self, args: Value) -> ToolResult {
        let params: ConnectionParams = parse_args(args)?;
        let source = require("source", &params.source)?;
        let target = require("target", &params.target)?;

        let remaining = self.state.apply(|cloud| {
            cloud.remove_connection(source, target)?;
            Ok(cloud.connections.len())
        })?;

        Ok(json!({
            "removed": { "source": source, "target": target },
            "remaining_connections": remaining,
        }))
    }

    fn clear_cloud(&self, args: Value) -> ToolResult {
        let params: ClearParams = parse_args(args)?;
        if !params.confirm {
            return Err(ToolError::InvalidArguments(
                "confirm must be true to clear all words".to_string(),
            ));
        }

        let (words, connections) = self.state.apply(|cloud| Ok(cloud.clear()))?;

        Ok(json!({
            "words_removed": words,
            "connections_removed": connections,
        }))
    }

    fn list_words(&self, _args: Value) -> ToolResult {
        let snapshot = self.state.snapshot();

        Ok(json!({
            "total_words": snapshot.words.len(),
            "words": snapshot.words_by_size(),
            "connections": snapshot.connections,
            "viewer": self.viewer_url,
        }))
    }

    fn list_categories(&self, _args: Value) -> ToolResult {
        let categories: Vec<Value> = CATEGORIES
            .iter()
            .map(|c| {
                json!({
                    "key": c.key,
                    "label": c.label,
                    "description": c.description,
                    "color": c.color,
                    "examples": &c.keywords[..c.keywords.len().min(CATEGORY_EXAMPLES)],
                })
            })
            .collect();

        Ok(json!({
            "categories": categories,
            "usage": "Pass a category key as the description of add_word, or let the word be categorised from its keywords.",
        }))
    }

    fn list_by_category(&self, _args: Value) -> ToolResult {
        let snapshot = self.state.snapshot();

        Ok(json!({
            "total_words": snapshot.words.len(),
            "categories": group_by_category(&snapshot),
            "viewer": self.viewer_url,
        }))
    }

    fn add_mcp_servers(&self, args: Value) -> ToolResult {
        let params: AddMcpServersParams = parse_args(args)?;
        let size = clamp_size(params.size.unwrap_or(DEFAULT_MCP_SERVER_SIZE));

        let path = self.claude_desktop_config.as_ref().ok_or_else(|| {
            Error::Config("No Claude Desktop config location on this platform".to_string())
        })?;
        let servers = installed_mcp_servers(path)?;
        if servers.is_empty() {
            return Err(ToolError::State(Error::Config(format!(
                "No MCP servers found in {}",
                path.display()
            ))));
        }

        let (added, updated, total) = self.state.apply(|cloud| {
            let mut added = Vec::new();
            let mut updated = Vec::new();
            for name in &servers {
                let input = NewWord::new(name.clone())
                    .description("MCP Server")
                    .category("mcp")
                    .size(size);
                match cloud.upsert_word(input)? {
                    Upsert::Added => added.push(name.clone()),
                    Upsert::Updated => updated.push(name.clone()),
                }
            }
            Ok((added, updated, cloud.words.len()))
        })?;

        Ok(json!({
            "added": added,
            "updated": updated,
            "total_words": total,
            "viewer": self.viewer_url,
        }))
    }

    fn viewer_url(&self, _args: Value) -> ToolResult {
        Ok(json!({
            "url": self.viewer_url,
            "total_words": self.state.snapshot().words.len(),
        }))
    }
}

fn require<'a>(name: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::InvalidArguments(format!("{} is required", name)));
    }
    Ok(value)
}

/// Group words by category: catalogue categories first, in catalogue order,
/// then any categories the catalogue does not know (from older data).
fn group_by_category(snapshot: &Snapshot) -> Vec<Value> {
    let mut groups: BTreeMap<&str, Vec<&Word>> = BTreeMap::new();
    for word in snapshot.words_by_size() {
        groups.entry(word.category.as_str()).or_default().push(word);
    }

    let mut result = Vec::new();
    for category in CATEGORIES {
        if let Some(words) = groups.remove(category.key) {
            result.push(json!({
                "key": category.key,
                "label": category.label,
                "count": words.len(),
                "words": words,
            }));
        }
    }
    for (key, words) in groups {
        result.push(json!({
            "key": key,
            "label": key,
            "count": words.len(),
            "words": words,
        }));
    }
    result
}

/// Names of the servers configured in a Claude Desktop config file.
fn installed_mcp_servers(path: &Path) -> Result<Vec<String>, Error> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Claude Desktop config not found at {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path)?;
    let config: Value = serde_json::from_str(&contents)?;

    Ok(config
        .get("mcpServers")
        .and_then(Value::as_object)
        .map(|servers| servers.keys().cloned().collect())
        .unwrap_or_default())
}
