//! Built-in example tools.
//!
//! Host-specific tools plug in through the same [`Tool`] trait; these three
//! only need the local filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::protocol::{ContentItem, ToolDefinition};
use crate::tools::{Tool, ToolRegistry};

/// Register every built-in tool, in listing order.
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(Arc::new(EchoTool));
    registry.register(Arc::new(ListDirectoryTool));
    registry.register(Arc::new(ReadImageTool));
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Map<String, Value>) -> anyhow::Result<T> {
    serde_json::from_value(Value::Object(arguments)).context("invalid arguments")
}

/// Tool that returns its input.
pub struct EchoTool;

#[derive(Debug, Deserialize)]
struct EchoArgs {
    /// Text to return.
    text: String,
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".into(),
            description: "Return the given text unchanged. Useful to check connectivity.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to echo back"
                    }
                },
                "required": ["text"]
            }),
        }
    }

    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> {
        let args: EchoArgs = parse_args(arguments)?;
        Ok(vec![ContentItem::text(args.text)])
    }
}

/// Tool for listing a directory.
pub struct ListDirectoryTool;

#[derive(Debug, Deserialize)]
struct ListDirectoryArgs {
    /// Directory to list.
    #[serde(default = "current_dir")]
    path: PathBuf,
}

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Serialize)]
struct DirEntry {
    name: String,
    kind: &'static str,
    size: u64,
}

#[async_trait::async_trait]
impl Tool for ListDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_directory".into(),
            description: "List the entries of a directory on the host. \
                          Returns name, kind, and size for each entry."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory to list. Default: the server's working directory."
                    }
                }
            }),
        }
    }

    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> {
        let args: ListDirectoryArgs = parse_args(arguments)?;
        let mut dir = tokio::fs::read_dir(&args.path)
            .await
            .with_context(|| format!("cannot read directory '{}'", args.path.display()))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let kind = if metadata.is_dir() {
                "directory"
            } else if metadata.is_file() {
                "file"
            } else {
                "other"
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(vec![ContentItem::text(serde_json::to_string_pretty(&entries)?)])
    }
}

/// Tool that returns an image file as an image content block.
pub struct ReadImageTool;

#[derive(Debug, Deserialize)]
struct ReadImageArgs {
    /// Image file to read.
    path: PathBuf,
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    })
}

#[async_trait::async_trait]
impl Tool for ReadImageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_image".into(),
            description: "Read an image file from the host and return it as an image. \
                          Supported formats: PNG, JPEG, GIF, WebP, BMP."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path of the image file"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<ContentItem>> {
        let args: ReadImageArgs = parse_args(arguments)?;
        let Some(mime_type) = image_mime_type(&args.path) else {
            bail!("unsupported image type: '{}'", args.path.display());
        };
        let bytes = tokio::fs::read(&args.path)
            .await
            .with_context(|| format!("cannot read '{}'", args.path.display()))?;
        Ok(vec![ContentItem::image_bytes(&bytes, mime_type)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_all(&mut registry);
        registry
    }

    #[test]
    fn registered_in_listing_order() {
        let names: Vec<_> = registry().list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["echo", "list_directory", "read_image"]);
    }

    #[tokio::test]
    async fn echo_returns_text() {
        let result = registry()
            .invoke("echo", args(json!({"text": "hello"})))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, vec![ContentItem::text("hello")]);
    }

    #[tokio::test]
    async fn echo_without_text_is_a_tool_error() {
        let result = registry().invoke("echo", Map::new()).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn list_directory_sorts_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "12345").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();

        let result = registry()
            .invoke("list_directory", args(json!({"path": dir.path()})))
            .await
            .unwrap();
        assert!(!result.is_error);

        let ContentItem::Text { text } = &result.content[0] else {
            panic!("expected text");
        };
        let listed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(
            listed,
            json!([
                {"name": "a", "kind": "directory", "size": listed[0]["size"]},
                {"name": "b.txt", "kind": "file", "size": 5}
            ])
        );
    }

    #[tokio::test]
    async fn read_image_encodes_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.PNG");
        std::fs::write(&path, b"abc").unwrap();

        let result = registry()
            .invoke("read_image", args(json!({"path": path})))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, vec![ContentItem::image("YWJj", "image/png")]);
    }

    #[tokio::test]
    async fn read_image_failures_are_tool_errors() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hi").unwrap();

        let registry = registry();
        let unsupported = registry
            .invoke("read_image", args(json!({"path": text})))
            .await
            .unwrap();
        assert!(unsupported.is_error);

        let missing = registry
            .invoke("read_image", args(json!({"path": dir.path().join("gone.png")})))
            .await
            .unwrap();
        assert!(missing.is_error);
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(image_mime_type(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("a.tiff")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }
}
