//! File management tools

use std::future::Future;
use std::sync::Arc;

use mcp_server::protocol::ToolCallResult;
use mcp_server::registry::RegistryBuilder;
use mcp_server::{Arguments, FieldSpec, InputSchema, RegistryError, ToolDescriptor, ToolError, ToolResult};

use crate::fs::{format_time, Encoding, EntryKind, FileManager};

/// Bind a tool body to the shared manager
fn tool<F, Fut>(manager: &Arc<FileManager>, name: &str, body: F) -> ToolDescriptor
where
    F: Fn(Arc<FileManager>, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult> + Send + 'static,
{
    let manager = manager.clone();
    ToolDescriptor::new(name, move |args| body(manager.clone(), args))
}

async fn read_file(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("file_path")?;
    let encoding_name = args.string("encoding")?;
    let encoding = Encoding::parse(encoding_name)
        .ok_or_else(|| ToolError::invalid_argument("encoding", format!("unsupported encoding {}", encoding_name)))?;

    let file = manager.read_file(path, encoding).await?;
    Ok(ToolCallResult::text(format!(
        "File: {}\nSize: {} bytes\nModified: {}\nContent:\n{}",
        path,
        file.size,
        format_time(file.modified),
        file.content
    )))
}

async fn write_file(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("file_path")?;
    manager
        .write_file(path, args.string("content")?, args.boolean("create_dirs")?)
        .await?;
    Ok(ToolCallResult::text(format!("File written: {}", path)))
}

async fn list_directory(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("directory_path")?;
    let listing = manager
        .list_directory(path, args.boolean("show_hidden")?, args.boolean("recursive")?)
        .await?;

    let mut text = format!("Directory: {}", path);
    for entry in &listing {
        text.push('\n');
        text.push_str(&entry.to_string());
    }
    Ok(ToolCallResult::text(text))
}

async fn create_directory(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("directory_path")?;
    manager.create_directory(path, args.boolean("recursive")?).await?;
    Ok(ToolCallResult::text(format!("Directory created: {}", path)))
}

async fn delete_path(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("path")?;
    manager.delete_path(path, args.boolean("recursive")?).await?;
    Ok(ToolCallResult::text(format!("Deleted: {}", path)))
}

async fn file_info(manager: Arc<FileManager>, args: Arguments) -> ToolResult {
    let path = args.string("path")?;
    let info = manager.file_info(path).await?;

    let size = match info.kind {
        EntryKind::File { size } => format!("{} bytes", size),
        EntryKind::Directory => "directory".to_string(),
        EntryKind::Other => "n/a".to_string(),
    };

    Ok(ToolCallResult::text(
        [
            format!("File info: {}", path),
            format!("Type: {}", info.kind.label()),
            format!("Size: {}", size),
            format!("Created: {}", format_time(info.created)),
            format!("Modified: {}", format_time(info.modified)),
            format!("Permissions: {}", info.permissions),
            format!("Absolute path: {}", info.absolute_path.display()),
        ]
        .join("\n"),
    ))
}

pub(crate) fn register(
    builder: RegistryBuilder,
    manager: &Arc<FileManager>,
) -> Result<RegistryBuilder, RegistryError> {
    builder
        .tool(
            tool(manager, "read_file", read_file)
                .with_title("Read file")
                .with_description("Read the contents of a file")
                .with_schema(
                    InputSchema::new()
                        .field("file_path", FieldSpec::string("Path of the file to read"))
                        .field(
                            "encoding",
                            FieldSpec::one_of(Encoding::NAMES, "Encoding of the returned content")
                                .with_default("utf8"),
                        ),
                ),
        )?
        .tool(
            tool(manager, "write_file", write_file)
                .with_title("Write file")
                .with_description("Write text content to a file")
                .with_schema(
                    InputSchema::new()
                        .field("file_path", FieldSpec::string("Path of the file to write"))
                        .field("content", FieldSpec::string("Content to write"))
                        .field(
                            "create_dirs",
                            FieldSpec::boolean("Create missing parent directories").with_default(true),
                        ),
                ),
        )?
        .tool(
            tool(manager, "list_directory", list_directory)
                .with_title("List directory")
                .with_description("List the contents of a directory")
                .with_schema(
                    InputSchema::new()
                        .field(
                            "directory_path",
                            FieldSpec::string("Directory to list").with_default("."),
                        )
                        .field(
                            "show_hidden",
                            FieldSpec::boolean("Include entries starting with a dot").with_default(false),
                        )
                        .field(
                            "recursive",
                            FieldSpec::boolean("Also list the contents of subdirectories").with_default(false),
                        ),
                ),
        )?
        .tool(
            tool(manager, "create_directory", create_directory)
                .with_title("Create directory")
                .with_description("Create a new directory")
                .with_schema(
                    InputSchema::new()
                        .field("directory_path", FieldSpec::string("Directory to create"))
                        .field(
                            "recursive",
                            FieldSpec::boolean("Create missing parent directories").with_default(true),
                        ),
                ),
        )?
        .tool(
            tool(manager, "delete_path", delete_path)
                .with_title("Delete path")
                .with_description("Delete a file or directory")
                .with_schema(
                    InputSchema::new()
                        .field("path", FieldSpec::string("File or directory to delete"))
                        .field(
                            "recursive",
                            FieldSpec::boolean("Delete non-empty directories").with_default(false),
                        ),
                ),
        )?
        .tool(
            tool(manager, "file_info", file_info)
                .with_title("File info")
                .with_description("Show details about a file or directory")
                .with_schema(InputSchema::new().field("path", FieldSpec::string("File or directory path"))),
        )
}
