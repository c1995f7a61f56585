//! Project overview and file content resources, plus the analyzer prompt

use std::sync::Arc;

use mcp_server::protocol::{PromptMessage, ResourceContents};
use mcp_server::registry::RegistryBuilder;
use mcp_server::{
    Arguments, FieldSpec, InputSchema, PromptDescriptor, RegistryError, ResourceDescriptor,
    ResourceRequest, ToolError,
};

use crate::fs::{Encoding, FileManager};

const ANALYSIS_TYPES: &[&str] = &["code_review", "documentation", "performance", "security"];

async fn project_overview(manager: Arc<FileManager>, request: ResourceRequest) -> Vec<ResourceContents> {
    let text = match manager.list_directory(".", true, false).await {
        Ok(listing) => {
            let mut overview = String::from("Project overview\n\n");
            for entry in listing {
                overview.push_str(&entry.to_string());
                overview.push('\n');
            }
            overview
        }
        Err(e) => format!("Failed to build project overview: {}", e),
    };
    vec![ResourceContents::text(request.uri, text)]
}

async fn file_content(manager: Arc<FileManager>, request: ResourceRequest) -> Vec<ResourceContents> {
    let path = request.variable("path").unwrap_or_default();
    let text = match manager.read_file(path, Encoding::Utf8).await {
        Ok(file) => file.content,
        Err(e) => format!("Failed to read file: {}", e),
    };
    vec![ResourceContents::text(request.uri, text)]
}

fn file_analyzer(args: &Arguments) -> Result<Vec<PromptMessage>, ToolError> {
    let file_path = args.string("file_path")?;
    let analysis_type = args.string("analysis_type")?;

    Ok(vec![PromptMessage::user(format!(
        "You are an experienced code analyst. Analyze the file {file_path} and give \
         {analysis_type} recommendations. Be specific and practical, and suggest concrete \
         improvements.\n\nPlease review this file with a focus on {analysis_type}."
    ))])
}

pub(crate) fn register(
    builder: RegistryBuilder,
    manager: &Arc<FileManager>,
) -> Result<RegistryBuilder, RegistryError> {
    let overview_manager = manager.clone();
    let content_manager = manager.clone();

    builder
        .resource(
            ResourceDescriptor::fixed("project_overview", "file://overview/", move |request| {
                project_overview(overview_manager.clone(), request)
            })
            .with_description("Overview of the files in the project root")
            .with_mime_type("text/plain"),
        )?
        .resource(
            ResourceDescriptor::template("file_content", "file://content/{path}", move |request| {
                file_content(content_manager.clone(), request)
            })?
            .with_title("File content")
            .with_description("Text content of a file in the project root"),
        )?
        .prompt(
            PromptDescriptor::new("file_analyzer", file_analyzer)
                .with_title("File analyzer")
                .with_description("Analyze a source file and suggest improvements")
                .with_arguments(
                    InputSchema::new()
                        .field("file_path", FieldSpec::string("Path of the file to analyze"))
                        .field("analysis_type", FieldSpec::one_of(ANALYSIS_TYPES, "Kind of analysis")),
                ),
        )
}
